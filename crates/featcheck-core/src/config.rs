//! Check matrix configuration.
//!
//! A [`MatrixConfig`] describes the whole run: which tool to drive, which
//! features to combine and which (toolchain, target) cells to check. It is
//! expanded into one immutable [`CheckConfiguration`] per cell.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MatrixError, MatrixResult};
use crate::powerset::Powerset;

/// Upper bound on declared features; the matrix grows as `2^N`.
pub const MAX_FEATURES: usize = 16;

/// Default build tool.
pub const DEFAULT_TOOL: &str = "cargo";

/// Target used by the default matrix besides the host.
pub const WASM_TARGET: &str = "wasm32-unknown-unknown";

/// Ordered list of distinct optional feature names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeatureSet(Vec<String>);

impl FeatureSet {
    /// Build a feature set, rejecting duplicates, empty names and oversized sets.
    pub fn new<I, S>(names: I) -> MatrixResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut features: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if name.trim().is_empty() {
                return Err(MatrixError::EmptyFeatureName);
            }
            if features.contains(&name) {
                return Err(MatrixError::DuplicateFeature { name });
            }
            features.push(name);
        }
        if features.len() > MAX_FEATURES {
            return Err(MatrixError::TooManyFeatures {
                count: features.len(),
                max: MAX_FEATURES,
            });
        }
        Ok(Self(features))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Features forced into every checked subset.
///
/// Keeps insertion order; repeated names collapse into one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MandatorySet(Vec<String>);

impl MandatorySet {
    pub fn new<I, S>(names: I) -> MatrixResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut mandatory: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if name.trim().is_empty() {
                return Err(MatrixError::EmptyFeatureName);
            }
            if !mandatory.contains(&name) {
                mandatory.push(name);
            }
        }
        Ok(Self(mandatory))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// One cell of the check matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckConfiguration {
    toolchain: String,
    target: Option<String>,
    features: FeatureSet,
    mandatory: MandatorySet,
}

impl CheckConfiguration {
    pub fn new(
        toolchain: impl Into<String>,
        target: Option<String>,
        features: FeatureSet,
        mandatory: MandatorySet,
    ) -> MatrixResult<Self> {
        let toolchain = toolchain.into();
        if toolchain.trim().is_empty() {
            return Err(MatrixError::EmptyToolchain);
        }
        if target.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(MatrixError::EmptyTarget);
        }
        Ok(Self {
            toolchain,
            target,
            features,
            mandatory,
        })
    }

    pub fn toolchain(&self) -> &str {
        &self.toolchain
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    pub fn mandatory(&self) -> &MandatorySet {
        &self.mandatory
    }

    /// Short human-readable name: `toolchain` or `toolchain/target`.
    pub fn label(&self) -> String {
        match &self.target {
            Some(target) => format!("{}/{}", self.toolchain, target),
            None => self.toolchain.clone(),
        }
    }

    /// Every feature subset to check, each unioned with the mandatory set.
    ///
    /// Enumerated members come first in declaration order, followed by any
    /// mandatory member not already present.
    pub fn subsets(&self) -> Vec<Vec<String>> {
        Powerset::new(self.features.as_slice())
            .map(|subset| {
                let mut merged: Vec<String> = subset.into_iter().cloned().collect();
                for name in self.mandatory.as_slice() {
                    if !merged.contains(name) {
                        merged.push(name.clone());
                    }
                }
                merged
            })
            .collect()
    }
}

impl fmt::Display for CheckConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// A (toolchain, target) pair as written in the matrix file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixCell {
    pub toolchain: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl MatrixCell {
    pub fn new(toolchain: impl Into<String>, target: Option<&str>) -> Self {
        Self {
            toolchain: toolchain.into(),
            target: target.map(str::to_string),
        }
    }
}

/// Whole-run configuration, loadable from TOML.
///
/// Keys missing from the file take their value from [`MatrixConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatrixConfig {
    /// Build tool executable.
    pub tool: String,

    /// Optional features to combine.
    pub features: Vec<String>,

    /// Features present in every combination.
    pub mandatory: Vec<String>,

    /// Toolchain/target cells, checked concurrently.
    #[serde(rename = "cell")]
    pub cells: Vec<MatrixCell>,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            tool: DEFAULT_TOOL.to_string(),
            features: vec!["sync".to_string(), "alloc".to_string()],
            mandatory: Vec::new(),
            cells: vec![
                MatrixCell::new("nightly", None),
                MatrixCell::new("stable", None),
                MatrixCell::new("nightly", Some(WASM_TARGET)),
                MatrixCell::new("stable", Some(WASM_TARGET)),
            ],
        }
    }
}

impl MatrixConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str, origin: &Path) -> MatrixResult<Self> {
        toml::from_str(content).map_err(|source| MatrixError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> MatrixResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| MatrixError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Expand into one validated [`CheckConfiguration`] per cell, in file order.
    pub fn configurations(&self) -> MatrixResult<Vec<CheckConfiguration>> {
        if self.cells.is_empty() {
            return Err(MatrixError::EmptyMatrix);
        }
        let features = FeatureSet::new(self.features.iter().cloned())?;
        let mandatory = MandatorySet::new(self.mandatory.iter().cloned())?;

        self.cells
            .iter()
            .map(|cell| {
                CheckConfiguration::new(
                    cell.toolchain.clone(),
                    cell.target.clone(),
                    features.clone(),
                    mandatory.clone(),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(features: &[&str], mandatory: &[&str]) -> CheckConfiguration {
        CheckConfiguration::new(
            "stable",
            None,
            FeatureSet::new(features.iter().copied()).expect("features"),
            MandatorySet::new(mandatory.iter().copied()).expect("mandatory"),
        )
        .expect("configuration")
    }

    #[test]
    fn test_feature_set_rejects_duplicates() {
        let err = FeatureSet::new(["sync", "alloc", "sync"]).unwrap_err();
        assert!(matches!(err, MatrixError::DuplicateFeature { ref name } if name == "sync"));
    }

    #[test]
    fn test_feature_set_rejects_empty_name() {
        let err = FeatureSet::new(["sync", " "]).unwrap_err();
        assert!(matches!(err, MatrixError::EmptyFeatureName));
    }

    #[test]
    fn test_feature_set_rejects_too_many() {
        let names: Vec<String> = (0..=MAX_FEATURES).map(|i| format!("f{i}")).collect();
        let err = FeatureSet::new(names).unwrap_err();
        assert!(matches!(err, MatrixError::TooManyFeatures { count, .. } if count == MAX_FEATURES + 1));
    }

    #[test]
    fn test_mandatory_set_collapses_duplicates() {
        let mandatory = MandatorySet::new(["std", "std", "log"]).expect("mandatory");
        assert_eq!(mandatory.as_slice(), ["std".to_string(), "log".to_string()]);
    }

    #[test]
    fn test_empty_toolchain_rejected() {
        let err = CheckConfiguration::new(
            "",
            None,
            FeatureSet::default(),
            MandatorySet::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MatrixError::EmptyToolchain));
    }

    #[test]
    fn test_empty_target_rejected() {
        for target in ["", "  "] {
            let err = CheckConfiguration::new(
                "stable",
                Some(target.to_string()),
                FeatureSet::default(),
                MandatorySet::default(),
            )
            .unwrap_err();
            assert!(matches!(err, MatrixError::EmptyTarget));
        }
    }

    #[test]
    fn test_label_includes_target() {
        let host = config(&[], &[]);
        assert_eq!(host.label(), "stable");

        let wasm = CheckConfiguration::new(
            "nightly",
            Some(WASM_TARGET.to_string()),
            FeatureSet::default(),
            MandatorySet::default(),
        )
        .expect("configuration");
        assert_eq!(wasm.label(), "nightly/wasm32-unknown-unknown");
        assert_eq!(wasm.to_string(), wasm.label());
    }

    #[test]
    fn test_subsets_sync_alloc() {
        let subsets = config(&["sync", "alloc"], &[]).subsets();
        assert_eq!(
            subsets,
            vec![
                Vec::<String>::new(),
                vec!["alloc".to_string()],
                vec!["sync".to_string()],
                vec!["sync".to_string(), "alloc".to_string()],
            ]
        );
    }

    #[test]
    fn test_subsets_always_contain_mandatory() {
        let cfg = config(&["sync", "alloc", "std"], &["std", "log"]);
        let subsets = cfg.subsets();
        assert_eq!(subsets.len(), 8);
        for subset in &subsets {
            assert!(subset.contains(&"std".to_string()));
            assert!(subset.contains(&"log".to_string()));
            let mut deduped = subset.clone();
            deduped.sort();
            deduped.dedup();
            assert_eq!(deduped.len(), subset.len(), "duplicate in {subset:?}");
        }
    }

    #[test]
    fn test_subsets_empty_features_single_baseline() {
        assert_eq!(config(&[], &[]).subsets(), vec![Vec::<String>::new()]);
        assert_eq!(
            config(&[], &["std"]).subsets(),
            vec![vec!["std".to_string()]]
        );
    }

    #[test]
    fn test_default_matrix_matches_reference() {
        let configs = MatrixConfig::default().configurations().expect("default");
        let labels: Vec<String> = configs.iter().map(CheckConfiguration::label).collect();
        assert_eq!(
            labels,
            vec![
                "nightly",
                "stable",
                "nightly/wasm32-unknown-unknown",
                "stable/wasm32-unknown-unknown",
            ]
        );
        for cfg in &configs {
            assert_eq!(cfg.features().as_slice(), ["sync", "alloc"]);
            assert!(cfg.mandatory().as_slice().is_empty());
        }
    }

    #[test]
    fn test_toml_overrides_and_defaults() {
        let content = r#"
features = ["std", "serde"]

[[cell]]
toolchain = "1.70"

[[cell]]
toolchain = "stable"
target = "thumbv7em-none-eabihf"
"#;
        let cfg = MatrixConfig::from_toml_str(content, Path::new("featcheck.toml")).expect("parse");
        assert_eq!(cfg.tool, DEFAULT_TOOL);
        assert_eq!(cfg.features, vec!["std", "serde"]);
        assert!(cfg.mandatory.is_empty());
        assert_eq!(
            cfg.cells,
            vec![
                MatrixCell::new("1.70", None),
                MatrixCell::new("stable", Some("thumbv7em-none-eabihf")),
            ]
        );
    }

    #[test]
    fn test_toml_unknown_key_rejected() {
        let err = MatrixConfig::from_toml_str("featurez = []", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, MatrixError::ConfigParse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_toml_empty_target_rejected() {
        let cfg = MatrixConfig::from_toml_str(
            "[[cell]]\ntoolchain = \"stable\"\ntarget = \"\"\n",
            Path::new("featcheck.toml"),
        )
        .expect("parse");
        assert!(matches!(cfg.configurations(), Err(MatrixError::EmptyTarget)));
    }

    #[test]
    fn test_empty_cells_rejected() {
        let cfg = MatrixConfig {
            cells: Vec::new(),
            ..MatrixConfig::default()
        };
        assert!(matches!(cfg.configurations(), Err(MatrixError::EmptyMatrix)));
    }
}
