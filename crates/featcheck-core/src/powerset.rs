//! Feature combination enumeration.
//!
//! Subsets are produced by counting a bitmask from `0` to `2^N - 1`. Item `i`
//! is selected by bit `N - 1 - i`, so the last item flips fastest:
//!
//! ```text
//! [a, b]    -> [], [b], [a], [a, b]
//! [a, b, c] -> [], [c], [b], [b, c], [a], [a, c], [a, b], [a, b, c]
//! ```
//!
//! Members of every subset keep the input order.

/// Iterator over every subset of a slice.
///
/// Yields exactly `2^N` subsets, starting with the empty one and ending with
/// the full slice. The input is only borrowed.
#[derive(Debug, Clone)]
pub struct Powerset<'a, T> {
    items: &'a [T],
    next: u64,
    end: u64,
}

impl<'a, T> Powerset<'a, T> {
    /// Create the iterator.
    ///
    /// # Panics
    ///
    /// Panics if `items` has 64 or more elements. Callers bound the feature
    /// count well below that (see [`crate::config::MAX_FEATURES`]).
    pub fn new(items: &'a [T]) -> Self {
        assert!(
            items.len() < u64::BITS as usize,
            "powerset of {} items does not fit a 64-bit mask",
            items.len()
        );
        Self {
            items,
            next: 0,
            end: 1u64 << items.len(),
        }
    }

    fn select(&self, mask: u64) -> Vec<&'a T> {
        let n = self.items.len();
        self.items
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1u64 << (n - 1 - i)) != 0)
            .map(|(_, item)| item)
            .collect()
    }
}

impl<'a, T> Iterator for Powerset<'a, T> {
    type Item = Vec<&'a T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let subset = self.select(self.next);
        self.next += 1;
        Some(subset)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.end - self.next) {
            Ok(remaining) => (remaining, Some(remaining)),
            Err(_) => (usize::MAX, None),
        }
    }
}

impl<T> ExactSizeIterator for Powerset<'_, T> {}

/// Collect every subset of `items` into owned vectors.
///
/// # Panics
///
/// Panics if `items` has 64 or more elements, like [`Powerset::new`].
pub fn powerset<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    Powerset::new(items)
        .map(|subset| subset.into_iter().cloned().collect())
        .collect()
}
