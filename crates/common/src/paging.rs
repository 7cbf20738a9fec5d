use serde::{Deserialize, Serialize};

/// An offset + length window over an ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryRange {
    pub offset: usize,
    pub length: usize,
}

impl QueryRange {
    /// Creates a range starting at `offset` returning at most `length` items.
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    /// A range that disables paging.
    pub fn all() -> Self {
        Self {
            offset: 0,
            length: usize::MAX,
        }
    }

    /// Returns true if this range does not restrict the result set.
    pub fn is_all(&self) -> bool {
        self.offset == 0 && self.length == usize::MAX
    }

    /// Applies the range to an already filtered and ordered sequence.
    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Page<T> {
        let items: Vec<T> = items.into_iter().collect();
        let total_count = items.len();
        let items = items
            .into_iter()
            .skip(self.offset)
            .take(self.length)
            .collect();
        Page { items, total_count }
    }
}

impl Default for QueryRange {
    fn default() -> Self {
        Self::all()
    }
}

/// One page of a query result together with the size of the full result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: usize,
}

impl<T> Page<T> {
    /// An empty page.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
        }
    }

    /// Maps every item of the page, keeping the total count.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
        }
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::empty()
    }
}
