use crate::value::Value;
use derive_more::IntoIterator;

///
/// Paging
///
/// Offset/limit window over a field's values.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Paging {
    pub offset: usize,
    pub limit: usize,
}

impl Paging {
    #[must_use]
    pub const fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// Normalize a caller-supplied window.
    ///
    /// Negative offsets clamp to zero; non-positive limits fall back to
    /// `default_limit`.
    #[must_use]
    pub fn clamped(offset: i64, limit: i64, default_limit: usize) -> Self {
        let offset = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        let limit = if limit > 0 {
            usize::try_from(limit).unwrap_or(usize::MAX)
        } else {
            default_limit
        };

        Self { offset, limit }
    }
}

///
/// PagedValues
///
/// One page of values plus the total size of the underlying list.
///

#[derive(Clone, Debug, Default, Eq, IntoIterator, PartialEq)]
pub struct PagedValues {
    #[into_iterator(owned, ref)]
    pub values: Vec<Value>,
    pub offset: usize,
    pub limit: usize,
    pub total: usize,
}

impl PagedValues {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            values: Vec::new(),
            offset: 0,
            limit: 0,
            total: 0,
        }
    }

    /// Wrap a complete value list as a single page.
    #[must_use]
    pub fn unpaged(values: Vec<Value>) -> Self {
        let total = values.len();

        Self {
            values,
            offset: 0,
            limit: total,
            total,
        }
    }

    /// Cut one page out of a complete value list.
    #[must_use]
    pub fn page(values: &[Value], paging: Paging) -> Self {
        Self {
            values: values
                .iter()
                .skip(paging.offset)
                .take(paging.limit)
                .cloned()
                .collect(),
            offset: paging.offset,
            limit: paging.limit,
            total: values.len(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

///
/// TESTS
///
