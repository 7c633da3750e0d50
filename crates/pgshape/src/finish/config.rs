//! Query finisher configuration.
//!
//! Defaults the finisher falls back to when a request carries no paging
//! parameters or ordering of its own.

/// Defaults applied by the query finisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishConfig {
    /// Page size bound when no paging parameters are given.
    pub default_per_page: u32,
    /// Columns ordered `DESC` (qualified by the sorting table) when neither a
    /// raw order nor an `orderBy` field is given.
    pub default_sort_columns: Vec<String>,
}

impl Default for FinishConfig {
    fn default() -> Self {
        Self {
            default_per_page: super::meta::DEFAULT_PER_PAGE,
            default_sort_columns: vec!["id".to_string(), "created_at".to_string()],
        }
    }
}

impl FinishConfig {
    /// Create a configuration with defaults (25 rows, `id DESC, created_at DESC`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page size used when no paging parameters are given.
    pub fn with_default_per_page(mut self, per_page: u32) -> Self {
        self.default_per_page = per_page;
        self
    }

    /// Replace the default sort columns.
    pub fn with_default_sort_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_sort_columns = columns.into_iter().map(Into::into).collect();
        self
    }
}
