//! Pipeline configuration.

use adminkit_db::filter::DEFAULT_MAX_DEPTH;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Nesting limit passed to the filter compiler.
    pub max_filter_depth: usize,
    /// Page size when a query names none.
    pub default_page_limit: u64,
    /// Upper bound on any requested page size.
    pub max_page_limit: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_filter_depth: DEFAULT_MAX_DEPTH,
            default_page_limit: 50,
            max_page_limit: 1000,
        }
    }
}

impl PipelineConfig {
    /// Effective page size for a requested `limit`.
    #[must_use]
    pub fn page_limit(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_page_limit)
            .min(self.max_page_limit)
    }
}
