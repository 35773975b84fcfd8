use crate::document::ResourceDocument;
use crate::violation::Violation;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as Json};

/// One rule category. The runner drives every category through this trait.
///
/// `analyze` must be repeatable: the same document yields the same list, and
/// the statistics returned by `get_summary` describe the most recent call.
pub trait Analyzer {
    fn name(&self) -> &'static str;
    fn analyze(&mut self, doc: &ResourceDocument) -> Vec<Violation>;
    fn get_summary(&self) -> AnalyzerSummary;
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerSummary {
    pub analyzer: String,
    pub resources_scanned: usize,
    pub violations: usize,
    /// Analyzer-specific counters, e.g. `vpc_count`.
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub stats: JsonMap<String, Json>,
}

impl AnalyzerSummary {
    pub fn new(analyzer: &str, resources_scanned: usize, violations: usize) -> Self {
        Self {
            analyzer: analyzer.to_string(),
            resources_scanned,
            violations,
            stats: JsonMap::new(),
        }
    }

    pub fn with_stat(mut self, key: &str, value: impl Into<Json>) -> Self {
        self.stats.insert(key.to_string(), value.into());
        self
    }
}
