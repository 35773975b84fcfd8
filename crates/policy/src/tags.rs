use crate::config::REQUIRED_TAGS;
use r2audit_core::{
    Analyzer, AnalyzerSummary, Attributes, ResourceDocument, Severity, Violation, ViolationType,
};
use serde_json::{json, Value as Json};
use std::collections::BTreeSet;

/// Flags any resource, of any type, missing one of the required governance tags.
pub struct TagComplianceValidator {
    required_tags: Vec<String>,
    resources_scanned: usize,
    violations: usize,
}

impl Default for TagComplianceValidator {
    fn default() -> Self {
        Self::new(REQUIRED_TAGS.iter().map(|t| t.to_string()).collect())
    }
}

/// Tag keys of a resource: `tags`, or the provider-computed `tags_all` when
/// `tags` is absent. A non-map value carries no tags.
fn tag_keys(attrs: &Attributes) -> BTreeSet<&str> {
    let tags = match attrs.get("tags") {
        None | Some(Json::Null) => attrs.get("tags_all"),
        present => present,
    };
    tags.and_then(Json::as_object)
        .map(|m| m.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

impl TagComplianceValidator {
    pub fn new(required_tags: Vec<String>) -> Self {
        Self { required_tags, resources_scanned: 0, violations: 0 }
    }

    pub fn missing_tags(&self, attrs: &Attributes) -> Vec<String> {
        let present = tag_keys(attrs);
        self.required_tags
            .iter()
            .filter(|t| !present.contains(t.as_str()))
            .cloned()
            .collect()
    }
}

impl Analyzer for TagComplianceValidator {
    fn name(&self) -> &'static str {
        "tags"
    }

    fn analyze(&mut self, doc: &ResourceDocument) -> Vec<Violation> {
        let mut out = Vec::new();
        let mut scanned = 0;

        for (resource_type, name, attrs) in doc.all_instances() {
            scanned += 1;
            let missing = self.missing_tags(attrs);
            if missing.is_empty() {
                continue;
            }
            let remediation = format!("Add the missing tags: {}", missing.join(", "));
            let details = json!({ "missing_tags": missing, "present_tags": tag_keys(attrs) });
            out.push(
                Violation::new(
                    Severity::Medium,
                    ViolationType::MissingRequiredTags,
                    resource_type,
                    name,
                )
                .with_details(details)
                .with_remediation(remediation),
            );
        }

        self.resources_scanned = scanned;
        self.violations = out.len();
        out
    }

    fn get_summary(&self) -> AnalyzerSummary {
        AnalyzerSummary::new(self.name(), self.resources_scanned, self.violations)
            .with_stat("required_tags", self.required_tags.clone())
    }
}
