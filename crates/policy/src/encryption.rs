use crate::config::ACCEPTED_SSE_ALGORITHMS;
use r2audit_aws::{sse_resource_algorithms, sse_rule_algorithms, targets_bucket, types};
use r2audit_core::{
    lenient_bool, Analyzer, AnalyzerSummary, Attributes, ResourceDocument, Severity, Violation,
    ViolationType,
};
use serde_json::{json, Value as Json};

/// Flags storage buckets and databases without valid at-rest encryption.
pub struct EncryptionValidator {
    accepted_algorithms: Vec<String>,
    buckets_scanned: usize,
    databases_scanned: usize,
    violations: usize,
}

impl Default for EncryptionValidator {
    fn default() -> Self {
        Self::new(ACCEPTED_SSE_ALGORITHMS.iter().map(|a| a.to_string()).collect())
    }
}

impl EncryptionValidator {
    pub fn new(accepted_algorithms: Vec<String>) -> Self {
        Self { accepted_algorithms, buckets_scanned: 0, databases_scanned: 0, violations: 0 }
    }

    fn accepts(&self, algorithms: &[Option<String>]) -> bool {
        algorithms.iter().flatten().any(|a| self.accepted_algorithms.contains(a))
    }

    /// Rule algorithms governing a bucket and where they were declared:
    /// the inline configuration, or else a companion SSE resource targeting it.
    fn bucket_rules<'a>(
        name: &str,
        attrs: &Attributes,
        companions: &[(&'a str, &'a Attributes)],
    ) -> Option<(Vec<Option<String>>, Option<&'a str>)> {
        match attrs.get("server_side_encryption_configuration") {
            Some(config) if !config.is_null() => Some((sse_rule_algorithms(config), None)),
            _ => {
                let literal = attrs.get("bucket").and_then(Json::as_str);
                companions
                    .iter()
                    .find(|(_, c)| {
                        c.get("bucket")
                            .and_then(Json::as_str)
                            .is_some_and(|target| targets_bucket(target, name, literal))
                    })
                    .map(|(companion, c)| (sse_resource_algorithms(c), Some(*companion)))
            }
        }
    }

    fn check_buckets(&self, doc: &ResourceDocument, out: &mut Vec<Violation>) -> usize {
        let companions: Vec<_> = doc.instances(types::S3_BUCKET_SSE).collect();
        let mut scanned = 0;

        for (name, attrs) in doc.instances(types::S3_BUCKET) {
            scanned += 1;
            let Some((algorithms, companion)) = Self::bucket_rules(name, attrs, &companions) else {
                let missing = Violation::new(
                    Severity::High,
                    ViolationType::MissingEncryption,
                    types::S3_BUCKET,
                    name,
                );
                out.push(missing.with_remediation(
                    "Add server_side_encryption_configuration with an AES256 or aws:kms \
                     default encryption rule",
                ));
                continue;
            };
            if self.accepts(&algorithms) {
                continue;
            }
            out.push(
                Violation::new(
                    Severity::High,
                    ViolationType::InvalidEncryption,
                    types::S3_BUCKET,
                    name,
                )
                .with_details(json!({
                    "algorithms": algorithms,
                    "accepted": self.accepted_algorithms,
                    "configured_by": companion,
                }))
                .with_remediation(format!(
                    "Set apply_server_side_encryption_by_default.sse_algorithm to one of: {}",
                    self.accepted_algorithms.join(", ")
                )),
            );
        }
        scanned
    }

    fn check_databases(&self, doc: &ResourceDocument, out: &mut Vec<Violation>) -> usize {
        let mut scanned = 0;
        for resource_type in types::DATABASES {
            for (name, attrs) in doc.instances(resource_type) {
                scanned += 1;
                let flag = attrs.get("storage_encrypted");
                if flag.is_some_and(lenient_bool) {
                    continue;
                }
                out.push(
                    Violation::new(
                        Severity::High,
                        ViolationType::RdsEncryptionDisabled,
                        resource_type,
                        name,
                    )
                    .with_details(json!({ "storage_encrypted": flag }))
                    .with_remediation(
                        "Set storage_encrypted = true (optionally with kms_key_id); existing \
                         storage must be re-created from an encrypted snapshot",
                    ),
                );
            }
        }
        scanned
    }
}

impl Analyzer for EncryptionValidator {
    fn name(&self) -> &'static str {
        "encryption"
    }

    fn analyze(&mut self, doc: &ResourceDocument) -> Vec<Violation> {
        let mut out = Vec::new();
        self.buckets_scanned = self.check_buckets(doc, &mut out);
        self.databases_scanned = self.check_databases(doc, &mut out);
        self.violations = out.len();
        out
    }

    fn get_summary(&self) -> AnalyzerSummary {
        let scanned = self.buckets_scanned + self.databases_scanned;
        AnalyzerSummary::new(self.name(), scanned, self.violations)
            .with_stat("buckets_scanned", self.buckets_scanned)
            .with_stat("databases_scanned", self.databases_scanned)
    }
}
