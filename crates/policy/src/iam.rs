use r2audit_aws::{types, InlinePolicy, PolicyDocument};
use r2audit_core::{Analyzer, AnalyzerSummary, ResourceDocument, Severity, Violation, ViolationType};
use serde_json::{json, Value as Json};
use tracing::debug;

/// Flags `Allow` statements granting every action on every resource.
#[derive(Default)]
pub struct IamPolicyAnalyzer {
    policies_scanned: usize,
    statements_scanned: usize,
    violations: usize,
}

impl IamPolicyAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    fn inspect(
        &mut self,
        resource_type: &str,
        name: &str,
        label: Option<&str>,
        body: &Json,
        out: &mut Vec<Violation>,
    ) {
        let Some(policy) = PolicyDocument::from_json(body) else {
            if !body.is_null() {
                debug!(
                    resource = name,
                    policy = label,
                    "skipping empty or undecodable policy body"
                );
            }
            return;
        };
        self.policies_scanned += 1;

        for (index, statement) in policy.statements().iter().enumerate() {
            self.statements_scanned += 1;
            if !statement.grants_everything() {
                continue;
            }
            out.push(
                Violation::new(
                    Severity::Critical,
                    ViolationType::WildcardPolicy,
                    resource_type,
                    name,
                )
                .with_details(json!({
                    "policy": label,
                    "statement_index": index,
                    "sid": statement.sid,
                    "actions": statement.actions(),
                    "resources": statement.resources(),
                }))
                .with_remediation(
                    "Replace the wildcard Action/Resource pair with the specific actions and \
                     resource ARNs the principal needs",
                ),
            );
        }
    }
}

impl Analyzer for IamPolicyAnalyzer {
    fn name(&self) -> &'static str {
        "iam_policies"
    }

    fn analyze(&mut self, doc: &ResourceDocument) -> Vec<Violation> {
        self.policies_scanned = 0;
        self.statements_scanned = 0;
        let mut out = Vec::new();

        for resource_type in types::STANDALONE_POLICIES {
            for (name, attrs) in doc.instances(resource_type) {
                if let Some(body) = attrs.get("policy") {
                    self.inspect(resource_type, name, None, body, &mut out);
                }
            }
        }

        for (name, attrs) in doc.instances(types::IAM_ROLE) {
            for (index, inline) in InlinePolicy::of_role(attrs).iter().enumerate() {
                let Some(body) = &inline.policy else { continue };
                let label = inline.label(index);
                self.inspect(types::IAM_ROLE, name, Some(&label), body, &mut out);
            }
        }

        self.violations = out.len();
        out
    }

    fn get_summary(&self) -> AnalyzerSummary {
        AnalyzerSummary::new(self.name(), self.policies_scanned, self.violations)
            .with_stat("statements_scanned", self.statements_scanned)
    }
}
