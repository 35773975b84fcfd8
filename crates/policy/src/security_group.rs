use crate::config::{default_sensitive_ports, SensitivePort};
use r2audit_aws::{types, IngressRule};
use r2audit_core::{Analyzer, AnalyzerSummary, ResourceDocument, Violation, ViolationType};
use serde_json::json;
use tracing::debug;

/// Flags ingress rules that admit the whole internet on a sensitive port.
pub struct SecurityGroupAnalyzer {
    sensitive_ports: Vec<SensitivePort>,
    groups_scanned: usize,
    rules_scanned: usize,
    rules_skipped: usize,
    violations: usize,
}

impl Default for SecurityGroupAnalyzer {
    fn default() -> Self {
        Self::new(default_sensitive_ports())
    }
}

impl SecurityGroupAnalyzer {
    pub fn new(sensitive_ports: Vec<SensitivePort>) -> Self {
        Self {
            sensitive_ports,
            groups_scanned: 0,
            rules_scanned: 0,
            rules_skipped: 0,
            violations: 0,
        }
    }

    fn check_rule(
        &self,
        resource_type: &str,
        name: &str,
        index: Option<usize>,
        rule: &IngressRule,
    ) -> Option<Violation> {
        let sources = rule.open_sources();
        if sources.is_empty() {
            return None;
        }
        let exposed: Vec<&SensitivePort> =
            self.sensitive_ports.iter().filter(|p| rule.covers(p.port)).collect();
        let severity = exposed.iter().map(|p| p.severity).min()?;

        let services: Vec<String> =
            exposed.iter().map(|p| format!("{} ({})", p.port, p.service)).collect();
        Some(
            Violation::new(severity, ViolationType::UnrestrictedIngress, resource_type, name)
                .with_details(json!({
                    "rule_index": index,
                    "description": rule.description,
                    "from_port": rule.from_port.value(),
                    "to_port": rule.to_port.value(),
                    "protocol": rule.protocol,
                    "sources": sources,
                    "exposed_ports": exposed
                        .iter()
                        .map(|p| json!({ "port": p.port, "service": p.service }))
                        .collect::<Vec<_>>(),
                }))
                .with_remediation(format!(
                    "Restrict ingress on {} to known CIDR ranges instead of {}",
                    services.join(", "),
                    sources.join(", ")
                )),
        )
    }
}

impl Analyzer for SecurityGroupAnalyzer {
    fn name(&self) -> &'static str {
        "security_groups"
    }

    fn analyze(&mut self, doc: &ResourceDocument) -> Vec<Violation> {
        let mut out = Vec::new();
        let (mut groups, mut rules, mut skipped) = (0, 0, 0);

        for (name, attrs) in doc.instances(types::SECURITY_GROUP) {
            groups += 1;
            for (index, rule) in IngressRule::inline(attrs).into_iter().enumerate() {
                let Some(rule) = rule else {
                    debug!(resource = name, index, "skipping malformed ingress rule");
                    skipped += 1;
                    continue;
                };
                rules += 1;
                out.extend(self.check_rule(types::SECURITY_GROUP, name, Some(index), &rule));
            }
        }

        for (name, attrs) in doc.instances(types::SECURITY_GROUP_RULE) {
            let Some(rule) = IngressRule::from_attributes(attrs) else {
                debug!(resource = name, "skipping malformed security group rule");
                skipped += 1;
                continue;
            };
            if !rule.is_ingress() {
                continue;
            }
            rules += 1;
            out.extend(self.check_rule(types::SECURITY_GROUP_RULE, name, None, &rule));
        }

        self.groups_scanned = groups;
        self.rules_scanned = rules;
        self.rules_skipped = skipped;
        self.violations = out.len();
        out
    }

    fn get_summary(&self) -> AnalyzerSummary {
        AnalyzerSummary::new(self.name(), self.groups_scanned, self.violations)
            .with_stat("rules_scanned", self.rules_scanned)
            .with_stat("rules_skipped", self.rules_skipped)
    }
}
