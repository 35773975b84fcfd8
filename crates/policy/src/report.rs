use crate::config::SeverityWeights;
use r2audit_core::{AnalyzerSummary, ComplianceError, Severity, Violation, ViolationType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use time::OffsetDateTime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ComplianceStatus {
    Pass,
    Fail,
}

impl ComplianceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceStatus::Pass => "PASS",
            ComplianceStatus::Fail => "FAIL",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Immediate,
    High,
    Medium,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Immediate => "IMMEDIATE",
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
        }
    }

    fn for_severity(severity: Severity) -> Self {
        match severity {
            Severity::Critical => Priority::Immediate,
            Severity::High => Priority::High,
            Severity::Medium | Severity::Low => Priority::Medium,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub status: ComplianceStatus,
    pub compliance_score: f64,
    pub total_violations: usize,
    pub violations_by_severity: BTreeMap<Severity, usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub category: ViolationType,
    pub violations: usize,
    /// Distinct `(resource_type, resource_name)` pairs behind the violations.
    pub affected_resources: usize,
    pub action: String,
    pub impact: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    pub summary: ReportSummary,
    #[serde(default)]
    pub analyzers: Vec<AnalyzerSummary>,
    pub violations: Vec<Violation>,
    pub recommendations: Vec<Recommendation>,
}

impl ComplianceReport {
    pub fn passed(&self) -> bool {
        self.summary.status == ComplianceStatus::Pass
    }

    pub fn get_exit_code(&self) -> i32 {
        if self.passed() {
            0
        } else {
            1
        }
    }

    /// Writes the report as pretty-printed JSON to exactly `path`.
    pub fn save_report(&self, path: &Path) -> Result<(), ComplianceError> {
        let write_err = |source| ComplianceError::Write { path: path.to_path_buf(), source };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let body = serde_json::to_string_pretty(self)?;
        std::fs::write(path, body).map_err(write_err)
    }
}

fn guidance(category: ViolationType) -> (&'static str, &'static str) {
    match category {
        ViolationType::UnrestrictedIngress => (
            "Restrict security group ingress on administrative and database ports to known \
             CIDR ranges or a bastion",
            "Services reachable from the internet are exposed to brute force and exploitation",
        ),
        ViolationType::WildcardPolicy => (
            "Replace Action \"*\" on Resource \"*\" with least-privilege statements",
            "Any principal holding the policy has full control of the account",
        ),
        ViolationType::MissingRequiredTags => (
            "Add the required governance tags to every resource",
            "Untagged resources cannot be attributed for cost allocation or ownership",
        ),
        ViolationType::CidrOverlap => (
            "Assign non-overlapping CIDR blocks to every VPC",
            "Overlapping ranges prevent peering and transit routing between networks",
        ),
        ViolationType::CrossEnvironmentCidrOverlap => (
            "Allocate a distinct address range to each environment",
            "Environments sharing address space cannot be connected without NAT",
        ),
        ViolationType::MissingEncryption => (
            "Enable default server-side encryption on every bucket",
            "Objects are stored unencrypted at rest",
        ),
        ViolationType::InvalidEncryption => (
            "Use AES256 or aws:kms as the default encryption algorithm",
            "The bucket's encryption configuration does not guarantee encryption at rest",
        ),
        ViolationType::RdsEncryptionDisabled => (
            "Enable storage encryption on database instances and clusters",
            "Database storage, snapshots, and replicas are unencrypted at rest",
        ),
    }
}

/// Aggregates analyzer output into one scored report.
#[derive(Debug, Clone, Default)]
pub struct ComplianceReporter {
    weights: SeverityWeights,
}

impl ComplianceReporter {
    pub fn new(weights: SeverityWeights) -> Self {
        Self { weights }
    }

    pub fn severity_histogram(violations: &[Violation]) -> BTreeMap<Severity, usize> {
        let mut counts: BTreeMap<Severity, usize> = Severity::ALL.iter().map(|s| (*s, 0)).collect();
        for v in violations {
            *counts.entry(v.severity).or_default() += 1;
        }
        counts
    }

    /// 100 minus the weighted severity histogram, clamped to `[0, 100]`.
    pub fn compliance_score(&self, histogram: &BTreeMap<Severity, usize>) -> f64 {
        let deduction: f64 =
            histogram.iter().map(|(sev, count)| self.weights.weight(*sev) * *count as f64).sum();
        (100.0 - deduction).clamp(0.0, 100.0)
    }

    pub fn generate_report(
        &self,
        security_groups: Vec<Violation>,
        iam: Vec<Violation>,
        tags: Vec<Violation>,
        network: Vec<Violation>,
        encryption: Vec<Violation>,
    ) -> ComplianceReport {
        let all = [security_groups, iam, tags, network, encryption].concat();
        self.aggregate(Vec::new(), all)
    }

    /// `violations` must already be in analyzer order; it is kept as given.
    pub fn aggregate(
        &self,
        analyzers: Vec<AnalyzerSummary>,
        violations: Vec<Violation>,
    ) -> ComplianceReport {
        let histogram = Self::severity_histogram(&violations);
        let total = violations.len();
        let summary = ReportSummary {
            status: if total == 0 { ComplianceStatus::Pass } else { ComplianceStatus::Fail },
            compliance_score: self.compliance_score(&histogram),
            total_violations: total,
            violations_by_severity: histogram,
        };
        ComplianceReport {
            generated_at: OffsetDateTime::now_utc(),
            summary,
            analyzers,
            recommendations: Self::recommendations(&violations),
            violations,
        }
    }

    /// One item per violation category, most urgent first, ties in order of
    /// first appearance.
    pub fn recommendations(violations: &[Violation]) -> Vec<Recommendation> {
        struct Group<'a> {
            category: ViolationType,
            worst: Severity,
            count: usize,
            resources: BTreeSet<(&'a str, &'a str)>,
        }

        let mut groups: Vec<Group<'_>> = Vec::new();
        for v in violations {
            let resource = (v.resource_type.as_str(), v.resource_name.as_str());
            match groups.iter_mut().find(|g| g.category == v.violation_type) {
                Some(group) => {
                    group.worst = group.worst.min(v.severity);
                    group.count += 1;
                    group.resources.insert(resource);
                }
                None => groups.push(Group {
                    category: v.violation_type,
                    worst: v.severity,
                    count: 1,
                    resources: BTreeSet::from([resource]),
                }),
            }
        }

        let mut out: Vec<Recommendation> = groups
            .into_iter()
            .map(|group| {
                let (action, impact) = guidance(group.category);
                Recommendation {
                    priority: Priority::for_severity(group.worst),
                    category: group.category,
                    violations: group.count,
                    affected_resources: group.resources.len(),
                    action: action.to_string(),
                    impact: impact.to_string(),
                }
            })
            .collect();
        out.sort_by_key(|r| r.priority);
        out
    }
}
