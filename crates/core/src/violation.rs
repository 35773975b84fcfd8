use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Most severe first.
    pub const ALL: [Severity; 4] =
        [Severity::Critical, Severity::High, Severity::Medium, Severity::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationType {
    UnrestrictedIngress,
    WildcardPolicy,
    MissingRequiredTags,
    CidrOverlap,
    CrossEnvironmentCidrOverlap,
    MissingEncryption,
    InvalidEncryption,
    RdsEncryptionDisabled,
}

impl ViolationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationType::UnrestrictedIngress => "UNRESTRICTED_INGRESS",
            ViolationType::WildcardPolicy => "WILDCARD_POLICY",
            ViolationType::MissingRequiredTags => "MISSING_REQUIRED_TAGS",
            ViolationType::CidrOverlap => "CIDR_OVERLAP",
            ViolationType::CrossEnvironmentCidrOverlap => "CROSS_ENVIRONMENT_CIDR_OVERLAP",
            ViolationType::MissingEncryption => "MISSING_ENCRYPTION",
            ViolationType::InvalidEncryption => "INVALID_ENCRYPTION",
            ViolationType::RdsEncryptionDisabled => "RDS_ENCRYPTION_DISABLED",
        }
    }
}

impl fmt::Display for ViolationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One non-compliant configuration found by exactly one analyzer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub severity: Severity,
    pub resource_type: String,
    pub resource_name: String,
    pub violation_type: ViolationType,
    #[serde(default)]
    pub details: Json,
    pub remediation: String,
}

impl Violation {
    pub fn new(
        severity: Severity,
        violation_type: ViolationType,
        resource_type: impl Into<String>,
        resource_name: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            resource_type: resource_type.into(),
            resource_name: resource_name.into(),
            violation_type,
            details: json!({}),
            remediation: String::new(),
        }
    }

    pub fn with_details(mut self, details: Json) -> Self {
        self.details = details;
        self
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = remediation.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_are_screaming_case() {
        let v = Violation::new(
            Severity::High,
            ViolationType::RdsEncryptionDisabled,
            "aws_db_instance",
            "db",
        )
        .with_remediation("enable it");
        let out = serde_json::to_value(&v).unwrap();
        assert_eq!(out["severity"], "HIGH");
        assert_eq!(out["violation_type"], "RDS_ENCRYPTION_DISABLED");
        assert_eq!(out["details"], json!({}));
    }

    #[test]
    fn as_str_matches_serde() {
        for sev in Severity::ALL {
            assert_eq!(serde_json::to_value(sev).unwrap(), sev.as_str());
        }
        let t = ViolationType::CrossEnvironmentCidrOverlap;
        assert_eq!(serde_json::to_value(t).unwrap(), t.as_str());
    }
}
