//! Constant tables the analyzers and the reporter are built from.
//!
//! Each component takes its table through its constructor; [`PolicyConfig`]
//! only bundles them so one YAML file can override any subset.

use r2audit_core::{ComplianceError, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const REQUIRED_TAGS: [&str; 3] = ["Environment", "Owner", "CostCenter"];

pub const SEVERITY_WEIGHTS: [(Severity, f64); 4] = [
    (Severity::Critical, 20.0),
    (Severity::High, 10.0),
    (Severity::Medium, 5.0),
    (Severity::Low, 1.0),
];

pub const SENSITIVE_PORTS: [(u16, &str, Severity); 9] = [
    (22, "SSH", Severity::Critical),
    (3389, "RDP", Severity::Critical),
    (3306, "MySQL", Severity::High),
    (5432, "PostgreSQL", Severity::High),
    (1433, "SQL Server", Severity::High),
    (1521, "Oracle", Severity::High),
    (27017, "MongoDB", Severity::High),
    (6379, "Redis", Severity::High),
    (9200, "Elasticsearch", Severity::High),
];

pub const ACCEPTED_SSE_ALGORITHMS: [&str; 3] = ["AES256", "aws:kms", "aws:kms:dsse"];

/// Score deduction per violation, keyed by severity. A severity without an
/// entry deducts nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeverityWeights(BTreeMap<Severity, f64>);

impl SeverityWeights {
    pub fn new(weights: impl IntoIterator<Item = (Severity, f64)>) -> Self {
        Self(weights.into_iter().collect())
    }

    pub fn weight(&self, severity: Severity) -> f64 {
        self.0.get(&severity).copied().unwrap_or(0.0)
    }
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self::new(SEVERITY_WEIGHTS)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivePort {
    pub port: u16,
    pub service: String,
    pub severity: Severity,
}

pub fn default_sensitive_ports() -> Vec<SensitivePort> {
    SENSITIVE_PORTS
        .iter()
        .map(|(port, service, severity)| SensitivePort {
            port: *port,
            service: service.to_string(),
            severity: *severity,
        })
        .collect()
}

/// Example:
/// ```yaml
/// required_tags: [Environment, Owner, CostCenter, DataClass]
/// severity_weights:
///   CRITICAL: 25
///   HIGH: 10
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub required_tags: Vec<String>,
    pub severity_weights: SeverityWeights,
    pub sensitive_ports: Vec<SensitivePort>,
    pub accepted_sse_algorithms: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            required_tags: REQUIRED_TAGS.iter().map(|t| t.to_string()).collect(),
            severity_weights: SeverityWeights::default(),
            sensitive_ports: default_sensitive_ports(),
            accepted_sse_algorithms: ACCEPTED_SSE_ALGORITHMS
                .iter()
                .map(|a| a.to_string())
                .collect(),
        }
    }
}

impl PolicyConfig {
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, ComplianceError> {
        let config_err =
            |message: String| ComplianceError::Config { path: path.to_path_buf(), message };
        let text = std::fs::read_to_string(path).map_err(|e| config_err(e.to_string()))?;
        Self::from_yaml(&text).map_err(|e| config_err(e.to_string()))
    }
}
