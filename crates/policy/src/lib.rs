//! Compliance analyzers for synthesized Terraform JSON stacks, the reporter
//! that scores their findings, and the runner that wires them together.

pub mod cidr;
pub mod config;
pub mod console;
pub mod encryption;
pub mod iam;
pub mod network;
pub mod report;
pub mod runner;
pub mod security_group;
pub mod tags;

#[cfg(test)]
mod proptest;

pub use cidr::{CidrBlock, CidrError};
pub use config::{PolicyConfig, SensitivePort, SeverityWeights};
pub use console::render_summary;
pub use encryption::EncryptionValidator;
pub use iam::IamPolicyAnalyzer;
pub use network::{EnvironmentCidrs, NetworkAnalyzer};
pub use report::{
    ComplianceReport, ComplianceReporter, ComplianceStatus, Priority, Recommendation, ReportSummary,
};
pub use runner::{ComplianceRunner, DEFAULT_REPORT_PATH};
pub use security_group::SecurityGroupAnalyzer;
pub use tags::TagComplianceValidator;
