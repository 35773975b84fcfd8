//! Shared model for the compliance engine: the synthesized resource document,
//! violation records, and the contract every analyzer implements.

pub mod analyzer;
pub mod document;
pub mod error;
pub mod shape;
pub mod violation;

pub use analyzer::{Analyzer, AnalyzerSummary};
pub use document::{Attributes, ResourceDocument};
pub use error::ComplianceError;
pub use shape::{lenient_bool, one_or_many, OneOrMany};
pub use violation::{Severity, Violation, ViolationType};
