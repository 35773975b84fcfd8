use crate::config::PolicyConfig;
use crate::console::render_summary;
use crate::encryption::EncryptionValidator;
use crate::iam::IamPolicyAnalyzer;
use crate::network::NetworkAnalyzer;
use crate::report::{ComplianceReport, ComplianceReporter};
use crate::security_group::SecurityGroupAnalyzer;
use crate::tags::TagComplianceValidator;
use r2audit_core::{Analyzer, ComplianceError, ResourceDocument};
use std::path::{Path, PathBuf};
use tracing::{error, info, info_span};

pub const DEFAULT_REPORT_PATH: &str = "compliance-report.json";

/// Load, analyze, report: the whole pipeline over one synthesized stack.
pub struct ComplianceRunner {
    stack_path: PathBuf,
    config: PolicyConfig,
    document: Option<ResourceDocument>,
}

impl ComplianceRunner {
    pub fn new(stack_path: impl Into<PathBuf>) -> Self {
        Self { stack_path: stack_path.into(), config: PolicyConfig::default(), document: None }
    }

    pub fn with_config(mut self, config: PolicyConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_document(mut self, document: ResourceDocument) -> Self {
        self.document = Some(document);
        self
    }

    pub fn document(&self) -> Option<&ResourceDocument> {
        self.document.as_ref()
    }

    /// Reads and parses the stack. Failures are reported and turned into `false`.
    pub fn load_synthesized_stack(&mut self) -> bool {
        match ResourceDocument::load(&self.stack_path) {
            Ok(doc) => {
                info!(
                    path = %self.stack_path.display(),
                    resource_types = doc.resource_types().count(),
                    "loaded synthesized stack"
                );
                self.document = Some(doc);
                true
            }
            Err(e) => {
                error!(
                    path = %self.stack_path.display(),
                    error = %e,
                    "failed to load synthesized stack"
                );
                eprintln!("Error: {e}");
                false
            }
        }
    }

    /// Analyzers in their fixed run order.
    fn analyzers(&self) -> Vec<Box<dyn Analyzer>> {
        vec![
            Box::new(SecurityGroupAnalyzer::new(self.config.sensitive_ports.clone())),
            Box::new(IamPolicyAnalyzer::new()),
            Box::new(TagComplianceValidator::new(self.config.required_tags.clone())),
            Box::new(NetworkAnalyzer::new()),
            Box::new(EncryptionValidator::new(self.config.accepted_sse_algorithms.clone())),
        ]
    }

    pub fn run_analysis(&self) -> Result<ComplianceReport, ComplianceError> {
        let doc = self.document.as_ref().ok_or(ComplianceError::NotLoaded)?;
        let mut summaries = Vec::new();
        let mut violations = Vec::new();

        for mut analyzer in self.analyzers() {
            let span = info_span!("analyzer", name = analyzer.name());
            let _guard = span.enter();
            println!("Running {} analysis...", analyzer.name());
            let found = analyzer.analyze(doc);
            info!(violations = found.len(), "analyzer finished");
            summaries.push(analyzer.get_summary());
            violations.extend(found);
        }

        let reporter = ComplianceReporter::new(self.config.severity_weights.clone());
        Ok(reporter.aggregate(summaries, violations))
    }

    /// Persists the report and prints the console summary, which is shown
    /// even when the write fails. `Ok` carries whether the report passed.
    pub fn write_and_display_report(
        &self,
        report: &ComplianceReport,
        path: &Path,
    ) -> Result<bool, ComplianceError> {
        let saved = report.save_report(path);
        print!("{}", render_summary(report));
        saved?;
        println!("Report saved to {}", path.display());
        Ok(report.passed())
    }

    /// Like [`Self::write_and_display_report`], but a failed write is only
    /// reported; the return value is whether the report passed.
    pub fn save_and_display_report(&self, report: &ComplianceReport, path: &Path) -> bool {
        match self.write_and_display_report(report, path) {
            Ok(passed) => passed,
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to save compliance report");
                eprintln!("Error: {e}");
                report.passed()
            }
        }
    }
}
