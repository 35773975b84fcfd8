use crate::cidr::CidrBlock;
use r2audit_aws::types;
use r2audit_core::{
    one_or_many, Analyzer, AnalyzerSummary, ResourceDocument, Severity, Violation, ViolationType,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use tracing::debug;

/// Address ranges owned by one deployment environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentCidrs {
    pub name: String,
    #[serde(alias = "cidr_blocks")]
    pub cidrs: Vec<String>,
}

impl EnvironmentCidrs {
    pub fn new(name: impl Into<String>, cidrs: &[&str]) -> Self {
        Self { name: name.into(), cidrs: cidrs.iter().map(|c| c.to_string()).collect() }
    }
}

struct Declared<'a> {
    resource_type: &'static str,
    resource_name: &'a str,
    raw: &'a str,
    block: CidrBlock,
}

/// Flags overlapping address ranges declared on VPCs.
#[derive(Default)]
pub struct NetworkAnalyzer {
    vpc_count: usize,
    blocks_parsed: usize,
    blocks_skipped: usize,
    violations: usize,
}

fn parse_valid<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<(&'a str, CidrBlock)> {
    raw.filter_map(|c| match c.parse::<CidrBlock>() {
        Ok(block) => Some((c, block)),
        Err(e) => {
            debug!(cidr = c, error = %e, "excluding unparsable CIDR block");
            None
        }
    })
    .collect()
}

impl NetworkAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vpc_count(&self) -> usize {
        self.vpc_count
    }

    fn declared<'a>(&mut self, doc: &'a ResourceDocument) -> Vec<Declared<'a>> {
        const SOURCES: [(&str, &[&str]); 2] = [
            (types::VPC, &["cidr_block", "ipv6_cidr_block"]),
            (types::VPC_IPV4_CIDR_ASSOCIATION, &["cidr_block"]),
        ];

        let mut out = Vec::new();
        for (resource_type, keys) in SOURCES {
            for (name, attrs) in doc.instances(resource_type) {
                if resource_type == types::VPC {
                    self.vpc_count += 1;
                }
                let values = keys.iter().filter_map(|k| attrs.get(*k)).flat_map(one_or_many);
                for value in values {
                    let Some(raw) = value.as_str() else {
                        debug!(resource = name, value = %value, "excluding non-string CIDR block");
                        self.blocks_skipped += 1;
                        continue;
                    };
                    match raw.parse::<CidrBlock>() {
                        Ok(block) => {
                            self.blocks_parsed += 1;
                            out.push(Declared { resource_type, resource_name: name, raw, block });
                        }
                        Err(e) => {
                            debug!(
                                resource = name,
                                cidr = raw,
                                error = %e,
                                "excluding unparsable CIDR block"
                            );
                            self.blocks_skipped += 1;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flags every pair of environments whose ranges intersect, once per pair.
    pub fn validate_multi_environment(&self, environments: &[EnvironmentCidrs]) -> Vec<Violation> {
        let parsed: Vec<_> = environments
            .iter()
            .map(|env| (env, parse_valid(env.cidrs.iter().map(String::as_str))))
            .collect();

        let mut out = Vec::new();
        for (i, (a, a_blocks)) in parsed.iter().enumerate() {
            for (b, b_blocks) in &parsed[i + 1..] {
                let overlaps: Vec<Json> = a_blocks
                    .iter()
                    .flat_map(move |(ra, ba)| {
                        b_blocks
                            .iter()
                            .filter(move |(_, bb)| ba.overlaps(bb))
                            .map(move |(rb, _)| json!([ra, rb]))
                    })
                    .collect();
                if overlaps.is_empty() {
                    continue;
                }
                out.push(
                    Violation::new(
                        Severity::Critical,
                        ViolationType::CrossEnvironmentCidrOverlap,
                        "environment",
                        format!("{}/{}", a.name, b.name),
                    )
                    .with_details(json!({ "environments": [a.name, b.name], "overlaps": overlaps }))
                    .with_remediation(format!(
                        "Allocate non-overlapping address space to {} and {} so they can be \
                         peered or routed",
                        a.name, b.name
                    )),
                );
            }
        }
        out
    }
}

impl Analyzer for NetworkAnalyzer {
    fn name(&self) -> &'static str {
        "network"
    }

    fn analyze(&mut self, doc: &ResourceDocument) -> Vec<Violation> {
        self.vpc_count = 0;
        self.blocks_parsed = 0;
        self.blocks_skipped = 0;

        let declared = self.declared(doc);
        let mut out = Vec::new();
        for (i, a) in declared.iter().enumerate() {
            for b in &declared[i + 1..] {
                if !a.block.overlaps(&b.block) {
                    continue;
                }
                out.push(
                    Violation::new(
                        Severity::Critical,
                        ViolationType::CidrOverlap,
                        a.resource_type,
                        a.resource_name,
                    )
                    .with_details(json!({
                        "cidr_block": a.raw,
                        "conflicting_resource_type": b.resource_type,
                        "conflicting_resource": b.resource_name,
                        "conflicting_cidr_block": b.raw,
                        "identical": a.block == b.block,
                    }))
                    .with_remediation(format!(
                        "Re-plan address space so {} ({}) and {} ({}) do not overlap",
                        a.resource_name, a.raw, b.resource_name, b.raw
                    )),
                );
            }
        }

        self.violations = out.len();
        out
    }

    fn get_summary(&self) -> AnalyzerSummary {
        AnalyzerSummary::new(self.name(), self.vpc_count, self.violations)
            .with_stat("vpc_count", self.vpc_count)
            .with_stat("cidr_blocks_parsed", self.blocks_parsed)
            .with_stat("cidr_blocks_skipped", self.blocks_skipped)
    }
}
