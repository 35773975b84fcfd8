//! Property-based tests for the analyzers and the reporter:
//! - the score depends only on the severity histogram
//! - CIDR overlap is symmetric
//! - analyzers are repeatable over the same document

use crate::cidr::CidrBlock;
use crate::encryption::EncryptionValidator;
use crate::iam::IamPolicyAnalyzer;
use crate::network::NetworkAnalyzer;
use crate::report::{ComplianceReporter, ComplianceStatus};
use crate::security_group::SecurityGroupAnalyzer;
use crate::tags::TagComplianceValidator;
use proptest::prelude::*;
use r2audit_core::{Analyzer, ResourceDocument, Severity, Violation, ViolationType};
use serde_json::{json, Value as Json};

fn arb_severity() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Critical),
        Just(Severity::High),
        Just(Severity::Medium),
        Just(Severity::Low),
    ]
}

fn arb_violation() -> impl Strategy<Value = Violation> {
    (arb_severity(), "[a-z]{1,8}").prop_map(|(severity, name)| {
        Violation::new(severity, ViolationType::MissingRequiredTags, "aws_instance", name)
    })
}

/// Aligned IPv4 blocks drawn from a small space so overlaps are common.
fn arb_cidr() -> impl Strategy<Value = CidrBlock> {
    (any::<u32>(), 8u8..=28).prop_map(|(addr, prefix)| {
        let mask = u32::MAX << (32 - prefix);
        let addr = (addr & 0x0AFF_FFFF) & mask;
        format!("{}/{}", std::net::Ipv4Addr::from(addr), prefix).parse().unwrap()
    })
}

fn arb_document() -> impl Strategy<Value = Json> {
    let vpc = (arb_cidr(), any::<bool>())
        .prop_map(|(cidr, tagged)| {
            if tagged {
                json!({ "cidr_block": cidr.to_string(), "tags": { "Environment": "x", "Owner": "y", "CostCenter": "z" } })
            } else {
                json!({ "cidr_block": cidr.to_string() })
            }
        });
    let bucket = prop_oneof![
        Just(json!({})),
        Just(json!({ "server_side_encryption_configuration": { "rule": [] } })),
        Just(json!({ "server_side_encryption_configuration": { "rule": { "apply_server_side_encryption_by_default": { "sse_algorithm": "AES256" } } } })),
    ];
    let sg = (0i64..4000, 0i64..200, any::<bool>()).prop_map(|(from, span, open)| {
        let cidr = if open { "0.0.0.0/0" } else { "10.0.0.0/8" };
        json!({ "ingress": { "from_port": from, "to_port": from + span, "cidr_blocks": cidr } })
    });
    (
        prop::collection::vec(vpc, 0..5),
        prop::collection::vec(bucket, 0..4),
        prop::collection::vec(sg, 0..4),
    )
        .prop_map(|(vpcs, buckets, sgs)| {
            let named = |items: Vec<Json>, prefix: &str| -> Json {
                items.into_iter().enumerate().map(|(i, v)| (format!("{prefix}{i}"), v)).collect()
            };
            json!({ "resource": {
                "aws_vpc": named(vpcs, "vpc"),
                "aws_s3_bucket": named(buckets, "bucket"),
                "aws_security_group": named(sgs, "sg"),
                "aws_iam_policy": { "admin": { "policy": { "Statement": { "Effect": "Allow", "Action": "*", "Resource": "*" } } } }
            } })
        })
}

proptest! {
    #[test]
    fn score_matches_weighted_histogram(violations in prop::collection::vec(arb_violation(), 0..40)) {
        let report = ComplianceReporter::default().generate_report(vec![], vec![], violations.clone(), vec![], vec![]);
        let count = |s: Severity| violations.iter().filter(|v| v.severity == s).count() as f64;
        let expected = (100.0
            - 20.0 * count(Severity::Critical)
            - 10.0 * count(Severity::High)
            - 5.0 * count(Severity::Medium)
            - count(Severity::Low))
            .max(0.0);
        prop_assert_eq!(report.summary.compliance_score, expected);
        prop_assert_eq!(report.summary.status == ComplianceStatus::Fail, !violations.is_empty());
    }

    #[test]
    fn score_ignores_order_and_origin(mut violations in prop::collection::vec(arb_violation(), 0..20)) {
        let reporter = ComplianceReporter::default();
        let split = violations.len() / 2;
        let a = reporter.generate_report(violations[..split].to_vec(), vec![], vec![], violations[split..].to_vec(), vec![]);
        violations.reverse();
        let b = reporter.generate_report(vec![], vec![], vec![], vec![], violations);
        prop_assert_eq!(a.summary.compliance_score, b.summary.compliance_score);
        prop_assert_eq!(a.summary.violations_by_severity, b.summary.violations_by_severity);
    }

    #[test]
    fn cidr_overlap_is_symmetric(a in arb_cidr(), b in arb_cidr()) {
        prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        prop_assert!(a.overlaps(&a));
    }

    #[test]
    fn analyzers_are_repeatable(raw in arb_document()) {
        let doc = ResourceDocument::from_json(raw).unwrap();
        let mut analyzers: Vec<Box<dyn Analyzer>> = vec![
            Box::new(SecurityGroupAnalyzer::default()),
            Box::new(IamPolicyAnalyzer::new()),
            Box::new(TagComplianceValidator::default()),
            Box::new(NetworkAnalyzer::new()),
            Box::new(EncryptionValidator::default()),
        ];
        for analyzer in analyzers.iter_mut() {
            let first = analyzer.analyze(&doc);
            let first_summary = analyzer.get_summary();
            prop_assert_eq!(&first, &analyzer.analyze(&doc));
            prop_assert_eq!(first_summary, analyzer.get_summary());
        }
    }

    #[test]
    fn overlaps_reported_once_per_pair(blocks in prop::collection::vec(arb_cidr(), 0..6)) {
        let vpcs: serde_json::Map<String, Json> = blocks
            .iter()
            .enumerate()
            .map(|(i, b)| (format!("vpc{i}"), json!({ "cidr_block": b.to_string() })))
            .collect();
        let doc = ResourceDocument::from_json(json!({ "resource": { "aws_vpc": vpcs } })).unwrap();
        let mut expected = 0;
        for i in 0..blocks.len() {
            for j in i + 1..blocks.len() {
                if blocks[i].overlaps(&blocks[j]) {
                    expected += 1;
                }
            }
        }
        prop_assert_eq!(NetworkAnalyzer::new().analyze(&doc).len(), expected);
    }
}
