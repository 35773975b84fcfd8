//! AWS resource identifiers and typed views over the attribute bags the
//! compliance analyzers read.
//!
//! Every view is built leniently: a field that may appear as a scalar or a
//! list is an [`OneOrMany`], and fields the checks only echo or compare are
//! kept as raw JSON, so a stray type in one field never discards the entry.
//! A view that still fails to deserialize is reported as `None` so the caller
//! can skip the entry.

use r2audit_core::{one_or_many, OneOrMany};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeSet;

pub mod types {
    pub const S3_BUCKET: &str = "aws_s3_bucket";
    pub const S3_BUCKET_SSE: &str = "aws_s3_bucket_server_side_encryption_configuration";
    pub const DB_INSTANCE: &str = "aws_db_instance";
    pub const RDS_CLUSTER: &str = "aws_rds_cluster";
    pub const SECURITY_GROUP: &str = "aws_security_group";
    pub const SECURITY_GROUP_RULE: &str = "aws_security_group_rule";
    pub const VPC: &str = "aws_vpc";
    pub const VPC_IPV4_CIDR_ASSOCIATION: &str = "aws_vpc_ipv4_cidr_block_association";
    pub const IAM_POLICY: &str = "aws_iam_policy";
    pub const IAM_ROLE: &str = "aws_iam_role";
    pub const IAM_ROLE_POLICY: &str = "aws_iam_role_policy";
    pub const IAM_USER_POLICY: &str = "aws_iam_user_policy";
    pub const IAM_GROUP_POLICY: &str = "aws_iam_group_policy";

    /// Types whose `policy` attribute holds a whole policy document.
    pub const STANDALONE_POLICIES: [&str; 4] =
        [IAM_POLICY, IAM_ROLE_POLICY, IAM_USER_POLICY, IAM_GROUP_POLICY];
    pub const DATABASES: [&str; 2] = [DB_INSTANCE, RDS_CLUSTER];
}

pub const ANY_IPV4: &str = "0.0.0.0/0";
pub const ANY_IPV6: &str = "::/0";
pub const WILDCARD: &str = "*";

fn view<T: DeserializeOwned>(value: &Json) -> Option<T> {
    serde_json::from_value(value.clone()).ok()
}

// ---------------------------------------------------------------------------
// Security groups
// ---------------------------------------------------------------------------

/// Ports show up as numbers or numeric strings depending on the producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Port {
    Number(i64),
    Text(String),
}

impl Port {
    pub fn value(&self) -> Option<i64> {
        match self {
            Port::Number(n) => Some(*n),
            Port::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngressRule {
    /// Only set on standalone `aws_security_group_rule` resources.
    #[serde(rename = "type", default)]
    pub direction: Option<Json>,
    #[serde(default)]
    pub description: Option<Json>,
    pub from_port: Port,
    pub to_port: Port,
    #[serde(default)]
    pub protocol: Option<Json>,
    #[serde(default)]
    pub cidr_blocks: Option<OneOrMany<Json>>,
    #[serde(default)]
    pub ipv6_cidr_blocks: Option<OneOrMany<Json>>,
}

impl IngressRule {
    pub fn from_json(value: &Json) -> Option<Self> {
        let rule: Self = view(value)?;
        rule.from_port.value()?;
        rule.to_port.value()?;
        Some(rule)
    }

    /// A standalone `aws_security_group_rule` resource.
    pub fn from_attributes(attrs: &serde_json::Map<String, Json>) -> Option<Self> {
        Self::from_json(&Json::Object(attrs.clone()))
    }

    /// Rules of an `aws_security_group`'s inline `ingress` block(s). Malformed
    /// rules are returned as `None` at their position.
    pub fn inline(group: &serde_json::Map<String, Json>) -> Vec<Option<Self>> {
        group
            .get("ingress")
            .map(one_or_many)
            .unwrap_or_default()
            .into_iter()
            .map(Self::from_json)
            .collect()
    }

    pub fn is_ingress(&self) -> bool {
        self.direction.as_ref().and_then(Json::as_str).map_or(true, |d| d == "ingress")
    }

    /// Protocol `-1` (or `all`) opens every port regardless of the port range.
    pub fn all_traffic(&self) -> bool {
        match &self.protocol {
            Some(Json::String(p)) => p == "-1" || p.eq_ignore_ascii_case("all"),
            Some(Json::Number(n)) => n.as_i64() == Some(-1),
            _ => false,
        }
    }

    pub fn covers(&self, port: u16) -> bool {
        if self.all_traffic() {
            return true;
        }
        match (self.from_port.value(), self.to_port.value()) {
            (Some(from), Some(to)) => from <= i64::from(port) && i64::from(port) <= to,
            _ => false,
        }
    }

    /// The unrestricted sources this rule admits, if any.
    pub fn open_sources(&self) -> Vec<&str> {
        let v4 = self.cidr_blocks.iter().flat_map(|c| c.strings());
        let v6 = self.ipv6_cidr_blocks.iter().flat_map(|c| c.strings());
        v4.chain(v6)
            .map(|c| c.trim())
            .filter(|c| *c == ANY_IPV4 || *c == ANY_IPV6)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// IAM
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Statement {
    #[serde(rename = "Sid", default)]
    pub sid: Option<Json>,
    #[serde(rename = "Effect", default)]
    pub effect: Option<Json>,
    #[serde(rename = "Action", default)]
    pub action: Option<OneOrMany<Json>>,
    #[serde(rename = "Resource", default)]
    pub resource: Option<OneOrMany<Json>>,
}

impl Statement {
    pub fn allows(&self) -> bool {
        self.effect.as_ref().and_then(Json::as_str) == Some("Allow")
    }

    pub fn actions(&self) -> BTreeSet<&str> {
        self.action.iter().flat_map(|a| a.strings()).collect()
    }

    pub fn resources(&self) -> BTreeSet<&str> {
        self.resource.iter().flat_map(|r| r.strings()).collect()
    }

    pub fn grants_everything(&self) -> bool {
        self.allows() && self.actions().contains(WILDCARD) && self.resources().contains(WILDCARD)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyDocument {
    #[serde(rename = "Statement", default)]
    statement: Option<Json>,
}

impl PolicyDocument {
    /// Accepts a pre-parsed document or its JSON-encoded string form.
    /// Empty, absent, or undecodable bodies yield `None`.
    pub fn from_json(body: &Json) -> Option<Self> {
        match body {
            Json::String(s) if s.trim().is_empty() => None,
            Json::String(s) => serde_json::from_str(s).ok(),
            Json::Object(o) if o.is_empty() => None,
            Json::Object(_) => view(body),
            _ => None,
        }
    }

    /// Statements with single-statement shorthand unwrapped. Statements that
    /// do not have the expected shape are dropped.
    pub fn statements(&self) -> Vec<Statement> {
        self.statement
            .as_ref()
            .map(one_or_many)
            .unwrap_or_default()
            .into_iter()
            .filter_map(view)
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InlinePolicy {
    #[serde(default)]
    pub name: Option<Json>,
    #[serde(default)]
    pub policy: Option<Json>,
}

impl InlinePolicy {
    pub fn of_role(role: &serde_json::Map<String, Json>) -> Vec<Self> {
        role.get("inline_policy")
            .map(one_or_many)
            .unwrap_or_default()
            .into_iter()
            .filter_map(view)
            .collect()
    }

    /// The policy's `name`, or its position in the role's list when unnamed.
    pub fn label(&self, index: usize) -> String {
        match self.name.as_ref().and_then(Json::as_str) {
            Some(name) => name.to_string(),
            None => format!("inline_policy[{index}]"),
        }
    }
}

// ---------------------------------------------------------------------------
// S3 server-side encryption
// ---------------------------------------------------------------------------

/// Default-encryption algorithm of every rule in an SSE configuration, in
/// order. A rule without an algorithm contributes `None`.
///
/// Both the configuration and its `rule` may be a single object or a list,
/// and so may `apply_server_side_encryption_by_default`.
pub fn sse_rule_algorithms(config: &Json) -> Vec<Option<String>> {
    one_or_many(config)
        .into_iter()
        .filter_map(Json::as_object)
        .flat_map(|c| c.get("rule").map(one_or_many).unwrap_or_default())
        .map(|rule| {
            rule.get("apply_server_side_encryption_by_default")
                .map(one_or_many)
                .unwrap_or_default()
                .into_iter()
                .find_map(|d| d.get("sse_algorithm").and_then(Json::as_str))
                .map(str::to_string)
        })
        .collect()
}

/// Rules of a standalone `aws_s3_bucket_server_side_encryption_configuration`,
/// which is shaped like one configuration block plus a `bucket` argument.
pub fn sse_resource_algorithms(resource: &serde_json::Map<String, Json>) -> Vec<Option<String>> {
    sse_rule_algorithms(&Json::Object(resource.clone()))
}

/// Whether a `bucket` argument on a companion resource points at the bucket
/// instance `name` (by interpolation reference or by literal bucket name).
pub fn targets_bucket(target: &str, name: &str, bucket_attr: Option<&str>) -> bool {
    let by_ref = [
        format!("${{{}.{}.id}}", types::S3_BUCKET, name),
        format!("${{{}.{}.bucket}}", types::S3_BUCKET, name),
    ];
    by_ref.iter().any(|r| r == target) || bucket_attr.is_some_and(|b| b == target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ingress_rule_requires_ports() {
        assert!(IngressRule::from_json(&json!({ "cidr_blocks": ["0.0.0.0/0"] })).is_none());
        assert!(IngressRule::from_json(&json!({ "from_port": "x", "to_port": 22 })).is_none());
        let rule = IngressRule::from_json(&json!({
            "from_port": "20", "to_port": 25, "protocol": "tcp", "cidr_blocks": "0.0.0.0/0"
        }))
        .unwrap();
        assert!(rule.covers(22));
        assert!(!rule.covers(3389));
        assert_eq!(rule.open_sources(), vec!["0.0.0.0/0"]);
    }

    #[test]
    fn stray_field_types_do_not_discard_a_rule() {
        let rule = IngressRule::from_json(&json!({
            "description": ["ssh"], "from_port": 22, "to_port": 22,
            "cidr_blocks": ["0.0.0.0/0", 10], "ipv6_cidr_blocks": [null]
        }))
        .unwrap();
        assert!(rule.covers(22));
        assert_eq!(rule.open_sources(), vec!["0.0.0.0/0"]);

        let odd_direction = IngressRule::from_json(&json!({
            "type": 1, "from_port": 22, "to_port": 22, "cidr_blocks": "0.0.0.0/0"
        }))
        .unwrap();
        assert!(odd_direction.is_ingress());
    }

    #[test]
    fn all_traffic_covers_every_port() {
        let rule = IngressRule::from_json(&json!({
            "from_port": 0, "to_port": 0, "protocol": "-1", "ipv6_cidr_blocks": ["::/0"]
        }))
        .unwrap();
        assert!(rule.covers(5432));
        assert_eq!(rule.open_sources(), vec!["::/0"]);
    }

    #[test]
    fn policy_accepts_encoded_string_and_bare_statement() {
        let encoded = json!(r#"{"Version":"2012-10-17","Statement":{"Effect":"Allow","Action":"*","Resource":"*"}}"#);
        let doc = PolicyDocument::from_json(&encoded).unwrap();
        let stmts = doc.statements();
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].grants_everything());
    }

    #[test]
    fn unread_policy_fields_of_any_type_are_tolerated() {
        let doc = PolicyDocument::from_json(&json!({
            "Version": 2012,
            "Statement": { "Sid": 7, "Effect": "Allow", "Action": ["*", 3], "Resource": "*" }
        }))
        .unwrap();
        let stmts = doc.statements();
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].grants_everything());
        assert_eq!(stmts[0].actions().into_iter().collect::<Vec<_>>(), vec!["*"]);

        let numeric_effect: Statement =
            serde_json::from_value(json!({ "Effect": 1, "Action": "*", "Resource": "*" })).unwrap();
        assert!(!numeric_effect.grants_everything());
    }

    #[test]
    fn inline_policy_labels_fall_back_to_position() {
        let role = json!({ "inline_policy": [{ "name": "ops" }, { "name": 5 }, {}] });
        let labels: Vec<String> = InlinePolicy::of_role(role.as_object().unwrap())
            .iter()
            .enumerate()
            .map(|(i, p)| p.label(i))
            .collect();
        assert_eq!(labels, vec!["ops", "inline_policy[1]", "inline_policy[2]"]);
    }

    #[test]
    fn empty_or_broken_policies_are_none() {
        assert!(PolicyDocument::from_json(&json!("")).is_none());
        assert!(PolicyDocument::from_json(&json!({})).is_none());
        assert!(PolicyDocument::from_json(&json!("{oops")).is_none());
        assert!(PolicyDocument::from_json(&Json::Null).is_none());
    }

    #[test]
    fn deny_or_scoped_statements_do_not_grant_everything() {
        let deny: Statement =
            serde_json::from_value(json!({ "Effect": "Deny", "Action": "*", "Resource": "*" })).unwrap();
        assert!(!deny.grants_everything());
        let scoped: Statement = serde_json::from_value(
            json!({ "Effect": "Allow", "Action": ["*"], "Resource": ["arn:aws:s3:::logs/*"] }),
        )
        .unwrap();
        assert!(!scoped.grants_everything());
    }

    #[test]
    fn sse_rules_normalize_nested_shapes() {
        let single = json!({ "rule": { "apply_server_side_encryption_by_default": { "sse_algorithm": "AES256" } } });
        assert_eq!(sse_rule_algorithms(&single), vec![Some("AES256".to_string())]);

        let listed = json!([{ "rule": [
            { "apply_server_side_encryption_by_default": [{ "sse_algorithm": "aws:kms" }] },
            { "bucket_key_enabled": true }
        ] }]);
        assert_eq!(sse_rule_algorithms(&listed), vec![Some("aws:kms".to_string()), None]);

        assert!(sse_rule_algorithms(&json!({ "rule": [] })).is_empty());
    }

    #[test]
    fn bucket_targets_resolve_references_and_literals() {
        assert!(targets_bucket("${aws_s3_bucket.logs.id}", "logs", None));
        assert!(targets_bucket("${aws_s3_bucket.logs.bucket}", "logs", None));
        assert!(targets_bucket("acme-logs", "logs", Some("acme-logs")));
        assert!(!targets_bucket("${aws_s3_bucket.other.id}", "logs", Some("acme-logs")));
    }
}
