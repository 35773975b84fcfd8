//! Normalization for attribute bags whose fields arrive either as a scalar
//! (or single object) or as a list of them.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(v) => v,
            OneOrMany::One(t) => vec![t],
        }
    }

    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::Many(v) => v,
            OneOrMany::One(t) => std::slice::from_ref(t),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

impl OneOrMany<Json> {
    /// The string elements, in order. Elements of any other type are skipped
    /// on their own.
    pub fn strings(&self) -> impl Iterator<Item = &str> + '_ {
        self.iter().filter_map(Json::as_str)
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

/// Raw form of [`OneOrMany`]: `null` is empty, arrays are flattened one level,
/// anything else becomes a single element.
pub fn one_or_many(value: &Json) -> Vec<&Json> {
    match value {
        Json::Null => Vec::new(),
        Json::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

/// Booleans are taken as-is; strings are true only when they read `true` in
/// any letter case. Everything else is false.
pub fn lenient_bool(value: &Json) -> bool {
    match value {
        Json::Bool(b) => *b,
        Json::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_and_list_normalize_to_same_vec() {
        let one: OneOrMany<String> = serde_json::from_value(json!("*")).unwrap();
        let many: OneOrMany<String> = serde_json::from_value(json!(["*"])).unwrap();
        assert_eq!(one.into_vec(), many.into_vec());
    }

    #[test]
    fn strings_skip_foreign_elements() {
        let mixed: OneOrMany<Json> =
            serde_json::from_value(json!(["0.0.0.0/0", null, 7, ["x"], "::/0"])).unwrap();
        assert_eq!(mixed.strings().collect::<Vec<_>>(), vec!["0.0.0.0/0", "::/0"]);
        let single: OneOrMany<Json> = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(single.strings().count(), 0);
    }

    #[test]
    fn raw_values_flatten() {
        assert!(one_or_many(&Json::Null).is_empty());
        assert_eq!(one_or_many(&json!({ "a": 1 })).len(), 1);
        assert_eq!(one_or_many(&json!([{}, {}])).len(), 2);
    }

    #[test]
    fn lenient_bool_accepts_textual_true_only() {
        assert!(lenient_bool(&json!(true)));
        assert!(lenient_bool(&json!("true")));
        assert!(lenient_bool(&json!("TRUE")));
        assert!(lenient_bool(&json!("True")));
        assert!(!lenient_bool(&json!("false")));
        assert!(!lenient_bool(&json!("yes")));
        assert!(!lenient_bool(&json!(" true")));
        assert!(!lenient_bool(&json!(1)));
        assert!(!lenient_bool(&Json::Null));
    }
}
