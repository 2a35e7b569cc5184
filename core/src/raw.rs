//! Raw schema documents as supplied by a generator registry.
//!
//! These types mirror the untrusted input boundary: every field is optional
//! or defaulted so that any registry output deserializes, and nothing is
//! checked until [`normalize`](crate::normalize) runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ArrayStyle, Predicate};

/// A generator's option schema before normalization.
///
/// # Examples
///
/// ```
/// use generator_form_core::RawSchema;
///
/// let raw: RawSchema = serde_json::from_value(serde_json::json!({
///     "name": "library",
///     "command": "generate",
///     "positional": "@nrwl/angular:library",
///     "options": [
///         { "name": "style", "type": "string", "default": "scss", "aliases": ["s"],
///           "items": ["css", "scss", "less"] }
///     ]
/// }))
/// .unwrap();
/// assert_eq!(raw.options.len(), 1);
/// assert_eq!(raw.options[0].aliases, vec!["s"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSchema {
    /// Generator name.
    #[serde(default)]
    pub name: String,
    /// Leading command words (e.g. `generate`).
    #[serde(default)]
    pub command: String,
    /// Positional template token placed after the command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positional: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Array serialization policy; falls back to the normalizer's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_style: Option<ArrayStyle>,
    /// Options in declaration order.
    #[serde(default)]
    pub options: Vec<RawOption>,
}

/// One option entry of a [`RawSchema`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOption {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Type tag: `string`, `boolean`, `number`, `integer`, `array` or `enum`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, alias = "required")]
    pub is_required: bool,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    #[serde(default)]
    pub item_tooltips: BTreeMap<String, String>,
    /// Choices (for strings) or the item schema (for arrays).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<RawItems>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_: Option<Vec<serde_json::Value>>,
    /// Positional argument index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positional: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_when: Option<Predicate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_when: Option<Predicate>,
}

/// The `items` entry of a raw option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawItems {
    /// A bare list of allowed literals.
    Choices(Vec<serde_json::Value>),
    /// A nested item schema.
    Schema(RawItemSchema),
}

/// Item schema for array options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawItemSchema {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_: Option<Vec<serde_json::Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_alias_is_accepted() {
        let raw: RawOption =
            serde_json::from_value(serde_json::json!({ "name": "a", "required": true })).unwrap();
        assert!(raw.is_required);
    }

    #[test]
    fn test_items_accept_both_shapes() {
        let list: RawOption = serde_json::from_value(serde_json::json!({
            "name": "style", "items": ["css", "scss"]
        }))
        .unwrap();
        assert!(matches!(list.items, Some(RawItems::Choices(ref c)) if c.len() == 2));

        let nested: RawOption = serde_json::from_value(serde_json::json!({
            "name": "libraries", "type": "array",
            "items": { "type": "string", "enum": ["ui", "util"] }
        }))
        .unwrap();
        assert!(matches!(
            nested.items,
            Some(RawItems::Schema(RawItemSchema { enum_: Some(ref e), .. })) if e.len() == 2
        ));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let raw: RawSchema = serde_json::from_value(serde_json::json!({
            "name": "app",
            "command": "generate",
            "contextValues": { "path": "apps" },
            "options": [{ "name": "tags", "x-priority": "important" }]
        }))
        .unwrap();
        assert_eq!(raw.options[0].name, "tags");
    }
}
