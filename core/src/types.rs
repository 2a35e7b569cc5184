//! Type definitions for normalized generator option schemas.
//!
//! This module defines the data model produced by the normalizer and
//! consumed by the form model, serializer and reconciler. All types are
//! serializable with [`serde`] so snapshots and normalized schemas can be
//! handed to a presentation layer as JSON or YAML.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of a single array item (or of a scalar option).
///
/// Arrays of arrays are not representable: [`OptionKind::ArrayOf`] only
/// wraps an `ItemKind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    /// Free-form text.
    String,
    /// `true` / `false`.
    Boolean,
    /// Any finite number (integers included).
    Number,
    /// One of a non-empty, ordered set of literal choices.
    Enum(Vec<String>),
}

impl ItemKind {
    /// Returns `true` if `value` has the shape this kind expects.
    ///
    /// Choice membership is not checked here; see [`ItemKind::admits`].
    pub fn matches_type(&self, value: &OptionValue) -> bool {
        matches!(
            (self, value),
            (Self::String | Self::Enum(_), OptionValue::String(_))
                | (Self::Boolean, OptionValue::Bool(_))
                | (Self::Number, OptionValue::Number(_))
        )
    }

    /// Returns `true` if `value` type-checks and, for enums, is a declared
    /// choice.
    pub fn admits(&self, value: &OptionValue) -> bool {
        match (self, value) {
            (Self::Enum(choices), OptionValue::String(s)) => choices.contains(s),
            _ => self.matches_type(value),
        }
    }

    /// Parses a command-line literal into a value of this kind.
    ///
    /// Enum literals are accepted verbatim; whether they are a declared
    /// choice is a validation concern.
    ///
    /// # Examples
    ///
    /// ```
    /// use generator_form_core::{ItemKind, OptionValue};
    ///
    /// assert_eq!(ItemKind::Number.parse_literal("2.5"), Some(OptionValue::Number(2.5)));
    /// assert_eq!(ItemKind::Boolean.parse_literal("yes"), None);
    /// ```
    pub fn parse_literal(&self, text: &str) -> Option<OptionValue> {
        match self {
            Self::String | Self::Enum(_) => Some(OptionValue::String(text.to_string())),
            Self::Boolean => match text {
                "true" => Some(OptionValue::Bool(true)),
                "false" => Some(OptionValue::Bool(false)),
                _ => None,
            },
            Self::Number => text
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(OptionValue::Number),
        }
    }

    /// Declared choices for enum items.
    pub fn choices(&self) -> Option<&[String]> {
        match self {
            Self::Enum(choices) => Some(choices),
            _ => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::Enum(_) => "choice",
        }
    }
}

/// Value kind of an option, resolved once at normalization.
///
/// # Examples
///
/// ```
/// use generator_form_core::{ItemKind, OptionKind, OptionValue};
///
/// let kind = OptionKind::ArrayOf(ItemKind::Enum(vec!["ui".into(), "util".into()]));
/// assert!(kind.admits(&OptionValue::from(vec!["ui"])));
/// assert!(!kind.admits(&OptionValue::from(vec!["shell"])));
/// assert_eq!(kind.zero_value(), Some(OptionValue::List(Vec::new())));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionKind {
    /// Free-form text.
    String,
    /// Flag-style boolean.
    Boolean,
    /// Numeric value.
    Number,
    /// One of the listed choices.
    Enum(Vec<String>),
    /// Homogeneous list of scalar items.
    ArrayOf(ItemKind),
}

impl OptionKind {
    /// The scalar item kind, or `None` for arrays.
    pub fn scalar(&self) -> Option<ItemKind> {
        match self {
            Self::String => Some(ItemKind::String),
            Self::Boolean => Some(ItemKind::Boolean),
            Self::Number => Some(ItemKind::Number),
            Self::Enum(choices) => Some(ItemKind::Enum(choices.clone())),
            Self::ArrayOf(_) => None,
        }
    }

    /// Returns `true` if `value` has the shape this kind expects.
    pub fn matches_type(&self, value: &OptionValue) -> bool {
        match (self, value) {
            (Self::ArrayOf(item), OptionValue::List(items)) => {
                items.iter().all(|v| item.matches_type(v))
            }
            (Self::ArrayOf(_), _) | (_, OptionValue::List(_)) => false,
            (Self::String, v) => ItemKind::String.matches_type(v),
            (Self::Boolean, v) => ItemKind::Boolean.matches_type(v),
            (Self::Number, v) => ItemKind::Number.matches_type(v),
            (Self::Enum(_), v) => matches!(v, OptionValue::String(_)),
        }
    }

    /// Returns `true` if `value` type-checks and every literal is a declared
    /// choice (for enum kinds).
    pub fn admits(&self, value: &OptionValue) -> bool {
        match (self, value) {
            (Self::ArrayOf(item), OptionValue::List(items)) => items.iter().all(|v| item.admits(v)),
            (Self::Enum(choices), OptionValue::String(s)) => choices.contains(s),
            _ => self.matches_type(value),
        }
    }

    /// Value a field of this kind holds when the schema declares no default.
    ///
    /// Booleans start `false`, arrays start empty, everything else is unset.
    pub fn zero_value(&self) -> Option<OptionValue> {
        match self {
            Self::Boolean => Some(OptionValue::Bool(false)),
            Self::ArrayOf(_) => Some(OptionValue::List(Vec::new())),
            Self::String | Self::Number | Self::Enum(_) => None,
        }
    }

    /// Declared choices for enum options and arrays of enums.
    pub fn choices(&self) -> Option<&[String]> {
        match self {
            Self::Enum(choices) => Some(choices),
            Self::ArrayOf(item) => item.choices(),
            _ => None,
        }
    }

    /// Returns `true` when both kinds have the same shape, ignoring the
    /// concrete choice lists.
    pub fn same_shape(&self, other: &OptionKind) -> bool {
        match (self, other) {
            (Self::ArrayOf(a), Self::ArrayOf(b)) => {
                std::mem::discriminant(a) == std::mem::discriminant(b)
            }
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }

    /// Parses user-entered text for this kind.
    ///
    /// Arrays are written as a comma-separated list (see
    /// [`split_list_literal`]); an empty string is the empty list.
    pub fn parse_literal(&self, text: &str) -> Option<OptionValue> {
        match self {
            Self::ArrayOf(item) => {
                if text.is_empty() {
                    return Some(OptionValue::List(Vec::new()));
                }
                split_list_literal(text)
                    .iter()
                    .map(|part| item.parse_literal(part))
                    .collect::<Option<Vec<_>>>()
                    .map(OptionValue::List)
            }
            _ => self.scalar().and_then(|item| item.parse_literal(text)),
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Boolean => f.write_str("boolean"),
            Self::Number => f.write_str("number"),
            Self::Enum(_) => f.write_str("choice"),
            Self::ArrayOf(item) => write!(f, "array of {}", item.type_name()),
        }
    }
}

/// A concrete field value.
///
/// Enum choices are carried as [`OptionValue::String`]. Lists only ever hold
/// scalar values once they pass validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<OptionValue>),
}

impl OptionValue {
    /// Converts a JSON value; `null` and objects have no representation.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(Self::Number),
            serde_json::Value::String(s) => Some(Self::String(s.clone())),
            serde_json::Value::Array(items) => items
                .iter()
                .map(Self::from_json)
                .collect::<Option<Vec<_>>>()
                .map(Self::List),
            serde_json::Value::Null | serde_json::Value::Object(_) => None,
        }
    }

    /// Returns `true` for values a required field must not hold: blank text
    /// and empty lists.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::String(s) => s.trim().is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Bool(_) | Self::Number(_) => false,
        }
    }

    /// Command-line literal of a scalar; lists are comma-joined.
    ///
    /// # Examples
    ///
    /// ```
    /// use generator_form_core::OptionValue;
    ///
    /// assert_eq!(OptionValue::Number(3.0).literal(), "3");
    /// assert_eq!(OptionValue::from(vec!["a", "b,c"]).literal(), "a,b\\,c");
    /// ```
    pub fn literal(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::String(s) => s.clone(),
            Self::List(items) => join_list_literal(items),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.literal())
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl<T: Into<OptionValue>> From<Vec<T>> for OptionValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

/// Joins list items with `,`, escaping `\` and `,` inside items.
pub fn join_list_literal(items: &[OptionValue]) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        for c in item.literal().chars() {
            if c == ',' || c == '\\' {
                out.push('\\');
            }
            out.push(c);
        }
    }
    out
}

/// Splits a comma-joined list written by [`join_list_literal`].
///
/// Always yields at least one item.
///
/// # Examples
///
/// ```
/// use generator_form_core::split_list_literal;
///
/// assert_eq!(split_list_literal("ui,a\\,b"), vec!["ui", "a,b"]);
/// assert_eq!(split_list_literal(""), vec![""]);
/// ```
pub fn split_list_literal(text: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => current.push(chars.next().unwrap_or('\\')),
            ',' => items.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    items.push(current);
    items
}

/// Condition over sibling field values.
///
/// A predicate referencing a field the schema does not declare always
/// evaluates to `false`. A referenced field that is currently invisible is
/// seen as unset.
///
/// # Examples
///
/// ```
/// use generator_form_core::Predicate;
///
/// let p: Predicate = serde_json::from_value(serde_json::json!({
///     "all": [
///         { "equals": { "field": "style", "value": "scss" } },
///         { "truthy": { "field": "routing" } }
///     ]
/// }))
/// .unwrap();
/// assert_eq!(p.references(), vec!["style", "routing"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Predicate {
    /// The field's value equals `value`.
    Equals { field: String, value: OptionValue },
    /// The field's value is unset or differs from `value`.
    NotEquals { field: String, value: OptionValue },
    /// The field's value equals one of `values`.
    OneOf {
        field: String,
        values: Vec<OptionValue>,
    },
    /// The field holds a non-blank value. `false` counts as set.
    IsSet { field: String },
    /// The field holds a non-blank value other than `false`.
    Truthy { field: String },
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Field names referenced anywhere in this predicate, in order of
    /// appearance.
    pub fn references(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references<'a>(&'a self, refs: &mut Vec<&'a str>) {
        match self {
            Self::Equals { field, .. }
            | Self::NotEquals { field, .. }
            | Self::OneOf { field, .. }
            | Self::IsSet { field }
            | Self::Truthy { field } => {
                if !refs.contains(&field.as_str()) {
                    refs.push(field);
                }
            }
            Self::All(preds) | Self::Any(preds) => {
                for p in preds {
                    p.collect_references(refs);
                }
            }
            Self::Not(p) => p.collect_references(refs),
        }
    }
}

/// Array serialization policy, declared per schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ArrayStyle {
    /// One flag per item: `-l ui -l util` (the default).
    #[default]
    Repeated,
    /// A single comma-joined value: `-l ui,util`.
    CommaJoined,
}

/// Normalized, validated description of one generator parameter.
///
/// Descriptors are only produced by [`normalize`](crate::normalize), so
/// every invariant (unique name, type-checked default, non-empty choices)
/// holds for any descriptor reachable from a [`GeneratorSchema`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionDescriptor {
    /// Option name, unique within the schema.
    pub name: String,
    /// Value kind.
    pub kind: OptionKind,
    /// Declared default, already type-checked against `kind`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<OptionValue>,
    /// Declared requiredness, overridden by `required_when` when present.
    pub required: bool,
    /// Hidden options are never rendered or serialized.
    pub hidden: bool,
    /// Aliases without leading dashes, most preferred first.
    pub aliases: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    /// Help text per enum choice or array item literal.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub item_tooltips: BTreeMap<String, String>,
    /// Positional argument index, if the option is passed positionally.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positional: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_when: Option<Predicate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_when: Option<Predicate>,
}

impl OptionDescriptor {
    /// Value a freshly seeded field holds: the default, or the kind's zero
    /// value.
    pub fn initial_value(&self) -> Option<OptionValue> {
        self.default.clone().or_else(|| self.kind.zero_value())
    }

    /// Flag used when serializing: `-a` for a one-character alias, `--alias`
    /// for longer ones, `--name` without aliases.
    ///
    /// # Examples
    ///
    /// ```
    /// use generator_form_core::{RawSchema, normalize};
    ///
    /// let raw: RawSchema = serde_json::from_value(serde_json::json!({
    ///     "name": "lib",
    ///     "command": "generate",
    ///     "options": [
    ///         { "name": "libraries", "type": "array", "aliases": ["l"] },
    ///         { "name": "style" }
    ///     ]
    /// }))
    /// .unwrap();
    /// let schema = normalize(&raw).unwrap();
    /// assert_eq!(schema.option("libraries").unwrap().preferred_flag(), "-l");
    /// assert_eq!(schema.option("style").unwrap().preferred_flag(), "--style");
    /// ```
    pub fn preferred_flag(&self) -> String {
        match self.aliases.first() {
            Some(alias) if alias.chars().count() == 1 => format!("-{alias}"),
            Some(alias) => format!("--{alias}"),
            None => format!("--{}", self.name),
        }
    }

    /// Negated flag for booleans defaulting to `true`.
    pub fn negated_flag(&self) -> String {
        format!("--no-{}", self.name)
    }

    /// Returns `true` if `token` (without dashes) names this option.
    pub fn answers_to(&self, token: &str) -> bool {
        self.name == token || self.aliases.iter().any(|a| a == token)
    }

    /// Help text for one enum choice or array item.
    pub fn item_tooltip(&self, literal: &str) -> Option<&str> {
        self.item_tooltips.get(literal).map(String::as_str)
    }
}

/// A normalized generator schema.
///
/// Holds the descriptors in declaration order together with the
/// dependency graph derived from their predicates: a topological
/// resolution order (dependencies first) and, per option, the transitive
/// set of options whose predicates depend on it.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratorSchema {
    /// Generator name (e.g. `library`).
    pub name: String,
    /// Leading command (e.g. `generate`); may contain several words.
    pub command: String,
    /// Positional template token (e.g. `@scope:schematic`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positional: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// How array values are serialized.
    pub array_style: ArrayStyle,
    options: Vec<OptionDescriptor>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    #[serde(skip)]
    order: Vec<usize>,
    #[serde(skip)]
    dependents: Vec<Vec<usize>>,
}

impl GeneratorSchema {
    pub(crate) fn from_parts(
        header: SchemaHeader,
        options: Vec<OptionDescriptor>,
        order: Vec<usize>,
        dependents: Vec<Vec<usize>>,
    ) -> Self {
        let index = options
            .iter()
            .enumerate()
            .map(|(i, o)| (o.name.clone(), i))
            .collect();
        Self {
            name: header.name,
            command: header.command,
            positional: header.positional,
            description: header.description,
            array_style: header.array_style,
            options,
            index,
            order,
            dependents,
        }
    }

    /// Descriptors in declaration order.
    pub fn options(&self) -> &[OptionDescriptor] {
        &self.options
    }

    /// Finds a descriptor by name.
    pub fn option(&self, name: &str) -> Option<&OptionDescriptor> {
        self.position_of(name).map(|i| &self.options[i])
    }

    /// Declaration index of an option.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Finds the option a command-line token (name or alias, no dashes)
    /// refers to.
    pub fn find_by_flag(&self, token: &str) -> Option<&OptionDescriptor> {
        self.option(token)
            .or_else(|| self.options.iter().find(|o| o.answers_to(token)))
    }

    /// Option indices ordered so every option comes after the options its
    /// predicates reference.
    pub fn resolution_order(&self) -> &[usize] {
        &self.order
    }

    /// Indices of options whose visibility or requiredness transitively
    /// depends on option `index`, in resolution order.
    pub fn dependents_of(&self, index: usize) -> &[usize] {
        &self.dependents[index]
    }

    /// Options passed positionally, ordered by position.
    pub fn positional_options(&self) -> Vec<&OptionDescriptor> {
        let mut positional: Vec<_> = self
            .options
            .iter()
            .filter(|o| o.positional.is_some())
            .collect();
        positional.sort_by_key(|o| o.positional);
        positional
    }

    /// Number of options.
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Returns `true` if the schema declares no options.
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

/// Schema-level metadata carried from the raw document.
#[derive(Debug, Clone)]
pub(crate) struct SchemaHeader {
    pub name: String,
    pub command: String,
    pub positional: Option<String>,
    pub description: Option<String>,
    pub array_style: ArrayStyle,
}
