//! Field and cross-field validation.
//!
//! Validation never fails as a whole: every problem is reported as a
//! [`ValidationError`] attached to the field it concerns. Predicates that
//! reference unknown fields evaluate to `false` and produce a
//! [`DependencyError`] on the dependent field.
//!
//! # Examples
//!
//! ```
//! use generator_form_core::*;
//!
//! let raw: RawSchema = serde_json::from_value(serde_json::json!({
//!     "name": "library",
//!     "command": "generate",
//!     "options": [
//!         { "name": "style", "items": ["css", "scss", "less"], "isRequired": true }
//!     ]
//! }))
//! .unwrap();
//! let schema = normalize(&raw).unwrap();
//! let style = schema.option("style").unwrap();
//!
//! assert!(validate_field(style, Some(&OptionValue::from("css"))).is_empty());
//! assert_eq!(validate_field(style, None), vec![ValidationError::Required]);
//! assert_eq!(
//!     validate_field(style, Some(&OptionValue::from("sass"))),
//!     vec![ValidationError::InvalidChoice { value: "sass".into() }]
//! );
//! ```

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

use crate::{GeneratorSchema, OptionDescriptor, OptionValue, Predicate};

/// A predicate references a field the schema does not declare.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("'{field}' depends on unknown field '{missing}'")]
pub struct DependencyError {
    /// The field whose predicate holds the reference.
    pub field: String,
    /// The undeclared field name.
    pub missing: String,
}

/// Reason a field's current value is invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationError {
    /// The field is (effectively) required but unset or blank.
    #[error("a value is required")]
    Required,
    /// The value does not have the shape the option's kind expects.
    #[error("expected a {expected} value")]
    TypeMismatch { expected: String },
    /// An enum value or array item is not a declared choice.
    #[error("'{value}' is not one of the allowed choices")]
    InvalidChoice { value: String },
    /// A visibility or requiredness predicate is unresolvable.
    #[error(transparent)]
    Dependency(#[from] DependencyError),
}

/// Read access to current field values for predicate evaluation.
pub trait FieldValues {
    /// `None` when the schema declares no such field, `Some(None)` when the
    /// field is unset or currently invisible.
    fn lookup(&self, name: &str) -> Option<Option<&OptionValue>>;
}

/// Resolved visibility and requiredness of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub visible: bool,
    pub required: bool,
    pub dependency_errors: Vec<DependencyError>,
}

/// Evaluates a descriptor's `visibleWhen` and `requiredWhen` predicates.
///
/// Without predicates a field is visible and required as declared.
/// Invisible fields are never required.
pub fn resolve_field(descriptor: &OptionDescriptor, values: &impl FieldValues) -> Resolution {
    let mut dependency_errors = Vec::new();

    let visible = descriptor
        .visible_when
        .as_ref()
        .is_none_or(|p| evaluate_checked(descriptor, p, values, &mut dependency_errors));
    let required = match &descriptor.required_when {
        Some(p) => evaluate_checked(descriptor, p, values, &mut dependency_errors),
        None => descriptor.required,
    };

    Resolution {
        visible,
        required: visible && required,
        dependency_errors,
    }
}

/// Validates a single value against its descriptor.
///
/// Checks the type, choice membership and, for descriptors without a
/// `requiredWhen` predicate, the declared `required` flag.
pub fn validate_field(
    descriptor: &OptionDescriptor,
    value: Option<&OptionValue>,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if descriptor.required_when.is_none() && descriptor.required && is_blank(value) {
        errors.push(ValidationError::Required);
    }
    errors.extend(check_value(descriptor, value));
    errors
}

/// Resolves every predicate against the full value set and reports
/// requiredness and dependency errors per field.
///
/// Fields are resolved in dependency order so that a field hidden by its
/// own predicate is seen as unset by the fields depending on it. Only fields
/// with at least one error appear in the result, in declaration order.
///
/// # Examples
///
/// ```
/// use generator_form_core::*;
/// use indexmap::IndexMap;
///
/// let raw: RawSchema = serde_json::from_value(serde_json::json!({
///     "name": "app",
///     "command": "generate",
///     "options": [
///         { "name": "routing", "type": "boolean" },
///         { "name": "router", "requiredWhen": { "truthy": { "field": "routing" } } }
///     ]
/// }))
/// .unwrap();
/// let schema = normalize(&raw).unwrap();
///
/// let mut values = IndexMap::new();
/// values.insert("routing".to_string(), OptionValue::Bool(true));
/// let errors = validate_cross_field(&schema, &values);
/// assert_eq!(errors["router"], vec![ValidationError::Required]);
/// ```
pub fn validate_cross_field(
    schema: &GeneratorSchema,
    values: &IndexMap<String, OptionValue>,
) -> IndexMap<String, Vec<ValidationError>> {
    let mut visible = vec![true; schema.len()];
    let mut resolutions: Vec<Option<Resolution>> = vec![None; schema.len()];

    for &index in schema.resolution_order() {
        let view = MaskedValues {
            schema,
            values,
            visible: &visible,
        };
        let resolution = resolve_field(&schema.options()[index], &view);
        visible[index] = resolution.visible;
        resolutions[index] = Some(resolution);
    }

    let mut report = IndexMap::new();
    for (descriptor, resolution) in schema.options().iter().zip(resolutions) {
        let Some(resolution) = resolution else {
            continue;
        };
        let mut errors = Vec::new();
        if resolution.required && is_blank(values.get(&descriptor.name)) {
            errors.push(ValidationError::Required);
        }
        errors.extend(resolution.dependency_errors.into_iter().map(ValidationError::from));
        if !errors.is_empty() {
            report.insert(descriptor.name.clone(), errors);
        }
    }
    report
}

/// Complete error list for a field given its resolution: requiredness,
/// type and choice checks, then dependency errors.
pub(crate) fn field_errors(
    descriptor: &OptionDescriptor,
    value: Option<&OptionValue>,
    resolution: &Resolution,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if resolution.required && is_blank(value) {
        errors.push(ValidationError::Required);
    }
    errors.extend(check_value(descriptor, value));
    errors.extend(
        resolution
            .dependency_errors
            .iter()
            .cloned()
            .map(ValidationError::from),
    );
    errors
}

fn check_value(descriptor: &OptionDescriptor, value: Option<&OptionValue>) -> Vec<ValidationError> {
    let Some(value) = value else {
        return Vec::new();
    };
    if !descriptor.kind.matches_type(value) {
        return vec![ValidationError::TypeMismatch {
            expected: descriptor.kind.to_string(),
        }];
    }

    let Some(choices) = descriptor.kind.choices() else {
        return Vec::new();
    };
    let literals: Vec<&OptionValue> = match value {
        OptionValue::List(items) => items.iter().collect(),
        scalar => vec![scalar],
    };
    literals
        .into_iter()
        .filter_map(|v| match v {
            OptionValue::String(s) if !choices.contains(s) => {
                Some(ValidationError::InvalidChoice { value: s.clone() })
            }
            _ => None,
        })
        .collect()
}

fn is_blank(value: Option<&OptionValue>) -> bool {
    value.is_none_or(OptionValue::is_blank)
}

/// Evaluates `predicate`, treating it as `false` (and recording errors) if
/// it references undeclared fields.
fn evaluate_checked(
    descriptor: &OptionDescriptor,
    predicate: &Predicate,
    values: &impl FieldValues,
    errors: &mut Vec<DependencyError>,
) -> bool {
    let mut resolvable = true;
    for reference in predicate.references() {
        if values.lookup(reference).is_none() {
            resolvable = false;
            let error = DependencyError {
                field: descriptor.name.clone(),
                missing: reference.to_string(),
            };
            if !errors.contains(&error) {
                errors.push(error);
            }
        }
    }
    resolvable && evaluate(predicate, values)
}

fn current<'a>(values: &'a impl FieldValues, field: &str) -> Option<&'a OptionValue> {
    values.lookup(field).flatten()
}

fn evaluate(predicate: &Predicate, values: &impl FieldValues) -> bool {
    match predicate {
        Predicate::Equals { field, value } => current(values, field) == Some(value),
        Predicate::NotEquals { field, value } => current(values, field) != Some(value),
        Predicate::OneOf { field, values: options } => {
            current(values, field).is_some_and(|v| options.contains(v))
        }
        Predicate::IsSet { field } => current(values, field).is_some_and(|v| !v.is_blank()),
        Predicate::Truthy { field } => current(values, field)
            .is_some_and(|v| !v.is_blank() && *v != OptionValue::Bool(false)),
        Predicate::All(preds) => preds.iter().all(|p| evaluate(p, values)),
        Predicate::Any(preds) => preds.iter().any(|p| evaluate(p, values)),
        Predicate::Not(p) => !evaluate(p, values),
    }
}

/// Value view that hides fields resolved as invisible.
struct MaskedValues<'a> {
    schema: &'a GeneratorSchema,
    values: &'a IndexMap<String, OptionValue>,
    visible: &'a [bool],
}

impl FieldValues for MaskedValues<'_> {
    fn lookup(&self, name: &str) -> Option<Option<&OptionValue>> {
        let index = self.schema.position_of(name)?;
        Some(if self.visible[index] {
            self.values.get(name)
        } else {
            None
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{RawSchema, normalize};

    fn schema(options: serde_json::Value) -> GeneratorSchema {
        let raw: RawSchema = serde_json::from_value(json!({
            "name": "app",
            "command": "generate",
            "options": options
        }))
        .unwrap();
        normalize(&raw).unwrap()
    }

    fn values(pairs: &[(&str, OptionValue)]) -> IndexMap<String, OptionValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_validate_field_reports_type_mismatch() {
        let schema = schema(json!([{ "name": "port", "type": "number" }]));
        let port = schema.option("port").unwrap();
        assert_eq!(
            validate_field(port, Some(&OptionValue::from("eighty"))),
            vec![ValidationError::TypeMismatch {
                expected: "number".into()
            }]
        );
        assert!(validate_field(port, Some(&OptionValue::Number(80.0))).is_empty());
    }

    #[test]
    fn test_validate_field_checks_every_array_item() {
        let schema = schema(json!([{
            "name": "libraries", "type": "array",
            "items": { "type": "string", "enum": ["data-access", "feature", "ui"] }
        }]));
        let libraries = schema.option("libraries").unwrap();
        let errors = validate_field(
            libraries,
            Some(&OptionValue::from(vec!["ui", "shell", "core"])),
        );
        assert_eq!(
            errors,
            vec![
                ValidationError::InvalidChoice {
                    value: "shell".into()
                },
                ValidationError::InvalidChoice {
                    value: "core".into()
                },
            ]
        );
    }

    #[test]
    fn test_required_rejects_blank_values() {
        let schema = schema(json!([
            { "name": "name", "isRequired": true },
            { "name": "tags", "type": "array", "isRequired": true },
            { "name": "flag", "type": "boolean", "isRequired": true }
        ]));
        let name = schema.option("name").unwrap();
        let tags = schema.option("tags").unwrap();
        let flag = schema.option("flag").unwrap();

        assert_eq!(
            validate_field(name, Some(&OptionValue::from("  "))),
            vec![ValidationError::Required]
        );
        assert_eq!(
            validate_field(tags, Some(&OptionValue::List(Vec::new()))),
            vec![ValidationError::Required]
        );
        assert!(validate_field(flag, Some(&OptionValue::Bool(false))).is_empty());
    }

    #[test]
    fn test_unknown_reference_is_fail_safe() {
        let schema = schema(json!([
            { "name": "router", "isRequired": true,
              "requiredWhen": { "truthy": { "field": "routing" } } }
        ]));
        let errors = validate_cross_field(&schema, &IndexMap::new());
        assert_eq!(
            errors["router"],
            vec![ValidationError::Dependency(DependencyError {
                field: "router".into(),
                missing: "routing".into(),
            })]
        );
    }

    #[test]
    fn test_invisible_field_is_not_required_and_masks_dependents() {
        let schema = schema(json!([
            { "name": "routing", "type": "boolean" },
            { "name": "router", "type": "boolean",
              "visibleWhen": { "truthy": { "field": "routing" } } },
            { "name": "guard", "requiredWhen": { "truthy": { "field": "router" } } }
        ]));

        let hidden = values(&[
            ("routing", OptionValue::Bool(false)),
            ("router", OptionValue::Bool(true)),
        ]);
        assert!(validate_cross_field(&schema, &hidden).is_empty());

        let shown = values(&[
            ("routing", OptionValue::Bool(true)),
            ("router", OptionValue::Bool(true)),
        ]);
        assert_eq!(
            validate_cross_field(&schema, &shown)["guard"],
            vec![ValidationError::Required]
        );
    }

    #[test]
    fn test_predicate_operators() {
        let schema = schema(json!([
            { "name": "style", "items": ["css", "scss", "less"] },
            { "name": "a",
              "requiredWhen": { "oneOf": { "field": "style", "values": ["scss", "less"] } } },
            { "name": "b", "requiredWhen": { "notEquals": { "field": "style", "value": "css" } } },
            { "name": "c", "requiredWhen": { "any": [
                { "equals": { "field": "style", "value": "css" } },
                { "not": { "truthy": { "field": "style" } } }
            ] } }
        ]));

        let less = validate_cross_field(&schema, &values(&[("style", OptionValue::from("less"))]));
        assert!(less.contains_key("a"));
        assert!(less.contains_key("b"));
        assert!(!less.contains_key("c"));

        let unset = validate_cross_field(&schema, &IndexMap::new());
        assert!(!unset.contains_key("a"));
        assert!(unset.contains_key("b"));
        assert!(unset.contains_key("c"));
    }

    #[test]
    fn test_is_set_treats_false_as_set() {
        let schema = schema(json!([
            { "name": "routing", "type": "boolean" },
            { "name": "style" },
            { "name": "a", "requiredWhen": { "isSet": { "field": "routing" } } },
            { "name": "b", "requiredWhen": { "truthy": { "field": "routing" } } },
            { "name": "c", "requiredWhen": { "isSet": { "field": "style" } } }
        ]));

        let off = validate_cross_field(&schema, &values(&[("routing", OptionValue::Bool(false))]));
        assert!(off.contains_key("a"));
        assert!(!off.contains_key("b"));
        assert!(!off.contains_key("c"));

        let blank = validate_cross_field(&schema, &values(&[("style", OptionValue::from(" "))]));
        assert!(!blank.contains_key("c"));
    }
}
