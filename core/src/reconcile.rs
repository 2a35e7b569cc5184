//! Reconciling a live form with a refreshed schema.
//!
//! When a generator's options change on disk, [`reconcile`] rebuilds the
//! form for the new schema while keeping every user edit that still makes
//! sense: a dirty value survives when the option kept a compatible kind and
//! the value is still admitted by it.
//!
//! # Example
//!
//! ```
//! use generator_form_core::*;
//!
//! let v1: RawSchema = serde_json::from_value(serde_json::json!({
//!     "name": "library",
//!     "command": "generate",
//!     "options": [
//!         { "name": "style", "items": ["css", "scss"], "default": "scss" },
//!         { "name": "tags" }
//!     ]
//! }))
//! .unwrap();
//! let mut v2 = v1.clone();
//! v2.options[0].enum_ = Some(vec!["css".into(), "scss".into(), "less".into()]);
//! v2.options[0].items = None;
//! v2.options.remove(1);
//!
//! let mut form = FormModel::seed(normalize(&v1).unwrap());
//! form.set_value("style", "css").unwrap();
//! form.set_value("tags", "ui").unwrap();
//!
//! let (form, report) = reconcile_with_report(&form, normalize(&v2).unwrap());
//! assert_eq!(form.value("style"), Some(&OptionValue::from("css")));
//! assert_eq!(report.carried, vec!["style"]);
//! assert_eq!(report.dropped, vec!["tags"]);
//! ```

use serde::Serialize;
use tracing::debug;

use crate::form::FieldState;
use crate::{FormModel, GeneratorSchema, OptionDescriptor, OptionValue};

/// What happened to each field during reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Dirty fields whose value was kept.
    pub carried: Vec<String>,
    /// Dirty fields whose value no longer fits and fell back to the default.
    pub reset: Vec<String>,
    /// Fields the new schema no longer declares.
    pub dropped: Vec<String>,
    /// Fields the new schema introduces.
    pub added: Vec<String>,
}

impl ReconcileReport {
    /// Returns `true` if no user edit was lost and no field came or went.
    pub fn is_lossless(&self) -> bool {
        self.reset.is_empty() && self.dropped.is_empty() && self.added.is_empty()
    }
}

/// Rebuilds `old` for `schema`, preserving compatible user edits.
pub fn reconcile(old: &FormModel, schema: GeneratorSchema) -> FormModel {
    reconcile_with_report(old, schema).0
}

/// Like [`reconcile`], also reporting which fields were carried, reset,
/// dropped or added.
pub fn reconcile_with_report(
    old: &FormModel,
    schema: GeneratorSchema,
) -> (FormModel, ReconcileReport) {
    let mut report = ReconcileReport::default();
    let previous = old.schema();

    let fields = schema
        .options()
        .iter()
        .map(|descriptor| {
            let Some(prior) = previous.option(&descriptor.name) else {
                report.added.push(descriptor.name.clone());
                return FieldState::carried(descriptor.initial_value(), false);
            };
            let Some(state) = old.field(&descriptor.name).filter(|state| state.dirty) else {
                return FieldState::carried(descriptor.initial_value(), false);
            };

            match carry(prior, descriptor, state.value.as_ref()) {
                Some(value) => {
                    report.carried.push(descriptor.name.clone());
                    let dirty = value != descriptor.initial_value();
                    FieldState::carried(value, dirty)
                }
                None => {
                    report.reset.push(descriptor.name.clone());
                    FieldState::carried(descriptor.initial_value(), false)
                }
            }
        })
        .collect();

    report.dropped = previous
        .options()
        .iter()
        .filter(|o| schema.option(&o.name).is_none())
        .map(|o| o.name.clone())
        .collect();

    debug!(
        generator = %schema.name,
        carried = report.carried.len(),
        reset = report.reset.len(),
        dropped = report.dropped.len(),
        added = report.added.len(),
        "Reconciled form"
    );

    (FormModel::from_parts(schema, fields), report)
}

/// The value to carry for a dirty field, or `None` when it must reset.
///
/// Unchanged kinds carry anything, including values that were already
/// invalid. A changed kind of the same shape carries only values the new
/// kind admits.
fn carry(
    prior: &OptionDescriptor,
    next: &OptionDescriptor,
    value: Option<&OptionValue>,
) -> Option<Option<OptionValue>> {
    if prior.kind == next.kind {
        return Some(value.cloned());
    }
    if !prior.kind.same_shape(&next.kind) {
        return None;
    }
    match value {
        None => Some(None),
        Some(v) if next.kind.admits(v) => Some(Some(v.clone())),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{RawSchema, ValidationError, normalize};

    fn schema(options: serde_json::Value) -> GeneratorSchema {
        let raw: RawSchema = serde_json::from_value(json!({
            "name": "library",
            "command": "generate",
            "options": options
        }))
        .unwrap();
        normalize(&raw).unwrap()
    }

    fn base() -> GeneratorSchema {
        schema(json!([
            { "name": "name", "isRequired": true },
            { "name": "style", "items": ["css", "scss", "less"], "default": "scss" },
            { "name": "port", "type": "number" },
            { "name": "legacy", "type": "boolean" }
        ]))
    }

    #[test]
    fn test_unchanged_kind_keeps_edit() {
        let mut form = FormModel::seed(base());
        form.set_value("name", "shell").unwrap();

        let (next, report) = reconcile_with_report(&form, base());
        let field = next.field("name").unwrap();
        assert_eq!(field.value, Some(OptionValue::from("shell")));
        assert!(field.dirty);
        assert_eq!(report.carried, vec!["name"]);
        assert!(report.is_lossless());
    }

    #[test]
    fn test_incompatible_kind_resets_to_new_default() {
        let mut form = FormModel::seed(base());
        form.set_value("port", 4200.0).unwrap();

        let next_schema = schema(json!([
            { "name": "name", "isRequired": true },
            { "name": "style", "items": ["css", "scss", "less"], "default": "scss" },
            { "name": "port", "default": "auto" },
            { "name": "legacy", "type": "boolean" }
        ]));
        let (next, report) = reconcile_with_report(&form, next_schema);

        let field = next.field("port").unwrap();
        assert_eq!(field.value, Some(OptionValue::from("auto")));
        assert!(!field.dirty);
        assert_eq!(report.reset, vec!["port"]);
    }

    #[test]
    fn test_narrowed_choices_keep_admitted_values_only() {
        let narrowed = schema(json!([
            { "name": "name", "isRequired": true },
            { "name": "style", "items": ["css", "scss"], "default": "css" },
            { "name": "port", "type": "number" },
            { "name": "legacy", "type": "boolean" }
        ]));

        let mut kept = FormModel::seed(base());
        kept.set_value("style", "scss").unwrap();
        let (next, report) = reconcile_with_report(&kept, narrowed.clone());
        assert_eq!(next.value("style"), Some(&OptionValue::from("scss")));
        assert!(next.field("style").unwrap().dirty);
        assert_eq!(report.carried, vec!["style"]);

        let mut lost = FormModel::seed(base());
        lost.set_value("style", "less").unwrap();
        let (next, report) = reconcile_with_report(&lost, narrowed);
        assert_eq!(next.value("style"), Some(&OptionValue::from("css")));
        assert_eq!(report.reset, vec!["style"]);
    }

    #[test]
    fn test_clean_fields_follow_new_default() {
        let form = FormModel::seed(base());
        let next_schema = schema(json!([
            { "name": "name", "isRequired": true },
            { "name": "style", "items": ["css", "scss", "less"], "default": "less" }
        ]));

        let (next, report) = reconcile_with_report(&form, next_schema);
        assert_eq!(next.value("style"), Some(&OptionValue::from("less")));
        assert!(report.carried.is_empty());
        assert_eq!(report.dropped, vec!["port", "legacy"]);
    }

    #[test]
    fn test_added_fields_are_seeded_and_validated() {
        let form = FormModel::seed(base());
        let next_schema = schema(json!([
            { "name": "name", "isRequired": true },
            { "name": "project", "isRequired": true },
            { "name": "skipTests", "type": "boolean", "default": true }
        ]));

        let next = reconcile(&form, next_schema);
        assert_eq!(next.value("skipTests"), Some(&OptionValue::Bool(true)));
        assert_eq!(
            next.field("project").unwrap().errors,
            vec![ValidationError::Required]
        );
    }

    #[test]
    fn test_carried_value_matching_new_default_is_clean() {
        let mut form = FormModel::seed(base());
        form.set_value("style", "less").unwrap();
        let next_schema = schema(json!([
            { "name": "style", "items": ["css", "scss", "less"], "default": "less" }
        ]));

        let next = reconcile(&form, next_schema);
        assert_eq!(next.value("style"), Some(&OptionValue::from("less")));
        assert!(!next.field("style").unwrap().dirty);
    }
}
