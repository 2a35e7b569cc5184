//! Live form state seeded from a normalized schema.
//!
//! A [`FormModel`] owns one [`FieldState`] per option. Every mutation
//! recomputes the edited field and everything that transitively depends on
//! it before returning, so the tree is always internally consistent.
//!
//! # Example
//!
//! ```
//! use generator_form_core::*;
//!
//! let raw: RawSchema = serde_json::from_value(serde_json::json!({
//!     "name": "library",
//!     "command": "generate",
//!     "options": [
//!         { "name": "addE2EProject", "type": "boolean", "default": true }
//!     ]
//! }))
//! .unwrap();
//! let mut form = FormModel::seed(normalize(&raw).unwrap());
//!
//! form.set_value("addE2EProject", false).unwrap();
//! assert!(form.field("addE2EProject").unwrap().dirty);
//!
//! form.set_value("addE2EProject", true).unwrap();
//! assert!(!form.field("addE2EProject").unwrap().dirty);
//! ```

use indexmap::IndexMap;
use serde::Serialize;
use serde::ser::SerializeMap;
use thiserror::Error;
use tracing::debug;

use crate::validate::{FieldValues, field_errors, resolve_field};
use crate::{GeneratorSchema, OptionDescriptor, OptionValue, ValidationError};

/// Errors returned by form mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// The schema declares no field with this name.
    #[error("unknown field: {0}")]
    UnknownField(String),
}

/// Live state of one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldState {
    /// Current value; `None` means unset.
    pub value: Option<OptionValue>,
    /// `true` while the value differs from the seeded value.
    pub dirty: bool,
    /// Result of the `visibleWhen` predicate.
    pub visible: bool,
    /// Declared or predicate-derived requiredness (never true while
    /// invisible).
    pub effective_required: bool,
    /// Validation failures, empty when the field is valid.
    pub errors: Vec<ValidationError>,
}

impl FieldState {
    fn seeded(descriptor: &OptionDescriptor) -> Self {
        Self {
            value: descriptor.initial_value(),
            dirty: false,
            visible: true,
            effective_required: false,
            errors: Vec::new(),
        }
    }

    pub(crate) fn carried(value: Option<OptionValue>, dirty: bool) -> Self {
        Self {
            value,
            dirty,
            visible: true,
            effective_required: false,
            errors: Vec::new(),
        }
    }
}

/// Editable field-state tree for one generator form.
#[derive(Debug, Clone)]
pub struct FormModel {
    schema: GeneratorSchema,
    fields: Vec<FieldState>,
}

impl FormModel {
    /// Seeds a form: every field starts at its default (or zero value),
    /// clean, and fully resolved.
    pub fn seed(schema: GeneratorSchema) -> Self {
        let fields = schema.options().iter().map(FieldState::seeded).collect();
        Self::from_parts(schema, fields)
    }

    /// Builds a form from index-aligned field states and runs a full
    /// resolution pass.
    pub(crate) fn from_parts(schema: GeneratorSchema, mut fields: Vec<FieldState>) -> Self {
        refresh(&schema, &mut fields, schema.resolution_order().iter().copied());
        Self { schema, fields }
    }

    /// The normalized schema backing this form.
    pub fn schema(&self) -> &GeneratorSchema {
        &self.schema
    }

    /// Stores a value and recomputes dependent state.
    ///
    /// The value is stored even if it fails validation; the failure shows up
    /// in the field's `errors`.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::UnknownField`] if `name` is not declared.
    pub fn set_value(
        &mut self,
        name: &str,
        value: impl Into<OptionValue>,
    ) -> Result<(), FormError> {
        let index = self.index_of(name)?;
        self.store(index, Some(value.into()));
        Ok(())
    }

    /// Unsets a field's value.
    pub fn clear_value(&mut self, name: &str) -> Result<(), FormError> {
        let index = self.index_of(name)?;
        self.store(index, None);
        Ok(())
    }

    /// Restores a field to its seeded value and marks it clean.
    pub fn reset(&mut self, name: &str) -> Result<(), FormError> {
        let index = self.index_of(name)?;
        let initial = self.schema.options()[index].initial_value();
        self.store(index, initial);
        Ok(())
    }

    /// Sets several values in order. Nothing is applied if any name is
    /// unknown.
    pub fn apply_values<I, K, V>(&mut self, values: I) -> Result<(), FormError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<OptionValue>,
    {
        let resolved = values
            .into_iter()
            .map(|(name, value)| self.index_of(name.as_ref()).map(|i| (i, value.into())))
            .collect::<Result<Vec<_>, FormError>>()?;
        for (index, value) in resolved {
            self.store(index, Some(value));
        }
        Ok(())
    }

    /// Read-only view of all field states in declaration order.
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            schema: &self.schema,
            fields: &self.fields,
        }
    }

    /// State of one field.
    pub fn field(&self, name: &str) -> Option<&FieldState> {
        self.schema.position_of(name).map(|i| &self.fields[i])
    }

    /// Current value of one field.
    pub fn value(&self, name: &str) -> Option<&OptionValue> {
        self.field(name).and_then(|f| f.value.as_ref())
    }

    /// All set values in declaration order.
    pub fn values(&self) -> IndexMap<String, OptionValue> {
        self.schema
            .options()
            .iter()
            .zip(&self.fields)
            .filter_map(|(d, f)| f.value.clone().map(|v| (d.name.clone(), v)))
            .collect()
    }

    /// Returns `true` if any field carries a user edit.
    pub fn is_dirty(&self) -> bool {
        self.fields.iter().any(|f| f.dirty)
    }

    /// Returns `true` if any field has validation errors.
    pub fn has_errors(&self) -> bool {
        self.fields.iter().any(|f| !f.errors.is_empty())
    }

    fn index_of(&self, name: &str) -> Result<usize, FormError> {
        self.schema
            .position_of(name)
            .ok_or_else(|| FormError::UnknownField(name.to_string()))
    }

    fn store(&mut self, index: usize, value: Option<OptionValue>) {
        let descriptor = &self.schema.options()[index];
        let field = &mut self.fields[index];
        field.dirty = value != descriptor.initial_value();
        field.value = value;

        let dependents = self.schema.dependents_of(index);
        debug!(
            field = %descriptor.name,
            dirty = field.dirty,
            dependents = dependents.len(),
            "Field value stored"
        );
        refresh(
            &self.schema,
            &mut self.fields,
            std::iter::once(index).chain(dependents.iter().copied()),
        );
    }
}

/// Re-resolves and re-validates `indices`, which must be in resolution
/// order.
fn refresh(
    schema: &GeneratorSchema,
    fields: &mut [FieldState],
    indices: impl IntoIterator<Item = usize>,
) {
    for index in indices {
        let descriptor = &schema.options()[index];
        let resolution = resolve_field(
            descriptor,
            &FormValues {
                schema,
                fields: &*fields,
            },
        );
        let errors = field_errors(descriptor, fields[index].value.as_ref(), &resolution);

        let field = &mut fields[index];
        field.visible = resolution.visible;
        field.effective_required = resolution.required;
        field.errors = errors;
    }
}

struct FormValues<'a> {
    schema: &'a GeneratorSchema,
    fields: &'a [FieldState],
}

impl FieldValues for FormValues<'_> {
    fn lookup(&self, name: &str) -> Option<Option<&OptionValue>> {
        let field = &self.fields[self.schema.position_of(name)?];
        Some(if field.visible {
            field.value.as_ref()
        } else {
            None
        })
    }
}

/// Read-only, declaration-ordered view of a form's field states.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    schema: &'a GeneratorSchema,
    fields: &'a [FieldState],
}

impl<'a> Snapshot<'a> {
    /// State of one field.
    pub fn get(&self, name: &str) -> Option<&'a FieldState> {
        self.schema.position_of(name).map(|i| &self.fields[i])
    }

    /// `(descriptor, state)` pairs in declaration order.
    pub fn iter(self) -> impl Iterator<Item = (&'a OptionDescriptor, &'a FieldState)> + 'a {
        self.schema.options().iter().zip(self.fields.iter())
    }

    /// All validation errors as `(field, error)` pairs.
    pub fn errors(self) -> impl Iterator<Item = (&'a str, &'a ValidationError)> + 'a {
        self.iter()
            .flat_map(|(d, f)| f.errors.iter().map(move |e| (d.name.as_str(), e)))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` for a schema without options.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Snapshot<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (descriptor, state) in self.iter() {
            map.serialize_entry(&descriptor.name, state)?;
        }
        map.end()
    }
}
