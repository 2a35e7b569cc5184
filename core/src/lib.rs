//! Core engine for generator option forms.
//!
//! This crate turns a loosely-typed generator schema document into a live,
//! validated form and back into a command line:
//!
//! - [`normalize`] checks a [`RawSchema`] and produces a [`GeneratorSchema`]
//!   of strongly-typed [`OptionDescriptor`]s with a resolved dependency
//!   graph.
//! - [`validate_field`] and [`validate_cross_field`] check values against
//!   descriptors, including predicate-driven requiredness.
//! - [`FormModel`] holds per-field state (value, dirty, visibility,
//!   requiredness, errors) and keeps it consistent on every edit.
//! - [`serialize`] derives the canonical command line; [`parse_invocation`]
//!   reads one back.
//! - [`reconcile`] moves a live form onto a refreshed schema without losing
//!   compatible edits.
//!
//! # Example
//!
//! ```
//! use generator_form_core::*;
//!
//! let raw: RawSchema = serde_json::from_value(serde_json::json!({
//!     "name": "library",
//!     "command": "generate",
//!     "positional": "@nrwl/angular:library",
//!     "options": [
//!         { "name": "name", "isRequired": true },
//!         { "name": "addE2EProject", "type": "boolean", "default": true },
//!         { "name": "color" }
//!     ]
//! }))
//! .unwrap();
//! let mut form = FormModel::seed(normalize(&raw).unwrap());
//! assert!(form.has_errors());
//!
//! form.set_value("name", "shell").unwrap();
//! form.set_value("addE2EProject", false).unwrap();
//! form.set_value("color", "Rebecca Purple").unwrap();
//! assert!(!form.has_errors());
//!
//! let line = serialize(&form);
//! assert_eq!(
//!     line,
//!     "generate @nrwl/angular:library --name shell --no-addE2EProject --color 'Rebecca Purple'"
//! );
//!
//! let mut copy = FormModel::seed(form.schema().clone());
//! copy.apply_values(parse_invocation(form.schema(), &line).unwrap()).unwrap();
//! assert_eq!(copy.values(), form.values());
//! ```

mod form;
mod normalize;
mod parse;
mod raw;
mod reconcile;
mod serialize;
mod types;
mod validate;

pub use form::{FieldState, FormError, FormModel, Snapshot};
pub use normalize::{
    NormalizationError, NormalizationErrorKind, NormalizeOptions, normalize, normalize_with,
};
pub use parse::{ParseError, parse_invocation, split_command_line};
pub use raw::{RawItemSchema, RawItems, RawOption, RawSchema};
pub use reconcile::{ReconcileReport, reconcile, reconcile_with_report};
pub use serialize::{Argument, Invocation, invocation, quote, serialize, serialize_args};
pub use types::*;
pub use validate::{
    DependencyError, FieldValues, Resolution, ValidationError, resolve_field, validate_cross_field,
    validate_field,
};
