//! Schema normalization.
//!
//! Turns an untrusted [`RawSchema`] into a [`GeneratorSchema`]: resolves each
//! option's type tag into an [`OptionKind`], type-checks defaults, rejects
//! duplicate names and aliases, and builds the predicate dependency graph,
//! rejecting cycles. Normalization is all-or-nothing and stops at the first
//! violation.
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
//!         { "name": "style", "default": "scss", "items": ["css", "scss", "less"] },
//!         { "name": "style", "type": "boolean" }
//!     ]
//! }))
//! .unwrap();
//!
//! let err = normalize(&raw).unwrap_err();
//! assert_eq!(err.kind, NormalizationErrorKind::DuplicateName);
//! assert_eq!(err.option, "style");
//! ```

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::debug;

use crate::raw::{RawItems, RawOption, RawSchema};
use crate::types::SchemaHeader;
use crate::{ArrayStyle, GeneratorSchema, ItemKind, OptionDescriptor, OptionKind, OptionValue};

/// What went wrong during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NormalizationErrorKind {
    /// The schema declares no command.
    #[error("schema command cannot be empty")]
    EmptyCommand,
    /// An option has an empty name.
    #[error("option name cannot be empty")]
    EmptyName,
    /// Two options share a name.
    #[error("duplicate option name")]
    DuplicateName,
    /// An alias is used twice, or collides with another option's name.
    #[error("duplicate alias")]
    DuplicateAlias,
    /// The type tag is not one the engine understands.
    #[error("unsupported option type")]
    UnsupportedType,
    /// The default does not type-check against the option's kind.
    #[error("default does not match the option type")]
    InvalidDefault,
    /// An enum (or array of enums) declares no choices.
    #[error("enum declares no choices")]
    EmptyEnum,
    /// An array's items are themselves arrays.
    #[error("arrays of arrays are not supported")]
    NestedArray,
    /// Two options claim the same positional index.
    #[error("duplicate positional index")]
    DuplicatePositional,
    /// An array positional is followed by another positional, which it
    /// would swallow.
    #[error("array positional must come last")]
    PositionalArrayNotLast,
    /// `visibleWhen`/`requiredWhen` predicates form a cycle.
    #[error("dependency cycle between option predicates")]
    DependencyCycle,
}

/// Fatal schema load failure.
///
/// `option` names the offending option (or the schema name for
/// schema-level failures).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {option}")]
pub struct NormalizationError {
    pub kind: NormalizationErrorKind,
    pub option: String,
}

impl NormalizationError {
    fn new(kind: NormalizationErrorKind, option: impl Into<String>) -> Self {
        Self {
            kind,
            option: option.into(),
        }
    }
}

/// Normalizer settings not carried by the schema document itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NormalizeOptions {
    /// Array style for schemas that do not declare one.
    pub array_style: ArrayStyle,
}

/// Normalizes a raw schema with default [`NormalizeOptions`].
pub fn normalize(raw: &RawSchema) -> Result<GeneratorSchema, NormalizationError> {
    normalize_with(raw, &NormalizeOptions::default())
}

/// Normalizes a raw schema.
///
/// # Errors
///
/// Returns the first [`NormalizationError`] encountered; no partial schema
/// is ever produced.
pub fn normalize_with(
    raw: &RawSchema,
    options: &NormalizeOptions,
) -> Result<GeneratorSchema, NormalizationError> {
    use NormalizationErrorKind as Kind;

    let command = raw.command.trim();
    if command.is_empty() {
        return Err(NormalizationError::new(Kind::EmptyCommand, raw.name.clone()));
    }

    let mut names: HashSet<&str> = HashSet::new();
    for (i, option) in raw.options.iter().enumerate() {
        let name = option.name.trim();
        if name.is_empty() {
            return Err(NormalizationError::new(Kind::EmptyName, format!("#{i}")));
        }
        if !names.insert(name) {
            return Err(NormalizationError::new(Kind::DuplicateName, name));
        }
    }

    let mut seen_aliases: HashSet<String> = HashSet::new();
    let mut seen_positions: HashSet<usize> = HashSet::new();
    let mut descriptors = Vec::with_capacity(raw.options.len());

    for option in &raw.options {
        let name = option.name.trim();
        let fail = |kind| NormalizationError::new(kind, name);

        let kind = resolve_kind(option).map_err(fail)?;
        let default = match &option.default {
            None | Some(serde_json::Value::Null) => None,
            Some(json) => {
                Some(coerce_default(&kind, json).ok_or_else(|| fail(Kind::InvalidDefault))?)
            }
        };

        let mut aliases = Vec::with_capacity(option.aliases.len());
        for alias in &option.aliases {
            let alias = alias.trim().trim_start_matches('-');
            if alias.is_empty() {
                continue;
            }
            if names.contains(alias) || !seen_aliases.insert(alias.to_string()) {
                return Err(fail(Kind::DuplicateAlias));
            }
            aliases.push(alias.to_string());
        }

        if let Some(position) = option.positional {
            if !seen_positions.insert(position) {
                return Err(fail(Kind::DuplicatePositional));
            }
        }

        descriptors.push(OptionDescriptor {
            name: name.to_string(),
            kind,
            default,
            required: option.is_required,
            hidden: option.hidden,
            aliases,
            description: option.description.clone(),
            tooltip: option.tooltip.clone(),
            item_tooltips: option.item_tooltips.clone(),
            positional: option.positional,
            visible_when: option.visible_when.clone(),
            required_when: option.required_when.clone(),
        });
    }

    if let Some(last) = descriptors.iter().filter_map(|d| d.positional).max() {
        let swallowing = descriptors.iter().find(|d| {
            matches!(d.kind, OptionKind::ArrayOf(_)) && d.positional.is_some_and(|p| p != last)
        });
        if let Some(array) = swallowing {
            return Err(NormalizationError::new(
                Kind::PositionalArrayNotLast,
                array.name.clone(),
            ));
        }
    }

    let graph = DependencyGraph::build(&descriptors);
    let order = graph.resolution_order().map_err(|i| {
        NormalizationError::new(Kind::DependencyCycle, descriptors[i].name.clone())
    })?;
    let dependents = graph.transitive_dependents(&order);

    let header = SchemaHeader {
        name: raw.name.trim().to_string(),
        command: command.to_string(),
        positional: raw
            .positional
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from),
        description: raw.description.clone(),
        array_style: raw.array_style.unwrap_or(options.array_style),
    };

    debug!(
        schema = %header.name,
        options = descriptors.len(),
        array_style = ?header.array_style,
        "Normalized generator schema"
    );

    Ok(GeneratorSchema::from_parts(header, descriptors, order, dependents))
}

fn resolve_kind(option: &RawOption) -> Result<OptionKind, NormalizationErrorKind> {
    let type_tag = option.type_.as_deref().map(|t| t.trim().to_ascii_lowercase());

    match type_tag.as_deref() {
        Some("boolean") => Ok(OptionKind::Boolean),
        Some("number" | "integer") => Ok(OptionKind::Number),
        Some("array") => resolve_item_kind(option).map(OptionKind::ArrayOf),
        Some("string" | "enum") | None => {
            let choices = match (&option.enum_, &option.items) {
                (Some(values), _) => Some(choice_list(values)),
                (None, Some(RawItems::Choices(values))) => Some(choice_list(values)),
                (None, Some(RawItems::Schema(schema))) => schema.enum_.as_deref().map(choice_list),
                (None, None) => None,
            };
            match choices {
                Some(choices) if choices.is_empty() => Err(NormalizationErrorKind::EmptyEnum),
                Some(choices) => Ok(OptionKind::Enum(choices)),
                None if type_tag.as_deref() == Some("enum") => {
                    Err(NormalizationErrorKind::EmptyEnum)
                }
                None => Ok(OptionKind::String),
            }
        }
        Some(_) => Err(NormalizationErrorKind::UnsupportedType),
    }
}

fn resolve_item_kind(option: &RawOption) -> Result<ItemKind, NormalizationErrorKind> {
    let (type_tag, choices) = match &option.items {
        Some(RawItems::Choices(values)) => (None, Some(choice_list(values))),
        Some(RawItems::Schema(schema)) => (
            schema.type_.as_deref().map(|t| t.trim().to_ascii_lowercase()),
            schema.enum_.as_deref().map(choice_list),
        ),
        None => (None, None),
    };
    let choices = choices.or_else(|| option.enum_.as_deref().map(choice_list));

    match type_tag.as_deref() {
        Some("array") => Err(NormalizationErrorKind::NestedArray),
        Some("boolean") => Ok(ItemKind::Boolean),
        Some("number" | "integer") => Ok(ItemKind::Number),
        Some("string" | "enum") | None => match choices {
            Some(choices) if choices.is_empty() => Err(NormalizationErrorKind::EmptyEnum),
            Some(choices) => Ok(ItemKind::Enum(choices)),
            None if type_tag.as_deref() == Some("enum") => Err(NormalizationErrorKind::EmptyEnum),
            None => Ok(ItemKind::String),
        },
        Some(_) => Err(NormalizationErrorKind::UnsupportedType),
    }
}

/// Choice literals in declaration order, duplicates removed.
fn choice_list(values: &[serde_json::Value]) -> Vec<String> {
    let mut choices: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let literal = choice_literal(value);
        if !choices.contains(&literal) {
            choices.push(literal);
        }
    }
    choices
}

fn choice_literal(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Converts a JSON default into a value admitted by `kind`.
fn coerce_default(kind: &OptionKind, json: &serde_json::Value) -> Option<OptionValue> {
    let value = match (kind, json) {
        (OptionKind::Enum(_), scalar) if !scalar.is_array() => {
            OptionValue::String(choice_literal(scalar))
        }
        (OptionKind::ArrayOf(ItemKind::Enum(_)), serde_json::Value::Array(items)) => {
            OptionValue::List(
                items
                    .iter()
                    .map(|v| OptionValue::String(choice_literal(v)))
                    .collect(),
            )
        }
        _ => OptionValue::from_json(json)?,
    };
    kind.admits(&value).then_some(value)
}

/// Predicate dependency graph over option indices.
struct DependencyGraph {
    /// `deps[i]`: options referenced by option `i`'s predicates.
    deps: Vec<Vec<usize>>,
}

impl DependencyGraph {
    fn build(descriptors: &[OptionDescriptor]) -> Self {
        let index: HashMap<&str, usize> = descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| (d.name.as_str(), i))
            .collect();

        let deps = descriptors
            .iter()
            .map(|d| {
                let mut refs: Vec<usize> = Vec::new();
                for predicate in d.visible_when.iter().chain(d.required_when.iter()) {
                    // Unknown references are reported per field during validation.
                    for target in predicate.references().into_iter().filter_map(|r| index.get(r)) {
                        if !refs.contains(target) {
                            refs.push(*target);
                        }
                    }
                }
                refs
            })
            .collect();

        Self { deps }
    }

    /// Depth-first topological order, dependencies first. Returns the index
    /// of an option on a cycle if one exists.
    ///
    /// Uses an explicit stack so predicate chains of any length resolve.
    fn resolution_order(&self) -> Result<Vec<usize>, usize> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        let mut marks = vec![Mark::Unvisited; self.deps.len()];
        let mut order = Vec::with_capacity(self.deps.len());
        // (node, index of the next dependency to visit)
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for root in 0..self.deps.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            marks[root] = Mark::InProgress;
            stack.push((root, 0));

            while let Some(frame) = stack.last_mut() {
                let (node, next) = *frame;
                frame.1 += 1;
                match self.deps[node].get(next) {
                    Some(&dep) => match marks[dep] {
                        Mark::Done => {}
                        Mark::InProgress => return Err(dep),
                        Mark::Unvisited => {
                            marks[dep] = Mark::InProgress;
                            stack.push((dep, 0));
                        }
                    },
                    None => {
                        stack.pop();
                        marks[node] = Mark::Done;
                        order.push(node);
                    }
                }
            }
        }
        Ok(order)
    }

    /// For every option, the options that transitively depend on it, sorted
    /// by position in `order`.
    fn transitive_dependents(&self, order: &[usize]) -> Vec<Vec<usize>> {
        let n = self.deps.len();
        let mut reverse: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (node, deps) in self.deps.iter().enumerate() {
            for &dep in deps {
                reverse[dep].push(node);
            }
        }

        let mut rank = vec![0usize; n];
        for (position, &node) in order.iter().enumerate() {
            rank[node] = position;
        }

        (0..n)
            .map(|start| {
                let mut seen = vec![false; n];
                let mut stack = reverse[start].clone();
                let mut found = Vec::new();
                while let Some(node) = stack.pop() {
                    if seen[node] {
                        continue;
                    }
                    seen[node] = true;
                    found.push(node);
                    stack.extend(reverse[node].iter().copied());
                }
                found.sort_by_key(|&node| rank[node]);
                found
            })
            .collect()
    }
}
