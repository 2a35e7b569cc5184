//! Canonical command-line serialization of a form.
//!
//! The invocation is derived on demand and never stored. Arguments follow
//! declaration order, values equal to the field's initial value are omitted,
//! and every token is quoted minimally so a POSIX shell splits it back
//! exactly. Positional values starting with `-` move behind a `--`
//! separator after the flags.
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
//!         { "name": "libraries", "type": "array", "aliases": ["l"],
//!           "items": { "type": "string",
//!             "enum": ["data-access", "feature", "shell", "ui", "util"] },
//!           "default": ["data-access", "feature"] },
//!         { "name": "style", "items": ["css", "scss", "less"], "default": "scss",
//!           "aliases": ["s"] }
//!     ]
//! }))
//! .unwrap();
//! let mut form = FormModel::seed(normalize(&raw).unwrap());
//! form.set_value("libraries", vec!["ui"]).unwrap();
//!
//! assert_eq!(serialize(&form), "generate @nrwl/angular:library -l ui");
//! ```

use std::borrow::Cow;
use std::fmt;

use crate::{ArrayStyle, FormModel, OptionDescriptor, OptionKind, OptionValue, join_list_literal};

/// One emitted option: a flag and, unless it is a bare boolean flag, its
/// literal value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub flag: String,
    pub value: Option<String>,
}

impl Argument {
    fn bare(flag: String) -> Self {
        Self { flag, value: None }
    }

    fn with_value(flag: String, value: String) -> Self {
        Self {
            flag,
            value: Some(value),
        }
    }

    /// `--name=`: an explicitly emptied list.
    fn empty_list(name: &str) -> Self {
        Self::bare(format!("--{name}="))
    }
}

/// Derived command-line representation of a form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Invocation {
    /// Leading command words.
    pub command: Vec<String>,
    /// Positional template token.
    pub template: Option<String>,
    /// Values of positional options, in position order.
    pub positionals: Vec<String>,
    /// Flag arguments, in declaration order.
    pub arguments: Vec<Argument>,
}

impl Invocation {
    /// Unquoted argument vector.
    ///
    /// Positionals precede the flags unless one of them looks like a flag,
    /// in which case they follow a `--` separator.
    pub fn to_args(&self) -> Vec<String> {
        let separated = self.needs_separator();
        let mut args = self.command.clone();
        args.extend(self.template.iter().cloned());
        if !separated {
            args.extend(self.positionals.iter().cloned());
        }
        for argument in &self.arguments {
            args.push(argument.flag.clone());
            args.extend(argument.value.iter().cloned());
        }
        if separated {
            args.push("--".to_string());
            args.extend(self.positionals.iter().cloned());
        }
        args
    }

    fn needs_separator(&self) -> bool {
        self.positionals.iter().any(|p| p.starts_with('-'))
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.to_args().iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(&quote(arg))?;
        }
        Ok(())
    }
}

/// Builds the invocation for the form's current values.
///
/// Hidden and invisible fields are skipped. Validity is not checked; callers
/// should consult [`FormModel::has_errors`] before executing the result.
pub fn invocation(form: &FormModel) -> Invocation {
    let schema = form.schema();
    let snapshot = form.snapshot();

    let mut positionals = Vec::new();
    for descriptor in schema.positional_options() {
        let Some(state) = snapshot.get(&descriptor.name) else {
            continue;
        };
        if descriptor.hidden || !state.visible {
            continue;
        }
        match &state.value {
            Some(OptionValue::List(items)) => {
                positionals.extend(items.iter().map(OptionValue::literal));
            }
            Some(value) => positionals.push(value.literal()),
            None => {}
        }
    }

    let mut arguments = Vec::new();
    for (descriptor, state) in snapshot.iter() {
        if descriptor.hidden || !state.visible {
            continue;
        }
        let Some(value) = &state.value else {
            continue;
        };
        // An emptied positional list has no positional spelling.
        if descriptor.positional.is_some() && !is_empty_list(value) {
            continue;
        }
        arguments.extend(arguments_for(descriptor, value, schema.array_style));
    }

    Invocation {
        command: schema.command.split_whitespace().map(String::from).collect(),
        template: schema.positional.clone(),
        positionals,
        arguments,
    }
}

/// Unquoted argument vector for the form's current values.
pub fn serialize_args(form: &FormModel) -> Vec<String> {
    invocation(form).to_args()
}

/// Shell-quoted command line for the form's current values.
pub fn serialize(form: &FormModel) -> String {
    invocation(form).to_string()
}

fn arguments_for(
    descriptor: &OptionDescriptor,
    value: &OptionValue,
    style: ArrayStyle,
) -> Vec<Argument> {
    if descriptor.initial_value().as_ref() == Some(value) {
        return Vec::new();
    }

    let flag = descriptor.preferred_flag();
    match (&descriptor.kind, value) {
        (OptionKind::Boolean, OptionValue::Bool(true)) => vec![Argument::bare(flag)],
        // Only reachable when the initial value is `true`.
        (OptionKind::Boolean, OptionValue::Bool(false)) => {
            vec![Argument::bare(descriptor.negated_flag())]
        }
        (OptionKind::ArrayOf(_), OptionValue::List(items)) if items.is_empty() => {
            vec![Argument::empty_list(&descriptor.name)]
        }
        (OptionKind::ArrayOf(_), OptionValue::List(items)) => match style {
            ArrayStyle::Repeated => items
                .iter()
                .map(|item| Argument::with_value(flag.clone(), item.literal()))
                .collect(),
            ArrayStyle::CommaJoined => {
                vec![Argument::with_value(flag, join_list_literal(items))]
            }
        },
        (_, value) => vec![Argument::with_value(flag, value.literal())],
    }
}

fn is_empty_list(value: &OptionValue) -> bool {
    matches!(value, OptionValue::List(items) if items.is_empty())
}

/// Quotes a token for a POSIX shell, using the least quoting that keeps it a
/// single word with the same content.
///
/// # Examples
///
/// ```
/// use generator_form_core::quote;
///
/// assert_eq!(quote("scss"), "scss");
/// assert_eq!(quote("Rebecca Purple"), "'Rebecca Purple'");
/// assert_eq!(quote("it's"), "\"it's\"");
/// assert_eq!(quote(""), "''");
/// ```
pub fn quote(token: &str) -> Cow<'_, str> {
    if token.is_empty() {
        return Cow::Borrowed("''");
    }
    if token.chars().all(is_shell_safe) {
        return Cow::Borrowed(token);
    }
    if !token.contains('\'') {
        return Cow::Owned(format!("'{token}'"));
    }

    let mut quoted = String::with_capacity(token.len() + 2);
    quoted.push('"');
    for c in token.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Cow::Owned(quoted)
}

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '-' | '_' | '.' | '/' | ':' | '@' | '%' | '+' | '=' | ',')
}
