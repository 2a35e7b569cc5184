//! Parsing serialized invocations back into field values.
//!
//! [`split_command_line`] performs POSIX-style word splitting and
//! [`parse_invocation`] maps the resulting words onto a schema's options.
//! Applying the parsed values to a freshly seeded form reproduces the form
//! the invocation was serialized from.

use indexmap::IndexMap;
use thiserror::Error;

use crate::{
    ArrayStyle, GeneratorSchema, ItemKind, OptionDescriptor, OptionKind, OptionValue,
    split_list_literal,
};

/// Errors produced while parsing a command line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A quoted section is never closed.
    #[error("unterminated {0} quote")]
    UnterminatedQuote(char),
    /// The line ends with a lone backslash.
    #[error("dangling escape at end of input")]
    DanglingEscape,
    /// The leading command or template token does not match the schema.
    #[error("expected '{expected}', found '{found}'")]
    CommandMismatch { expected: String, found: String },
    /// A flag names no option of the schema.
    #[error("unknown option: {0}")]
    UnknownOption(String),
    /// A flag that takes a value is the last word.
    #[error("missing value for {0}")]
    MissingValue(String),
    /// A value does not parse as the option's kind.
    #[error("invalid value '{value}' for {option}")]
    InvalidValue { option: String, value: String },
    /// More positional words than positional options.
    #[error("unexpected positional argument: {0}")]
    UnexpectedPositional(String),
}

/// Splits a command line into words the way a POSIX shell would, without
/// any expansion.
///
/// # Examples
///
/// ```
/// use generator_form_core::split_command_line;
///
/// let words = split_command_line(r#"generate --color 'Rebecca Purple' -m "it's""#).unwrap();
/// assert_eq!(words, vec!["generate", "--color", "Rebecca Purple", "-m", "it's"]);
/// ```
pub fn split_command_line(line: &str) -> Result<Vec<String>, ParseError> {
    let mut words = Vec::new();
    let mut current: Option<String> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if let Some(word) = current.take() {
                    words.push(word);
                }
            }
            '\'' => {
                let word = current.get_or_insert_with(String::new);
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => word.push(c),
                        None => return Err(ParseError::UnterminatedQuote('\'')),
                    }
                }
            }
            '"' => {
                let word = current.get_or_insert_with(String::new);
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(escaped @ ('"' | '\\' | '$' | '`')) => word.push(escaped),
                            Some('\n') => {}
                            Some(other) => {
                                word.push('\\');
                                word.push(other);
                            }
                            None => return Err(ParseError::UnterminatedQuote('"')),
                        },
                        Some(c) => word.push(c),
                        None => return Err(ParseError::UnterminatedQuote('"')),
                    }
                }
            }
            '\\' => match chars.next() {
                Some('\n') => {}
                Some(escaped) => current.get_or_insert_with(String::new).push(escaped),
                None => return Err(ParseError::DanglingEscape),
            },
            other => current.get_or_insert_with(String::new).push(other),
        }
    }

    words.extend(current);
    Ok(words)
}

/// Parses a command line produced for `schema` into field values.
///
/// Recognizes the leading command and template, positional values, and
/// `--name`, `--name=value`, `--no-name`, `--alias value` and `-a value`
/// forms. The last occurrence of a scalar option wins; array items
/// accumulate, and `--name=` with nothing after the `=` sets an array to
/// the empty list. Words after `--` are always positional.
///
/// # Examples
///
/// ```
/// use generator_form_core::*;
///
/// let raw: RawSchema = serde_json::from_value(serde_json::json!({
///     "name": "library",
///     "command": "generate",
///     "options": [
///         { "name": "libraries", "type": "array", "aliases": ["l"] },
///         { "name": "addE2EProject", "type": "boolean", "default": true }
///     ]
/// }))
/// .unwrap();
/// let schema = normalize(&raw).unwrap();
///
/// let values = parse_invocation(&schema, "generate -l ui -l util --no-addE2EProject").unwrap();
/// assert_eq!(values["libraries"], OptionValue::from(vec!["ui", "util"]));
/// assert_eq!(values["addE2EProject"], OptionValue::Bool(false));
/// ```
pub fn parse_invocation(
    schema: &GeneratorSchema,
    line: &str,
) -> Result<IndexMap<String, OptionValue>, ParseError> {
    let words = split_command_line(line)?;
    let mut words = words.into_iter();

    let expected_prefix = schema
        .command
        .split_whitespace()
        .map(String::from)
        .chain(schema.positional.clone());
    for expected in expected_prefix {
        match words.next() {
            Some(found) if found == expected => {}
            found => {
                return Err(ParseError::CommandMismatch {
                    expected,
                    found: found.unwrap_or_default(),
                });
            }
        }
    }

    let positional = schema.positional_options();
    let mut next_positional = 0;
    let mut only_positionals = false;
    let mut values: IndexMap<String, OptionValue> = IndexMap::new();

    while let Some(word) = words.next() {
        if !only_positionals && word == "--" {
            only_positionals = true;
            continue;
        }

        let flag = if only_positionals { None } else { split_flag(&word) };
        let Some((token, inline)) = flag else {
            let Some(descriptor) = positional.get(next_positional) else {
                return Err(ParseError::UnexpectedPositional(word));
            };
            if matches!(descriptor.kind, OptionKind::ArrayOf(_)) {
                push_item(&mut values, descriptor, &word)?;
            } else {
                values.insert(descriptor.name.clone(), parse_scalar(descriptor, &word)?);
                next_positional += 1;
            }
            continue;
        };

        let descriptor = match schema.find_by_flag(token) {
            Some(descriptor) => descriptor,
            None => match token.strip_prefix("no-").and_then(|name| schema.option(name)) {
                Some(descriptor) if descriptor.kind == OptionKind::Boolean && inline.is_none() => {
                    values.insert(descriptor.name.clone(), OptionValue::Bool(false));
                    continue;
                }
                _ => return Err(ParseError::UnknownOption(word)),
            },
        };

        if descriptor.kind == OptionKind::Boolean {
            let value = match inline {
                Some(text) => parse_scalar(descriptor, text)?,
                None => OptionValue::Bool(true),
            };
            values.insert(descriptor.name.clone(), value);
            continue;
        }

        if let (OptionKind::ArrayOf(_), Some("")) = (&descriptor.kind, inline) {
            values.insert(descriptor.name.clone(), OptionValue::List(Vec::new()));
            continue;
        }

        let text = match inline {
            Some(text) => text.to_string(),
            None => words
                .next()
                .ok_or_else(|| ParseError::MissingValue(word.clone()))?,
        };

        match (&descriptor.kind, schema.array_style) {
            (OptionKind::ArrayOf(_), ArrayStyle::Repeated) => {
                push_item(&mut values, descriptor, &text)?;
            }
            (OptionKind::ArrayOf(_), ArrayStyle::CommaJoined) => {
                for item in split_list_literal(&text) {
                    push_item(&mut values, descriptor, &item)?;
                }
            }
            _ => {
                values.insert(descriptor.name.clone(), parse_scalar(descriptor, &text)?);
            }
        }
    }

    Ok(values)
}

/// Splits `--name=value`, `--name` and `-a` into the option token and an
/// optional inline value. Returns `None` for anything that is not a flag.
fn split_flag(word: &str) -> Option<(&str, Option<&str>)> {
    let body = match word.strip_prefix("--") {
        Some(body) => body,
        None => word
            .strip_prefix('-')
            .filter(|rest| !rest.is_empty() && !rest.starts_with(|c: char| c.is_ascii_digit()))?,
    };
    if body.is_empty() {
        return None;
    }
    Some(match body.split_once('=') {
        Some((token, value)) => (token, Some(value)),
        None => (body, None),
    })
}

fn parse_scalar(descriptor: &OptionDescriptor, text: &str) -> Result<OptionValue, ParseError> {
    descriptor
        .kind
        .scalar()
        .and_then(|item| item.parse_literal(text))
        .ok_or_else(|| invalid(descriptor, text))
}

fn push_item(
    values: &mut IndexMap<String, OptionValue>,
    descriptor: &OptionDescriptor,
    text: &str,
) -> Result<(), ParseError> {
    let item_kind = match &descriptor.kind {
        OptionKind::ArrayOf(item) => item,
        _ => &ItemKind::String,
    };
    let item = item_kind
        .parse_literal(text)
        .ok_or_else(|| invalid(descriptor, text))?;

    let entry = values
        .entry(descriptor.name.clone())
        .or_insert_with(|| OptionValue::List(Vec::new()));
    if let OptionValue::List(items) = entry {
        items.push(item);
    }
    Ok(())
}

fn invalid(descriptor: &OptionDescriptor, text: &str) -> ParseError {
    ParseError::InvalidValue {
        option: descriptor.name.clone(),
        value: text.to_string(),
    }
}
