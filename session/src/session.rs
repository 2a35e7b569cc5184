//! Event-driven form sessions.
//!
//! A [`FormSession`] owns one [`FormModel`] and applies field edits and
//! schema refreshes strictly in arrival order. A refresh is normalized and
//! reconciled to completion before the next event is looked at, so edits
//! never interleave with a partially reconciled form.

use std::collections::VecDeque;
use std::io::BufReader;
use std::path::Path;

use generator_form_core::{
    FormModel, NormalizeOptions, OptionValue, RawSchema, ReconcileReport, normalize_with,
    parse_invocation, reconcile_with_report, serialize,
};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::FormConfig;
use crate::error::{Result, SessionError};

/// Input event for a [`FormSession`].
#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    /// Store a value for a field.
    SetValue { name: String, value: OptionValue },
    /// Unset a field.
    ClearValue { name: String },
    /// Return a field to its seeded value.
    Reset { name: String },
    /// The generator's schema document changed.
    SchemaRefresh(RawSchema),
}

impl FormEvent {
    /// Convenience constructor for [`FormEvent::SetValue`].
    pub fn set(name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        Self::SetValue {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Outcome of one applied event.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// A field edit was stored.
    Edited(String),
    /// The form was reconciled onto a new schema.
    Refreshed(ReconcileReport),
    /// The refreshed schema is identical to the current one.
    Unchanged,
}

/// A live form plus the queue of events still to be applied to it.
#[derive(Debug)]
pub struct FormSession {
    form: FormModel,
    fingerprint: String,
    options: NormalizeOptions,
    queue: VecDeque<FormEvent>,
}

impl FormSession {
    /// Normalizes `raw` with default settings and seeds a session.
    pub fn new(raw: &RawSchema) -> Result<Self> {
        Self::with_config(raw, &FormConfig::default())
    }

    /// Normalizes `raw` with settings from `config` and seeds a session.
    pub fn with_config(raw: &RawSchema, config: &FormConfig) -> Result<Self> {
        let options = config.normalize_options();
        let schema = normalize_with(raw, &options)?;
        debug!(generator = %schema.name, options = schema.len(), "Seeded form session");
        Ok(Self {
            form: FormModel::seed(schema),
            fingerprint: fingerprint(raw)?,
            options,
            queue: VecDeque::new(),
        })
    }

    /// Loads a schema document from disk and seeds a session.
    pub fn open(path: impl AsRef<Path>, config: &FormConfig) -> Result<Self> {
        let raw = load_raw_schema(path)?;
        Self::with_config(&raw, config)
    }

    /// The current form.
    pub fn form(&self) -> &FormModel {
        &self.form
    }

    /// SHA-256 fingerprint of the schema document behind the current form.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Number of queued events.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Queues an event; nothing changes until [`drain`](Self::drain).
    pub fn submit(&mut self, event: FormEvent) {
        self.queue.push_back(event);
    }

    /// Applies all queued events in arrival order.
    ///
    /// A failing event does not stop the queue; each outcome is returned in
    /// the same order the events were submitted.
    pub fn drain(&mut self) -> Vec<Result<Applied>> {
        let mut outcomes = Vec::with_capacity(self.queue.len());
        while let Some(event) = self.queue.pop_front() {
            outcomes.push(self.apply(event));
        }
        outcomes
    }

    /// Applies one event immediately.
    ///
    /// # Errors
    ///
    /// Edits to undeclared fields return [`SessionError::Form`]. A refresh
    /// whose schema fails normalization returns
    /// [`SessionError::Normalization`] and leaves the form untouched.
    pub fn apply(&mut self, event: FormEvent) -> Result<Applied> {
        match event {
            FormEvent::SetValue { name, value } => {
                self.form.set_value(&name, value)?;
                Ok(Applied::Edited(name))
            }
            FormEvent::ClearValue { name } => {
                self.form.clear_value(&name)?;
                Ok(Applied::Edited(name))
            }
            FormEvent::Reset { name } => {
                self.form.reset(&name)?;
                Ok(Applied::Edited(name))
            }
            FormEvent::SchemaRefresh(raw) => self.refresh(&raw),
        }
    }

    /// Applies every value parsed from `line` to the form.
    ///
    /// Nothing is applied if the line does not parse.
    pub fn apply_command_line(&mut self, line: &str) -> Result<()> {
        let values = parse_invocation(self.form.schema(), line)?;
        self.form.apply_values(values)?;
        Ok(())
    }

    /// The current command line.
    pub fn command_line(&self) -> String {
        serialize(&self.form)
    }

    fn refresh(&mut self, raw: &RawSchema) -> Result<Applied> {
        let fingerprint = fingerprint(raw)?;
        if fingerprint == self.fingerprint {
            debug!(generator = %raw.name, "Schema unchanged; skipping refresh");
            return Ok(Applied::Unchanged);
        }

        let schema = normalize_with(raw, &self.options).inspect_err(|err| {
            warn!(generator = %raw.name, error = %err, "Rejected schema refresh");
        })?;
        let (form, report) = reconcile_with_report(&self.form, schema);
        self.form = form;
        self.fingerprint = fingerprint;
        Ok(Applied::Refreshed(report))
    }
}

/// SHA-256 of the canonical JSON encoding of a schema document, as
/// lowercase hex.
///
/// # Examples
///
/// ```
/// use generator_form_core::RawSchema;
/// use generator_form_session::fingerprint;
///
/// let raw = RawSchema { name: "library".into(), ..RawSchema::default() };
/// let hash = fingerprint(&raw).unwrap();
/// assert_eq!(hash.len(), 64);
/// assert_eq!(hash, fingerprint(&raw.clone()).unwrap());
/// ```
pub fn fingerprint(raw: &RawSchema) -> Result<String> {
    let bytes = serde_json::to_vec(raw)?;
    let hash = Sha256::digest(&bytes);
    Ok(format!("{:x}", hash))
}

/// Reads a schema document, choosing JSON or YAML by file extension.
///
/// # Errors
///
/// Returns [`SessionError::UnsupportedFormat`] for other extensions.
pub fn load_raw_schema(path: impl AsRef<Path>) -> Result<RawSchema> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let reader = BufReader::new(std::fs::File::open(path)?);
    let raw = match extension.as_str() {
        "json" => serde_json::from_reader(reader)?,
        "yaml" | "yml" => serde_yaml::from_reader(reader)?,
        _ => return Err(SessionError::UnsupportedFormat(path.display().to_string())),
    };
    debug!(path = %path.display(), "Loaded schema document");
    Ok(raw)
}
