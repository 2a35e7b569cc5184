//! Form sessions, configuration and editor integration for generator forms.
//!
//! This crate drives a [`generator_form_core::FormModel`] from the outside
//! world:
//!
//! - [`FormSession`] applies queued field edits and schema refreshes in
//!   arrival order, reconciling the form whenever the schema changes.
//! - [`FormConfig`] is the YAML configuration shared by the session and the
//!   editor listener.
//! - [`EditorListener`] connects a [`LanguageServiceConnector`] once per
//!   workspace when a recognized configuration file is opened.
//!
//! # Quick start
//!
//! ```no_run
//! use generator_form_session::{FormConfig, FormEvent, FormSession};
//!
//! let config = FormConfig::load("generator-form.yml").unwrap();
//! let mut session = FormSession::open("schema.json", &config).unwrap();
//!
//! session.submit(FormEvent::set("name", "shared"));
//! for outcome in session.drain() {
//!     outcome.unwrap();
//! }
//! println!("{}", session.command_line());
//! ```

mod config;
mod error;
mod listener;
mod session;

pub use config::{DEFAULT_WATCHED_FILES, FormConfig};
pub use error::{Result, SessionError};
pub use listener::{EditorListener, LanguageServiceConnector};
pub use session::{Applied, FormEvent, FormSession, fingerprint, load_raw_schema};
