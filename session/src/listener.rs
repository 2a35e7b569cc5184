//! Editor integration: connecting a language service per workspace.
//!
//! The language service itself lives outside this crate. The only contract
//! is that opening a recognized configuration file acquires one handle per
//! workspace, and that opening further files in a connected workspace does
//! nothing.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::FormConfig;
use crate::error::{Result, SessionError};

/// Acquires language-service handles for workspaces.
pub trait LanguageServiceConnector {
    /// Live connection kept for as long as the listener lives.
    type Handle;
    /// Connection failure.
    type Error: fmt::Display;

    /// Connects the language service for `workspace`.
    fn connect(&mut self, workspace: &Path) -> std::result::Result<Self::Handle, Self::Error>;
}

/// Reacts to files opened in an editor.
///
/// # Examples
///
/// ```
/// use std::convert::Infallible;
/// use std::path::Path;
///
/// use generator_form_session::{EditorListener, FormConfig, LanguageServiceConnector};
///
/// struct Counter(u32);
///
/// impl LanguageServiceConnector for Counter {
///     type Handle = u32;
///     type Error = Infallible;
///
///     fn connect(&mut self, _workspace: &Path) -> Result<u32, Infallible> {
///         self.0 += 1;
///         Ok(self.0)
///     }
/// }
///
/// let mut listener = EditorListener::new(&FormConfig::default(), Counter(0));
/// assert!(listener.editor_opened("/ws", "/ws/nx.json").unwrap());
/// assert!(!listener.editor_opened("/ws", "/ws/apps/web/project.json").unwrap());
/// assert!(!listener.editor_opened("/other", "/other/README.md").unwrap());
/// assert_eq!(listener.handle("/ws"), Some(&1));
/// ```
pub struct EditorListener<C: LanguageServiceConnector> {
    recognized: BTreeSet<String>,
    connector: C,
    handles: HashMap<PathBuf, C::Handle>,
}

impl<C: LanguageServiceConnector> EditorListener<C> {
    /// Builds a listener recognizing the configured watched files.
    pub fn new(config: &FormConfig, connector: C) -> Self {
        Self::with_files(config.watched_files.iter().cloned(), connector)
    }

    /// Builds a listener recognizing exactly `files`.
    pub fn with_files<I, S>(files: I, connector: C) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            recognized: files.into_iter().map(Into::into).collect(),
            connector,
            handles: HashMap::new(),
        }
    }

    /// Returns `true` if the file name of `file` is recognized.
    pub fn is_recognized(&self, file: impl AsRef<Path>) -> bool {
        file.as_ref()
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| self.recognized.contains(n))
    }

    /// Handles a file being opened in `workspace`.
    ///
    /// Returns `true` when this call connected the workspace. Unrecognized
    /// files and already-connected workspaces return `false`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Connect`] if the connector fails; the
    /// workspace stays unconnected so a later open can retry.
    pub fn editor_opened(
        &mut self,
        workspace: impl AsRef<Path>,
        file: impl AsRef<Path>,
    ) -> Result<bool> {
        let workspace = workspace.as_ref();
        if !self.is_recognized(file.as_ref()) {
            return Ok(false);
        }
        if self.handles.contains_key(workspace) {
            debug!(workspace = %workspace.display(), "Language service already connected");
            return Ok(false);
        }

        let handle = self
            .connector
            .connect(workspace)
            .map_err(|err| SessionError::Connect {
                workspace: workspace.display().to_string(),
                reason: err.to_string(),
            })?;
        info!(
            workspace = %workspace.display(),
            file = %file.as_ref().display(),
            "Connected language service"
        );
        self.handles.insert(workspace.to_path_buf(), handle);
        Ok(true)
    }

    /// Handles a file being closed. Connections outlive the files that
    /// opened them.
    pub fn editor_released(&mut self, _workspace: impl AsRef<Path>, _file: impl AsRef<Path>) {}

    /// Handle for a connected workspace.
    pub fn handle(&self, workspace: impl AsRef<Path>) -> Option<&C::Handle> {
        self.handles.get(workspace.as_ref())
    }

    /// Number of connected workspaces.
    pub fn connected(&self) -> usize {
        self.handles.len()
    }

    /// The underlying connector.
    pub fn connector(&self) -> &C {
        &self.connector
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Flaky {
        attempts: u32,
    }

    impl LanguageServiceConnector for Flaky {
        type Handle = u32;
        type Error = String;

        fn connect(&mut self, _workspace: &Path) -> std::result::Result<u32, String> {
            self.attempts += 1;
            if self.attempts == 1 {
                Err("server not ready".into())
            } else {
                Ok(self.attempts)
            }
        }
    }

    #[test]
    fn test_recognizes_by_file_name_only() {
        let listener = EditorListener::new(&FormConfig::default(), Flaky::default());
        assert!(listener.is_recognized("/ws/nx.json"));
        assert!(listener.is_recognized("workspace.json"));
        assert!(!listener.is_recognized("/ws/nx.json.bak"));
        assert!(!listener.is_recognized("/ws/project.yaml"));
    }

    #[test]
    fn test_failed_connection_can_be_retried() {
        let mut listener = EditorListener::with_files(["angular.json"], Flaky::default());

        let err = listener.editor_opened("/ws", "/ws/angular.json").unwrap_err();
        assert!(err.to_string().contains("server not ready"));
        assert!(listener.handle("/ws").is_none());

        assert!(listener.editor_opened("/ws", "/ws/angular.json").unwrap());
        assert_eq!(listener.handle("/ws"), Some(&2));
        assert_eq!(listener.connector().attempts, 2);
    }

    #[test]
    fn test_release_keeps_connection() {
        let mut listener = EditorListener::with_files(["nx.json"], Flaky { attempts: 1 });
        assert!(listener.editor_opened("/ws", "/ws/nx.json").unwrap());
        listener.editor_released("/ws", "/ws/nx.json");
        assert!(!listener.editor_opened("/ws", "/ws/nx.json").unwrap());
        assert_eq!(listener.connected(), 1);
    }
}
