use std::path::Path;

use generator_form_core::{ArrayStyle, OptionValue, RawSchema};
use generator_form_session::{
    Applied, FormConfig, FormEvent, FormSession, SessionError, load_raw_schema,
};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const LIBRARY_YAML: &str = r#"
name: library
command: nx generate
positional: "@nrwl/angular:library"
options:
  - name: name
    positional: 0
    isRequired: true
  - name: libraries
    type: array
    aliases: [l]
    default: [data-access, feature]
    items:
      type: string
      enum: [data-access, feature, shell, ui, util]
  - name: style
    items: [css, scss, less]
    default: scss
  - name: addE2EProject
    type: boolean
    default: true
"#;

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn library_raw() -> RawSchema {
    serde_yaml::from_str(LIBRARY_YAML).unwrap()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[test]
fn test_yaml_and_json_documents_load_identically() {
    let dir = TempDir::new().unwrap();
    let yaml_path = write(dir.path(), "schema.yaml", LIBRARY_YAML);
    let json_path = write(
        dir.path(),
        "schema.json",
        &serde_json::to_string_pretty(&library_raw()).unwrap(),
    );

    let from_yaml = load_raw_schema(&yaml_path).unwrap();
    let from_json = load_raw_schema(&json_path).unwrap();
    assert_eq!(from_yaml, from_json);
}

#[test]
fn test_unknown_extension_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "schema.toml", "name = 'library'");
    let err = load_raw_schema(&path).unwrap_err();
    assert!(matches!(err, SessionError::UnsupportedFormat(_)));
}

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("generator-form.yml");

    let config = FormConfig {
        watched_files: vec!["angular.json".into()],
        array_style: ArrayStyle::CommaJoined,
        ..FormConfig::default()
    };
    config.save(&path).unwrap();

    let loaded = FormConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_config_array_style_applies_to_opened_schema() {
    let dir = TempDir::new().unwrap();
    let schema_path = write(dir.path(), "schema.yaml", LIBRARY_YAML);
    let config = FormConfig {
        array_style: ArrayStyle::CommaJoined,
        ..FormConfig::default()
    };

    let mut session = FormSession::open(&schema_path, &config).unwrap();
    session
        .apply(FormEvent::set("libraries", vec!["ui", "util"]))
        .unwrap();
    assert!(session.command_line().ends_with("-l ui,util"));
}

// ---------------------------------------------------------------------------
// Session flow
// ---------------------------------------------------------------------------

#[test]
fn test_edits_then_refresh_preserve_user_values() {
    let mut session = FormSession::new(&library_raw()).unwrap();
    session.submit(FormEvent::set("name", "shared"));
    session.submit(FormEvent::set("libraries", vec!["ui"]));
    session.submit(FormEvent::set("addE2EProject", false));

    let mut refreshed = library_raw();
    refreshed.options.retain(|o| o.name != "style");
    refreshed.description = Some("Create a library".into());
    session.submit(FormEvent::SchemaRefresh(refreshed));
    session.submit(FormEvent::Reset {
        name: "addE2EProject".into(),
    });

    let outcomes = session.drain();
    assert_eq!(outcomes.len(), 5);
    match &outcomes[3] {
        Ok(Applied::Refreshed(report)) => {
            assert_eq!(report.carried, vec!["name", "libraries", "addE2EProject"]);
            assert_eq!(report.dropped, vec!["style"]);
        }
        other => panic!("expected a refresh, got {other:?}"),
    }
    assert!(outcomes[4].is_ok());

    assert_eq!(
        session.command_line(),
        "nx generate @nrwl/angular:library shared -l ui"
    );
}

#[test]
fn test_command_line_is_applied_to_form() {
    let mut session = FormSession::new(&library_raw()).unwrap();
    session
        .apply_command_line("nx generate @nrwl/angular:library shared -l shell --style css")
        .unwrap();

    let form = session.form();
    assert_eq!(form.value("name"), Some(&OptionValue::from("shared")));
    assert_eq!(form.value("libraries"), Some(&OptionValue::from(vec!["shell"])));
    assert_eq!(form.value("style"), Some(&OptionValue::from("css")));
    assert!(!form.has_errors());
}

#[test]
fn test_bad_command_line_changes_nothing() {
    let mut session = FormSession::new(&library_raw()).unwrap();
    let err = session
        .apply_command_line("nx generate @nrwl/angular:library shared --unknown x")
        .unwrap_err();

    assert!(matches!(err, SessionError::Parse(_)));
    assert!(session.form().value("name").is_none());
    assert!(!session.form().is_dirty());
}
