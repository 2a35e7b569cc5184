use std::fs;
use std::path::PathBuf;
use std::process::Output;

/// Helper to create a temp directory that is cleaned up on drop.
struct TempDir {
    path: PathBuf,
}

impl TempDir {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir()
            .join(format!("generator_form_cli_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&path);
        fs::create_dir_all(&path).expect("failed to create temp dir");
        Self { path }
    }

    fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Library generator schema used across the tests.
fn write_library_schema(dir: &TempDir) -> PathBuf {
    let json = serde_json::json!({
        "name": "library",
        "command": "generate",
        "positional": "@nrwl/angular:library",
        "options": [
            { "name": "name", "positional": 0, "isRequired": true },
            { "name": "libraries", "type": "array", "aliases": ["l"],
              "default": ["data-access", "feature"],
              "items": { "type": "string",
                "enum": ["data-access", "feature", "shell", "ui", "util"] } },
            { "name": "style", "items": ["css", "scss", "less"], "default": "scss" },
            { "name": "addE2EProject", "type": "boolean", "default": true },
            { "name": "color" }
        ]
    });
    let path = dir.join("library.json");
    fs::write(&path, serde_json::to_string_pretty(&json).unwrap())
        .expect("failed to write schema");
    path
}

fn run(args: &[&str]) -> Output {
    std::process::Command::new(env!("CARGO_BIN_EXE_generator-form"))
        .args(args)
        .output()
        .expect("failed to run generator-form")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

// ---------------------------------------------------------------------------
// normalize
// ---------------------------------------------------------------------------

#[test]
fn normalize_prints_typed_descriptors() {
    let dir = TempDir::new("normalize");
    let schema = write_library_schema(&dir);

    let out = run(&["normalize", "--schema", schema.to_str().unwrap()]);
    assert!(out.status.success());

    let json: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(json["name"], "library");
    assert_eq!(json["options"][1]["kind"]["ArrayOf"]["Enum"][3], "ui");
    assert_eq!(json["options"][3]["default"], true);
}

#[test]
fn normalize_rejects_duplicate_names() {
    let dir = TempDir::new("normalize_dup");
    let path = dir.join("broken.yaml");
    fs::write(
        &path,
        "name: broken\ncommand: generate\noptions:\n  - name: a\n  - name: a\n",
    )
    .unwrap();

    let out = run(&["normalize", "--schema", path.to_str().unwrap()]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("error:"), "stderr: {stderr}");
}

// ---------------------------------------------------------------------------
// form / serialize
// ---------------------------------------------------------------------------

#[test]
fn form_reports_field_state() {
    let dir = TempDir::new("form");
    let schema = write_library_schema(&dir);

    let out = run(&[
        "form",
        "--schema",
        schema.to_str().unwrap(),
        "--set",
        "style=sass",
    ]);
    assert!(out.status.success());

    let json: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(json["valid"], false);
    assert_eq!(json["dirty"], true);
    assert_eq!(json["fields"]["style"]["value"], "sass");
    assert_eq!(json["fields"]["name"]["errors"][0], "required");
}

#[test]
fn serialize_prints_canonical_command_line() {
    let dir = TempDir::new("serialize");
    let schema = write_library_schema(&dir);

    let out = run(&[
        "serialize",
        "--schema",
        schema.to_str().unwrap(),
        "--set",
        "name=shared",
        "--set",
        "libraries=ui",
        "--set",
        "addE2EProject=false",
        "--set",
        "color=Rebecca Purple",
        "--reset",
        "addE2EProject",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(
        stdout(&out),
        "generate @nrwl/angular:library shared -l ui --color 'Rebecca Purple'"
    );
}

#[test]
fn serialize_args_prints_unquoted_vector() {
    let dir = TempDir::new("serialize_args");
    let schema = write_library_schema(&dir);

    let out = run(&[
        "serialize",
        "--schema",
        schema.to_str().unwrap(),
        "--set",
        "name=shared",
        "--set",
        "color=Rebecca Purple",
        "--args",
    ]);
    assert!(out.status.success());
    let args: Vec<String> = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(
        args,
        vec!["generate", "@nrwl/angular:library", "shared", "--color", "Rebecca Purple"]
    );
}

#[test]
fn serialize_refuses_invalid_form() {
    let dir = TempDir::new("serialize_invalid");
    let schema = write_library_schema(&dir);

    let out = run(&["serialize", "--schema", schema.to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("name: a value is required"));

    let out = run(&[
        "serialize",
        "--schema",
        schema.to_str().unwrap(),
        "--allow-invalid",
    ]);
    assert!(out.status.success());
    assert_eq!(stdout(&out), "generate @nrwl/angular:library");
}

#[test]
fn unknown_field_fails() {
    let dir = TempDir::new("unknown_field");
    let schema = write_library_schema(&dir);

    let out = run(&[
        "form",
        "--schema",
        schema.to_str().unwrap(),
        "--set",
        "colour=red",
    ]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("unknown field: colour"));
}

// ---------------------------------------------------------------------------
// parse / config
// ---------------------------------------------------------------------------

#[test]
fn parse_prints_values_in_yaml() {
    let dir = TempDir::new("parse");
    let schema = write_library_schema(&dir);

    let out = run(&[
        "parse",
        "--schema",
        schema.to_str().unwrap(),
        "--format",
        "yaml",
        "generate @nrwl/angular:library shared -l ui -l util --no-addE2EProject",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let values: serde_json::Value = serde_yaml::from_str(&stdout(&out)).unwrap();
    assert_eq!(values["name"], "shared");
    assert_eq!(values["libraries"], serde_json::json!(["ui", "util"]));
    assert_eq!(values["addE2EProject"], false);
}

#[test]
fn config_array_style_is_applied() {
    let dir = TempDir::new("config");
    let schema = write_library_schema(&dir);
    let config = dir.join("generator-form.yml");
    fs::write(&config, "array_style: commaJoined\n").unwrap();

    let out = run(&[
        "serialize",
        "--config",
        config.to_str().unwrap(),
        "--schema",
        schema.to_str().unwrap(),
        "--set",
        "name=shared",
        "--set",
        "libraries=ui,util",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(stdout(&out), "generate @nrwl/angular:library shared -l ui,util");
}
