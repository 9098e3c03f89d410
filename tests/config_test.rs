//! Integration tests for Settings loading and wiring into the generator.
//!
//! Note: `Settings::load` also reads the global config if one exists on the
//! machine, so these tests only assert on values the project layer sets.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use genja::application::{ApplicationError, GenerateRequest, Mode};
use genja::config::{project_config_path, Settings, PROJECT_CONFIG_FILE};
use genja::infrastructure::di::ServiceContainer;

const PROJECT_CONFIG: &str = r#"
root_dir = "templates"
mtime_tolerance_secs = 3

[extensions]
".cpy" = "pyx"
cpd = ".pxd"

[[rules]]
directory = "types"
pattern = "*.cpy"
name = "integer types"
outputs = [
    { suffix = "_INT32", bindings = { type = "INT32_t" } },
    { suffix = "_INT64", bindings = { type = "INT64_t" } },
]

[default_rule]
pattern = "*.cpd"
outputs = [{ suffix = "" }]
"#;

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("templates/types")).unwrap();
    fs::write(dir.path().join(PROJECT_CONFIG_FILE), PROJECT_CONFIG).unwrap();
    fs::write(
        dir.path().join("templates/types/sum.cpy"),
        "cdef {{ type | type2enum }} x\n",
    )
    .unwrap();
    fs::write(dir.path().join("templates/decl.cpd"), "decl\n").unwrap();
    dir
}

#[test]
fn given_project_config_when_loading_then_project_values_apply() {
    let dir = project();

    let settings = Settings::load(dir.path(), None).expect("load settings");

    assert_eq!(settings.root_dir, dir.path().join("templates"));
    assert_eq!(settings.mtime_tolerance_secs, 3);
    assert_eq!(settings.extensions.get("cpy").map(String::as_str), Some("pyx"));
    assert_eq!(settings.extensions.get("cpd").map(String::as_str), Some("pxd"));
    let rule = settings
        .rules
        .iter()
        .find(|r| r.name.as_deref() == Some("integer types"))
        .expect("project rule present");
    assert_eq!(rule.directory, PathBuf::from("types"));
    assert_eq!(rule.outputs.len(), 2);
}

#[test]
fn given_explicit_config_file_when_loading_then_used_instead_of_project_file() {
    let dir = project();
    let other = dir.path().join("other.toml");
    fs::write(&other, "mtime_tolerance_secs = 9\n").unwrap();

    let settings = Settings::load(dir.path(), Some(&other)).expect("load settings");

    assert_eq!(settings.mtime_tolerance_secs, 9);
    assert!(settings
        .rules
        .iter()
        .all(|r| r.name.as_deref() != Some("integer types")));
}

#[test]
fn given_missing_explicit_config_when_loading_then_errors() {
    let dir = TempDir::new().unwrap();

    let result = Settings::load(dir.path(), Some(&dir.path().join("nope.toml")));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_invalid_toml_when_loading_file_then_errors_with_path() {
    let dir = TempDir::new().unwrap();
    let path = project_config_path(dir.path());
    fs::write(&path, "rules = 5").unwrap();

    let err = Settings::from_file(&path, dir.path()).unwrap_err();

    assert!(err.to_string().contains("genja.toml"), "{err}");
}

#[test]
fn given_same_extension_with_and_without_dot_when_loading_file_then_duplicate_error() {
    let dir = TempDir::new().unwrap();
    let path = project_config_path(dir.path());
    fs::write(
        &path,
        r#"
[extensions]
".cpy" = "pyx"
cpy = "py"
"#,
    )
    .unwrap();

    let result = Settings::from_file(&path, dir.path());

    assert!(matches!(
        result,
        Err(ApplicationError::DuplicateExtension { ref input, .. }) if input == "cpy"
    ));
}

#[test]
fn given_config_when_generating_through_container_then_outputs_rendered() {
    let dir = project();
    let settings = Settings::from_file(&project_config_path(dir.path()), dir.path()).unwrap();
    let container = ServiceContainer::new(settings).unwrap();
    let generator = container.generator().expect("generator from config");

    let report = generator
        .generate(&GenerateRequest {
            recursive: true,
            ..GenerateRequest::new(Mode::Generate)
        })
        .unwrap();

    let root = dir.path().join("templates");
    assert_eq!(report.generated(), 3);
    assert_eq!(
        fs::read_to_string(root.join("types/sum_INT64.pyx")).unwrap(),
        "cdef INT64_T x\n"
    );
    assert_eq!(fs::read_to_string(root.join("decl.pxd")).unwrap(), "decl\n");
    assert_eq!(generator.registry().rules_for(&"types".into())[0].name(), "integer types");
}

#[test]
fn given_rule_for_missing_directory_when_building_generator_then_errors() {
    let dir = TempDir::new().unwrap();
    let path = project_config_path(dir.path());
    fs::write(
        &path,
        r#"
[[rules]]
directory = "absent"
pattern = "*"
"#,
    )
    .unwrap();
    let settings = Settings::from_file(&path, dir.path()).unwrap();

    let result = ServiceContainer::new(settings).unwrap().generator();

    assert!(matches!(result, Err(ApplicationError::MissingDirectory(_))));
}

#[test]
fn given_template_config_when_written_then_loads_as_defaults() {
    let dir = TempDir::new().unwrap();
    let path = project_config_path(dir.path());
    fs::write(&path, Settings::template()).unwrap();

    let settings = Settings::from_file(&path, dir.path()).unwrap();

    assert_eq!(settings.mtime_tolerance_secs, 1);
    assert!(settings.extensions.is_empty());
    assert!(settings.rules.is_empty());
    assert!(settings.default_rule.is_none());
}
