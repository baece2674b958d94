mod common;

use common::TestWorkspace;
use leia_testenv::bootstrap::{self, Bootstrap, BootstrapState};
use leia_testenv::docker::ComposeMode;
use leia_testenv::EnvError;
use serial_test::serial;
use std::process::Command;
use std::sync::Arc;

/// Set on the child run of `report_to_stdout_child`; holds the base directory
const CHILD_DIR_VAR: &str = "LEIA_TESTENV_REPORT_DIR";

#[test]
fn test_valid_compose_initializes() {
    let workspace = TestWorkspace::new();

    let descriptor = bootstrap::initialize_in(workspace.path()).unwrap();

    assert!(descriptor.is_exposed("zookeeper", 32181));
    assert!(descriptor.is_exposed("kafka", 9092));
    assert!(descriptor.is_exposed("leia", 80));
    assert_eq!(descriptor.exposures().len(), 3);
    assert!(!descriptor.local_compose());
    assert!(matches!(
        descriptor.compose_mode(),
        ComposeMode::Containerized { .. }
    ));
}

#[test]
fn test_missing_compose_file_fails() {
    let workspace = TestWorkspace::empty();

    let err = bootstrap::initialize_in(workspace.path()).unwrap_err();

    match err {
        EnvError::ComposeFileNotFound(path) => {
            assert_eq!(path, workspace.compose_path());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_service_fails_with_same_kind() {
    let workspace = TestWorkspace::new();
    workspace.write_compose(
        r#"version: '3'
services:
  zookeeper:
    image: confluentinc/cp-zookeeper:5.1.0
    ports:
      - "32181:32181"
  kafka:
    image: confluentinc/cp-kafka:5.1.0
    ports:
      - "9092:9092"
"#,
    );

    let err: EnvError = bootstrap::initialize_in(workspace.path()).unwrap_err();

    match err {
        EnvError::ServiceNotDeclared { service, .. } => assert_eq!(service, "leia"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_port_fails() {
    let workspace = TestWorkspace::new();
    workspace.write_compose(
        r#"services:
  zookeeper:
    ports: ["2181:2181"]
  kafka:
    ports: ["9092:9092"]
  leia:
    ports: ["80"]
"#,
    );

    let err = bootstrap::initialize_in(workspace.path()).unwrap_err();
    assert!(matches!(
        err,
        EnvError::PortNotDeclared { ref service, port: 32181 } if service == "zookeeper"
    ));
}

#[test]
fn test_failure_report_has_message_and_debug_line() {
    let workspace = TestWorkspace::empty();
    let err = bootstrap::initialize_in(workspace.path()).unwrap_err();

    let mut out = Vec::new();
    bootstrap::write_failure_report(&err, &mut out).unwrap();
    let report = String::from_utf8(out).unwrap();

    let mut lines = report.lines();
    assert!(lines.next().unwrap().starts_with("Compose file not found"));
    assert!(lines.next().unwrap().starts_with("Error: ComposeFileNotFound"));
}

/// Runs only as a child of `test_initialize_reports_failure_on_stdout`
#[test]
fn report_to_stdout_child() {
    let Ok(dir) = std::env::var(CHILD_DIR_VAR) else {
        return;
    };
    let _ = bootstrap::initialize_in(std::path::Path::new(&dir));
}

#[test]
fn test_initialize_reports_failure_on_stdout() {
    let workspace = TestWorkspace::empty();

    let output = Command::new(std::env::current_exe().unwrap())
        .args(["report_to_stdout_child", "--exact", "--nocapture", "--test-threads=1"])
        .env(CHILD_DIR_VAR, workspace.path())
        .env("RUST_LOG", "off")
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let expected = format!("Compose file not found: {}", workspace.compose_path().display());
    assert!(stdout.contains(&expected), "stdout was: {stdout}");
    assert!(stdout.contains("Error: ComposeFileNotFound("), "stdout was: {stdout}");
}

#[test]
fn test_local_compose_disabled_before_validation() {
    let workspace = TestWorkspace::empty();

    let builder = bootstrap::configured_builder(workspace.path());

    // Nothing exists yet, so no check has run; the flag is already off
    assert!(!builder.uses_local_compose());
    assert!(builder.build().is_err());
}

#[test]
fn test_repeated_access_returns_same_handle() {
    let workspace = TestWorkspace::new();
    let cell = Bootstrap::new();
    assert_eq!(cell.state(), BootstrapState::Uninitialized);

    let first = cell
        .get_or_init(|| bootstrap::initialize_in(workspace.path()))
        .unwrap();
    let second = cell
        .get_or_init(|| panic!("initializer must not run twice"))
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cell.state(), BootstrapState::Ready);
}

#[test]
fn test_failure_is_terminal() {
    let workspace = TestWorkspace::empty();
    let cell = Bootstrap::new();

    let first = cell
        .get_or_init(|| bootstrap::initialize_in(workspace.path()))
        .unwrap_err();

    // Fixing the file afterwards does not revive the cell
    workspace.write_compose(common::KAFKA_CLUSTER);
    let second = cell
        .get_or_init(|| bootstrap::initialize_in(workspace.path()))
        .unwrap_err();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cell.state(), BootstrapState::Failed);
}

#[test]
#[serial]
fn test_shared_environment_from_current_dir() {
    let workspace = TestWorkspace::new();
    let original = std::env::current_dir().unwrap();
    std::env::set_current_dir(workspace.path()).unwrap();

    let first = bootstrap::shared();
    let second = bootstrap::shared();

    std::env::set_current_dir(original).unwrap();

    let first = first.unwrap();
    let second = second.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(bootstrap::shared_state(), BootstrapState::Ready);
}
