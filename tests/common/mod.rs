/// Common test utilities for leia-testenv integration tests
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// The compose file the leia environment expects, with all three services
#[allow(dead_code)]
pub const KAFKA_CLUSTER: &str = r#"version: '3'
services:
  zookeeper:
    image: confluentinc/cp-zookeeper:5.1.0
    ports:
      - "32181:32181"
  kafka:
    image: confluentinc/cp-kafka:5.1.0
    depends_on:
      - zookeeper
    ports:
      - target: 9092
        published: 9092
  leia:
    build: .
    ports:
      - "80"
"#;

/// A temporary directory standing in for the leia project root
#[allow(dead_code)]
pub struct TestWorkspace {
    pub temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestWorkspace {
    /// Empty workspace with no compose file
    pub fn empty() -> Self {
        TestWorkspace {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Workspace holding the standard Kafka cluster compose file
    pub fn new() -> Self {
        let workspace = Self::empty();
        workspace.write_compose(KAFKA_CLUSTER);
        workspace
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn compose_path(&self) -> PathBuf {
        self.path().join("docker-compose-kafka-cluster.yaml")
    }

    /// Replace the compose file contents
    pub fn write_compose(&self, content: &str) {
        std::fs::write(self.compose_path(), content).expect("Failed to write compose file");
    }

    /// Create a leia-env.yml config file
    pub fn create_config(&self, content: &str) {
        std::fs::write(self.path().join("leia-env.yml"), content)
            .expect("Failed to write config");
    }

    /// Run leia-env against this workspace
    pub fn leia_env(&self, args: &[&str]) -> CommandResult {
        let output = Command::new(env!("CARGO_BIN_EXE_leia-env"))
            .arg("--dir")
            .arg(self.path())
            .args(args)
            .env("RUST_LOG", "off")
            .output()
            .expect("Failed to execute leia-env command");

        CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            exit_code: output.status.code(),
        }
    }
}

/// Result of running a command
#[allow(dead_code)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: Option<i32>,
}

#[allow(dead_code)]
impl CommandResult {
    pub fn assert_success(&self) {
        if !self.success {
            panic!(
                "Command failed with exit code {:?}\nStdout: {}\nStderr: {}",
                self.exit_code, self.stdout, self.stderr
            );
        }
    }

    pub fn assert_failure(&self) {
        if self.success {
            panic!(
                "Command succeeded but was expected to fail\nStdout: {}\nStderr: {}",
                self.stdout, self.stderr
            );
        }
    }

    pub fn assert_stdout_contains(&self, text: &str) {
        assert!(
            self.stdout.contains(text),
            "Expected stdout to contain '{}'\nActual stdout: {}",
            text,
            self.stdout
        );
    }

    pub fn assert_stderr_contains(&self, text: &str) {
        assert!(
            self.stderr.contains(text),
            "Expected stderr to contain '{}'\nActual stderr: {}",
            text,
            self.stderr
        );
    }
}
