use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvError {
    #[error("Compose file not found: {}", .0.display())]
    ComposeFileNotFound(PathBuf),

    #[error("Malformed compose file {}: {message}", .path.display())]
    MalformedComposeFile { path: PathBuf, message: String },

    #[error("Service '{service}' is not declared in {}", .compose_file.display())]
    ServiceNotDeclared {
        service: String,
        compose_file: PathBuf,
    },

    #[error("Service '{service}' does not declare port {port}")]
    PortNotDeclared { service: String, port: u16 },

    #[error("Service '{service}' is exposed on port {port} more than once")]
    DuplicateExposure { service: String, port: u16 },

    #[error("No usable compose implementation: {0}")]
    ComposeUnavailable(String),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Service '{service}' port {port} was not reachable within {timeout_secs}s")]
    ReadinessTimeout {
        service: String,
        port: u16,
        timeout_secs: u64,
    },

    #[error("Port {port} of service '{service}' is not exposed by this environment")]
    NotExposed { service: String, port: u16 },

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EnvError>;
