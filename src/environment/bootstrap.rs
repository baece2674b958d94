// One-time setup of the leia test environment (Kafka cluster compose file, containerized compose)
// Runs at most once per process; a failed setup stays failed and is never retried

use crate::environment::descriptor::{EnvironmentBuilder, EnvironmentDescriptor};
use crate::errors::{EnvError, Result};
use std::error::Error;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::error;

/// Compose file, relative to the base directory
pub const COMPOSE_FILE: &str = "docker-compose-kafka-cluster.yaml";

/// Services the tests reach, with their container ports
pub const EXPOSED_SERVICES: [(&str, u16); 3] = [("zookeeper", 32181), ("kafka", 9092), ("leia", 80)];

/// Builder for the leia environment rooted at `base_dir`.
///
/// No file is touched here; validation happens in `build`. Local compose is
/// already switched off on the returned builder.
pub fn configured_builder(base_dir: &Path) -> EnvironmentBuilder {
    let builder = EnvironmentBuilder::new(base_dir.join(COMPOSE_FILE)).with_local_compose(false);

    EXPOSED_SERVICES
        .iter()
        .fold(builder, |builder, (service, port)| {
            builder.with_exposed_service(service, *port)
        })
}

/// Build the descriptor for `base_dir`, reporting any failure on stdout
pub fn initialize_in(base_dir: &Path) -> Result<EnvironmentDescriptor> {
    configured_builder(base_dir).build().map_err(|e| {
        report_failure(&e);
        e
    })
}

/// Build the descriptor for the current directory
pub fn initialize() -> Result<EnvironmentDescriptor> {
    let base_dir = std::env::current_dir().map_err(|e| {
        let e = EnvError::from(e);
        report_failure(&e);
        e
    })?;
    initialize_in(&base_dir)
}

/// Log a setup failure and print its report on stdout
pub fn report_failure(err: &EnvError) {
    error!(error = %err, "environment initialization failed");
    let stdout = io::stdout();
    let mut out = stdout.lock();
    // Nothing sensible to do if stdout itself is gone
    let _ = write_failure_report(err, &mut out);
}

/// Write the error message followed by its chain of causes
pub fn write_failure_report<W: Write>(err: &EnvError, out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", err)?;
    writeln!(out, "Error: {:?}", err)?;

    let mut source = err.source();
    while let Some(cause) = source {
        writeln!(out, "Caused by: {}", cause)?;
        source = cause.source();
    }
    out.flush()
}

/// Where a `Bootstrap` is in its one-way lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Uninitialized,
    Ready,
    Failed,
}

pub type SharedEnvironment = std::result::Result<Arc<EnvironmentDescriptor>, Arc<EnvError>>;

/// Run-once holder for an environment descriptor
#[derive(Debug, Default)]
pub struct Bootstrap {
    cell: OnceLock<SharedEnvironment>,
}

impl Bootstrap {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// Run `init` on first access; every later access returns the same outcome
    pub fn get_or_init<F>(&self, init: F) -> SharedEnvironment
    where
        F: FnOnce() -> Result<EnvironmentDescriptor>,
    {
        self.cell
            .get_or_init(|| init().map(Arc::new).map_err(Arc::new))
            .clone()
    }

    pub fn state(&self) -> BootstrapState {
        match self.cell.get() {
            None => BootstrapState::Uninitialized,
            Some(Ok(_)) => BootstrapState::Ready,
            Some(Err(_)) => BootstrapState::Failed,
        }
    }
}

static SHARED: Bootstrap = Bootstrap::new();

/// Process-wide leia environment, initialized from the current directory on first use
pub fn shared() -> SharedEnvironment {
    SHARED.get_or_init(initialize)
}

pub fn shared_state() -> BootstrapState {
    SHARED.state()
}
