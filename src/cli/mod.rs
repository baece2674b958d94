pub mod docker;
pub mod ports;
pub mod validate;

use crate::environment::bootstrap::{self, EXPOSED_SERVICES};
use crate::environment::{EnvironmentBuilder, EnvironmentDescriptor};
use crate::errors::Result;
use std::path::PathBuf;
use std::sync::Arc;

/// Project name used by the CLI so `up` and `down` from separate runs match
pub const CLI_PROJECT_NAME: &str = "leia";

/// Which environment a CLI invocation operates on
#[derive(Debug, Clone)]
pub struct Target {
    pub dir: PathBuf,
    pub compose: Option<PathBuf>,
    pub local_compose: bool,
    pub project: Option<String>,
}

impl Target {
    pub fn builder(&self) -> EnvironmentBuilder {
        let builder = match &self.compose {
            None => bootstrap::configured_builder(&self.dir),
            Some(file) => EXPOSED_SERVICES.iter().fold(
                EnvironmentBuilder::new(self.dir.join(file)),
                |builder, (service, port)| builder.with_exposed_service(service, *port),
            ),
        };

        builder
            .with_local_compose(self.local_compose)
            .with_project_name(self.project.as_deref().unwrap_or(CLI_PROJECT_NAME))
    }

    /// Build the descriptor, printing the failure report on error
    pub fn descriptor(&self) -> Result<Arc<EnvironmentDescriptor>> {
        self.builder()
            .build()
            .map(Arc::new)
            .map_err(|e| {
                bootstrap::report_failure(&e);
                e
            })
    }
}
