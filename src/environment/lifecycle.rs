// Running environment: start containers, resolve exposed ports, tear down on drop

use crate::clock::{Clock, SystemClock};
use crate::docker::compose::ComposeOrchestrator;
use crate::docker::ports::{docker_host, wait_for_tcp};
use crate::docker::runner::{CommandRunner, SystemRunner};
use crate::environment::descriptor::{EnvironmentDescriptor, ServiceExposure};
use crate::errors::{EnvError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// A started compose environment.
///
/// Containers are stopped when the value is dropped unless `stop` was already
/// called, so a panicking test still releases them.
pub struct RunningEnvironment {
    orchestrator: ComposeOrchestrator,
    host: String,
    mapped_ports: BTreeMap<ServiceExposure, u16>,
    stopped: bool,
}

impl RunningEnvironment {
    pub fn start(descriptor: Arc<EnvironmentDescriptor>) -> Result<Self> {
        Self::start_with(
            descriptor,
            Arc::new(SystemRunner),
            Arc::new(SystemClock),
            docker_host(),
        )
    }

    pub fn start_with(
        descriptor: Arc<EnvironmentDescriptor>,
        runner: Arc<dyn CommandRunner>,
        clock: Arc<dyn Clock>,
        host: String,
    ) -> Result<Self> {
        let config = descriptor.config();
        let timeout = config.startup_timeout()?;
        let poll = config.poll_interval()?;
        let pull = config.pull;

        let orchestrator = ComposeOrchestrator::new(descriptor, runner);
        if pull {
            orchestrator.pull()?;
        }

        let mut environment = Self {
            orchestrator,
            host,
            mapped_ports: BTreeMap::new(),
            stopped: false,
        };

        // From here on a failure drops `environment`, which runs `down`
        environment.orchestrator.up()?;

        let start = clock.now();
        let exposures = environment.orchestrator.descriptor().exposures().to_vec();
        for exposure in exposures {
            let mapped = environment
                .orchestrator
                .service_port(&exposure.service, exposure.port)?;

            let remaining = timeout.saturating_sub(clock.elapsed_since(start));
            let host = environment.host.clone();
            if !wait_for_tcp(clock.as_ref(), &host, mapped, remaining, poll) {
                return Err(EnvError::ReadinessTimeout {
                    service: exposure.service.clone(),
                    port: exposure.port,
                    timeout_secs: timeout.as_secs(),
                });
            }

            info!(exposure = %exposure, host = %host, mapped, "service reachable");
            environment.mapped_ports.insert(exposure, mapped);
        }

        Ok(environment)
    }

    pub fn descriptor(&self) -> &EnvironmentDescriptor {
        self.orchestrator.descriptor()
    }

    fn check_exposed(&self, service: &str, port: u16) -> Result<&u16> {
        self.mapped_ports
            .get(&ServiceExposure::new(service, port))
            .ok_or_else(|| EnvError::NotExposed {
                service: service.to_string(),
                port,
            })
    }

    /// Host the published ports are bound on
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Host through which an exposed service is reached
    pub fn service_host(&self, service: &str, port: u16) -> Result<&str> {
        self.check_exposed(service, port)?;
        Ok(&self.host)
    }

    /// Host port mapped to an exposed service's container port
    pub fn service_port(&self, service: &str, port: u16) -> Result<u16> {
        self.check_exposed(service, port).copied()
    }

    /// "host:port" for an exposed service
    pub fn endpoint(&self, service: &str, port: u16) -> Result<String> {
        let mapped = self.service_port(service, port)?;
        Ok(format!("{}:{}", self.host, mapped))
    }

    pub fn mapped_ports(&self) -> &BTreeMap<ServiceExposure, u16> {
        &self.mapped_ports
    }

    /// Leave the containers running after this value is gone
    pub fn detach(mut self) -> BTreeMap<ServiceExposure, u16> {
        self.stopped = true;
        std::mem::take(&mut self.mapped_ports)
    }

    /// Stop and remove the containers
    pub fn stop(mut self) -> Result<()> {
        self.stopped = true;
        self.orchestrator.down()
    }
}

impl Drop for RunningEnvironment {
    fn drop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        if let Err(e) = self.orchestrator.down() {
            warn!(
                project = %self.orchestrator.descriptor().project_name(),
                error = %e,
                "failed to stop environment"
            );
        }
    }
}

/// Start the environment, run `body` against it, and always stop it afterwards
pub fn with_running_environment<T, F>(descriptor: Arc<EnvironmentDescriptor>, body: F) -> Result<T>
where
    F: FnOnce(&RunningEnvironment) -> T,
{
    let environment = RunningEnvironment::start(descriptor)?;
    let value = body(&environment);
    environment.stop()?;
    Ok(value)
}
