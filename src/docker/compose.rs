// Compose invocation: builds argument lists and runs them for an environment
// Either shells out to a host compose binary or drives a compose image via `docker run`

use crate::docker::ports::parse_port_output;
use crate::docker::runner::{CommandOutput, CommandRunner, Invocation};
use crate::environment::EnvironmentDescriptor;
use crate::errors::{EnvError, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Docker socket mounted into the compose container
const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Host compose binary flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeVariant {
    /// Legacy docker-compose (with hyphen)
    Hyphenated,
    /// Modern docker compose (no hyphen, subcommand of docker)
    Subcommand,
}

/// How compose commands are executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeMode {
    /// Use a compose binary installed on the host
    Local(ComposeVariant),
    /// Run compose from an image, talking to the host daemon through its socket
    Containerized { image: String },
}

/// Detect which host compose variant is available, preferring `docker compose`
pub fn detect_compose_variant(runner: &dyn CommandRunner, cwd: &Path) -> Option<ComposeVariant> {
    let probes = [
        (
            ComposeVariant::Subcommand,
            Invocation::new("docker", vec!["compose".into(), "version".into()], cwd),
        ),
        (
            ComposeVariant::Hyphenated,
            Invocation::new("docker-compose", vec!["version".into()], cwd),
        ),
    ];

    for (variant, probe) in probes {
        let available = runner
            .run(&probe)
            .map(|output| output.success)
            .unwrap_or(false);
        if available {
            debug!(?variant, "detected host compose");
            return Some(variant);
        }
    }

    None
}

/// Docker Compose project names must be lowercase alphanumeric with hyphens only
pub fn sanitize_project_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Builds compose invocations for one environment
pub struct ComposeCommand<'a> {
    descriptor: &'a EnvironmentDescriptor,
}

impl<'a> ComposeCommand<'a> {
    pub fn new(descriptor: &'a EnvironmentDescriptor) -> Self {
        Self { descriptor }
    }

    /// Wrap compose arguments in the program that runs them
    pub fn invocation(&self, subcommand: &[&str]) -> Invocation {
        let descriptor = self.descriptor;
        let workdir = descriptor.working_dir();
        let workdir_str = workdir.to_string_lossy().to_string();

        let mut compose_args = vec![
            "-p".to_string(),
            descriptor.project_name().to_string(),
            "-f".to_string(),
            descriptor.compose_file().to_string_lossy().to_string(),
        ];
        compose_args.extend(subcommand.iter().map(|s| s.to_string()));

        let env: Vec<(String, String)> = descriptor
            .env()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        match descriptor.compose_mode() {
            ComposeMode::Local(ComposeVariant::Subcommand) => {
                let mut args = vec!["compose".to_string()];
                args.extend(compose_args);
                Invocation::new("docker", args, workdir).with_envs(env)
            }
            ComposeMode::Local(ComposeVariant::Hyphenated) => {
                Invocation::new("docker-compose", compose_args, workdir).with_envs(env)
            }
            ComposeMode::Containerized { image } => {
                let mut args = vec![
                    "run".to_string(),
                    "--rm".to_string(),
                    "-v".to_string(),
                    format!("{}:{}", DOCKER_SOCKET, DOCKER_SOCKET),
                    "-v".to_string(),
                    format!("{}:{}", workdir_str, workdir_str),
                    "-w".to_string(),
                    workdir_str.clone(),
                ];
                for (key, value) in &env {
                    args.push("-e".to_string());
                    args.push(format!("{}={}", key, value));
                }
                args.push(image.clone());
                args.extend(compose_args);
                Invocation::new("docker", args, workdir)
            }
        }
    }

    pub fn pull(&self) -> Invocation {
        self.invocation(&["pull"])
    }

    pub fn up(&self) -> Invocation {
        self.invocation(&["up", "-d"])
    }

    pub fn down(&self) -> Invocation {
        self.invocation(&["down", "-v", "--remove-orphans"])
    }

    pub fn ps(&self) -> Invocation {
        self.invocation(&["ps", "-q"])
    }

    pub fn port(&self, service: &str, port: u16) -> Invocation {
        let port = port.to_string();
        self.invocation(&["port", service, &port])
    }

    pub fn logs(&self, service: Option<&str>, follow: bool) -> Invocation {
        let mut args = vec!["logs"];
        if follow {
            args.push("--follow");
        }
        if let Some(service) = service {
            args.push(service);
        }
        self.invocation(&args)
    }
}

/// Runs compose commands for one environment
pub struct ComposeOrchestrator {
    descriptor: Arc<EnvironmentDescriptor>,
    runner: Arc<dyn CommandRunner>,
}

impl ComposeOrchestrator {
    pub fn new(descriptor: Arc<EnvironmentDescriptor>, runner: Arc<dyn CommandRunner>) -> Self {
        Self { descriptor, runner }
    }

    pub fn descriptor(&self) -> &EnvironmentDescriptor {
        &self.descriptor
    }

    fn commands(&self) -> ComposeCommand<'_> {
        ComposeCommand::new(&self.descriptor)
    }

    fn run_checked(&self, invocation: Invocation) -> Result<CommandOutput> {
        let output = self.runner.run(&invocation)?;
        if !output.success {
            return Err(EnvError::CommandFailed(format!(
                "{}: {}",
                invocation.display(),
                output.stderr.trim()
            )));
        }
        Ok(output)
    }

    pub fn pull(&self) -> Result<()> {
        info!(project = %self.descriptor.project_name(), "pulling images");
        self.run_checked(self.commands().pull())?;
        Ok(())
    }

    pub fn up(&self) -> Result<()> {
        info!(project = %self.descriptor.project_name(), "starting containers");
        self.run_checked(self.commands().up())?;
        Ok(())
    }

    pub fn down(&self) -> Result<()> {
        info!(project = %self.descriptor.project_name(), "stopping containers");
        self.run_checked(self.commands().down())?;
        Ok(())
    }

    /// Number of containers compose reports for the project; 0 if compose fails
    pub fn running_container_count(&self) -> usize {
        self.runner
            .run(&self.commands().ps())
            .map(|output| {
                if output.success {
                    output
                        .stdout
                        .lines()
                        .filter(|line| !line.trim().is_empty())
                        .count()
                } else {
                    0
                }
            })
            .unwrap_or(0)
    }

    /// Host port that compose mapped to a service's container port
    pub fn service_port(&self, service: &str, port: u16) -> Result<u16> {
        let output = self.run_checked(self.commands().port(service, port))?;
        parse_port_output(&output.stdout).ok_or_else(|| {
            EnvError::CommandFailed(format!(
                "compose reported no host mapping for {}:{}",
                service, port
            ))
        })
    }

    /// Print container logs to the terminal
    pub fn logs(&self, service: Option<&str>, follow: bool) -> Result<()> {
        let invocation = self.commands().logs(service, follow);
        if !self.runner.run_attached(&invocation)? {
            return Err(EnvError::CommandFailed(invocation.display()));
        }
        Ok(())
    }
}
