use crate::compose::ComposeFile;
use crate::config::EnvConfig;
use crate::docker::compose::{detect_compose_variant, sanitize_project_name, ComposeMode};
use crate::docker::runner::{CommandRunner, SystemRunner};
use crate::errors::{EnvError, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A (service, container port) pair the tests are allowed to reach
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceExposure {
    pub service: String,
    pub port: u16,
}

impl ServiceExposure {
    pub fn new(service: &str, port: u16) -> Self {
        Self {
            service: service.to_string(),
            port,
        }
    }
}

impl fmt::Display for ServiceExposure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.service, self.port)
    }
}

/// Collects the description of a compose environment and validates it in `build`.
///
/// Local compose starts enabled, matching the usual convenience default; callers
/// that want the library-managed path switch it off with `with_local_compose(false)`.
#[derive(Debug, Clone)]
pub struct EnvironmentBuilder {
    compose_file: PathBuf,
    exposures: Vec<ServiceExposure>,
    local_compose: bool,
    project_name: Option<String>,
    env: BTreeMap<String, String>,
    config: Option<EnvConfig>,
}

impl EnvironmentBuilder {
    pub fn new(compose_file: impl AsRef<Path>) -> Self {
        Self {
            compose_file: compose_file.as_ref().to_path_buf(),
            exposures: Vec::new(),
            local_compose: true,
            project_name: None,
            env: BTreeMap::new(),
            config: None,
        }
    }

    pub fn with_exposed_service(mut self, service: &str, port: u16) -> Self {
        self.exposures.push(ServiceExposure::new(service, port));
        self
    }

    pub fn with_local_compose(mut self, local_compose: bool) -> Self {
        self.local_compose = local_compose;
        self
    }

    /// Fixed project name instead of a generated one
    pub fn with_project_name(mut self, name: &str) -> Self {
        self.project_name = Some(name.to_string());
        self
    }

    /// Variable passed to compose and used when interpolating the file
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    /// Use this config instead of reading leia-env.yml next to the compose file
    pub fn with_config(mut self, config: EnvConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn compose_file(&self) -> &Path {
        &self.compose_file
    }

    pub fn exposures(&self) -> &[ServiceExposure] {
        &self.exposures
    }

    pub fn uses_local_compose(&self) -> bool {
        self.local_compose
    }

    pub fn build(self) -> Result<EnvironmentDescriptor> {
        self.build_with(&SystemRunner)
    }

    /// Validate and freeze the description.
    ///
    /// Checks, in order: no exposure is listed twice, the compose file exists and
    /// parses, every exposed service is declared, every exposed port is published by
    /// its service, no service pins a `container_name`, and (local mode only) a host
    /// compose binary is available.
    ///
    /// Process variables the compose file references are copied into the descriptor's
    /// env, so compose sees the same values at run time as validation did here.
    pub fn build_with(self, runner: &dyn CommandRunner) -> Result<EnvironmentDescriptor> {
        let mut seen = HashSet::new();
        for exposure in &self.exposures {
            if !seen.insert(exposure) {
                return Err(EnvError::DuplicateExposure {
                    service: exposure.service.clone(),
                    port: exposure.port,
                });
            }
        }

        let mut vars: HashMap<String, String> = std::env::vars().collect();
        vars.extend(self.env.iter().map(|(k, v)| (k.clone(), v.clone())));

        let compose = ComposeFile::load_with_env(&self.compose_file, &vars)?;

        for exposure in &self.exposures {
            let service = compose.service(&exposure.service).ok_or_else(|| {
                EnvError::ServiceNotDeclared {
                    service: exposure.service.clone(),
                    compose_file: self.compose_file.clone(),
                }
            })?;

            if !service.declares_port(exposure.port) {
                if service.exposes_internally(exposure.port) {
                    debug!(
                        exposure = %exposure,
                        "port is only listed under expose and is not reachable from the host"
                    );
                }
                return Err(EnvError::PortNotDeclared {
                    service: exposure.service.clone(),
                    port: exposure.port,
                });
            }
        }

        // Fixed container names would clash between concurrently running projects
        if let Some((name, _)) = compose
            .services
            .iter()
            .find(|(_, service)| service.container_name.is_some())
        {
            return Err(EnvError::MalformedComposeFile {
                path: self.compose_file.clone(),
                message: format!(
                    "service '{}' sets container_name, which is not supported",
                    name
                ),
            });
        }

        let compose_file = fs::canonicalize(&self.compose_file)?;
        let working_dir = compose_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));

        let config = match self.config {
            Some(config) => config,
            None => EnvConfig::load(&working_dir)?,
        };

        let compose_mode = if self.local_compose {
            let variant = detect_compose_variant(runner, &working_dir).ok_or_else(|| {
                EnvError::ComposeUnavailable(
                    "local compose requested but neither 'docker compose' nor 'docker-compose' works"
                        .to_string(),
                )
            })?;
            ComposeMode::Local(variant)
        } else {
            ComposeMode::Containerized {
                image: config.compose_image.clone(),
            }
        };

        // Builder entries win over the process environment
        let mut env = self.env;
        for name in &compose.variables {
            if env.contains_key(name) {
                continue;
            }
            if let Some(value) = vars.get(name) {
                env.insert(name.clone(), value.clone());
            }
        }

        let project_name = match &self.project_name {
            Some(name) => sanitize_project_name(name),
            None => generated_project_name(&config.project_prefix),
        };
        if project_name.is_empty() {
            return Err(EnvError::ConfigError(
                "project name is empty after sanitizing".to_string(),
            ));
        }

        debug!(
            project = %project_name,
            compose_file = %compose_file.display(),
            ?compose_mode,
            "environment described"
        );

        Ok(EnvironmentDescriptor {
            compose_file,
            working_dir,
            exposures: self.exposures,
            local_compose: self.local_compose,
            project_name,
            compose_mode,
            env,
            config,
            services: compose.services.keys().cloned().collect(),
        })
    }
}

/// Prefix plus a short random suffix so parallel runs get separate projects
fn generated_project_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    let suffix: String = id.chars().take(8).collect();
    sanitize_project_name(&format!("{}-{}", prefix, suffix))
}

/// Validated, immutable description of a compose environment
#[derive(Debug, Clone)]
pub struct EnvironmentDescriptor {
    compose_file: PathBuf,
    working_dir: PathBuf,
    exposures: Vec<ServiceExposure>,
    local_compose: bool,
    project_name: String,
    compose_mode: ComposeMode,
    env: BTreeMap<String, String>,
    config: EnvConfig,
    services: Vec<String>,
}

impl EnvironmentDescriptor {
    /// Absolute path of the compose file
    pub fn compose_file(&self) -> &Path {
        &self.compose_file
    }

    /// Directory compose runs in (the compose file's parent)
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn exposures(&self) -> &[ServiceExposure] {
        &self.exposures
    }

    pub fn is_exposed(&self, service: &str, port: u16) -> bool {
        self.exposures
            .iter()
            .any(|e| e.service == service && e.port == port)
    }

    pub fn local_compose(&self) -> bool {
        self.local_compose
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn compose_mode(&self) -> &ComposeMode {
        &self.compose_mode
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// Every service declared in the compose file, sorted
    pub fn services(&self) -> &[String] {
        &self.services
    }
}
