// Compose file model: the services of a compose description and the ports each declares
// Everything else in the file is left to the compose implementation that runs it

pub mod interpolate;
pub mod ports;

use crate::errors::{EnvError, Result};
use ports::{PortRange, PortSpec, RawPort};
use serde::Deserialize;
use serde_yml::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// A parsed compose description
#[derive(Debug, Clone)]
pub struct ComposeFile {
    pub path: PathBuf,
    pub version: Option<String>,
    pub services: BTreeMap<String, ComposeService>,
    /// Names of every variable the file references, set or not
    pub variables: BTreeSet<String>,
}

/// A single service entry
#[derive(Debug, Clone, Default)]
pub struct ComposeService {
    pub image: Option<String>,
    pub has_build: bool,
    pub container_name: Option<String>,
    pub ports: Vec<PortSpec>,
    pub expose: Vec<PortRange>,
}

impl ComposeService {
    /// True when the service publishes the given TCP container port to the host.
    /// `expose` entries only open the port to other services and do not count.
    pub fn declares_port(&self, port: u16) -> bool {
        self.ports.iter().any(|spec| spec.targets(port))
    }

    /// True when the port is listed under `expose` only
    pub fn exposes_internally(&self, port: u16) -> bool {
        !self.declares_port(port) && self.expose.iter().any(|range| range.contains(port))
    }
}

#[derive(Debug, Deserialize)]
struct RawComposeFile {
    #[serde(default)]
    version: Option<Value>,
    services: Option<BTreeMap<String, Option<RawService>>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawService {
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    build: Option<Value>,
    #[serde(default)]
    container_name: Option<String>,
    #[serde(default)]
    ports: Vec<RawPort>,
    #[serde(default)]
    expose: Vec<ports::NumberOrString>,
}

impl ComposeFile {
    /// Load and parse a compose file, interpolating from the process environment
    pub fn load(path: &Path) -> Result<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::load_with_env(path, &vars)
    }

    /// Load and parse a compose file, interpolating from `vars`
    pub fn load_with_env(path: &Path, vars: &HashMap<String, String>) -> Result<Self> {
        if !path.is_file() {
            return Err(EnvError::ComposeFileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse_with_env(path, &content, vars)
    }

    /// Parse compose text without any variables set
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        Self::parse_with_env(path, content, &HashMap::new())
    }

    pub fn parse_with_env(
        path: &Path,
        content: &str,
        vars: &HashMap<String, String>,
    ) -> Result<Self> {
        let malformed = |message: String| EnvError::MalformedComposeFile {
            path: path.to_path_buf(),
            message,
        };

        let mut document: Value =
            serde_yml::from_str(content).map_err(|e| malformed(e.to_string()))?;
        let mut variables = BTreeSet::new();
        interpolate_value(&mut document, vars, &mut variables).map_err(malformed)?;

        let raw: RawComposeFile =
            serde_yml::from_value(document).map_err(|e| malformed(e.to_string()))?;

        let raw_services = raw
            .services
            .ok_or_else(|| malformed("no 'services' section".to_string()))?;

        let mut services = BTreeMap::new();
        for (name, raw_service) in raw_services {
            let raw_service = raw_service.unwrap_or_default();

            let ports = raw_service
                .ports
                .into_iter()
                .map(RawPort::into_spec)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| malformed(format!("service '{}': {}", name, e)))?;

            let expose = raw_service
                .expose
                .iter()
                .map(|entry| {
                    let text = entry.as_text();
                    // "80/tcp" is valid in expose lists
                    let port = text.split('/').next().unwrap_or_default();
                    PortRange::parse(port)
                })
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| malformed(format!("service '{}': {}", name, e)))?;

            services.insert(
                name,
                ComposeService {
                    image: raw_service.image,
                    has_build: raw_service.build.is_some(),
                    container_name: raw_service.container_name,
                    ports,
                    expose,
                },
            );
        }

        Ok(Self {
            path: path.to_path_buf(),
            version: raw.version.and_then(|v| match v {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }),
            services,
            variables,
        })
    }

    pub fn service(&self, name: &str) -> Option<&ComposeService> {
        self.services.get(name)
    }

    pub fn service_names(&self) -> Vec<&str> {
        self.services.keys().map(String::as_str).collect()
    }
}

/// Apply variable substitution to every string scalar in the document
fn interpolate_value(
    value: &mut Value,
    vars: &HashMap<String, String>,
    referenced: &mut BTreeSet<String>,
) -> std::result::Result<(), String> {
    match value {
        Value::String(s) => {
            referenced.extend(interpolate::referenced_names(s));
            *s = interpolate::interpolate(s, vars)?;
        }
        Value::Sequence(items) => {
            for item in items.iter_mut() {
                interpolate_value(item, vars, referenced)?;
            }
        }
        Value::Mapping(map) => {
            for (_, item) in map.iter_mut() {
                interpolate_value(item, vars, referenced)?;
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const KAFKA_CLUSTER: &str = r#"
version: '3'
services:
  zookeeper:
    image: confluentinc/cp-zookeeper:5.1.0
    ports:
      - "32181:32181"
    environment:
      ZOOKEEPER_CLIENT_PORT: 32181
  kafka:
    image: confluentinc/cp-kafka:5.1.0
    depends_on:
      - zookeeper
    ports:
      - target: 9092
        published: 9092
  leia:
    build: .
    expose:
      - 80
"#;

    #[test]
    fn test_parse_services_and_ports() {
        let file = ComposeFile::parse(Path::new("compose.yaml"), KAFKA_CLUSTER).unwrap();

        assert_eq!(file.version.as_deref(), Some("3"));
        assert_eq!(file.service_names(), vec!["kafka", "leia", "zookeeper"]);

        assert!(file.service("zookeeper").unwrap().declares_port(32181));
        assert!(file.service("kafka").unwrap().declares_port(9092));
        let leia = file.service("leia").unwrap();
        assert!(leia.has_build);
        assert!(!leia.declares_port(80));
        assert!(leia.exposes_internally(80));
        assert!(!leia.exposes_internally(8080));
        assert!(file.variables.is_empty());
    }

    #[test]
    fn test_udp_port_does_not_declare_tcp() {
        let content = r#"
services:
  kafka:
    ports:
      - "9092:9092/udp"
      - target: 9093
        protocol: udp
"#;
        let file = ComposeFile::parse(Path::new("c.yml"), content).unwrap();
        let kafka = file.service("kafka").unwrap();
        assert!(!kafka.declares_port(9092));
        assert!(!kafka.declares_port(9093));
    }

    #[test]
    fn test_numeric_version() {
        let file = ComposeFile::parse(Path::new("c.yml"), "version: 3.8\nservices: {}\n").unwrap();
        assert_eq!(file.version.as_deref(), Some("3.8"));
        assert!(file.services.is_empty());
    }

    #[test]
    fn test_service_without_body() {
        let file = ComposeFile::parse(Path::new("c.yml"), "services:\n  idle:\n").unwrap();
        let idle = file.service("idle").unwrap();
        assert!(idle.ports.is_empty());
        assert!(!idle.declares_port(80));
    }

    #[test]
    fn test_interpolated_port() {
        let vars = HashMap::from([("KAFKA_PORT".to_string(), "19092".to_string())]);
        let content = r#"
services:
  kafka:
    ports:
      - "${KAFKA_PORT}:9092"
      - "${ZK_PORT:-32181}:32181"
"#;
        let file = ComposeFile::parse_with_env(Path::new("c.yml"), content, &vars).unwrap();
        let kafka = file.service("kafka").unwrap();
        assert_eq!(kafka.ports[0].published, Some(PortRange::single(19092)));
        assert_eq!(kafka.ports[1].published, Some(PortRange::single(32181)));
        assert_eq!(
            file.variables.iter().map(String::as_str).collect::<Vec<_>>(),
            ["KAFKA_PORT", "ZK_PORT"]
        );
    }

    #[test]
    fn test_malformed_inputs() {
        let path = Path::new("bad.yml");
        for content in [
            "services: [",
            "version: '3'\n",
            "services:\n  kafka:\n    ports:\n      - \"not-a-port\"\n",
            "services:\n  kafka:\n    ports:\n      - \"${PORT:?PORT must be set}:9092\"\n",
        ] {
            let err = ComposeFile::parse(path, content).unwrap_err();
            assert!(
                matches!(err, EnvError::MalformedComposeFile { .. }),
                "unexpected error for {:?}: {:?}",
                content,
                err
            );
        }
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.yaml");

        let err = ComposeFile::load(&path).unwrap_err();
        assert!(matches!(err, EnvError::ComposeFileNotFound(p) if p == path));
    }

    #[test]
    fn test_load_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("docker-compose.yaml");
        fs::write(&path, KAFKA_CLUSTER).unwrap();

        let file = ComposeFile::load(&path).unwrap();
        assert_eq!(file.path, path);
        assert_eq!(file.services.len(), 3);
    }
}
