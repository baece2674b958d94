// Port declarations inside a compose service
// Handles the short ("127.0.0.1:8080:80/udp") and long ({target, published}) forms

use serde::Deserialize;
use std::fmt;

/// Inclusive range of ports; a single port is a range of one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    pub fn single(port: u16) -> Self {
        Self {
            start: port,
            end: port,
        }
    }

    pub fn contains(&self, port: u16) -> bool {
        self.start <= port && port <= self.end
    }

    /// Parse "80" or "8000-8010"
    pub fn parse(value: &str) -> Result<Self, String> {
        let value = value.trim();
        let parse_one = |s: &str| {
            s.trim()
                .parse::<u16>()
                .map_err(|_| format!("invalid port '{}'", value))
        };

        let range = match value.split_once('-') {
            Some((start, end)) => Self {
                start: parse_one(start)?,
                end: parse_one(end)?,
            },
            None => Self::single(parse_one(value)?),
        };

        if range.start > range.end {
            return Err(format!("invalid port range '{}'", value));
        }
        Ok(range)
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// One entry of a service's `ports:` list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    pub host_ip: Option<String>,
    pub published: Option<PortRange>,
    pub target: PortRange,
    pub protocol: String,
}

impl PortSpec {
    /// Parse the short syntax: [HOST_IP:][PUBLISHED:]TARGET[/PROTOCOL]
    pub fn parse_short(value: &str) -> Result<Self, String> {
        let value = value.trim();
        if value.is_empty() {
            return Err("empty port mapping".to_string());
        }

        let (mapping, protocol) = match value.rsplit_once('/') {
            Some((mapping, protocol)) => (mapping, protocol.to_string()),
            None => (value, "tcp".to_string()),
        };

        // Bracketed IPv6 host address
        let (host_ip, rest) = if let Some(stripped) = mapping.strip_prefix('[') {
            let (ip, rest) = stripped
                .split_once("]:")
                .ok_or_else(|| format!("invalid port mapping '{}'", value))?;
            (Some(ip.to_string()), rest)
        } else {
            (None, mapping)
        };

        let parts: Vec<&str> = rest.rsplitn(3, ':').collect();
        let (host_ip, published, target) = match parts.as_slice() {
            [target] => (host_ip, None, *target),
            [target, published] => (host_ip, Some(*published), *target),
            [target, published, ip] if host_ip.is_none() && !ip.contains(':') => {
                (Some(ip.to_string()), Some(*published), *target)
            }
            _ => return Err(format!("invalid port mapping '{}'", value)),
        };

        let published = match published {
            Some(p) if !p.trim().is_empty() => Some(PortRange::parse(p)?),
            _ => None,
        };

        Ok(Self {
            host_ip: host_ip.filter(|ip| !ip.is_empty()),
            published,
            target: PortRange::parse(target)?,
            protocol,
        })
    }

    /// True for a TCP mapping whose container side includes `port`
    pub fn targets(&self, port: u16) -> bool {
        self.protocol.eq_ignore_ascii_case("tcp") && self.target.contains(port)
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ip) = &self.host_ip {
            write!(f, "{}:", ip)?;
        }
        if let Some(published) = &self.published {
            write!(f, "{}:", published)?;
        }
        write!(f, "{}/{}", self.target, self.protocol)
    }
}

/// Scalar that compose accepts as either a number or a string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum NumberOrString {
    Number(u64),
    Text(String),
}

impl NumberOrString {
    pub(crate) fn as_text(&self) -> String {
        match self {
            NumberOrString::Number(n) => n.to_string(),
            NumberOrString::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LongPortSyntax {
    target: NumberOrString,
    #[serde(default)]
    published: Option<NumberOrString>,
    #[serde(default)]
    host_ip: Option<String>,
    #[serde(default)]
    protocol: Option<String>,
}

/// Raw `ports:` entry as it appears in YAML
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawPort {
    Short(NumberOrString),
    Long(LongPortSyntax),
}

impl RawPort {
    pub(crate) fn into_spec(self) -> Result<PortSpec, String> {
        match self {
            RawPort::Short(short) => PortSpec::parse_short(&short.as_text()),
            RawPort::Long(long) => {
                let published = match long.published {
                    Some(p) => {
                        let text = p.as_text();
                        if text.trim().is_empty() {
                            None
                        } else {
                            Some(PortRange::parse(&text)?)
                        }
                    }
                    None => None,
                };
                Ok(PortSpec {
                    host_ip: long.host_ip,
                    published,
                    target: PortRange::parse(&long.target.as_text())?,
                    protocol: long.protocol.unwrap_or_else(|| "tcp".to_string()),
                })
            }
        }
    }
}
