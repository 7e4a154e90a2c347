//! Value types for groups and network endpoints.
//!
//! `GroupName` is the stable identity of one primary/replica group and
//! anchors that group's position on the shard ring. `Endpoint` is a plain
//! `(host, port)` value with structural equality.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Stable, configuration-supplied name of one primary/replica group.
///
/// The name identifies the group for the whole process lifetime; the
/// group's primary endpoint may change underneath it on failover.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupName(String);

impl GroupName {
    /// Creates a group name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for GroupName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A reachable `(host, port)` pair.
///
/// Equality is structural. Used both for backend primaries and for
/// sentinel addresses; DNS resolution is deferred to the connector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Hostname or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Endpoint {
    /// Creates an endpoint.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Errors parsing a `host:port` string into an [`Endpoint`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointParseError {
    /// No `:` separator present.
    #[error("missing ':' separator in endpoint {input:?}")]
    MissingSeparator {
        /// The offending input.
        input: String,
    },

    /// The host part is empty.
    #[error("empty host in endpoint {input:?}")]
    EmptyHost {
        /// The offending input.
        input: String,
    },

    /// The port part is not a valid u16.
    #[error("invalid port {port:?} in endpoint {input:?}")]
    InvalidPort {
        /// The offending input.
        input: String,
        /// The unparseable port text.
        port: String,
    },
}

impl FromStr for Endpoint {
    type Err = EndpointParseError;

    /// Parses `host:port`. The split is on the last `:` so bracketed or
    /// unbracketed IPv6 hosts keep their colons.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) =
            s.rsplit_once(':')
                .ok_or_else(|| EndpointParseError::MissingSeparator {
                    input: s.to_string(),
                })?;

        if host.is_empty() {
            return Err(EndpointParseError::EmptyHost {
                input: s.to_string(),
            });
        }

        let port = port
            .parse::<u16>()
            .map_err(|_| EndpointParseError::InvalidPort {
                input: s.to_string(),
                port: port.to_string(),
            })?;

        Ok(Self::new(host, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_name_display() {
        let group = GroupName::new("m1");
        assert_eq!(format!("{group}"), "m1");
        assert_eq!(group.as_str(), "m1");
    }

    #[test]
    fn test_endpoint_structural_equality() {
        let a = Endpoint::new("10.0.0.1", 6379);
        let b = Endpoint::new("10.0.0.1", 6379);
        let c = Endpoint::new("10.0.0.1", 6380);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_endpoint_display() {
        let ep = Endpoint::new("redis-1.internal", 6379);
        assert_eq!(format!("{ep}"), "redis-1.internal:6379");
    }

    #[test]
    fn test_endpoint_parse() {
        let ep: Endpoint = "10.0.0.1:6379".parse().unwrap();
        assert_eq!(ep, Endpoint::new("10.0.0.1", 6379));
    }

    #[test]
    fn test_endpoint_parse_ipv6_keeps_host_colons() {
        let ep: Endpoint = "::1:6379".parse().unwrap();
        assert_eq!(ep.host, "::1");
        assert_eq!(ep.port, 6379);
    }

    #[test]
    fn test_endpoint_parse_rejects_missing_separator() {
        let err = "localhost".parse::<Endpoint>().unwrap_err();
        assert!(matches!(err, EndpointParseError::MissingSeparator { .. }));
    }

    #[test]
    fn test_endpoint_parse_rejects_bad_port() {
        let err = "localhost:not-a-port".parse::<Endpoint>().unwrap_err();
        assert!(matches!(err, EndpointParseError::InvalidPort { .. }));

        let err = "localhost:70000".parse::<Endpoint>().unwrap_err();
        assert!(matches!(err, EndpointParseError::InvalidPort { .. }));
    }

    #[test]
    fn test_endpoint_parse_rejects_empty_host() {
        let err = ":6379".parse::<Endpoint>().unwrap_err();
        assert!(matches!(err, EndpointParseError::EmptyHost { .. }));
    }
}
