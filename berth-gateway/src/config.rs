//! Gateway configuration, read from environment variables.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use berth_engine::{DockerConnector, EngineConnector, MemoryConnector};

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_BASE_PATH: &str = "/api/orchestrator";

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// `BERTH_ENGINE` names an engine this build does not know.
    #[error("unknown engine '{0}'; expected 'docker' or 'memory'")]
    UnknownEngine(String),

    /// `BERTH_LISTEN_ADDR` is set but empty.
    #[error("listen address must not be empty")]
    EmptyListenAddr,
}

/// Which container engine the gateway talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    /// A Docker-compatible daemon, located through the ambient environment.
    #[default]
    Docker,
    /// The in-process engine. State is lost on exit.
    Memory,
}

impl FromStr for EngineKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docker" => Ok(Self::Docker),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::UnknownEngine(s.to_owned())),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Docker => "docker",
            Self::Memory => "memory",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct GatewayConfig {
    /// Address to bind, `host:port`.
    pub listen_addr: String,
    /// Prefix for the API routes. Empty mounts them at the root.
    pub base_path: String,
    pub engine: EngineKind,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_owned(),
            base_path: DEFAULT_BASE_PATH.to_owned(),
            engine: EngineKind::Docker,
        }
    }
}

impl GatewayConfig {
    /// Read `BERTH_LISTEN_ADDR`, `BERTH_BASE_PATH` and `BERTH_ENGINE`.
    ///
    /// # Errors
    /// See [`GatewayConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    ///
    /// # Errors
    /// Returns [`ConfigError::UnknownEngine`] for an unrecognised engine and
    /// [`ConfigError::EmptyListenAddr`] for a blank listen address.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let listen_addr =
            lookup("BERTH_LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_owned());
        if listen_addr.trim().is_empty() {
            return Err(ConfigError::EmptyListenAddr);
        }

        let base_path = normalize_base_path(
            &lookup("BERTH_BASE_PATH").unwrap_or_else(|| DEFAULT_BASE_PATH.to_owned()),
        );

        let engine = match lookup("BERTH_ENGINE") {
            Some(raw) => raw.parse()?,
            None => EngineKind::default(),
        };

        Ok(Self {
            listen_addr,
            base_path,
            engine,
        })
    }

    /// Connector for the configured engine.
    #[must_use]
    pub fn connector(&self) -> Arc<dyn EngineConnector> {
        match self.engine {
            EngineKind::Docker => Arc::new(DockerConnector::new()),
            EngineKind::Memory => Arc::new(MemoryConnector::new()),
        }
    }
}

/// Normalise a route prefix to `/a/b` form, or `""` for the root.
#[must_use]
pub fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn config_defaults_when_unset() {
        let config = match GatewayConfig::from_lookup(lookup(&[])) {
            Ok(c) => c,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(config, GatewayConfig::default());
    }

    #[test]
    fn config_reads_all_variables() {
        let config = match GatewayConfig::from_lookup(lookup(&[
            ("BERTH_LISTEN_ADDR", "0.0.0.0:9000"),
            ("BERTH_BASE_PATH", "api/v1/"),
            ("BERTH_ENGINE", "Memory"),
        ])) {
            Ok(c) => c,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(config.listen_addr, "0.0.0.0:9000");
        assert_eq!(config.base_path, "/api/v1");
        assert_eq!(config.engine, EngineKind::Memory);
    }

    #[test]
    fn config_unknown_engine_is_rejected() {
        let result = GatewayConfig::from_lookup(lookup(&[("BERTH_ENGINE", "podman-ish")]));
        assert!(matches!(result, Err(ConfigError::UnknownEngine(ref e)) if e == "podman-ish"));
    }

    #[test]
    fn config_blank_listen_addr_is_rejected() {
        let result = GatewayConfig::from_lookup(lookup(&[("BERTH_LISTEN_ADDR", "  ")]));
        assert!(matches!(result, Err(ConfigError::EmptyListenAddr)));
    }

    #[test]
    fn normalize_base_path_handles_root_and_slashes() {
        assert_eq!(normalize_base_path(""), "");
        assert_eq!(normalize_base_path("/"), "");
        assert_eq!(normalize_base_path("/api/orchestrator/"), "/api/orchestrator");
        assert_eq!(normalize_base_path("api"), "/api");
    }
}
