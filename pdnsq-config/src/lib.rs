//! Configuration loading for pdnsq.
//!
//! Presents the selected backend's configuration as `(system, key, value)`
//! triples (§6: "Configuration loading presents `(system_name, key, value)`
//! triples to the core") and the CLI/environment-derived knobs as a
//! strongly-typed [`Knobs`] struct.

mod knobs;

pub use knobs::{Batching, Sorting, TimeFormat, Transforms};

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    default_system: Option<String>,
    #[serde(default)]
    systems: HashMap<String, HashMap<String, String>>,
}

/// Resolved configuration: which backend system to use, its `(key, value)`
/// settings, and the process-wide knobs.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub default_system: Option<String>,
    pub systems: HashMap<String, HashMap<String, String>>,
    pub knobs: Knobs,
}

impl Config {
    /// The config file search order: `$DNSDBQ_CONFIG`, `~/.dnsdbq.conf`,
    /// `$XDG_CONFIG_HOME/dnsdbq/config.toml`.
    #[must_use]
    pub fn path() -> Option<PathBuf> {
        if let Ok(path) = env::var("DNSDBQ_CONFIG") {
            return Some(PathBuf::from(path));
        }
        if let Some(home) = dirs::home_dir() {
            let candidate = home.join(".dnsdbq.conf");
            if candidate.exists() {
                return Some(candidate);
            }
        }
        dirs::config_dir().map(|dir| dir.join("dnsdbq").join("config.toml"))
    }

    /// Loads configuration from the given path (or the default search
    /// order, if `None`), then applies environment-variable overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved_path = path.map(Path::to_path_buf).or_else(Self::path);

        let raw = match resolved_path {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                toml::from_str::<RawConfig>(&text)
                    .map_err(|source| ConfigError::Parse { path, source })?
            }
            _ => RawConfig::default(),
        };

        let mut config = Config {
            default_system: raw.default_system,
            systems: raw.systems,
            knobs: Knobs::default(),
        };

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(system) = env::var("DNSDBQ_SYSTEM") {
            tracing::debug!(system, "DNSDBQ_SYSTEM overrides configured default_system");
            self.default_system = Some(system);
        }
        if let Ok(format) = env::var("DNSDBQ_TIME_FORMAT") {
            self.knobs.time_format = TimeFormat::parse(&format);
        }
    }

    /// The `(key, value)` triples for one system, in the order spec.md §1
    /// describes them being handed to the backend's `setenv` hook.
    #[must_use]
    pub fn triples_for(&self, system: &str) -> Vec<(String, String, String)> {
        self.systems
            .get(system)
            .map(|kv| {
                kv.iter()
                    .map(|(k, v)| (system.to_string(), k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_systems_and_default() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            default_system = "dnsdb2"

            [systems.dnsdb2]
            apikey = "secret"
            server = "https://api.dnsdb.info/dnsdb/v2"
            "#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.default_system.as_deref(), Some("dnsdb2"));
        let triples = config.triples_for("dnsdb2");
        assert!(triples.iter().any(|(_, k, v)| k == "apikey" && v == "secret"));
    }

    #[test]
    fn env_system_overrides_file_default() {
        // SAFETY-equivalent: test env vars are process-local to the test
        // binary; no other test reads DNSDBQ_SYSTEM concurrently in this crate.
        unsafe {
            env::set_var("DNSDBQ_SYSTEM", "circl");
        }
        let config = Config::load(None).unwrap();
        assert_eq!(config.default_system.as_deref(), Some("circl"));
        unsafe {
            env::remove_var("DNSDBQ_SYSTEM");
        }
    }

    #[test]
    fn missing_file_yields_empty_config() {
        let config = Config::load(Some(Path::new("/nonexistent/path/does-not-exist.toml")))
            .unwrap();
        assert!(config.systems.is_empty());
    }
}
