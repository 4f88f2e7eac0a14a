//! Configuration resolution: CLI flags layered over an optional TOML file.
//!
//! Precedence, lowest to highest: built-in defaults, the `[server]` table
//! of a `--config` file, then CLI flags. This mirrors the layering used
//! elsewhere in the corpus for long-running network services: a `clap`
//! struct for the command line, a `serde`-deserialized struct for the file,
//! and a final resolved `Config` that callers actually use.

use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

/// Command-line arguments for the server.
#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "A small HTTP/1.1 static-file server", long_about = None)]
pub struct CliArgs {
    /// TCP port to listen on.
    pub port: Option<u16>,

    /// Path to a TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Filesystem prefix prepended to request targets.
    #[arg(long = "doc-root")]
    pub doc_root: Option<PathBuf>,

    /// Number of worker threads.
    #[arg(long)]
    pub threads: Option<usize>,

    /// Maximum number of requests allowed to wait in the task queue.
    #[arg(long = "max-requests")]
    pub max_requests: Option<usize>,

    /// Maximum number of simultaneous connections.
    #[arg(long = "max-connections")]
    pub max_connections: Option<usize>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long = "log-level")]
    pub log_level: Option<String>,
}

/// `[server]` table of a TOML configuration file.
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerSection,
}

/// Per-field TOML configuration, all optional so a file may override only
/// what it cares about.
#[derive(Debug, Deserialize, Default)]
pub struct ServerSection {
    pub port: Option<u16>,
    pub doc_root: Option<PathBuf>,
    pub threads: Option<usize>,
    pub max_requests: Option<usize>,
    pub max_connections: Option<usize>,
    pub log_level: Option<String>,
}

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port to listen on.
    pub port: u16,
    /// Filesystem prefix prepended to request targets.
    pub doc_root: PathBuf,
    /// Number of worker threads in the bounded pool.
    pub threads: usize,
    /// Capacity of the bounded task queue.
    pub max_requests: usize,
    /// Cap on simultaneous connections (`MAX_FD` in the original design).
    pub max_connections: usize,
    /// Capacity of each connection's read buffer, in bytes.
    pub read_buffer_size: usize,
    /// Capacity of each connection's response buffer, in bytes.
    pub response_buffer_size: usize,
    /// Level passed to the tracing `EnvFilter`.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 0,
            doc_root: PathBuf::from("/var/www"),
            threads: 8,
            max_requests: 10_000,
            max_connections: 65_536,
            read_buffer_size: 2048,
            response_buffer_size: 1024,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Resolves configuration from `std::env::args()` and, if named, a TOML
    /// file. CLI flags take precedence over the file; the file takes
    /// precedence over built-in defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_cli(CliArgs::parse())
    }

    /// Resolves configuration from an already-parsed [`CliArgs`]. Split out
    /// from [`Config::load`] so tests can supply arguments directly instead
    /// of going through `std::env::args()`.
    pub fn from_cli(cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = match &cli.config {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .map_err(|e| ConfigError::FileRead(path.clone(), e))?;
                toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.clone(), e))?
            }
            None => TomlConfig::default(),
        };

        let defaults = Config::default();
        let server = toml_config.server;

        let port = cli
            .port
            .or(server.port)
            .ok_or(ConfigError::MissingPort)?;

        Ok(Config {
            port,
            doc_root: cli.doc_root.or(server.doc_root).unwrap_or(defaults.doc_root),
            threads: cli.threads.or(server.threads).unwrap_or(defaults.threads),
            max_requests: cli
                .max_requests
                .or(server.max_requests)
                .unwrap_or(defaults.max_requests),
            max_connections: cli
                .max_connections
                .or(server.max_connections)
                .unwrap_or(defaults.max_connections),
            log_level: cli
                .log_level
                .or(server.log_level)
                .unwrap_or(defaults.log_level),
            ..defaults
        })
    }
}

/// Errors surfaced while resolving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file named by `--config` could not be read.
    #[error("could not read config file {0}: {1}")]
    FileRead(std::path::PathBuf, #[source] std::io::Error),

    /// The file's contents were not valid TOML, or didn't match the
    /// expected schema.
    #[error("could not parse config file {0}: {1}")]
    Parse(std::path::PathBuf, #[source] toml::de::Error),

    /// No port was given on the command line and none was set in the
    /// config file.
    #[error(
        "no port specified: pass it as `server <port>` or set `[server] port` in the config file"
    )]
    MissingPort,
}

#[cfg(test)]
mod test {
    use super::*;

    fn cli(port: Option<u16>) -> CliArgs {
        CliArgs {
            port,
            config: None,
            doc_root: None,
            threads: None,
            max_requests: None,
            max_connections: None,
            log_level: None,
        }
    }

    #[test]
    fn resolves_defaults_when_only_port_given() {
        let config = Config::from_cli(cli(Some(8080))).unwrap();
        assert_eq!(8080, config.port);
        assert_eq!(8, config.threads);
        assert_eq!(10_000, config.max_requests);
        assert_eq!(65_536, config.max_connections);
        assert_eq!("info", config.log_level);
    }

    #[test]
    fn missing_port_is_an_error() {
        let err = Config::from_cli(cli(None)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingPort));
    }

    #[test]
    fn cli_overrides_defaults() {
        let mut args = cli(Some(9090));
        args.threads = Some(4);
        args.log_level = Some("debug".to_string());
        let config = Config::from_cli(args).unwrap();
        assert_eq!(4, config.threads);
        assert_eq!("debug", config.log_level);
    }
}
