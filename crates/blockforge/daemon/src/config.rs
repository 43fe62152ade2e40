//! Configuration for the blockforge daemon

use std::net::SocketAddr;
use std::path::PathBuf;

use blockforge_queue::QueueConfig;
use blockforge_toolchain::{ToolchainConfig, WorkspaceConfig};
use serde::{Deserialize, Serialize};

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// HTTP server
    #[serde(default)]
    pub server: ServerConfig,

    /// Job and artifact persistence
    #[serde(default)]
    pub storage: StorageConfig,

    /// Worker pool and submission channel
    #[serde(default)]
    pub queue: QueueConfig,

    /// Per-job workspace directories
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Compiler binaries and limits
    #[serde(default)]
    pub toolchain: ToolchainConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Maximum request body size in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            enable_cors: true,
            max_body_size: default_max_body_size(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage; jobs are lost on restart
    #[default]
    Memory,

    /// JSON files under a data directory
    File {
        /// Data directory
        path: PathBuf,
    },
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level, used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

// Above the validator's 1 MiB source ceiling, so oversized sources get a
// validation code rather than 413.
fn default_max_body_size() -> usize {
    4 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Layer defaults, then the optional file, then `FORGE_*` variables
    /// (`FORGE_QUEUE__WORKERS=8`).
    pub fn load(path: Option<&str>) -> Result<Self, ::config::ConfigError> {
        let mut builder = ::config::Config::builder();

        builder = builder.add_source(::config::Config::try_from(&DaemonConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(::config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("FORGE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.server.listen_addr.port(), 8080);
        assert!(matches!(config.storage, StorageConfig::Memory));
        assert_eq!(config.queue.workers, 4);
        assert_eq!(config.toolchain.timeout_secs, 120);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = DaemonConfig::load(None).unwrap();
        assert!(config.server.enable_cors);
        assert_eq!(config.workspace.prefix, "forge-job-");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[queue]
workers = 2

[storage]
type = "file"
path = "/var/lib/forge"

[toolchain]
timeout_secs = 30
"#
        )
        .unwrap();

        let config = DaemonConfig::load(file.path().to_str()).unwrap();
        assert_eq!(config.queue.workers, 2);
        assert_eq!(config.toolchain.timeout_secs, 30);
        assert_eq!(config.toolchain.solc_path, PathBuf::from("solc"));
        match config.storage {
            StorageConfig::File { path } => assert_eq!(path, PathBuf::from("/var/lib/forge")),
            other => panic!("unexpected storage {:?}", other),
        }
    }
}
