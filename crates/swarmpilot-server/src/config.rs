use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    /// Declarative stack file configuration
    #[serde(default)]
    pub stack: StackConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// Default derived via field defaults

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        // Orchestrator validations
        if matches!(self.orchestrator.backend, OrchestratorBackend::Docker)
            && self.orchestrator.endpoint.is_empty()
        {
            return Err("orchestrator.endpoint must be set for the docker backend".into());
        }
        // Stack validation
        if self.stack.file.as_os_str().is_empty() {
            return Err("stack.file must not be empty".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Which orchestrator backend the server talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrchestratorBackend {
    /// Docker Engine REST API (requires a swarm manager endpoint)
    #[default]
    Docker,
    /// In-process backend, useful for tests and local development
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub backend: OrchestratorBackend,
    /// Engine endpoint, e.g. `http://localhost:2375`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            backend: OrchestratorBackend::default(),
            endpoint: default_endpoint(),
        }
    }
}

fn default_endpoint() -> String {
    "http://localhost:2375".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackConfig {
    /// Path of the declarative stack file, relative to the process
    #[serde(default = "default_stack_file")]
    pub file: PathBuf,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            file: default_stack_file(),
        }
    }
}

fn default_stack_file() -> PathBuf {
    PathBuf::from("swarm-stack.yml")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if pathbuf.exists() {
                    builder = builder.add_source(File::from(pathbuf));
                }
            }
            None => {
                // Try default root-level file
                let default_path = PathBuf::from("swarmpilot.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., SWARMPILOT__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("SWARMPILOT")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
