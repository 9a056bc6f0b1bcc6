//! Gateway configuration: a TOML file naming the listen address, the
//! descriptor set to load, the route table, and the directory records for
//! deployments that pin backend addresses instead of running a registry.
use portico_core::route::Endpoint;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const SUPPORTED_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "PATCH"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Path to the encoded `FileDescriptorSet` the message catalog is built
    /// from.
    pub descriptor_set: PathBuf,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_lookup_timeout_secs")]
    pub lookup_timeout_secs: u64,

    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Pinned backend addresses, keyed by fully-qualified service name.
    #[serde(default)]
    pub directory: HashMap<String, String>,

    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_request_timeout_secs() -> u64 {
    portico_core::gateway::DEFAULT_REQUEST_TIMEOUT.as_secs()
}

fn default_connect_timeout_secs() -> u64 {
    portico_core::channel::DEFAULT_CONNECT_TIMEOUT.as_secs()
}

fn default_lookup_timeout_secs() -> u64 {
    portico_core::directory::DEFAULT_LOOKUP_TIMEOUT.as_secs()
}

fn default_probe_timeout_secs() -> u64 {
    portico_core::health::DEFAULT_PROBE_TIMEOUT.as_secs()
}

impl GatewayConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: GatewayConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoints.is_empty() {
            return Err(ConfigError::Validation(
                "at least one endpoint is required".to_string(),
            ));
        }
        for endpoint in &self.endpoints {
            if !SUPPORTED_METHODS.contains(&endpoint.method.to_uppercase().as_str()) {
                return Err(ConfigError::Validation(format!(
                    "endpoint {}: unsupported HTTP method {:?}",
                    endpoint.path, endpoint.method
                )));
            }
            if !endpoint.path.starts_with('/') {
                return Err(ConfigError::Validation(format!(
                    "endpoint path {:?} must start with '/'",
                    endpoint.path
                )));
            }
            if endpoint.grpc_service.is_empty() || endpoint.grpc_method.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "endpoint {}: grpc_service and grpc_method are required",
                    endpoint.path
                )));
            }
        }
        Ok(())
    }
}
