// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Webhook Configuration Types
//
// Defines the configuration schema for an origin-guard deployment:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Governed CSI driver and candidate ordering
// - Admission server bind settings
// - API server access for listing and backfilling volumes
// - Logging settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::domain::provenance::CandidateOrder;
use crate::domain::volume::DEFAULT_TARGET_DRIVER;

pub const CONFIG_API_VERSION: &str = "origin-guard.io/v1";
pub const CONFIG_KIND: &str = "WebhookConfig";

/// Top-level Kubernetes-style configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfigManifest {
    /// API version (must be "origin-guard.io/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "WebhookConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: WebhookConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfigSpec {
    /// CSI driver whose volumes are governed; all others pass through
    #[serde(default = "default_target_driver")]
    pub target_driver: String,

    #[serde(default)]
    pub resolution: ResolutionConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub cluster: ClusterConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionConfig {
    #[serde(default)]
    pub candidate_order: CandidateOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Network bind address (e.g. "0.0.0.0" or "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Serve HTTPS with this certificate; plain HTTP when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,
}

/// PEM certificate chain and private key for the webhook server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsConfig {
    pub cert_path: String,
    pub key_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    /// API server base URL
    #[serde(default = "default_api_server")]
    pub api_server: String,

    /// Bearer token file; skipped when it does not exist
    #[serde(default = "default_token_path")]
    pub token_path: String,

    /// PEM bundle trusted for the API server certificate
    #[serde(default = "default_ca_path", skip_serializing_if = "Option::is_none")]
    pub ca_path: Option<String>,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

// Default value functions
fn default_target_driver() -> String {
    DEFAULT_TARGET_DRIVER.to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9443
}

fn default_api_server() -> String {
    "https://kubernetes.default.svc".to_string()
}

fn default_token_path() -> String {
    "/var/run/secrets/kubernetes.io/serviceaccount/token".to_string()
}

fn default_ca_path() -> Option<String> {
    Some("/var/run/secrets/kubernetes.io/serviceaccount/ca.crt".to_string())
}

/// Must stay below the webhook `timeoutSeconds` registered with the API
/// server (10s by default)
fn default_timeout_seconds() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            tls: None,
        }
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            api_server: default_api_server(),
            token_path: default_token_path(),
            ca_path: default_ca_path(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Default for WebhookConfigSpec {
    fn default() -> Self {
        Self {
            target_driver: default_target_driver(),
            resolution: ResolutionConfig::default(),
            server: ServerConfig::default(),
            cluster: ClusterConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WebhookConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "origin-guard".to_string());

        Self {
            api_version: CONFIG_API_VERSION.to_string(),
            kind: CONFIG_KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: WebhookConfigSpec::default(),
        }
    }
}

impl WebhookConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Discover configuration file using precedence order
    /// 1. ORIGIN_GUARD_CONFIG_PATH environment variable
    /// 2. ./origin-guard.yaml (working directory)
    /// 3. ~/.origin-guard/config.yaml (user home)
    /// 4. /etc/origin-guard/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("ORIGIN_GUARD_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./origin-guard.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".origin-guard").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/origin-guard/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path must load
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides()?;
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides()?;
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides()?;
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source. An override that
    /// does not parse is an error.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(driver) = lookup("ORIGIN_GUARD_TARGET_DRIVER") {
            tracing::info!("Environment override: ORIGIN_GUARD_TARGET_DRIVER={}", driver);
            self.spec.target_driver = driver;
        }

        if let Some(val) = lookup("ORIGIN_GUARD_CANDIDATE_ORDER") {
            let order = val.parse::<CandidateOrder>().map_err(|e| {
                anyhow::anyhow!("Invalid value for ORIGIN_GUARD_CANDIDATE_ORDER: {}", e)
            })?;
            tracing::info!("Environment override: ORIGIN_GUARD_CANDIDATE_ORDER={}", val);
            self.spec.resolution.candidate_order = order;
        }

        // In-cluster service discovery, as injected into every pod
        if let (Some(host), Some(port)) = (
            lookup("KUBERNETES_SERVICE_HOST"),
            lookup("KUBERNETES_SERVICE_PORT"),
        ) {
            let host = if host.contains(':') {
                format!("[{}]", host)
            } else {
                host
            };
            self.spec.cluster.api_server = format!("https://{}:{}", host, port);
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != CONFIG_API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                CONFIG_API_VERSION
            );
        }

        if self.kind != CONFIG_KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, CONFIG_KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.target_driver.trim().is_empty() {
            anyhow::bail!("spec.targetDriver cannot be empty");
        }

        let api_server = &self.spec.cluster.api_server;
        if !api_server.starts_with("http://") && !api_server.starts_with("https://") {
            anyhow::bail!(
                "spec.cluster.apiServer must start with http:// or https://, got '{}'",
                api_server
            );
        }

        if let Some(tls) = &self.spec.server.tls {
            if tls.cert_path.trim().is_empty() || tls.key_path.trim().is_empty() {
                anyhow::bail!("spec.server.tls requires both certPath and keyPath");
            }
        }

        if self.spec.cluster.timeout_seconds == 0 {
            anyhow::bail!("spec.cluster.timeoutSeconds must be greater than zero");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let manifest = WebhookConfigManifest::default();
        assert_eq!(manifest.api_version, CONFIG_API_VERSION);
        assert_eq!(manifest.kind, CONFIG_KIND);
        assert!(!manifest.metadata.name.is_empty());
        assert_eq!(manifest.spec.target_driver, DEFAULT_TARGET_DRIVER);
        assert_eq!(manifest.spec.resolution.candidate_order, CandidateOrder::AsListed);
        assert_eq!(manifest.spec.server.port, 9443);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
apiVersion: origin-guard.io/v1
kind: WebhookConfig
metadata:
  name: test-webhook
spec:
  resolution:
    candidateOrder: stable
  logging:
    format: json
"#;
        let manifest = WebhookConfigManifest::from_yaml_str(yaml).unwrap();
        assert_eq!(manifest.metadata.name, "test-webhook");
        assert_eq!(manifest.spec.target_driver, DEFAULT_TARGET_DRIVER);
        assert_eq!(manifest.spec.resolution.candidate_order, CandidateOrder::Stable);
        assert_eq!(manifest.spec.logging.format, LogFormat::Json);
        assert_eq!(manifest.spec.logging.level, "info");
        assert_eq!(manifest.spec.cluster.timeout_seconds, 5);
    }

    #[test]
    fn test_server_tls_section() {
        let yaml = r#"
apiVersion: origin-guard.io/v1
kind: WebhookConfig
metadata:
  name: tls-webhook
spec:
  server:
    port: 8443
    tls:
      certPath: /etc/webhook/certs/tls.crt
      keyPath: /etc/webhook/certs/tls.key
"#;
        let mut manifest = WebhookConfigManifest::from_yaml_str(yaml).unwrap();
        assert_eq!(manifest.spec.server.port, 8443);
        assert_eq!(manifest.spec.server.bind_address, "0.0.0.0");
        assert_eq!(
            manifest.spec.server.tls,
            Some(TlsConfig {
                cert_path: "/etc/webhook/certs/tls.crt".to_string(),
                key_path: "/etc/webhook/certs/tls.key".to_string(),
            })
        );
        assert!(manifest.validate().is_ok());

        if let Some(tls) = manifest.spec.server.tls.as_mut() {
            tls.key_path = String::new();
        }
        assert!(manifest.validate().is_err());
        assert!(WebhookConfigManifest::default().spec.server.tls.is_none());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut manifest = WebhookConfigManifest::default();
        manifest.spec.target_driver = "nfs.csi.example.com".to_string();
        manifest.spec.cluster.ca_path = None;

        let yaml = manifest.to_yaml_string().unwrap();
        let parsed = WebhookConfigManifest::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed.spec.target_driver, "nfs.csi.example.com");
        assert_eq!(parsed.metadata.name, manifest.metadata.name);
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("origin-guard.yaml");
        std::fs::write(
            &path,
            "apiVersion: origin-guard.io/v1\nkind: WebhookConfig\nmetadata:\n  name: from-file\n",
        )
        .unwrap();

        let manifest = WebhookConfigManifest::load_or_default(Some(path)).unwrap();
        assert_eq!(manifest.metadata.name, "from-file");
    }

    #[test]
    fn test_explicit_missing_path_fails() {
        let result = WebhookConfigManifest::load_or_default(Some(PathBuf::from(
            "/nonexistent/origin-guard.yaml",
        )));
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides() {
        let mut manifest = WebhookConfigManifest::default();
        let vars: HashMap<&str, &str> = HashMap::from([
            ("ORIGIN_GUARD_TARGET_DRIVER", "other.csi.io"),
            ("ORIGIN_GUARD_CANDIDATE_ORDER", "stable"),
            ("KUBERNETES_SERVICE_HOST", "10.96.0.1"),
            ("KUBERNETES_SERVICE_PORT", "443"),
        ]);

        manifest
            .apply_overrides_from(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(manifest.spec.target_driver, "other.csi.io");
        assert_eq!(manifest.spec.resolution.candidate_order, CandidateOrder::Stable);
        assert_eq!(manifest.spec.cluster.api_server, "https://10.96.0.1:443");
    }

    #[test]
    fn test_invalid_order_override_rejected() {
        let mut manifest = WebhookConfigManifest::default();
        let err = manifest
            .apply_overrides_from(|key| {
                (key == "ORIGIN_GUARD_CANDIDATE_ORDER").then(|| "shuffled".to_string())
            })
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("ORIGIN_GUARD_CANDIDATE_ORDER"), "{message}");
        assert!(message.contains("shuffled"), "{message}");
        assert_eq!(manifest.spec.resolution.candidate_order, CandidateOrder::AsListed);
    }

    #[test]
    fn test_default_timeout_below_webhook_deadline() {
        assert!(ClusterConfig::default().timeout_seconds < 10);
    }

    #[test]
    fn test_ipv6_service_host() {
        let mut manifest = WebhookConfigManifest::default();
        manifest
            .apply_overrides_from(|key| match key {
                "KUBERNETES_SERVICE_HOST" => Some("fd00::1".to_string()),
                "KUBERNETES_SERVICE_PORT" => Some("443".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(manifest.spec.cluster.api_server, "https://[fd00::1]:443");
    }

    #[test]
    fn test_validation() {
        let mut manifest = WebhookConfigManifest::default();
        assert!(manifest.validate().is_ok());

        manifest.api_version = "wrong/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = CONFIG_API_VERSION.to_string();

        manifest.kind = "NodeConfig".to_string();
        assert!(manifest.validate().is_err());
        manifest.kind = CONFIG_KIND.to_string();

        manifest.spec.target_driver = "  ".to_string();
        assert!(manifest.validate().is_err());
        manifest.spec.target_driver = DEFAULT_TARGET_DRIVER.to_string();

        manifest.spec.cluster.api_server = "kubernetes.default.svc".to_string();
        assert!(manifest.validate().is_err());
        manifest.spec.cluster.api_server = "https://kubernetes.default.svc".to_string();

        manifest.spec.cluster.timeout_seconds = 0;
        assert!(manifest.validate().is_err());
    }
}
