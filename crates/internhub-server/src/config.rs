//! Server configuration
//!
//! Loaded from TOML (`--config`, else `config/internhub.toml` when present,
//! else defaults), then overridden by `INTERNHUB_*` environment variables.

use anyhow::{bail, Context, Result};
use chrono::Duration;
use internhub_service::context::default_content_types;
use internhub_service::{Settings, TokenSigner, DEFAULT_MAX_UPLOAD_BYTES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Searched when no `--config` is given
pub const DEFAULT_CONFIG_PATH: &str = "config/internhub.toml";

/// Longest accepted session lifetime (ten years)
pub const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; `*` allows any, empty allows none
    pub cors_origins: Vec<String>,
    /// Request body cap, uploads included
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
            // room for multipart framing around the largest upload
            max_body_bytes: DEFAULT_MAX_UPLOAD_BYTES as usize + 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub token_ttl_secs: u64,
    /// 32-byte ed25519 seed, hex. Generated per process when absent.
    pub signing_key_hex: Option<String>,
    pub password_rounds: u32,
    pub bootstrap_admin_email: Option<String>,
    pub bootstrap_admin_password: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: 24 * 60 * 60,
            signing_key_hex: None,
            password_rounds: Settings::default().password_rounds,
            bootstrap_admin_email: None,
            bootstrap_admin_password: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub documents_dir: PathBuf,
    /// No persistence when absent
    pub snapshot_path: Option<PathBuf>,
    /// 0 disables the periodic flush; a final snapshot is still written
    pub snapshot_interval_secs: u64,
    pub max_upload_bytes: u64,
    pub allowed_content_types: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            documents_dir: PathBuf::from("data/documents"),
            snapshot_path: Some(PathBuf::from("data/internhub.json")),
            snapshot_interval_secs: 60,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_content_types: default_content_types(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// File (explicit or default location) plus environment, validated
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(DEFAULT_CONFIG_PATH)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `INTERNHUB_*` overrides from `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = lookup("INTERNHUB_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("INTERNHUB_PORT is not a port number: {port}"))?;
        }
        if let Some(host) = lookup("INTERNHUB_HOST") {
            self.server.host = host;
        }
        if let Some(dir) = lookup("INTERNHUB_STORAGE_DIR") {
            self.storage.documents_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("INTERNHUB_SNAPSHOT_PATH") {
            self.storage.snapshot_path = (!path.is_empty()).then(|| PathBuf::from(path));
        }
        if let Some(key) = lookup("INTERNHUB_SIGNING_KEY") {
            self.auth.signing_key_hex = Some(key);
        }
        if let Some(email) = lookup("INTERNHUB_ADMIN_EMAIL") {
            self.auth.bootstrap_admin_email = Some(email);
        }
        if let Some(password) = lookup("INTERNHUB_ADMIN_PASSWORD") {
            self.auth.bootstrap_admin_password = Some(password);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            bail!("server.host must not be empty");
        }
        if self.auth.token_ttl_secs == 0 {
            bail!("auth.token_ttl_secs must be positive");
        }
        if self.auth.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            bail!(
                "auth.token_ttl_secs ({}) exceeds the maximum of {MAX_TOKEN_TTL_SECS}",
                self.auth.token_ttl_secs
            );
        }
        if self.auth.password_rounds == 0 {
            bail!("auth.password_rounds must be positive");
        }
        if self.storage.max_upload_bytes == 0 {
            bail!("storage.max_upload_bytes must be positive");
        }
        if self.storage.max_upload_bytes as usize > self.server.max_body_bytes {
            bail!(
                "storage.max_upload_bytes ({}) exceeds server.max_body_bytes ({})",
                self.storage.max_upload_bytes,
                self.server.max_body_bytes
            );
        }
        if self.storage.allowed_content_types.is_empty() {
            bail!("storage.allowed_content_types must list at least one type");
        }
        match (
            &self.auth.bootstrap_admin_email,
            &self.auth.bootstrap_admin_password,
        ) {
            (Some(_), None) | (None, Some(_)) => {
                bail!("bootstrap admin needs both an email and a password")
            }
            _ => Ok(()),
        }
    }

    /// Service tunables
    pub fn settings(&self) -> Settings {
        let mut settings = Settings::default()
            .with_password_rounds(self.auth.password_rounds)
            .with_max_upload_bytes(self.storage.max_upload_bytes);
        settings.allowed_content_types = self
            .storage
            .allowed_content_types
            .iter()
            .map(|t| t.trim().to_ascii_lowercase())
            .collect();
        settings
    }

    /// Token signer from the configured seed, or a fresh key
    pub fn token_signer(&self) -> Result<TokenSigner> {
        if self.auth.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            bail!("auth.token_ttl_secs is too large");
        }
        let ttl = Duration::seconds(
            i64::try_from(self.auth.token_ttl_secs).context("auth.token_ttl_secs is too large")?,
        );
        match &self.auth.signing_key_hex {
            Some(seed) => TokenSigner::from_hex_seed(seed, ttl)
                .context("auth.signing_key_hex is not a valid 32-byte hex seed"),
            None => {
                warn!("no signing key configured; sessions will not survive a restart");
                Ok(TokenSigner::generate(ttl))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9000

            [storage]
            snapshot_interval_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.storage.snapshot_interval_secs, 5);
        assert_eq!(config.auth.token_ttl_secs, 86_400);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("internhub.toml");
        std::fs::write(
            &path,
            concat!(
                "[auth]\n",
                "bootstrap_admin_email = \"a@b.test\"\n",
                "bootstrap_admin_password = \"pass-1234\"\n",
            ),
        )
        .unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.auth.bootstrap_admin_email.as_deref(), Some("a@b.test"));
        config.validate().unwrap();

        let err = Config::from_file(dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));

        std::fs::write(&path, "[server]\nport = \"eighty\"\n").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("INTERNHUB_PORT", "3000"),
            ("INTERNHUB_HOST", "0.0.0.0"),
            ("INTERNHUB_SNAPSHOT_PATH", ""),
            ("INTERNHUB_ADMIN_EMAIL", "root@example.org"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.snapshot_path, None);
        assert_eq!(config.auth.bootstrap_admin_email.as_deref(), Some("root@example.org"));
        // email without password
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_port_is_reported() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(|k| (k == "INTERNHUB_PORT").then(|| "http".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("INTERNHUB_PORT"));
    }

    #[test]
    fn test_upload_limit_must_fit_body_limit() {
        let mut config = Config::default();
        config.server.max_body_bytes = 1024;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_token_ttl_is_rejected() {
        let mut config = Config::default();
        config.auth.token_ttl_secs = 100_000_000_000_000_000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("auth.token_ttl_secs"));
        assert!(config.token_signer().is_err());

        config.auth.token_ttl_secs = MAX_TOKEN_TTL_SECS;
        config.validate().unwrap();
        assert!(config.token_signer().is_ok());
    }

    #[test]
    fn test_signing_key_seed() {
        let mut config = Config::default();
        config.auth.signing_key_hex = Some("00".repeat(32));
        assert!(config.token_signer().is_ok());
        config.auth.signing_key_hex = Some("zz".into());
        assert!(config.token_signer().is_err());
    }
}
