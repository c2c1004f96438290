//! CLI settings
//!
//! Layered, later sources winning:
//! 1. `~/.datalayer/credentials.json`, written by `datalayer login`
//! 2. `~/.datalayer/config.yml`
//! 3. `DATALAYER_*` environment variables
//! 4. command line flags

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use config::{Config, Environment, File, FileFormat};
use datalayer_common::DEFAULT_RUN_URL;
use datalayer_sdk::DatalayerClientConfig;
use serde::{Deserialize, Serialize};

const SETTINGS_DIR: &str = ".datalayer";
const CONFIG_FILE: &str = "config.yml";
const CREDENTIALS_FILE: &str = "credentials.json";
const UPLOADS_FILE: &str = "uploads.json";

#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    #[serde(default = "default_run_url")]
    pub run_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Seconds to wait for a deleted snapshot to disappear
    #[serde(default = "default_snapshot_delete_timeout")]
    pub snapshot_delete_timeout_secs: u64,
}

fn default_run_url() -> String {
    DEFAULT_RUN_URL.to_string()
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_read_timeout_ms() -> u64 {
    30000
}

fn default_snapshot_delete_timeout() -> u64 {
    300
}

/// Values given on the command line
#[derive(Debug, Default)]
pub struct Overrides<'a> {
    pub run_url: Option<&'a str>,
    pub token: Option<&'a str>,
}

/// Token remembered between invocations
#[derive(Debug, Serialize, Deserialize)]
pub struct Credentials {
    pub run_url: String,
    pub token: String,
}

/// `~/.datalayer`
pub fn settings_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(SETTINGS_DIR))
        .ok_or_else(|| anyhow!("Could not determine home directory"))
}

impl Settings {
    pub fn load(dir: &Path, overrides: &Overrides) -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(
                File::from(dir.join(CREDENTIALS_FILE))
                    .format(FileFormat::Json)
                    .required(false),
            )
            .add_source(
                File::from(dir.join(CONFIG_FILE))
                    .format(FileFormat::Yaml)
                    .required(false),
            )
            .add_source(Environment::with_prefix("DATALAYER").try_parsing(true));

        if let Some(run_url) = overrides.run_url {
            builder = builder.set_override("run_url", run_url)?;
        }
        if let Some(token) = overrides.token {
            builder = builder.set_override("token", token)?;
        }

        builder
            .build()
            .with_context(|| format!("Failed to read settings from {}", dir.display()))?
            .try_deserialize()
            .context("Invalid settings")
    }

    pub fn client_config(&self) -> DatalayerClientConfig {
        let defaults = DatalayerClientConfig::default();
        DatalayerClientConfig {
            run_urls: vec![self.run_url.clone()],
            token: self.token.clone().filter(|t| !t.trim().is_empty()),
            handle: self.handle.clone().unwrap_or_default(),
            password: self.password.clone().unwrap_or_default(),
            connect_timeout_ms: self.connect_timeout_ms,
            read_timeout_ms: self.read_timeout_ms,
            snapshot_deletion: defaults
                .snapshot_deletion
                .clone()
                .with_timeout(std::time::Duration::from_secs(self.snapshot_delete_timeout_secs)),
            ..defaults
        }
    }
}

/// Where unfinished snapshot uploads are remembered
pub fn uploads_file(dir: &Path) -> PathBuf {
    dir.join(UPLOADS_FILE)
}

pub fn save_credentials(dir: &Path, credentials: &Credentials) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(CREDENTIALS_FILE);
    std::fs::write(&path, serde_json::to_vec_pretty(credentials)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    restrict_permissions(&path)
}

/// Forget the stored token; returns whether one was stored
pub fn remove_credentials(dir: &Path) -> Result<bool> {
    let path = dir.join(CREDENTIALS_FILE);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to restrict permissions of {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(dir.path(), &Overrides::default()).unwrap();

        assert_eq!(settings.connect_timeout_ms, 5000);
        assert_eq!(settings.read_timeout_ms, 30000);
        assert_eq!(settings.snapshot_delete_timeout_secs, 300);
    }

    #[test]
    fn test_config_file_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "run_url: https://oss.datalayer.run\nread_timeout_ms: 1000\nhandle: ada\n",
        )
        .unwrap();

        let settings = Settings::load(dir.path(), &Overrides::default()).unwrap();
        assert_eq!(settings.run_url, "https://oss.datalayer.run");
        assert_eq!(settings.read_timeout_ms, 1000);
        assert_eq!(settings.handle.as_deref(), Some("ada"));

        let overrides = Overrides {
            run_url: Some("http://localhost:8888"),
            token: Some("flag-token"),
        };
        let settings = Settings::load(dir.path(), &overrides).unwrap();
        assert_eq!(settings.run_url, "http://localhost:8888");
        assert_eq!(settings.token.as_deref(), Some("flag-token"));
    }

    #[test]
    fn test_credentials_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let settings_dir = dir.path().join(SETTINGS_DIR);

        save_credentials(
            &settings_dir,
            &Credentials {
                run_url: "http://localhost:8888".to_string(),
                token: "stored-token".to_string(),
            },
        )
        .unwrap();

        let settings = Settings::load(&settings_dir, &Overrides::default()).unwrap();
        assert_eq!(settings.token.as_deref(), Some("stored-token"));
        assert_eq!(settings.run_url, "http://localhost:8888");

        assert!(remove_credentials(&settings_dir).unwrap());
        assert!(!remove_credentials(&settings_dir).unwrap());
    }

    #[test]
    fn test_client_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "token: ''\nsnapshot_delete_timeout_secs: 60\n",
        )
        .unwrap();

        let settings = Settings::load(dir.path(), &Overrides::default()).unwrap();
        let config = settings.client_config();
        assert!(config.token.is_none());
        assert_eq!(config.snapshot_deletion.timeout.as_secs(), 60);
        assert_eq!(config.run_urls.len(), 1);
    }
}
