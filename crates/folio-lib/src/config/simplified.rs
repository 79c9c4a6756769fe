use std::path::PathBuf;
use std::sync::OnceLock;

use crate::errors::{FolioError, Result};

/// Immutable application configuration initialized once at startup from environment variables.
///
/// Access via `SimplifiedConfig::get()` which returns a `&'static SimplifiedConfig`.
/// Dropbox app credentials are only read from the environment, never from disk.
pub struct SimplifiedConfig {
    pub home_dir: PathBuf,
    pub folio_dir: PathBuf,
    pub download_dir: PathBuf,
    pub cache_db_file: PathBuf,
    pub dropbox_app_key: Option<String>,
    pub dropbox_app_secret: Option<String>,
    pub dropbox_refresh_token: Option<String>,
}

/// App key, app secret and refresh token for the Dropbox app.
#[derive(Debug, Clone)]
pub struct DropboxCredentials {
    pub app_key: String,
    pub app_secret: String,
    pub refresh_token: String,
}

static CONFIG: OnceLock<SimplifiedConfig> = OnceLock::new();

pub const ENV_APP_KEY: &str = "FOLIO_DROPBOX_APP_KEY";
pub const ENV_APP_SECRET: &str = "FOLIO_DROPBOX_APP_SECRET";
pub const ENV_REFRESH_TOKEN: &str = "FOLIO_DROPBOX_REFRESH_TOKEN";

impl SimplifiedConfig {
    /// Returns a reference to the global `SimplifiedConfig` singleton.
    /// Initializes from environment variables on first call.
    pub fn get() -> &'static SimplifiedConfig {
        CONFIG.get_or_init(SimplifiedConfig::from_env)
    }

    fn from_env() -> Self {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        let home_dir = PathBuf::from(&home);
        let folio_dir = home_dir.join(".folio");

        Self {
            download_dir: home_dir.join("Downloads"),
            cache_db_file: folio_dir.join("asset-cache.db"),
            dropbox_app_key: non_empty_var(ENV_APP_KEY),
            dropbox_app_secret: non_empty_var(ENV_APP_SECRET),
            dropbox_refresh_token: non_empty_var(ENV_REFRESH_TOKEN),
            folio_dir,
            home_dir,
        }
    }

    /// All three Dropbox secrets, or a `Config` error naming the first missing one.
    pub fn dropbox_credentials(&self) -> Result<DropboxCredentials> {
        let missing = |name: &str| FolioError::Config(format!("{name} is not set"));
        Ok(DropboxCredentials {
            app_key: self
                .dropbox_app_key
                .clone()
                .ok_or_else(|| missing(ENV_APP_KEY))?,
            app_secret: self
                .dropbox_app_secret
                .clone()
                .ok_or_else(|| missing(ENV_APP_SECRET))?,
            refresh_token: self
                .dropbox_refresh_token
                .clone()
                .ok_or_else(|| missing(ENV_REFRESH_TOKEN))?,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(key: Option<&str>, secret: Option<&str>, refresh: Option<&str>) -> SimplifiedConfig {
        SimplifiedConfig {
            home_dir: PathBuf::from("/tmp"),
            folio_dir: PathBuf::from("/tmp/.folio"),
            download_dir: PathBuf::from("/tmp/Downloads"),
            cache_db_file: PathBuf::from("/tmp/.folio/asset-cache.db"),
            dropbox_app_key: key.map(String::from),
            dropbox_app_secret: secret.map(String::from),
            dropbox_refresh_token: refresh.map(String::from),
        }
    }

    #[test]
    fn test_dropbox_credentials_complete() {
        let cfg = config_with(Some("key"), Some("secret"), Some("refresh"));
        let creds = cfg.dropbox_credentials().unwrap();
        assert_eq!(creds.app_key, "key");
        assert_eq!(creds.app_secret, "secret");
        assert_eq!(creds.refresh_token, "refresh");
    }

    #[test]
    fn test_dropbox_credentials_missing_secret() {
        let cfg = config_with(Some("key"), None, Some("refresh"));
        match cfg.dropbox_credentials().unwrap_err() {
            FolioError::Config(msg) => assert!(msg.contains(ENV_APP_SECRET)),
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    #[test]
    fn test_singleton_paths_under_folio_dir() {
        let cfg = SimplifiedConfig::get();
        assert!(cfg.cache_db_file.starts_with(&cfg.folio_dir));
        assert!(cfg.folio_dir.ends_with(".folio"));
    }
}
