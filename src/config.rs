//! Configuration manager for onboard.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::FromRef;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::AppState;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Instance name.
    pub name: String,
    /// Domain name of current instance, also used as token issuer.
    pub url: String,
    #[serde(default)]
    version: String,
    #[serde(skip)]
    path: PathBuf,
    /// Registration behaviour toggles.
    #[serde(default)]
    pub registration: Registration,
    /// Related to JsonWebToken configuration.
    #[serde(skip_serializing)]
    pub token: Option<Token>,
    /// Related to PostgreSQL configuration.
    #[serde(skip_serializing)]
    pub postgres: Option<Postgres>,
    /// Related to Argon2 configuration.
    #[serde(skip_serializing)]
    pub argon2: Option<Argon2>,
}

/// Registration options.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    /// Lowercase and trim emails before the duplicate check and storage.
    /// Off by default: two addresses differing only by case are then
    /// distinct identities, compared as stored.
    #[serde(default)]
    pub normalize_email: bool,
}

/// PostgreSQL configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Postgres {
    /// Hostname:(?port) for PostgreSQL instance.
    pub address: String,
    /// Database name.
    pub database: Option<String>,
    /// Username credential to connect.
    pub username: Option<String>,
    /// Password credential to connect.
    pub password: Option<String>,
    /// Maximum pool connections.
    pub pool_size: Option<u32>,
}

/// Argon2 configuration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Argon2 {
    /// Memory used while hashing.
    pub memory_cost: u32,
    /// Iterations of hash.
    pub iterations: u32,
    /// Parallelism degree.
    pub parallelism: u32,
    /// Output hash length.
    pub hash_length: usize,
}

impl Default for Argon2 {
    fn default() -> Self {
        Self {
            memory_cost: 1024 * 64, // 64 MiB.
            iterations: 4,
            parallelism: 2,
            hash_length: 32,
        }
    }
}

/// Json Web Token configuration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Symmetric signing secret shared by the whole process.
    pub secret: String,
    /// Token lifetime in seconds. Default is 100 hours.
    pub expires_in: Option<u64>,
}

impl FromRef<AppState> for Arc<Configuration> {
    fn from_ref(state: &AppState) -> Arc<Configuration> {
        Arc::clone(&state.config)
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Normalizes a URL string by ensuring it starts with a valid scheme
    /// (`http` or `https`).
    fn normalize_url(&self, url: &str) -> Result<String, url::ParseError> {
        let url_with_scheme =
            if url.starts_with("http://") || url.starts_with("https://") {
                url.to_string()
            } else {
                format!("https://{url}")
            };

        let parsed_url = Url::parse(&url_with_scheme)?;
        Ok(parsed_url.to_string())
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location.
    pub fn read(self) -> Result<Arc<Self>, url::ParseError> {
        let default_path = Path::new(DEFAULT_CONFIG_PATH).to_path_buf();
        let file_path = if self.path.is_file() {
            &self.path
        } else {
            &default_path
        };

        match File::open(file_path) {
            Ok(file) => {
                let mut config: Configuration =
                    match serde_yaml::from_reader(file) {
                        Ok(config) => config,
                        Err(err) => {
                            return Ok(Arc::new(self.error(err)));
                        },
                    };

                // set app version.
                config.version = VERSION.to_owned();

                // normalize issuer URL.
                config.url = self.normalize_url(&config.url)?;

                Ok(Arc::new(config))
            },
            Err(err) => Ok(Arc::new(self.error(err))),
        }
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, "`config.yaml` file not found");
        Self {
            version: VERSION.to_owned(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
name: onboard
url: onboard.example.com
registration:
  normalize_email: true
token:
  secret: not-a-real-secret
  expires_in: 360000
postgres:
  address: localhost:5432
  database: onboard
argon2:
  memory_cost: 65536
  iterations: 4
  parallelism: 2
  hash_length: 32
"#;

    #[test]
    fn test_read_sample_file() {
        let path = std::env::temp_dir().join("onboard-config-test.yaml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config =
            Configuration::default().path(path.clone()).read().unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.name, "onboard");
        assert_eq!(config.url, "https://onboard.example.com/");
        assert!(config.registration.normalize_email);

        let token = config.token.as_ref().unwrap();
        assert_eq!(token.secret, "not-a-real-secret");
        assert_eq!(token.expires_in, Some(360_000));

        let postgres = config.postgres.as_ref().unwrap();
        assert_eq!(postgres.address, "localhost:5432");
        assert_eq!(postgres.database.as_deref(), Some("onboard"));
        assert_eq!(postgres.username, None);

        assert_eq!(config.argon2, Some(Argon2::default()));
    }

    #[test]
    fn test_registration_defaults() {
        let config: Configuration =
            serde_yaml::from_str("name: onboard\nurl: example.com").unwrap();
        assert!(!config.registration.normalize_email);
        assert!(config.token.is_none());
        assert!(config.argon2.is_none());
    }
}
