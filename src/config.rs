//! Layered configuration: built-in defaults, `docktuna.toml`, then
//! `DOCKTUNA_*` environment variables (`__` separates nested keys).
//!
//! ```text
//! DOCKTUNA_LOGLEVEL=debug
//! DOCKTUNA_SECRETS_DIR=/tmp/secrets
//! DOCKTUNA_DATABASE__PASSWORD=env:TUNING_DBS_PASSWORD
//! DOCKTUNA_DATABASE__URL=sqlite:///tmp/studies.db
//! ```

use std::path::PathBuf;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::secrets::{Credential, DEFAULT_SECRETS_DIR, SecretResolver, default_dotenv_path};
use crate::url::ConnectionUrl;

/// File consulted after the built-in defaults.
pub const CONFIG_FILE: &str = "docktuna.toml";

/// Prefix of the environment variables consulted last.
pub const ENV_PREFIX: &str = "DOCKTUNA_";

/// How to reach the tuning database.
///
/// `Debug` hides literal credentials and the password of a configured `url`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// URL scheme, driver suffix included.
    pub scheme: String,
    /// Database user.
    pub username: Credential,
    /// Password of `username`; percent-encoded into the URL.
    pub password: Credential,
    /// Database holding the studies.
    pub db_name: Credential,
    /// Host name of the database server.
    pub hostname: Credential,
    /// A complete URL used instead of the assembled one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl core::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("scheme", &self.scheme)
            .field("username", &self.username)
            .field("password", &self.password)
            .field("db_name", &self.db_name)
            .field("hostname", &self.hostname)
            .field(
                "url",
                &self
                    .url
                    .as_ref()
                    .map(|raw| ConnectionUrl::from_raw(raw.as_str()).to_string()),
            )
            .finish()
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::dotenv()
    }
}

impl DatabaseConfig {
    /// Non-secret values from the environment or `.env` file, the password
    /// from a secret file.
    #[must_use]
    pub fn dotenv() -> Self {
        Self {
            scheme: "postgresql+psycopg2".to_string(),
            username: Credential::Env("TUNING_DBS_USER".to_string()),
            password: Credential::File("tuningdb_tuner_password".to_string()),
            db_name: Credential::Env("MODEL_TUNING_DB_NAME".to_string()),
            hostname: Credential::Env("POSTGRES_DBS_HOST".to_string()),
            url: None,
        }
    }

    /// Every value from a secret file.
    #[must_use]
    pub fn docker_secrets() -> Self {
        Self {
            scheme: "postgresql+psycopg2".to_string(),
            username: Credential::File("tuning_dbs_user".to_string()),
            password: Credential::File("tuningdb_tuner_password".to_string()),
            db_name: Credential::File("model_tuning_db_name".to_string()),
            hostname: Credential::File("postgres_dbs_host".to_string()),
            url: None,
        }
    }
}

/// Top-level configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one file per secret.
    pub secrets_dir: PathBuf,
    /// `.env` file consulted for variables missing from the environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dotenv_path: Option<PathBuf>,
    /// Default `tracing` filter for the binaries when `RUST_LOG` is unset.
    pub loglevel: String,
    /// Where the studies live.
    pub database: DatabaseConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            secrets_dir: PathBuf::from(DEFAULT_SECRETS_DIR),
            dotenv_path: default_dotenv_path(),
            loglevel: "info".to_string(),
            database: DatabaseConfig::default(),
        }
    }
}

impl Config {
    /// The provider stack behind [`Config::load`].
    #[must_use]
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads the configuration from every layer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a layer is malformed.
    pub fn load() -> Result<Self> {
        Self::extract(&Self::figment())
    }

    /// Extracts a configuration from an arbitrary provider stack.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the providers do not describe a valid
    /// configuration.
    pub fn extract(figment: &Figment) -> Result<Self> {
        figment.extract().map_err(|e| Error::Config(e.to_string()))
    }

    /// A resolver over the configured secrets directory and `.env` file.
    #[must_use]
    pub fn resolver(&self) -> SecretResolver {
        SecretResolver::new(self.secrets_dir.clone(), self.dotenv_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_toml(toml: &str) -> Result<Config> {
        Config::extract(
            &Figment::from(Serialized::defaults(Config::default())).merge(Toml::string(toml)),
        )
    }

    #[test]
    fn defaults_use_dotenv_preset() {
        let config = with_toml("").unwrap();
        assert_eq!(config.database, DatabaseConfig::dotenv());
        assert_eq!(config.secrets_dir, PathBuf::from("/run/secrets"));
        assert_eq!(config.loglevel, "info");
        assert_eq!(
            config.database.password,
            Credential::File("tuningdb_tuner_password".to_string())
        );
    }

    #[test]
    fn toml_overrides_single_credential() {
        let config = with_toml(
            r#"
            secrets_dir = "/tmp/secrets"

            [database]
            hostname = "value:localhost"
            "#,
        )
        .unwrap();
        assert_eq!(config.secrets_dir, PathBuf::from("/tmp/secrets"));
        assert_eq!(
            config.database.hostname,
            Credential::Value("localhost".to_string())
        );
        assert_eq!(
            config.database.username,
            Credential::Env("TUNING_DBS_USER".to_string())
        );
    }

    #[test]
    fn malformed_credential_is_config_error() {
        let err = with_toml("[database]\nusername = \"tuner\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn docker_secrets_preset_reads_files() {
        let db = DatabaseConfig::docker_secrets();
        for (cred, name) in [
            (&db.username, "tuning_dbs_user"),
            (&db.password, "tuningdb_tuner_password"),
            (&db.db_name, "model_tuning_db_name"),
            (&db.hostname, "postgres_dbs_host"),
        ] {
            assert_eq!(cred, &Credential::File(name.to_string()));
        }
    }

    #[test]
    fn resolver_uses_configured_paths() {
        let mut config = Config::default();
        config.secrets_dir = PathBuf::from("/tmp/elsewhere");
        assert_eq!(
            config.resolver().secrets_dir(),
            std::path::Path::new("/tmp/elsewhere")
        );
    }
}
