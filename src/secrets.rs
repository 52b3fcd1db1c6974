//! Credential resolution from secret files, the environment, and `.env` files.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Where a single credential comes from.
///
/// Written as `kind:name`, e.g. `env:TUNING_DBS_USER`,
/// `file:tuningdb_tuner_password` or `value:tuner`, so a single environment
/// variable can override a credential of any kind.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Credential {
    /// A literal value.
    Value(String),
    /// The name of a file in the secrets directory.
    File(String),
    /// The name of an environment variable, also looked up in the `.env` file.
    Env(String),
}

impl Credential {
    /// The identifier reported when the credential cannot be found.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Value(_) => "<literal>",
            Self::File(name) | Self::Env(name) => name,
        }
    }
}

impl core::fmt::Debug for Credential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Value(_) => f.write_str("Value(***)"),
            Self::File(name) => f.debug_tuple("File").field(name).finish(),
            Self::Env(name) => f.debug_tuple("Env").field(name).finish(),
        }
    }
}

impl core::str::FromStr for Credential {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some(("env", name)) if !name.is_empty() => Ok(Self::Env(name.to_string())),
            Some(("file", name)) if !name.is_empty() => Ok(Self::File(name.to_string())),
            Some(("value", value)) => Ok(Self::Value(value.to_string())),
            _ => Err(Error::Config(format!(
                "credential '{s}' must start with env:, file: or value:"
            ))),
        }
    }
}

impl TryFrom<String> for Credential {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Credential> for String {
    fn from(credential: Credential) -> Self {
        match credential {
            Credential::Value(v) => format!("value:{v}"),
            Credential::File(name) => format!("file:{name}"),
            Credential::Env(name) => format!("env:{name}"),
        }
    }
}

/// Reads secrets on demand. Nothing is cached: every call hits the filesystem
/// or the environment again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretResolver {
    secrets_dir: PathBuf,
    dotenv_path: Option<PathBuf>,
}

/// Default directory for mounted secret files.
pub(crate) const DEFAULT_SECRETS_DIR: &str = "/run/secrets";

/// The `.env` file read when a variable is missing from the process environment.
#[must_use]
pub(crate) fn default_dotenv_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join("project/docker/databases/tuning_dbs.env"))
}

impl Default for SecretResolver {
    fn default() -> Self {
        Self::new(DEFAULT_SECRETS_DIR, default_dotenv_path())
    }
}

impl SecretResolver {
    /// Creates a resolver over `secrets_dir`, falling back to `dotenv_path`
    /// for environment lookups.
    pub fn new(secrets_dir: impl Into<PathBuf>, dotenv_path: Option<PathBuf>) -> Self {
        Self {
            secrets_dir: secrets_dir.into(),
            dotenv_path,
        }
    }

    /// The directory holding one file per secret.
    #[must_use]
    pub fn secrets_dir(&self) -> &Path {
        &self.secrets_dir
    }

    /// Reads `secrets_dir/name` and trims surrounding whitespace.
    ///
    /// # Errors
    ///
    /// [`Error::SecretNotFound`] when the file does not exist,
    /// [`Error::SecretUnreadable`] for any other I/O failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use docktuna::SecretResolver;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// std::fs::write(dir.path().join("db_password"), "s3cret\n").unwrap();
    ///
    /// let resolver = SecretResolver::new(dir.path(), None);
    /// assert_eq!(resolver.read_secret("db_password").unwrap(), "s3cret");
    /// assert!(resolver.read_secret("missing").is_err());
    /// ```
    pub fn read_secret(&self, name: &str) -> Result<String> {
        match std::fs::read_to_string(self.secrets_dir.join(name)) {
            Ok(contents) => Ok(contents.trim().to_string()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::SecretNotFound {
                name: name.to_string(),
            }),
            Err(source) => Err(Error::SecretUnreadable {
                name: name.to_string(),
                source,
            }),
        }
    }

    /// Looks up `name` in the process environment, then in the `.env` file.
    ///
    /// The file is parsed on every call and never loaded into the process
    /// environment.
    ///
    /// # Errors
    ///
    /// [`Error::SecretNotFound`] when neither source defines the variable.
    pub fn read_env(&self, name: &str) -> Result<String> {
        if let Ok(value) = std::env::var(name) {
            return Ok(value);
        }
        self.read_dotenv(name)?.ok_or_else(|| Error::SecretNotFound {
            name: name.to_string(),
        })
    }

    fn read_dotenv(&self, name: &str) -> Result<Option<String>> {
        let Some(path) = &self.dotenv_path else {
            return Ok(None);
        };
        let iter = match dotenvy::from_path_iter(path) {
            Ok(iter) => iter,
            Err(dotenvy::Error::Io(e)) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Config(format!("{}: {e}", path.display()))),
        };
        for item in iter {
            let (key, value) =
                item.map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
            if key == name {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Resolves a credential to its current value.
    ///
    /// # Errors
    ///
    /// See [`read_secret`](Self::read_secret) and [`read_env`](Self::read_env).
    pub fn resolve(&self, credential: &Credential) -> Result<String> {
        match credential {
            Credential::Value(value) => Ok(value.clone()),
            Credential::File(name) => self.read_secret(name),
            Credential::Env(name) => self.read_env(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver_with_env(contents: &str) -> (tempfile::TempDir, SecretResolver) {
        let dir = tempfile::tempdir().unwrap();
        let env_path = dir.path().join("tuning_dbs.env");
        std::fs::write(&env_path, contents).unwrap();
        let resolver = SecretResolver::new(dir.path(), Some(env_path));
        (dir, resolver)
    }

    #[test]
    fn secret_file_is_trimmed() {
        let (dir, resolver) = resolver_with_env("");
        std::fs::write(dir.path().join("pw"), "  hunter2 \n").unwrap();
        assert_eq!(resolver.read_secret("pw").unwrap(), "hunter2");
    }

    #[test]
    fn missing_secret_names_identifier() {
        let (_dir, resolver) = resolver_with_env("");
        let err = resolver.read_secret("tuningdb_tuner_password").unwrap_err();
        assert!(matches!(&err, Error::SecretNotFound { name } if name == "tuningdb_tuner_password"));
        assert!(err.to_string().contains("tuningdb_tuner_password"));
    }

    #[test]
    fn directory_in_place_of_secret_is_unreadable() {
        let (dir, resolver) = resolver_with_env("");
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        assert!(matches!(
            resolver.read_secret("nested"),
            Err(Error::SecretUnreadable { .. })
        ));
    }

    #[test]
    fn dotenv_file_supplies_variables() {
        let (_dir, resolver) =
            resolver_with_env("DOCKTUNA_TEST_ONLY_USER=tuner\nDOCKTUNA_TEST_ONLY_HOST=db\n");
        assert_eq!(resolver.read_env("DOCKTUNA_TEST_ONLY_USER").unwrap(), "tuner");
        assert_eq!(resolver.read_env("DOCKTUNA_TEST_ONLY_HOST").unwrap(), "db");
    }

    #[test]
    fn dotenv_is_reread_on_every_call() {
        let (dir, resolver) = resolver_with_env("DOCKTUNA_TEST_ONLY_DB=first\n");
        assert_eq!(resolver.read_env("DOCKTUNA_TEST_ONLY_DB").unwrap(), "first");
        std::fs::write(
            dir.path().join("tuning_dbs.env"),
            "DOCKTUNA_TEST_ONLY_DB=second\n",
        )
        .unwrap();
        assert_eq!(resolver.read_env("DOCKTUNA_TEST_ONLY_DB").unwrap(), "second");
    }

    #[test]
    fn absent_variable_is_not_found() {
        let resolver = SecretResolver::new("/nonexistent", None);
        assert!(matches!(
            resolver.read_env("DOCKTUNA_TEST_ONLY_ABSENT"),
            Err(Error::SecretNotFound { .. })
        ));
    }

    #[test]
    fn missing_dotenv_file_is_not_an_error() {
        let resolver =
            SecretResolver::new("/nonexistent", Some(PathBuf::from("/nonexistent/x.env")));
        assert!(matches!(
            resolver.read_env("DOCKTUNA_TEST_ONLY_ABSENT"),
            Err(Error::SecretNotFound { .. })
        ));
    }

    #[test]
    fn resolve_dispatches_on_kind() {
        let (dir, resolver) = resolver_with_env("DOCKTUNA_TEST_ONLY_NAME=optuna_db\n");
        std::fs::write(dir.path().join("pw"), "pw\n").unwrap();

        let literal = Credential::Value("x".to_string());
        assert_eq!(resolver.resolve(&literal).unwrap(), "x");
        assert_eq!(
            resolver.resolve(&Credential::File("pw".to_string())).unwrap(),
            "pw"
        );
        assert_eq!(
            resolver
                .resolve(&Credential::Env("DOCKTUNA_TEST_ONLY_NAME".to_string()))
                .unwrap(),
            "optuna_db"
        );
    }

    #[test]
    fn credential_parses_kind_prefix() {
        let cred: Credential = serde_json::from_str(r#""env:TUNING_DBS_USER""#).unwrap();
        assert_eq!(cred, Credential::Env("TUNING_DBS_USER".to_string()));
        assert_eq!(cred.name(), "TUNING_DBS_USER");

        let literal: Credential = "value:a:b".parse().unwrap();
        assert_eq!(literal, Credential::Value("a:b".to_string()));
        assert_eq!(String::from(literal), "value:a:b");

        assert!(matches!(
            "TUNING_DBS_USER".parse::<Credential>(),
            Err(Error::Config(_))
        ));
        assert!("file:".parse::<Credential>().is_err());
    }
}
