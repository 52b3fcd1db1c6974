//! The study registry: study lookup, creation and reporting on top of a
//! credential-driven database connection.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::{Config, DatabaseConfig};
use crate::error::{Error, Result};
use crate::logging::{self, Verbosity};
use crate::param::ParamValue;
use crate::pruner::Pruner;
use crate::sampler::Sampler;
use crate::secrets::SecretResolver;
use crate::storage::{RdbStorage, Storage};
use crate::study::{Study, StudySummary, get_all_study_summaries};
use crate::types::Direction;
use crate::url::ConnectionUrl;

/// Opens a storage handle for a connection URL.
pub type StorageOpener = Arc<dyn Fn(&ConnectionUrl) -> Result<Arc<dyn Storage>> + Send + Sync>;

fn open_rdb(url: &ConnectionUrl) -> Result<Arc<dyn Storage>> {
    Ok(Arc::new(RdbStorage::open(url.expose())?))
}

/// How [`StudyRegistry::get_study_with`] configures a study it creates or loads.
#[derive(Clone, Default)]
pub struct StudyOptions {
    /// Direction for a newly created study. Loaded studies keep theirs.
    pub direction: Direction,
    /// Sampler for the returned handle; random sampling if `None`.
    pub sampler: Option<Arc<dyn Sampler>>,
    /// Pruner for the returned handle; never prunes if `None`.
    pub pruner: Option<Arc<dyn Pruner>>,
}

impl core::fmt::Debug for StudyOptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StudyOptions")
            .field("direction", &self.direction)
            .field("has_sampler", &self.sampler.is_some())
            .field("has_pruner", &self.pruner.is_some())
            .finish()
    }
}

impl StudyOptions {
    /// Options for a study that maximizes its objective.
    #[must_use]
    pub fn maximize() -> Self {
        Self {
            direction: Direction::Maximize,
            ..Self::default()
        }
    }
}

/// Access point for every study in the tuning database.
///
/// The registry stores only *where* credentials come from. Each
/// [`storage`](Self::storage) call resolves them again, builds the URL and
/// opens a fresh handle, so a rotated password is picked up without a
/// restart.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use docktuna::config::DatabaseConfig;
/// use docktuna::{MemoryStorage, SecretResolver, Storage, StudyRegistry};
///
/// let mut database = DatabaseConfig::default();
/// database.url = Some("sqlite://:memory:".to_string());
///
/// // Hand every caller the same in-memory store instead of a new database.
/// let shared: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
/// let registry = StudyRegistry::new(database, SecretResolver::default())
///     .with_opener(move |_url| Ok(Arc::clone(&shared)));
///
/// let study = registry.get_study("demo").unwrap();
/// assert!(registry.study_exists("demo").unwrap());
/// assert!(registry.get_best_params(study.name()).unwrap().is_empty());
/// ```
pub struct StudyRegistry {
    database: DatabaseConfig,
    resolver: SecretResolver,
    opener: StorageOpener,
}

impl core::fmt::Debug for StudyRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StudyRegistry")
            .field("database", &self.database)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

impl StudyRegistry {
    /// A registry that opens [`RdbStorage`] handles.
    #[must_use]
    pub fn new(database: DatabaseConfig, resolver: SecretResolver) -> Self {
        Self {
            database,
            resolver,
            opener: Arc::new(open_rdb),
        }
    }

    /// A registry over the configured database and secret locations.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.database.clone(), config.resolver())
    }

    /// Replace the function that turns a URL into a storage handle.
    #[must_use]
    pub fn with_opener<F>(mut self, opener: F) -> Self
    where
        F: Fn(&ConnectionUrl) -> Result<Arc<dyn Storage>> + Send + Sync + 'static,
    {
        self.opener = Arc::new(opener);
        self
    }

    /// The database user name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SecretNotFound`] if the credential cannot be resolved.
    pub fn username(&self) -> Result<String> {
        self.resolver.resolve(&self.database.username)
    }

    /// The database name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SecretNotFound`] if the credential cannot be resolved.
    pub fn db_name(&self) -> Result<String> {
        self.resolver.resolve(&self.database.db_name)
    }

    /// The database host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SecretNotFound`] if the credential cannot be resolved.
    pub fn hostname(&self) -> Result<String> {
        self.resolver.resolve(&self.database.hostname)
    }

    /// The connection URL, with every credential resolved now.
    ///
    /// A configured `url` is used verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SecretNotFound`] naming the first missing credential.
    pub fn url(&self) -> Result<ConnectionUrl> {
        if let Some(raw) = &self.database.url {
            return Ok(ConnectionUrl::from_raw(raw.clone()));
        }
        let user = self.username()?;
        let password = self.resolver.resolve(&self.database.password)?;
        let host = self.hostname()?;
        let db_name = self.db_name()?;
        Ok(ConnectionUrl::build(
            &self.database.scheme,
            &user,
            &password,
            &host,
            &db_name,
        ))
    }

    /// Open a new storage handle.
    ///
    /// # Errors
    ///
    /// Returns credential errors from [`url`](Self::url) and driver errors
    /// from the opener unchanged.
    pub fn storage(&self) -> Result<Arc<dyn Storage>> {
        let url = self.url()?;
        trace_debug!(url = %url, "opening study storage");
        (self.opener)(&url)
    }

    /// Summaries of every stored study.
    ///
    /// # Errors
    ///
    /// Returns connection and storage errors.
    pub fn study_summaries(&self) -> Result<Vec<StudySummary>> {
        get_all_study_summaries(self.storage()?.as_ref())
    }

    /// Whether a study named `study_name` exists.
    ///
    /// # Errors
    ///
    /// Returns connection and storage errors.
    pub fn study_exists(&self, study_name: &str) -> Result<bool> {
        Ok(self
            .study_summaries()?
            .iter()
            .any(|s| s.study_name == study_name))
    }

    /// The summary of the study named `study_name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StudyNotFound`] if there is no such study.
    pub fn get_study_summary(&self, study_name: &str) -> Result<StudySummary> {
        self.study_summaries()?
            .into_iter()
            .find(|s| s.study_name == study_name)
            .ok_or_else(|| Error::StudyNotFound(study_name.to_string()))
    }

    /// The parameters of the study's best trial; empty when nothing completed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StudyNotFound`] if there is no such study.
    pub fn get_best_params(&self, study_name: &str) -> Result<BTreeMap<String, ParamValue>> {
        Ok(self
            .get_study_summary(study_name)?
            .best_trial
            .map(|t| t.params)
            .unwrap_or_default())
    }

    /// Load the study named `study_name`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns connection and storage errors.
    pub fn get_study(&self, study_name: &str) -> Result<Study> {
        self.get_study_with(study_name, &StudyOptions::default())
    }

    /// Like [`get_study`](Self::get_study) with an explicit direction,
    /// sampler and pruner.
    ///
    /// The library's verbosity is lowered to [`Verbosity::Warning`] while the
    /// study is opened and restored afterwards, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns connection and storage errors.
    pub fn get_study_with(&self, study_name: &str, options: &StudyOptions) -> Result<Study> {
        let _quiet = logging::temporary_verbosity(Verbosity::Warning);

        let mut builder = Study::builder()
            .name(study_name)
            .storage(self.storage()?)
            .direction(options.direction)
            .load_if_exists(true);
        if let Some(sampler) = &options.sampler {
            builder = builder.shared_sampler(Arc::clone(sampler));
        }
        if let Some(pruner) = &options.pruner {
            builder = builder.shared_pruner(Arc::clone(pruner));
        }
        builder.build()
    }

    /// One study per stored name, in first-seen order.
    ///
    /// # Errors
    ///
    /// Returns connection and storage errors.
    pub fn get_all_studies(&self) -> Result<Vec<Study>> {
        let mut names: Vec<String> = Vec::new();
        for summary in self.study_summaries()? {
            if !names.contains(&summary.study_name) {
                names.push(summary.study_name);
            }
        }
        names.iter().map(|name| self.get_study(name)).collect()
    }

    /// The number of stored studies.
    ///
    /// # Errors
    ///
    /// Returns connection and storage errors.
    pub fn num_existing_studies(&self) -> Result<usize> {
        Ok(self.get_all_studies()?.len())
    }

    /// The most recent `datetime_complete` among the study's trials, or
    /// `DateTime::<Utc>::MIN_UTC` when no trial has finished.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub fn last_update_time(study: &Study) -> Result<DateTime<Utc>> {
        Ok(study
            .trials()?
            .iter()
            .filter_map(|t| t.datetime_complete)
            .max()
            .unwrap_or(DateTime::<Utc>::MIN_UTC))
    }

    /// The study updated most recently, or `None` when there are no studies.
    ///
    /// Ties go to the study listed first by
    /// [`get_all_studies`](Self::get_all_studies).
    ///
    /// # Errors
    ///
    /// Returns connection and storage errors.
    pub fn get_latest_study(&self) -> Result<Option<Study>> {
        let mut latest: Option<(DateTime<Utc>, Study)> = None;
        for study in self.get_all_studies()? {
            let updated = Self::last_update_time(&study)?;
            if latest.as_ref().is_none_or(|(best, _)| updated > *best) {
                latest = Some((updated, study));
            }
        }
        Ok(latest.map(|(_, study)| study))
    }
}
