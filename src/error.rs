/// Errors produced by the registry, the storage backends, and the study API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a secret file or environment variable does not exist.
    #[error("secret {name} not found")]
    SecretNotFound {
        /// The identifier that was looked up.
        name: String,
    },

    /// Returned when a secret exists but cannot be read.
    #[error("secret {name} could not be read: {source}")]
    SecretUnreadable {
        /// The identifier that was looked up.
        name: String,
        /// The underlying I/O failure.
        source: std::io::Error,
    },

    /// Returned when the process-wide registry fails its start-up check.
    ///
    /// The message embeds the underlying cause.
    #[error("failed to initialize tuning database: {0}")]
    InitializationFailure(String),

    /// Returned when no stored study carries the requested name.
    #[error("study {0} not found")]
    StudyNotFound(String),

    /// Returned when creating a study whose name is already taken.
    #[error("study {0} already exists")]
    DuplicatedStudy(String),

    /// Returned when a storage driver operation fails (connect, query, decode).
    #[error("storage error: {0}")]
    Storage(String),

    /// Returned when a connection URL names a scheme no backend handles.
    #[error("unsupported storage scheme: {0}")]
    UnsupportedScheme(String),

    /// Returned when configuration cannot be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Returned when requesting the best trial but no trials have completed.
    #[error("no completed trials available")]
    NoCompletedTrials,

    /// Returned when a trial is pruned (stopped early by the objective function).
    #[error("trial was pruned")]
    TrialPruned,

    /// Returned when a parameter is suggested with a different configuration.
    #[error("parameter conflict for '{name}': {reason}")]
    ParameterConflict {
        /// The name of the conflicting parameter.
        name: String,
        /// The reason for the conflict.
        reason: String,
    },

    /// Returned when the lower bound is greater than the upper bound.
    #[error("invalid bounds: low ({low}) must be less than or equal to high ({high})")]
    InvalidBounds {
        /// The lower bound value.
        low: f64,
        /// The upper bound value.
        high: f64,
    },

    /// Returned when log scale is used with non-positive bounds.
    #[error("invalid log bounds: low must be positive for log scale")]
    InvalidLogBounds,

    /// Returned when step size is not positive.
    #[error("invalid step: step must be positive")]
    InvalidStep,

    /// Returned when categorical choices are empty.
    #[error("categorical choices cannot be empty")]
    EmptyChoices,

    /// Returned when an internal invariant is violated.
    #[error("internal error: {0}")]
    Internal(&'static str),
}

impl Error {
    /// Wrap any displayable driver error as [`Error::Storage`].
    pub(crate) fn storage(e: impl core::fmt::Display) -> Self {
        Self::Storage(e.to_string())
    }
}

pub type Result<T> = core::result::Result<T, Error>;

/// Convenience type for signalling a pruned trial from an objective function.
///
/// Implements `Into<Error>` so it can be used with `?` in objectives that
/// return `Result<f64, Error>`.
///
/// # Examples
///
/// ```
/// use docktuna::{Error, TrialPruned};
///
/// fn objective_that_prunes() -> Result<f64, Error> {
///     Err(TrialPruned)?
/// }
///
/// assert!(matches!(objective_that_prunes(), Err(Error::TrialPruned)));
/// ```
#[derive(Debug)]
pub struct TrialPruned;

impl core::fmt::Display for TrialPruned {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "trial was pruned")
    }
}

impl From<TrialPruned> for Error {
    fn from(_: TrialPruned) -> Self {
        Error::TrialPruned
    }
}
