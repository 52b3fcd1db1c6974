//! Core types shared by studies, trials and storage backends.

use serde::{Deserialize, Serialize};

/// The direction of optimization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Minimize the objective value.
    #[default]
    Minimize,
    /// Maximize the objective value.
    Maximize,
}

impl Direction {
    /// The token written to the `direction` column of the studies table.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minimize => "MINIMIZE",
            Self::Maximize => "MAXIMIZE",
        }
    }

    /// Parse a token produced by [`Direction::as_str`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`](crate::Error::Storage) for unknown tokens.
    pub fn parse(token: &str) -> crate::Result<Self> {
        match token {
            "MINIMIZE" => Ok(Self::Minimize),
            "MAXIMIZE" => Ok(Self::Maximize),
            other => Err(crate::Error::Storage(format!(
                "unknown study direction '{other}'"
            ))),
        }
    }

    /// Returns `true` if `candidate` is strictly better than `incumbent`.
    #[must_use]
    pub fn is_better(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Self::Minimize => candidate < incumbent,
            Self::Maximize => candidate > incumbent,
        }
    }
}

/// The state of a trial in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialState {
    /// The trial is currently running.
    Running,
    /// The trial completed successfully.
    Complete,
    /// The trial was stopped early by a pruner.
    Pruned,
    /// The trial failed with an error.
    Failed,
}

impl TrialState {
    /// The token written to the `state` column of the trials table.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Complete => "COMPLETE",
            Self::Pruned => "PRUNED",
            Self::Failed => "FAIL",
        }
    }

    /// Parse a token produced by [`TrialState::as_str`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`](crate::Error::Storage) for unknown tokens.
    pub fn parse(token: &str) -> crate::Result<Self> {
        match token {
            "RUNNING" => Ok(Self::Running),
            "COMPLETE" => Ok(Self::Complete),
            "PRUNED" => Ok(Self::Pruned),
            "FAIL" => Ok(Self::Failed),
            other => Err(crate::Error::Storage(format!(
                "unknown trial state '{other}'"
            ))),
        }
    }

    /// Whether the trial has stopped running.
    #[must_use]
    pub fn is_finished(self) -> bool {
        self != Self::Running
    }
}
