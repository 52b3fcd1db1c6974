use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::sampler::FrozenTrial;
use crate::storage::Storage;
use crate::types::Direction;

/// A lightweight description of a stored study.
#[derive(Clone, Debug, PartialEq)]
pub struct StudySummary {
    pub study_name: String,
    pub direction: Direction,
    /// The best completed trial, if any.
    pub best_trial: Option<FrozenTrial>,
    /// Trials in any state.
    pub n_trials: usize,
    /// Start time of the first trial.
    pub datetime_start: Option<DateTime<Utc>>,
}

/// Summaries of every study in `storage`, in creation order.
///
/// # Errors
///
/// Returns a storage error if the backend cannot be queried.
///
/// # Examples
///
/// ```
/// use docktuna::{Direction, MemoryStorage, Storage, get_all_study_summaries};
///
/// let storage = MemoryStorage::new();
/// storage.create_study("a", Direction::Minimize).unwrap();
/// let summaries = get_all_study_summaries(&storage).unwrap();
/// assert_eq!(summaries[0].study_name, "a");
/// assert!(summaries[0].best_trial.is_none());
/// ```
pub fn get_all_study_summaries(storage: &dyn Storage) -> Result<Vec<StudySummary>> {
    storage
        .list_studies()?
        .into_iter()
        .map(|record| {
            let trials = storage.trials(record.id)?;
            let datetime_start = trials.iter().map(|t| t.datetime_start).min();
            let n_trials = trials.len();
            Ok(StudySummary {
                best_trial: super::best_of(record.direction, trials),
                study_name: record.name,
                direction: record.direction,
                n_trials,
                datetime_start,
            })
        })
        .collect()
}
