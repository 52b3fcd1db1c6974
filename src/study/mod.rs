//! Study implementation for managing optimization trials.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::param::ParamValue;
use crate::pruner::{NopPruner, Pruner};
use crate::sampler::random::RandomSampler;
use crate::sampler::{FrozenTrial, Sampler};
use crate::storage::{Storage, StudyId};
use crate::trial::Trial;
use crate::types::{Direction, TrialState};

mod builder;
mod optimize;
mod summary;

pub use builder::StudyBuilder;
pub use summary::{StudySummary, get_all_study_summaries};

/// A named optimization study persisted in a [`Storage`].
///
/// A study holds no trials itself: every query reads the storage, so studies
/// opened from different processes on the same database see each other's
/// trials.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use docktuna::{Direction, MemoryStorage, Study};
///
/// let study = Study::builder()
///     .name("quadratic")
///     .storage(Arc::new(MemoryStorage::new()))
///     .direction(Direction::Minimize)
///     .build()
///     .unwrap();
/// assert_eq!(study.direction(), Direction::Minimize);
/// assert_eq!(study.n_trials().unwrap(), 0);
/// ```
pub struct Study {
    pub(crate) name: String,
    pub(crate) id: StudyId,
    pub(crate) direction: Direction,
    pub(crate) storage: Arc<dyn Storage>,
    pub(crate) sampler: Arc<dyn Sampler>,
    pub(crate) pruner: Arc<dyn Pruner>,
}

impl core::fmt::Debug for Study {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Study")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("direction", &self.direction)
            .finish_non_exhaustive()
    }
}

impl Study {
    /// Return a [`StudyBuilder`] for creating or loading a study.
    #[must_use]
    pub fn builder() -> StudyBuilder {
        StudyBuilder::new()
    }

    /// Open an existing study with the default sampler and pruner.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StudyNotFound`] if no study carries `name`, or a
    /// storage error.
    pub fn load(name: &str, storage: Arc<dyn Storage>) -> Result<Self> {
        let id = storage
            .study_id_from_name(name)?
            .ok_or_else(|| Error::StudyNotFound(name.to_string()))?;
        let direction = storage.study_direction(id)?;
        Ok(Self {
            name: name.to_string(),
            id,
            direction,
            storage,
            sampler: Arc::new(RandomSampler::new()),
            pruner: Arc::new(NopPruner),
        })
    }

    /// The study's unique name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The backend-assigned identifier.
    #[must_use]
    pub fn id(&self) -> StudyId {
        self.id
    }

    /// The direction the study was created with.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The storage backing this study.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// All trials in number order, including running ones.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend cannot be queried.
    pub fn trials(&self) -> Result<Vec<FrozenTrial>> {
        self.storage.trials(self.id)
    }

    /// Number of trials in any state.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend cannot be queried.
    pub fn n_trials(&self) -> Result<usize> {
        Ok(self.trials()?.len())
    }

    /// The completed trial with the best value. Ties go to the earliest.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCompletedTrials`] if no trial has completed.
    pub fn best_trial(&self) -> Result<FrozenTrial> {
        best_of(self.direction, self.trials()?).ok_or(Error::NoCompletedTrials)
    }

    /// The best objective value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCompletedTrials`] if no trial has completed.
    pub fn best_value(&self) -> Result<f64> {
        self.best_trial()?
            .value
            .ok_or(Error::Internal("completed trial has no value"))
    }

    /// The parameters of the best trial.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCompletedTrials`] if no trial has completed.
    pub fn best_params(&self) -> Result<BTreeMap<String, ParamValue>> {
        Ok(self.best_trial()?.params)
    }

    /// Start a new trial and register it as running.
    ///
    /// The trial sees a snapshot of the study's finished trials, which the
    /// pruner compares against.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the trial cannot be created.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use docktuna::{MemoryStorage, Study, TrialState};
    ///
    /// let study = Study::builder()
    ///     .name("ask-tell")
    ///     .storage(Arc::new(MemoryStorage::new()))
    ///     .build()
    ///     .unwrap();
    ///
    /// let mut trial = study.ask().unwrap();
    /// let x = trial.suggest_float("x", 0.0, 1.0).unwrap();
    /// let frozen = study.tell(trial, Ok(x * x)).unwrap();
    /// assert_eq!(frozen.state, TrialState::Complete);
    /// assert_eq!(study.n_trials().unwrap(), 1);
    /// ```
    pub fn ask(&self) -> Result<Trial> {
        let running = self.storage.create_trial(self.id)?;
        let history: Vec<FrozenTrial> = self
            .trials()?
            .into_iter()
            .filter(|t| t.state.is_finished())
            .collect();
        Ok(Trial::attached(
            running.number,
            running.datetime_start,
            Arc::clone(&self.sampler),
            Arc::clone(&self.pruner),
            Arc::from(history),
        ))
    }

    /// Finish a trial obtained from [`ask`](Self::ask).
    ///
    /// `Ok(value)` completes the trial (a NaN value fails it instead),
    /// `Err(Error::TrialPruned)` prunes it, and any other error fails it.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the result cannot be written.
    pub fn tell(&self, trial: Trial, outcome: Result<f64>) -> Result<FrozenTrial> {
        let (state, value) = match outcome {
            Ok(v) if v.is_nan() => (TrialState::Failed, None),
            Ok(v) => (TrialState::Complete, Some(v)),
            Err(Error::TrialPruned) => (TrialState::Pruned, None),
            Err(_) => (TrialState::Failed, None),
        };
        let frozen = trial.into_frozen(state, value);
        self.storage.finish_trial(self.id, &frozen)?;
        Ok(frozen)
    }
}

/// The best completed trial under `direction`, earliest on ties.
pub(crate) fn best_of(direction: Direction, trials: Vec<FrozenTrial>) -> Option<FrozenTrial> {
    let mut best: Option<(f64, FrozenTrial)> = None;
    for trial in trials {
        let Some(value) = trial.value.filter(|_| trial.state == TrialState::Complete) else {
            continue;
        };
        if best
            .as_ref()
            .is_none_or(|(incumbent, _)| direction.is_better(value, *incumbent))
        {
            best = Some((value, trial));
        }
    }
    best.map(|(_, trial)| trial)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::storage::MemoryStorage;

    fn done(number: u64, value: f64) -> FrozenTrial {
        let mut trial = FrozenTrial::running(number, Utc::now());
        trial.state = TrialState::Complete;
        trial.value = Some(value);
        trial
    }

    #[test]
    fn best_of_respects_direction_and_ties() {
        let trials = vec![done(0, 5.0), done(1, 2.0), done(2, 9.0), done(3, 2.0)];
        assert_eq!(
            best_of(Direction::Minimize, trials.clone()).unwrap().number,
            1
        );
        assert_eq!(best_of(Direction::Maximize, trials).unwrap().number, 2);
    }

    #[test]
    fn best_of_skips_unfinished() {
        let mut pruned = FrozenTrial::running(0, Utc::now());
        pruned.state = TrialState::Pruned;
        let running = FrozenTrial::running(1, Utc::now());
        assert!(best_of(Direction::Minimize, vec![pruned, running]).is_none());
    }

    #[test]
    fn load_unknown_study_is_not_found() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        assert!(matches!(
            Study::load("nope", storage),
            Err(Error::StudyNotFound(name)) if name == "nope"
        ));
    }

    #[test]
    fn tell_maps_outcomes_to_states() {
        let study = Study::builder()
            .name("states")
            .storage(Arc::new(MemoryStorage::new()))
            .build()
            .unwrap();

        let pruned = study.tell(study.ask().unwrap(), Err(Error::TrialPruned)).unwrap();
        assert_eq!(pruned.state, TrialState::Pruned);

        let failed = study
            .tell(study.ask().unwrap(), Err(Error::Internal("boom")))
            .unwrap();
        assert_eq!(failed.state, TrialState::Failed);

        let nan = study.tell(study.ask().unwrap(), Ok(f64::NAN)).unwrap();
        assert_eq!(nan.state, TrialState::Failed);

        assert!(matches!(study.best_trial(), Err(Error::NoCompletedTrials)));
        assert_eq!(study.n_trials().unwrap(), 3);
    }

    #[test]
    fn ask_hands_out_consecutive_numbers() {
        let study = Study::builder()
            .name("numbers")
            .storage(Arc::new(MemoryStorage::new()))
            .build()
            .unwrap();
        let a = study.ask().unwrap();
        let b = study.ask().unwrap();
        assert_eq!((a.number(), b.number()), (0, 1));
    }
}
