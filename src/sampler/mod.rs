//! Sampler trait, the frozen trial record, and the built-in random sampler.

pub mod random;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::distribution::Distribution;
use crate::param::ParamValue;
use crate::parameter::Parameter;
use crate::types::TrialState;

pub use random::RandomSampler;

/// An immutable snapshot of a trial as stored by a [`Storage`](crate::storage::Storage).
///
/// Snapshots are produced for every finished trial (complete, pruned or
/// failed) and for trials that are still running in another process.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrozenTrial {
    /// Zero-based position of the trial within its study.
    pub number: u64,
    /// Lifecycle state.
    pub state: TrialState,
    /// The objective value; `None` unless the trial completed.
    pub value: Option<f64>,
    /// The sampled parameter values, keyed by parameter name.
    pub params: BTreeMap<String, ParamValue>,
    /// The parameter distributions used, keyed by parameter name.
    pub distributions: BTreeMap<String, Distribution>,
    /// Intermediate objective values reported during the trial.
    pub intermediate_values: Vec<(u64, f64)>,
    /// When the trial was created.
    pub datetime_start: DateTime<Utc>,
    /// When the trial stopped running, if it has.
    pub datetime_complete: Option<DateTime<Utc>>,
}

impl FrozenTrial {
    /// Creates a running trial snapshot with no parameters.
    #[must_use]
    pub fn running(number: u64, datetime_start: DateTime<Utc>) -> Self {
        Self {
            number,
            state: TrialState::Running,
            value: None,
            params: BTreeMap::new(),
            distributions: BTreeMap::new(),
            intermediate_values: Vec::new(),
            datetime_start,
            datetime_complete: None,
        }
    }

    /// Returns the typed value for the given parameter.
    ///
    /// Returns `None` if the parameter was not used in this trial or the
    /// stored value does not match the parameter's type.
    pub fn get<P: Parameter>(&self, param: &P) -> Option<P::Value> {
        self.params
            .get(param.name())
            .and_then(|v| param.cast_param_value(v).ok())
    }

    /// Whether the trial completed with an objective value.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == TrialState::Complete && self.value.is_some()
    }
}

/// Trait for pluggable parameter sampling strategies.
///
/// Samplers generate parameter values from a distribution, optionally
/// informed by the study's history. The trait requires `Send + Sync` so a
/// study can be shared across threads.
pub trait Sampler: Send + Sync {
    /// Samples a parameter value from the given distribution.
    ///
    /// # Arguments
    ///
    /// * `distribution` - The parameter distribution to sample from.
    /// * `trial_number` - The number of the trial being sampled for.
    /// * `history` - Finished trials of the study, oldest first.
    fn sample(
        &self,
        distribution: &Distribution,
        trial_number: u64,
        history: &[FrozenTrial],
    ) -> ParamValue;
}
