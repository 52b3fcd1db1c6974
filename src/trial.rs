//! Trial implementation for tracking sampled parameters while an objective runs.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::distribution::Distribution;
use crate::error::{Error, Result};
use crate::param::ParamValue;
use crate::parameter::{BoolParam, CategoricalParam, FloatParam, IntParam, Parameter};
use crate::pruner::Pruner;
use crate::sampler::{FrozenTrial, RandomSampler, Sampler};
use crate::types::TrialState;

/// A trial represents a single evaluation of the objective function.
///
/// Trials handed out by [`Study::ask`](crate::Study::ask) carry the study's
/// sampler, pruner and a snapshot of the finished trials, and are written
/// back to storage once the objective returns. A detached trial created with
/// [`Trial::new`] samples uniformly at random and never prunes.
#[derive(Clone)]
pub struct Trial {
    number: u64,
    datetime_start: DateTime<Utc>,
    params: BTreeMap<String, ParamValue>,
    distributions: BTreeMap<String, Distribution>,
    intermediate_values: Vec<(u64, f64)>,
    sampler: Option<Arc<dyn Sampler>>,
    pruner: Option<Arc<dyn Pruner>>,
    history: Arc<[FrozenTrial]>,
}

impl core::fmt::Debug for Trial {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Trial")
            .field("number", &self.number)
            .field("datetime_start", &self.datetime_start)
            .field("params", &self.params)
            .field("intermediate_values", &self.intermediate_values)
            .field("has_sampler", &self.sampler.is_some())
            .field("has_pruner", &self.pruner.is_some())
            .field("history_len", &self.history.len())
            .finish()
    }
}

impl Trial {
    /// Creates a detached trial with the given number.
    ///
    /// # Examples
    ///
    /// ```
    /// use docktuna::Trial;
    ///
    /// let trial = Trial::new(0);
    /// assert_eq!(trial.number(), 0);
    /// assert!(trial.params().is_empty());
    /// ```
    #[must_use]
    pub fn new(number: u64) -> Self {
        Self {
            number,
            datetime_start: Utc::now(),
            params: BTreeMap::new(),
            distributions: BTreeMap::new(),
            intermediate_values: Vec::new(),
            sampler: None,
            pruner: None,
            history: Arc::from(Vec::new()),
        }
    }

    /// Creates a trial wired to a study's sampler, pruner and history.
    pub(crate) fn attached(
        number: u64,
        datetime_start: DateTime<Utc>,
        sampler: Arc<dyn Sampler>,
        pruner: Arc<dyn Pruner>,
        history: Arc<[FrozenTrial]>,
    ) -> Self {
        Self {
            number,
            datetime_start,
            params: BTreeMap::new(),
            distributions: BTreeMap::new(),
            intermediate_values: Vec::new(),
            sampler: Some(sampler),
            pruner: Some(pruner),
            history,
        }
    }

    fn sample_value(&self, distribution: &Distribution) -> ParamValue {
        match &self.sampler {
            Some(sampler) => sampler.sample(distribution, self.number, &self.history),
            None => RandomSampler::new().sample(distribution, self.number, &[]),
        }
    }

    /// Returns the trial's number within its study.
    #[must_use]
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Returns when the trial was started.
    #[must_use]
    pub fn datetime_start(&self) -> DateTime<Utc> {
        self.datetime_start
    }

    /// Returns a reference to the sampled parameters.
    #[must_use]
    pub fn params(&self) -> &BTreeMap<String, ParamValue> {
        &self.params
    }

    /// Returns a reference to the parameter distributions.
    #[must_use]
    pub fn distributions(&self) -> &BTreeMap<String, Distribution> {
        &self.distributions
    }

    /// Returns the intermediate values reported so far.
    #[must_use]
    pub fn intermediate_values(&self) -> &[(u64, f64)] {
        &self.intermediate_values
    }

    /// Suggests a parameter value using a [`Parameter`] definition.
    ///
    /// Suggesting the same name twice with the same distribution returns the
    /// cached value.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The parameter fails validation
    /// - The name was previously suggested with a different distribution
    /// - The sampled value cannot be converted
    pub fn suggest_param<P: Parameter>(&mut self, param: &P) -> Result<P::Value> {
        param.validate()?;

        let name = param.name();
        let distribution = param.distribution();

        if let Some(existing) = self.distributions.get(name) {
            if *existing == distribution {
                if let Some(value) = self.params.get(name) {
                    return param.cast_param_value(value);
                }
            }
            return Err(Error::ParameterConflict {
                name: name.to_string(),
                reason: "parameter was previously sampled with different configuration or type"
                    .to_string(),
            });
        }

        let value = self.sample_value(&distribution);
        let result = param.cast_param_value(&value)?;

        self.distributions.insert(name.to_string(), distribution);
        self.params.insert(name.to_string(), value);

        Ok(result)
    }

    /// Suggest a float uniformly from `[low, high]`.
    ///
    /// # Errors
    ///
    /// See [`suggest_param`](Self::suggest_param).
    pub fn suggest_float(&mut self, name: &str, low: f64, high: f64) -> Result<f64> {
        self.suggest_param(&FloatParam::new(name, low, high))
    }

    /// Suggest a float from `[low, high]` sampled in log space.
    ///
    /// # Errors
    ///
    /// See [`suggest_param`](Self::suggest_param).
    pub fn suggest_float_log(&mut self, name: &str, low: f64, high: f64) -> Result<f64> {
        self.suggest_param(&FloatParam::new(name, low, high).log_scale())
    }

    /// Suggest an integer from `[low, high]`.
    ///
    /// # Errors
    ///
    /// See [`suggest_param`](Self::suggest_param).
    pub fn suggest_int(&mut self, name: &str, low: i64, high: i64) -> Result<i64> {
        self.suggest_param(&IntParam::new(name, low, high))
    }

    /// Suggest one of `choices`.
    ///
    /// # Errors
    ///
    /// See [`suggest_param`](Self::suggest_param).
    pub fn suggest_categorical(&mut self, name: &str, choices: &[&str]) -> Result<String> {
        self.suggest_param(&CategoricalParam::new(name, choices.iter().copied()))
    }

    /// Suggest a boolean.
    ///
    /// # Errors
    ///
    /// See [`suggest_param`](Self::suggest_param).
    pub fn suggest_bool(&mut self, name: &str) -> Result<bool> {
        self.suggest_param(&BoolParam::new(name))
    }

    /// Report an intermediate objective value at `step`.
    ///
    /// Reporting the same step twice keeps the first value.
    pub fn report(&mut self, step: u64, value: f64) {
        if self.intermediate_values.iter().all(|&(s, _)| s != step) {
            self.intermediate_values.push((step, value));
        }
    }

    /// Ask the study's pruner whether this trial should stop now.
    ///
    /// Return `Err(TrialPruned)` from the objective when this is `true`.
    #[must_use]
    pub fn should_prune(&self) -> bool {
        let (Some(pruner), Some(&(step, _))) = (&self.pruner, self.intermediate_values.last())
        else {
            return false;
        };
        pruner.should_prune(self.number, step, &self.intermediate_values, &self.history)
    }

    /// Freeze the trial into its stored form.
    pub(crate) fn into_frozen(self, state: TrialState, value: Option<f64>) -> FrozenTrial {
        FrozenTrial {
            number: self.number,
            state,
            value: if state == TrialState::Complete { value } else { None },
            params: self.params,
            distributions: self.distributions,
            intermediate_values: self.intermediate_values,
            datetime_start: self.datetime_start,
            datetime_complete: Some(Utc::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pruner::MedianPruner;
    use crate::types::Direction;

    #[test]
    fn same_name_same_distribution_is_cached() {
        let mut trial = Trial::new(0);
        let a = trial.suggest_float("x", -10.0, 10.0).unwrap();
        let b = trial.suggest_float("x", -10.0, 10.0).unwrap();
        assert_eq!(a, b);
        assert_eq!(trial.params().len(), 1);
    }

    #[test]
    fn same_name_different_distribution_conflicts() {
        let mut trial = Trial::new(0);
        trial.suggest_float("x", 0.0, 1.0).unwrap();
        assert!(matches!(
            trial.suggest_int("x", 0, 1),
            Err(Error::ParameterConflict { .. })
        ));
    }

    #[test]
    fn report_keeps_first_value_per_step() {
        let mut trial = Trial::new(0);
        trial.report(0, 1.0);
        trial.report(0, 5.0);
        trial.report(1, 0.5);
        assert_eq!(trial.intermediate_values(), &[(0, 1.0), (1, 0.5)]);
    }

    #[test]
    fn detached_trial_never_prunes() {
        let mut trial = Trial::new(0);
        trial.report(0, f64::MAX);
        assert!(!trial.should_prune());
    }

    #[test]
    fn attached_trial_consults_pruner() {
        let mut done = FrozenTrial::running(0, Utc::now());
        done.state = TrialState::Complete;
        done.value = Some(0.1);
        done.intermediate_values = vec![(0, 0.1)];

        let mut trial = Trial::attached(
            1,
            Utc::now(),
            Arc::new(RandomSampler::with_seed(1)),
            Arc::new(MedianPruner::new(Direction::Minimize)),
            Arc::from(vec![done]),
        );
        trial.report(0, 9.0);
        assert!(trial.should_prune());
    }

    #[test]
    fn frozen_failed_trial_drops_value() {
        let trial = Trial::new(3);
        let frozen = trial.into_frozen(TrialState::Failed, Some(1.0));
        assert_eq!(frozen.value, None);
        assert!(frozen.datetime_complete.is_some());
        assert_eq!(frozen.number, 3);
    }
}
