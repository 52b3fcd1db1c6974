use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::logging::{self, Verbosity};
#[cfg_attr(not(feature = "tracing"), allow(unused_imports))]
use crate::param::{ParamValue, format_params};
use crate::trial::Trial;
use crate::types::TrialState;

use super::Study;

impl Study {
    /// Run `n_trials` evaluations of `objective` one after another.
    ///
    /// Each trial is registered as running, evaluated, then stored as
    /// complete, pruned (the objective returned [`Error::TrialPruned`]) or
    /// failed (any other error). Failures do not stop the loop.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCompletedTrials`] if the study has no completed
    /// trial afterwards, or a storage error.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use docktuna::{MemoryStorage, RandomSampler, Study, Trial};
    ///
    /// let study = Study::builder()
    ///     .name("quadratic")
    ///     .storage(Arc::new(MemoryStorage::new()))
    ///     .sampler(RandomSampler::with_seed(42))
    ///     .build()
    ///     .unwrap();
    ///
    /// study
    ///     .optimize(10, |trial: &mut Trial| {
    ///         let x = trial.suggest_float("x", -10.0, 10.0)?;
    ///         Ok((x - 2.0).powi(2))
    ///     })
    ///     .unwrap();
    ///
    /// assert_eq!(study.n_trials().unwrap(), 10);
    /// assert!(study.best_value().unwrap() >= 0.0);
    /// ```
    pub fn optimize<F>(&self, n_trials: usize, mut objective: F) -> Result<()>
    where
        F: FnMut(&mut Trial) -> Result<f64>,
    {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("optimize", study = %self.name, n_trials).entered();

        for _ in 0..n_trials {
            let mut trial = self.ask()?;
            let outcome = objective(&mut trial);
            let error = outcome.as_ref().err().map(ToString::to_string);
            let frozen = self.tell(trial, outcome)?;
            self.log_finished(
                frozen.number,
                frozen.state,
                frozen.value,
                error.as_deref(),
                &frozen.params,
            );
        }

        let has_complete = self
            .trials()?
            .iter()
            .any(|t| t.state == TrialState::Complete);
        if !has_complete {
            return Err(Error::NoCompletedTrials);
        }
        Ok(())
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn log_finished(
        &self,
        number: u64,
        state: TrialState,
        value: Option<f64>,
        error: Option<&str>,
        params: &BTreeMap<String, ParamValue>,
    ) {
        match (state, value) {
            (TrialState::Complete, Some(value)) => {
                if !logging::enabled(Verbosity::Info) {
                    return;
                }
                let best = self.best_trial().ok();
                let best_number = best.as_ref().map_or(number, |b| b.number);
                let best_value = best.and_then(|b| b.value).unwrap_or(value);
                trace_info!(
                    "Trial {number} finished with value: {value} and parameters: {}. \
                     Best is trial {best_number} with value: {best_value}.",
                    format_params(params)
                );
            }
            (TrialState::Pruned, _) => {
                trace_info!("Trial {number} pruned.");
            }
            _ => {
                trace_warn!(
                    "Trial {number} failed with parameters: {}: {}",
                    format_params(params),
                    error.unwrap_or("objective returned NaN")
                );
            }
        }
    }
}
