//! Pruner trait and implementations for trial pruning.
//!
//! Pruners decide whether to stop (prune) a trial early based on its
//! intermediate values compared to other trials of the same study.

mod median;
mod nop;

pub use median::MedianPruner;
pub use nop::NopPruner;

use crate::sampler::FrozenTrial;

/// Trait for pluggable trial pruning strategies.
///
/// Pruners are consulted from [`Trial::should_prune`](crate::Trial::should_prune)
/// after intermediate values have been reported.
///
/// # Implementing a custom pruner
///
/// ```
/// use docktuna::pruner::Pruner;
/// use docktuna::sampler::FrozenTrial;
///
/// struct MyPruner {
///     threshold: f64,
/// }
///
/// impl Pruner for MyPruner {
///     fn should_prune(
///         &self,
///         _trial_number: u64,
///         _step: u64,
///         intermediate_values: &[(u64, f64)],
///         _history: &[FrozenTrial],
///     ) -> bool {
///         intermediate_values
///             .last()
///             .is_some_and(|&(_, v)| v > self.threshold)
///     }
/// }
/// ```
pub trait Pruner: Send + Sync {
    /// Decide whether to prune a trial at the given step.
    ///
    /// # Arguments
    ///
    /// * `trial_number` - The current trial's number.
    /// * `step` - The step at which the latest intermediate value was reported.
    /// * `intermediate_values` - All `(step, value)` pairs reported so far for this trial.
    /// * `history` - Finished trials of the study (for comparison).
    fn should_prune(
        &self,
        trial_number: u64,
        step: u64,
        intermediate_values: &[(u64, f64)],
        history: &[FrozenTrial],
    ) -> bool;
}
