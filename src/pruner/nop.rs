use super::Pruner;
use crate::sampler::FrozenTrial;

/// A pruner that never prunes. This is the default when no pruner is configured.
pub struct NopPruner;

impl Pruner for NopPruner {
    fn should_prune(
        &self,
        _trial_number: u64,
        _step: u64,
        _intermediate_values: &[(u64, f64)],
        _history: &[FrozenTrial],
    ) -> bool {
        false
    }
}
