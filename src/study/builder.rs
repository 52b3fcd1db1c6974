use std::sync::Arc;

use crate::error::{Error, Result};
use crate::pruner::{NopPruner, Pruner};
use crate::sampler::Sampler;
use crate::sampler::random::RandomSampler;
use crate::storage::{MemoryStorage, Storage};
use crate::types::Direction;

use super::Study;

/// A builder for creating or loading a [`Study`].
///
/// Created via [`Study::builder()`].
///
/// # Defaults
///
/// - Name: a random `no-name-…` identifier
/// - Storage: a fresh [`MemoryStorage`]
/// - Direction: [`Minimize`](Direction::Minimize)
/// - Sampler: [`RandomSampler`]
/// - Pruner: [`NopPruner`]
/// - `load_if_exists`: `false`
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use docktuna::prelude::*;
///
/// let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
/// let first = Study::builder()
///     .name("shared")
///     .storage(Arc::clone(&storage))
///     .maximize()
///     .build()
///     .unwrap();
///
/// // A second handle on the same study keeps the stored direction.
/// let again = Study::builder()
///     .name("shared")
///     .storage(storage)
///     .load_if_exists(true)
///     .build()
///     .unwrap();
/// assert_eq!(again.id(), first.id());
/// assert_eq!(again.direction(), Direction::Maximize);
/// ```
pub struct StudyBuilder {
    name: Option<String>,
    storage: Option<Arc<dyn Storage>>,
    direction: Direction,
    sampler: Option<Arc<dyn Sampler>>,
    pruner: Option<Arc<dyn Pruner>>,
    load_if_exists: bool,
}

impl StudyBuilder {
    pub(super) fn new() -> Self {
        Self {
            name: None,
            storage: None,
            direction: Direction::Minimize,
            sampler: None,
            pruner: None,
            load_if_exists: false,
        }
    }

    /// Set the study name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the storage the study lives in.
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Set the optimization direction to minimize (the default).
    #[must_use]
    pub fn minimize(mut self) -> Self {
        self.direction = Direction::Minimize;
        self
    }

    /// Set the optimization direction to maximize.
    #[must_use]
    pub fn maximize(mut self) -> Self {
        self.direction = Direction::Maximize;
        self
    }

    /// Set the optimization direction explicitly.
    ///
    /// Ignored when an existing study is loaded: the stored direction wins.
    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Set the sampler used for parameter suggestions.
    #[must_use]
    pub fn sampler(mut self, sampler: impl Sampler + 'static) -> Self {
        self.sampler = Some(Arc::new(sampler));
        self
    }

    /// Set a shared sampler.
    #[must_use]
    pub fn shared_sampler(mut self, sampler: Arc<dyn Sampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Set the pruner used for early stopping of trials.
    #[must_use]
    pub fn pruner(mut self, pruner: impl Pruner + 'static) -> Self {
        self.pruner = Some(Arc::new(pruner));
        self
    }

    /// Set a shared pruner.
    #[must_use]
    pub fn shared_pruner(mut self, pruner: Arc<dyn Pruner>) -> Self {
        self.pruner = Some(pruner);
        self
    }

    /// Load the study if the name is already taken instead of failing.
    #[must_use]
    pub fn load_if_exists(mut self, load: bool) -> Self {
        self.load_if_exists = load;
        self
    }

    /// Create the study, or load it when `load_if_exists` is set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicatedStudy`] if the name is taken and
    /// `load_if_exists` is off, or a storage error.
    pub fn build(self) -> Result<Study> {
        let name = self
            .name
            .unwrap_or_else(|| format!("no-name-{:016x}", fastrand::u64(..)));
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));

        let (id, direction) = match storage.create_study(&name, self.direction) {
            Ok(id) => {
                trace_info!(study = %name, "a new study created");
                (id, self.direction)
            }
            Err(Error::DuplicatedStudy(_)) if self.load_if_exists => {
                let id = storage
                    .study_id_from_name(&name)?
                    .ok_or_else(|| Error::StudyNotFound(name.clone()))?;
                trace_info!(study = %name, "using an existing study");
                (id, storage.study_direction(id)?)
            }
            Err(e) => return Err(e),
        };

        Ok(Study {
            name,
            id,
            direction,
            storage,
            sampler: self
                .sampler
                .unwrap_or_else(|| Arc::new(RandomSampler::new())),
            pruner: self.pruner.unwrap_or_else(|| Arc::new(NopPruner)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_without_load_if_exists_fails() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        Study::builder()
            .name("dup")
            .storage(Arc::clone(&storage))
            .build()
            .unwrap();
        let err = Study::builder()
            .name("dup")
            .storage(storage)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::DuplicatedStudy(name) if name == "dup"));
    }

    #[test]
    fn unnamed_studies_get_distinct_names() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let a = Study::builder().storage(Arc::clone(&storage)).build().unwrap();
        let b = Study::builder().storage(storage).build().unwrap();
        assert!(a.name().starts_with("no-name-"));
        assert_ne!(a.name(), b.name());
    }
}
