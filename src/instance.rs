//! The process-wide registry.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::registry::StudyRegistry;

/// A lazily initialized, resettable slot holding one [`StudyRegistry`].
///
/// The first successful [`get_or_try_init`](Self::get_or_try_init) stores the
/// registry; later calls return the same `Arc`. Initialization opens one
/// storage handle to surface connection problems early. If that fails the
/// cell stays empty and the next call tries again. The lock is held during
/// initialization, so concurrent first callers never build two registries.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use docktuna::config::DatabaseConfig;
/// use docktuna::{MemoryStorage, RegistryCell, SecretResolver, Storage, StudyRegistry};
///
/// static CELL: RegistryCell = RegistryCell::new();
///
/// let mut database = DatabaseConfig::default();
/// database.url = Some("sqlite://:memory:".to_string());
/// let first = CELL
///     .get_or_try_init(|| {
///         Ok(StudyRegistry::new(database, SecretResolver::default())
///             .with_opener(|_url| Ok(Arc::new(MemoryStorage::new()) as Arc<dyn Storage>)))
///     })
///     .unwrap();
/// let second = CELL.get_or_try_init(|| unreachable!()).unwrap();
/// assert!(Arc::ptr_eq(&first, &second));
/// ```
#[derive(Debug)]
pub struct RegistryCell {
    slot: Mutex<Option<Arc<StudyRegistry>>>,
}

impl Default for RegistryCell {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryCell {
    /// An empty cell.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slot: parking_lot::const_mutex(None),
        }
    }

    /// The stored registry, building it with `init` if the cell is empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InitializationFailure`] wrapping the cause when `init`
    /// fails or the registry cannot open its storage. The cell stays empty.
    pub fn get_or_try_init<F>(&self, init: F) -> Result<Arc<StudyRegistry>>
    where
        F: FnOnce() -> Result<StudyRegistry>,
    {
        let mut slot = self.slot.lock();
        if let Some(registry) = slot.as_ref() {
            return Ok(Arc::clone(registry));
        }

        let registry = init()
            .and_then(|registry| registry.storage().map(|_| registry))
            .map_err(|e| {
                trace_warn!(error = %e, "tuning database initialization failed");
                Error::InitializationFailure(e.to_string())
            })?;
        let registry = Arc::new(registry);
        *slot = Some(Arc::clone(&registry));
        trace_info!("tuning database registry initialized");
        Ok(registry)
    }

    /// The stored registry, if initialized.
    #[must_use]
    pub fn get(&self) -> Option<Arc<StudyRegistry>> {
        self.slot.lock().clone()
    }

    /// Whether a registry is stored.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Drop the stored registry; the next access initializes again.
    pub fn reset(&self) {
        self.slot.lock().take();
    }
}

static REGISTRY: RegistryCell = RegistryCell::new();

/// The process-wide registry, built from [`Config::load`] on first use.
///
/// # Errors
///
/// Returns [`Error::InitializationFailure`] if the configuration cannot be
/// loaded or the database cannot be reached.
pub fn get_registry() -> Result<Arc<StudyRegistry>> {
    REGISTRY.get_or_try_init(|| Ok(StudyRegistry::from_config(&Config::load()?)))
}

/// Forget the process-wide registry.
pub fn reset_registry() {
    REGISTRY.reset();
}
