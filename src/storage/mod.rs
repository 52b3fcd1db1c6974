//! Study and trial storage backends.
//!
//! The [`Storage`] trait defines how studies and their trials are persisted
//! and retrieved. Every [`Study`](crate::Study) holds an `Arc<dyn Storage>`,
//! so one handle can back several studies and be shared across threads.
//!
//! # Available backends
//!
//! | Backend | Description | Feature flag |
//! |---------|-------------|-------------|
//! | [`MemoryStorage`] | In-process maps behind a read-write lock | — |
//! | [`RdbStorage`] on `sqlite://` | Single-file `SQLite` database | `sqlite` |
//! | [`RdbStorage`] on `postgresql://` | Shared `PostgreSQL` database | `postgres` |
//!
//! # Implementing a custom backend
//!
//! Implement [`Storage`] and hand the backend to a study via the builder:
//!
//! ```
//! use std::sync::Arc;
//!
//! use docktuna::prelude::*;
//!
//! let storage = Arc::new(MemoryStorage::new());
//! let study = Study::builder()
//!     .name("demo")
//!     .storage(storage)
//!     .build()
//!     .unwrap();
//! assert_eq!(study.name(), "demo");
//! ```

mod memory;
mod rdb;

pub use memory::MemoryStorage;
pub use rdb::RdbStorage;

use crate::error::Result;
use crate::sampler::FrozenTrial;
use crate::types::Direction;

/// Backend-assigned identifier of a study.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StudyId(pub i64);

impl core::fmt::Display for StudyId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A row of the studies table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StudyRecord {
    /// Backend-assigned identifier.
    pub id: StudyId,
    /// Unique study name.
    pub name: String,
    /// Optimization direction fixed at creation.
    pub direction: Direction,
}

/// Trait for storing studies and their trials.
///
/// Every method can fail: relational backends talk to a database, and those
/// errors propagate to the caller unchanged as
/// [`Error::Storage`](crate::Error::Storage).
///
/// Implementations must be `Send + Sync` because a study may be shared
/// across threads.
pub trait Storage: Send + Sync {
    /// Create a new study.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicatedStudy`](crate::Error::DuplicatedStudy)
    /// if the name is taken.
    fn create_study(&self, name: &str, direction: Direction) -> Result<StudyId>;

    /// Look up a study id by name.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend cannot be queried.
    fn study_id_from_name(&self, name: &str) -> Result<Option<StudyId>>;

    /// The direction a study was created with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StudyNotFound`](crate::Error::StudyNotFound) for
    /// unknown ids.
    fn study_direction(&self, study_id: StudyId) -> Result<Direction>;

    /// Every study in creation order.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend cannot be queried.
    fn list_studies(&self) -> Result<Vec<StudyRecord>>;

    /// Register a new running trial and return it.
    ///
    /// The trial's number is its zero-based position within the study.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StudyNotFound`](crate::Error::StudyNotFound) for
    /// unknown ids, or a storage error.
    fn create_trial(&self, study_id: StudyId) -> Result<FrozenTrial>;

    /// Overwrite a trial (matched by study and number) with its final state.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the trial does not exist or cannot be written.
    fn finish_trial(&self, study_id: StudyId, trial: &FrozenTrial) -> Result<()>;

    /// All trials of a study ordered by number.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend cannot be queried.
    fn trials(&self, study_id: StudyId) -> Result<Vec<FrozenTrial>>;
}
