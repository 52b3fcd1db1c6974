#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Database-backed hyperparameter tuning with an Optuna-like study API.
//!
//! Studies and their trials live in a relational database (`PostgreSQL` in a
//! shared deployment, `SQLite` for local runs) so that several tuning
//! processes can contribute to, and report on, the same study. Database
//! credentials come from Docker secret files, environment variables, or a
//! `.env` file, and are resolved again every time a connection is opened.
//!
//! # Getting Started
//!
//! ```
//! use std::sync::Arc;
//!
//! use docktuna::prelude::*;
//!
//! let study = Study::builder()
//!     .name("quadratic")
//!     .storage(Arc::new(MemoryStorage::new()))
//!     .sampler(RandomSampler::with_seed(3))
//!     .build()
//!     .unwrap();
//!
//! study
//!     .optimize(20, |trial: &mut Trial| {
//!         let x = trial.suggest_float("x", -10.0, 10.0)?;
//!         Ok((x - 2.0).powi(2))
//!     })
//!     .unwrap();
//!
//! let best = study.best_trial().unwrap();
//! println!("best x = {}", best.params["x"]);
//! ```
//!
//! Against the shared database, go through the process-wide registry:
//!
//! ```no_run
//! let registry = docktuna::get_registry().unwrap();
//! let study = registry.get_study("simple_study").unwrap();
//! println!("{} trials so far", study.n_trials().unwrap());
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`StudyRegistry`] | Open, list and report on the studies in the tuning database. |
//! | [`Study`] | Drive an optimization loop against a [`Storage`]. |
//! | [`Trial`] | A single evaluation of the objective, carrying suggested parameter values. |
//! | [`Credential`] / [`SecretResolver`] | Where each database credential comes from. |
//! | [`ConnectionUrl`] | A database URL that never prints its password. |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `sqlite` | `sqlite://` URLs in [`RdbStorage`] | on |
//! | `postgres` | `postgresql://` URLs in [`RdbStorage`] | on |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) | on |
//! | `cli` | The `simple_tune`, `mlp_tune` and `check_connections` binaries | on |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled and
/// the library verbosity admits it. No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => {
        if $crate::logging::enabled($crate::logging::Verbosity::Info) {
            tracing::info!($($arg)*)
        }
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled and
/// the library verbosity admits it. No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => {
        if $crate::logging::enabled($crate::logging::Verbosity::Debug) {
            tracing::debug!($($arg)*)
        }
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::warn!` event when the `tracing` feature is enabled and
/// the library verbosity admits it. No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_warn {
    ($($arg:tt)*) => {
        if $crate::logging::enabled($crate::logging::Verbosity::Warning) {
            tracing::warn!($($arg)*)
        }
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_warn {
    ($($arg:tt)*) => {};
}

pub mod config;
mod distribution;
mod error;
mod instance;
pub mod logging;
mod param;
pub mod parameter;
pub mod pruner;
mod registry;
mod rng_util;
pub mod sampler;
mod secrets;
pub mod storage;
mod study;
mod trial;
mod types;
mod url;

pub use config::{Config, DatabaseConfig};
pub use distribution::{
    CategoricalDistribution, Distribution, FloatDistribution, IntDistribution,
};
pub use error::{Error, Result, TrialPruned};
pub use instance::{RegistryCell, get_registry, reset_registry};
pub use param::{ParamValue, format_params};
pub use registry::{StorageOpener, StudyOptions, StudyRegistry};
pub use sampler::{FrozenTrial, RandomSampler};
pub use secrets::{Credential, SecretResolver};
pub use storage::{MemoryStorage, RdbStorage, Storage, StudyId};
pub use study::{Study, StudyBuilder, StudySummary, get_all_study_summaries};
pub use trial::Trial;
pub use types::{Direction, TrialState};
pub use url::ConnectionUrl;

/// Convenient wildcard import for the most common types.
///
/// ```
/// use docktuna::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result, TrialPruned};
    pub use crate::param::ParamValue;
    pub use crate::parameter::{BoolParam, CategoricalParam, FloatParam, IntParam, Parameter};
    pub use crate::pruner::{MedianPruner, NopPruner, Pruner};
    pub use crate::registry::{StudyOptions, StudyRegistry};
    pub use crate::sampler::{FrozenTrial, RandomSampler, Sampler};
    pub use crate::storage::{MemoryStorage, RdbStorage, Storage};
    pub use crate::study::{Study, StudyBuilder, StudySummary};
    pub use crate::trial::Trial;
    pub use crate::types::{Direction, TrialState};
}
