//! Integration tests for the study registry over a shared in-memory store.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use docktuna::config::DatabaseConfig;
use docktuna::logging::{self, Verbosity};
use docktuna::{
    Direction, Error, MemoryStorage, ParamValue, SecretResolver, Storage, StudyId, StudyOptions,
    StudyRegistry, TrialState,
};

fn database() -> DatabaseConfig {
    let mut database = DatabaseConfig::default();
    database.url = Some("sqlite://:memory:".to_string());
    database
}

fn registry_over(storage: &Arc<dyn Storage>) -> StudyRegistry {
    let storage = Arc::clone(storage);
    StudyRegistry::new(database(), SecretResolver::new("/nonexistent", None))
        .with_opener(move |_url| Ok(Arc::clone(&storage)))
}

fn shared() -> Arc<dyn Storage> {
    Arc::new(MemoryStorage::new())
}

/// Store one finished trial with an `x` parameter.
fn record(
    storage: &Arc<dyn Storage>,
    study: StudyId,
    x: f64,
    state: TrialState,
    finished: DateTime<Utc>,
) {
    let mut trial = storage.create_trial(study).unwrap();
    trial.state = state;
    trial.value = (state == TrialState::Complete).then_some(x);
    trial.params.insert("x".to_string(), ParamValue::Float(x));
    trial.datetime_complete = Some(finished);
    storage.finish_trial(study, &trial).unwrap();
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

#[test]
fn get_study_creates_then_loads() {
    let storage = shared();
    let registry = registry_over(&storage);

    let first = registry.get_study("simple_study").unwrap();
    let second = registry.get_study("simple_study").unwrap();

    assert_eq!(first.id(), second.id());
    assert_eq!(registry.num_existing_studies().unwrap(), 1);
    assert!(registry.study_exists("simple_study").unwrap());
    assert!(!registry.study_exists("other").unwrap());
}

#[test]
fn loaded_study_keeps_stored_direction() {
    let storage = shared();
    let registry = registry_over(&storage);

    registry
        .get_study_with("maximized", &StudyOptions::maximize())
        .unwrap();
    let loaded = registry.get_study("maximized").unwrap();
    assert_eq!(loaded.direction(), Direction::Maximize);
}

#[test]
fn best_params_follow_best_trial() {
    let storage = shared();
    let registry = registry_over(&storage);
    let study = registry.get_study("quadratic").unwrap();

    for (i, x) in [5.0, 2.0, 9.0].into_iter().enumerate() {
        record(&storage, study.id(), x, TrialState::Complete, at(i as i64));
    }

    let best = registry.get_best_params("quadratic").unwrap();
    assert_eq!(best.get("x"), Some(&ParamValue::Float(2.0)));

    let summary = registry.get_study_summary("quadratic").unwrap();
    assert_eq!(summary.n_trials, 3);
    assert_eq!(summary.best_trial.unwrap().value, Some(2.0));
    assert_eq!(summary.direction, Direction::Minimize);
}

#[test]
fn best_params_of_study_without_completed_trials_is_empty() {
    let storage = shared();
    let registry = registry_over(&storage);
    let study = registry.get_study("empty").unwrap();
    assert_eq!(registry.get_best_params("empty").unwrap(), BTreeMap::new());

    record(&storage, study.id(), 1.0, TrialState::Pruned, at(0));
    record(&storage, study.id(), 2.0, TrialState::Failed, at(1));
    assert!(registry.get_best_params("empty").unwrap().is_empty());
}

#[test]
fn unknown_study_summary_is_not_found() {
    let registry = registry_over(&shared());
    assert!(matches!(
        registry.get_study_summary("missing"),
        Err(Error::StudyNotFound(name)) if name == "missing"
    ));
    assert!(matches!(
        registry.get_best_params("missing"),
        Err(Error::StudyNotFound(_))
    ));
}

#[test]
fn latest_study_has_most_recent_completion() {
    let storage = shared();
    let registry = registry_over(&storage);

    let a = registry.get_study("a").unwrap();
    let b = registry.get_study("b").unwrap();
    record(&storage, a.id(), 1.0, TrialState::Complete, at(10));
    record(&storage, b.id(), 1.0, TrialState::Complete, at(20));
    record(&storage, a.id(), 1.0, TrialState::Pruned, at(5));

    let latest = registry.get_latest_study().unwrap().unwrap();
    assert_eq!(latest.name(), "b");
    assert_eq!(StudyRegistry::last_update_time(&a).unwrap(), at(10));
}

#[test]
fn study_with_only_running_trials_ranks_oldest() {
    let storage = shared();
    let registry = registry_over(&storage);

    let running = registry.get_study("running").unwrap();
    let finished = registry.get_study("finished").unwrap();
    storage.create_trial(running.id()).unwrap();
    record(&storage, finished.id(), 1.0, TrialState::Complete, at(0));

    let latest = registry.get_latest_study().unwrap().unwrap();
    assert_eq!(latest.name(), "finished");
    assert_eq!(running.n_trials().unwrap(), 1);
    assert_eq!(
        StudyRegistry::last_update_time(&running).unwrap(),
        DateTime::<Utc>::MIN_UTC
    );
}

#[test]
fn latest_study_ties_go_to_first_listed() {
    let storage = shared();
    let registry = registry_over(&storage);

    registry.get_study("first").unwrap();
    registry.get_study("second").unwrap();

    let latest = registry.get_latest_study().unwrap().unwrap();
    assert_eq!(latest.name(), "first");
    assert_eq!(
        StudyRegistry::last_update_time(&latest).unwrap(),
        DateTime::<Utc>::MIN_UTC
    );
}

#[test]
fn latest_study_of_empty_database_is_none() {
    let registry = registry_over(&shared());
    assert!(registry.get_latest_study().unwrap().is_none());
    assert_eq!(registry.num_existing_studies().unwrap(), 0);
    assert!(registry.get_all_studies().unwrap().is_empty());
}

#[test]
fn all_studies_keep_creation_order() {
    let storage = shared();
    let registry = registry_over(&storage);
    for name in ["c", "a", "b"] {
        registry.get_study(name).unwrap();
    }
    let names: Vec<String> = registry
        .get_all_studies()
        .unwrap()
        .iter()
        .map(|s| s.name().to_string())
        .collect();
    assert_eq!(names, ["c", "a", "b"]);
}

#[test]
fn get_study_quiets_library_logs_and_restores() {
    let before = logging::verbosity();
    let registry = StudyRegistry::new(database(), SecretResolver::new("/nonexistent", None))
        .with_opener(|_url| {
            assert_eq!(logging::verbosity(), Verbosity::Warning);
            Err(Error::Storage("DB connection failed".to_string()))
        });

    let err = registry.get_study("any").unwrap_err();
    assert!(matches!(err, Error::Storage(msg) if msg == "DB connection failed"));
    assert_eq!(logging::verbosity(), before);
}

#[test]
fn connection_errors_propagate_unchanged() {
    let registry = StudyRegistry::new(database(), SecretResolver::new("/nonexistent", None))
        .with_opener(|_url| Err(Error::Storage("refused".to_string())));
    assert!(matches!(registry.study_summaries(), Err(Error::Storage(_))));
    assert!(matches!(registry.study_exists("x"), Err(Error::Storage(_))));
}
