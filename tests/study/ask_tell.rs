use std::sync::Arc;

use docktuna::{Error, MemoryStorage, Study, TrialState};

fn study() -> Study {
    Study::builder()
        .name("ask_tell")
        .storage(Arc::new(MemoryStorage::new()))
        .build()
        .unwrap()
}

#[test]
fn ask_registers_a_running_trial() {
    let study = study();
    let trial = study.ask().unwrap();

    let stored = study.trials().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].number, trial.number());
    assert_eq!(stored[0].state, TrialState::Running);
    assert!(stored[0].datetime_complete.is_none());
}

#[test]
fn tell_writes_params_and_value() {
    let study = study();
    let mut trial = study.ask().unwrap();
    let x = trial.suggest_float("x", 0.0, 1.0).unwrap();
    let layers = trial.suggest_int("layers", 1, 4).unwrap();
    study.tell(trial, Ok(x + layers as f64)).unwrap();

    let best = study.best_trial().unwrap();
    assert_eq!(best.state, TrialState::Complete);
    assert_eq!(best.params.len(), 2);
    assert!(best.datetime_complete.is_some());
    assert_eq!(study.best_value().unwrap(), x + layers as f64);
}

#[test]
fn interleaved_trials_finish_independently() {
    let study = study();
    let first = study.ask().unwrap();
    let second = study.ask().unwrap();

    study.tell(second, Ok(1.0)).unwrap();
    let trials = study.trials().unwrap();
    assert_eq!(trials[0].state, TrialState::Running);
    assert_eq!(trials[1].state, TrialState::Complete);

    study.tell(first, Err(Error::TrialPruned)).unwrap();
    assert_eq!(study.trials().unwrap()[0].state, TrialState::Pruned);
    assert_eq!(study.best_trial().unwrap().number, 1);
}
