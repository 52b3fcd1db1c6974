use std::sync::Arc;

use docktuna::{Direction, MemoryStorage, Storage, Study, Trial, get_all_study_summaries};

#[test]
fn summaries_cover_every_study() {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let study = Study::builder()
        .name("with_trials")
        .storage(Arc::clone(&storage))
        .maximize()
        .build()
        .unwrap();
    study
        .optimize(3, |trial: &mut Trial| Ok(trial.number() as f64))
        .unwrap();
    storage.create_study("empty", Direction::Minimize).unwrap();

    let summaries = get_all_study_summaries(storage.as_ref()).unwrap();
    assert_eq!(summaries.len(), 2);

    let full = &summaries[0];
    assert_eq!(full.study_name, "with_trials");
    assert_eq!(full.direction, Direction::Maximize);
    assert_eq!(full.n_trials, 3);
    assert_eq!(full.best_trial.as_ref().unwrap().number, 2);
    assert!(full.datetime_start.is_some());

    let empty = &summaries[1];
    assert_eq!(empty.n_trials, 0);
    assert!(empty.best_trial.is_none());
    assert!(empty.datetime_start.is_none());
}
