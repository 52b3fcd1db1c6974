use std::sync::Arc;

use docktuna::pruner::MedianPruner;
use docktuna::{Direction, Error, MemoryStorage, RandomSampler, Storage, Study};

#[test]
fn builder_applies_direction() {
    let study = Study::builder()
        .name("max")
        .storage(Arc::new(MemoryStorage::new()))
        .maximize()
        .sampler(RandomSampler::with_seed(1))
        .pruner(MedianPruner::new(Direction::Maximize))
        .build()
        .unwrap();
    assert_eq!(study.direction(), Direction::Maximize);
    assert_eq!(study.name(), "max");
}

#[test]
fn duplicate_name_is_rejected_without_load_if_exists() {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    Study::builder()
        .name("taken")
        .storage(Arc::clone(&storage))
        .build()
        .unwrap();

    let err = Study::builder()
        .name("taken")
        .storage(Arc::clone(&storage))
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::DuplicatedStudy(name) if name == "taken"));

    let loaded = Study::builder()
        .name("taken")
        .storage(storage)
        .maximize()
        .load_if_exists(true)
        .build()
        .unwrap();
    assert_eq!(loaded.direction(), Direction::Minimize);
}

#[test]
fn load_reads_stored_direction() {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    storage.create_study("stored", Direction::Maximize).unwrap();
    let study = Study::load("stored", storage).unwrap();
    assert_eq!(study.direction(), Direction::Maximize);
}
