use chrono::Utc;
use parking_lot::RwLock;

use super::{Storage, StudyId, StudyRecord};
use crate::error::{Error, Result};
use crate::sampler::FrozenTrial;
use crate::types::Direction;

struct StoredStudy {
    record: StudyRecord,
    trials: Vec<FrozenTrial>,
}

/// In-memory study storage.
///
/// Nothing outlives the process. Useful for tests and for studies that do
/// not need to be shared.
pub struct MemoryStorage {
    studies: RwLock<Vec<StoredStudy>>,
}

impl MemoryStorage {
    /// Creates a new, empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            studies: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn position(studies: &[StoredStudy], study_id: StudyId) -> Result<usize> {
    studies
        .iter()
        .position(|s| s.record.id == study_id)
        .ok_or_else(|| Error::StudyNotFound(format!("with id {study_id}")))
}

impl Storage for MemoryStorage {
    fn create_study(&self, name: &str, direction: Direction) -> Result<StudyId> {
        let mut studies = self.studies.write();
        if studies.iter().any(|s| s.record.name == name) {
            return Err(Error::DuplicatedStudy(name.to_string()));
        }
        let id = StudyId(studies.last().map_or(1, |s| s.record.id.0 + 1));
        studies.push(StoredStudy {
            record: StudyRecord {
                id,
                name: name.to_string(),
                direction,
            },
            trials: Vec::new(),
        });
        Ok(id)
    }

    fn study_id_from_name(&self, name: &str) -> Result<Option<StudyId>> {
        Ok(self
            .studies
            .read()
            .iter()
            .find(|s| s.record.name == name)
            .map(|s| s.record.id))
    }

    fn study_direction(&self, study_id: StudyId) -> Result<Direction> {
        let studies = self.studies.read();
        let idx = position(&studies, study_id)?;
        Ok(studies[idx].record.direction)
    }

    fn list_studies(&self) -> Result<Vec<StudyRecord>> {
        Ok(self
            .studies
            .read()
            .iter()
            .map(|s| s.record.clone())
            .collect())
    }

    fn create_trial(&self, study_id: StudyId) -> Result<FrozenTrial> {
        let mut studies = self.studies.write();
        let idx = position(&studies, study_id)?;
        let trials = &mut studies[idx].trials;
        let trial = FrozenTrial::running(trials.len() as u64, Utc::now());
        trials.push(trial.clone());
        Ok(trial)
    }

    fn finish_trial(&self, study_id: StudyId, trial: &FrozenTrial) -> Result<()> {
        let mut studies = self.studies.write();
        let idx = position(&studies, study_id)?;
        let slot = usize::try_from(trial.number)
            .ok()
            .and_then(|n| studies[idx].trials.get_mut(n))
            .ok_or_else(|| Error::Storage(format!("trial {} does not exist", trial.number)))?;
        *slot = trial.clone();
        Ok(())
    }

    fn trials(&self, study_id: StudyId) -> Result<Vec<FrozenTrial>> {
        let studies = self.studies.read();
        let idx = position(&studies, study_id)?;
        Ok(studies[idx].trials.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrialState;

    #[test]
    fn duplicate_names_are_rejected() {
        let storage = MemoryStorage::new();
        storage.create_study("a", Direction::Minimize).unwrap();
        assert!(matches!(
            storage.create_study("a", Direction::Maximize),
            Err(Error::DuplicatedStudy(name)) if name == "a"
        ));
    }

    #[test]
    fn trials_are_numbered_per_study() {
        let storage = MemoryStorage::new();
        let a = storage.create_study("a", Direction::Minimize).unwrap();
        let b = storage.create_study("b", Direction::Minimize).unwrap();
        assert_eq!(storage.create_trial(a).unwrap().number, 0);
        assert_eq!(storage.create_trial(a).unwrap().number, 1);
        assert_eq!(storage.create_trial(b).unwrap().number, 0);
    }

    #[test]
    fn finish_overwrites_running_trial() {
        let storage = MemoryStorage::new();
        let id = storage.create_study("a", Direction::Minimize).unwrap();
        let mut trial = storage.create_trial(id).unwrap();
        trial.state = TrialState::Complete;
        trial.value = Some(2.0);
        storage.finish_trial(id, &trial).unwrap();

        let stored = storage.trials(id).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].value, Some(2.0));
    }

    #[test]
    fn unknown_study_id_is_not_found() {
        let storage = MemoryStorage::new();
        assert!(matches!(
            storage.trials(StudyId(9)),
            Err(Error::StudyNotFound(_))
        ));
    }
}
