use std::sync::Arc;

use docktuna::parameter::{BoolParam, CategoricalParam, FloatParam, IntParam, Parameter};
use docktuna::{Error, MemoryStorage, ParamValue, RandomSampler, Study, Trial, TrialState};

fn study(seed: u64) -> Study {
    Study::builder()
        .name("workflow")
        .storage(Arc::new(MemoryStorage::new()))
        .sampler(RandomSampler::with_seed(seed))
        .build()
        .unwrap()
}

#[test]
fn test_study_basic_workflow() {
    let study = study(42);
    let x_param = FloatParam::new("x", -5.0, 5.0);

    study
        .optimize(10, |trial: &mut Trial| {
            let x = x_param.suggest(trial)?;
            Ok(x * x)
        })
        .expect("optimization should succeed");

    assert_eq!(study.n_trials().unwrap(), 10);
    let best = study.best_trial().expect("should have best trial");
    assert!(best.value.unwrap() >= 0.0, "x^2 should be non-negative");
    assert!(best.get(&x_param).is_some());
}

#[test]
fn test_study_with_failures() {
    let study = study(1);
    let x_param = FloatParam::new("x", -5.0, 5.0);

    let mut counter = 0;
    study
        .optimize(10, |trial: &mut Trial| {
            counter += 1;
            if counter % 2 == 0 {
                return Err(Error::Internal("intentional failure"));
            }
            let x = x_param.suggest(trial)?;
            Ok(x * x)
        })
        .expect("optimization should succeed with some failures");

    let trials = study.trials().unwrap();
    assert_eq!(trials.len(), 10);
    let failed = trials
        .iter()
        .filter(|t| t.state == TrialState::Failed)
        .count();
    assert_eq!(failed, 5);
}

#[test]
fn test_no_completed_trials_error() {
    let study = study(0);
    assert!(matches!(study.best_trial(), Err(Error::NoCompletedTrials)));
    assert!(matches!(study.best_params(), Err(Error::NoCompletedTrials)));
}

#[test]
fn test_mixed_parameter_types_are_stored() {
    let study = study(5);
    let hidden = IntParam::new("hidden_size", 8, 128);
    let optimizer = CategoricalParam::new("optimizer", ["Adam", "SGD"]);
    let lr = FloatParam::new("lr", 1e-5, 1e-1).log_scale();
    let dropout = BoolParam::new("dropout");

    study
        .optimize(5, |trial: &mut Trial| {
            let h = hidden.suggest(trial)?;
            let o = optimizer.suggest(trial)?;
            let l = lr.suggest(trial)?;
            let d = dropout.suggest(trial)?;
            assert!((8..=128).contains(&h));
            assert!(o == "Adam" || o == "SGD");
            assert!((1e-5..=1e-1).contains(&l));
            Ok(h as f64 * l + if d { 1.0 } else { 0.0 })
        })
        .unwrap();

    let params = study.best_params().unwrap();
    assert!(matches!(params["hidden_size"], ParamValue::Int(_)));
    assert!(matches!(params["optimizer"], ParamValue::Str(_)));
    assert!(matches!(params["lr"], ParamValue::Float(_)));
    assert!(matches!(params["dropout"], ParamValue::Bool(_)));
}

#[test]
fn test_invalid_parameter_fails_the_trial() {
    let study = study(3);
    let result = study.optimize(1, |trial: &mut Trial| {
        let x = trial.suggest_float("x", 1.0, 0.0)?;
        Ok(x)
    });
    assert!(matches!(result, Err(Error::NoCompletedTrials)));
    assert_eq!(study.trials().unwrap()[0].state, TrialState::Failed);
}
