//! Tune a small multilayer perceptron against the shared tuning database.
//!
//! Each trial trains a one-hidden-layer ReLU network on a fixed synthetic
//! regression set with full-batch gradient descent and reports the final
//! training loss. The hidden width, the optimizer and its learning rate are
//! tuned.
//!
//! ```bash
//! mlp_tune --study_name my_study --n_trials 10
//! ```

use std::process::ExitCode;

use clap::Parser;
use docktuna::{Error, Result, Trial, format_params, get_registry};
use nalgebra::DMatrix;

const DATA_SEED: u64 = 42;
const N_SAMPLES: usize = 1000;
const INPUT_SIZE: usize = 10;
const EPOCHS: usize = 20;

/// Run a study over MLP training hyperparameters.
#[derive(Parser, Debug)]
#[command(name = "mlp_tune", version)]
struct Cli {
    /// Name of the study to create or resume.
    #[arg(long = "study_name", default_value = "mlp_study")]
    study_name: String,

    /// Number of trials to run.
    #[arg(long = "n_trials", default_value_t = 10)]
    n_trials: usize,
}

/// Standard normal draw (Box-Muller).
fn normal(rng: &mut fastrand::Rng) -> f64 {
    let u1 = 1.0 - rng.f64();
    let u2 = rng.f64();
    (-2.0 * u1.ln()).sqrt() * (core::f64::consts::TAU * u2).cos()
}

fn synthetic_data() -> (DMatrix<f64>, DMatrix<f64>) {
    let mut rng = fastrand::Rng::with_seed(DATA_SEED);
    let x = DMatrix::from_fn(N_SAMPLES, INPUT_SIZE, |_, _| normal(&mut rng));
    let y = DMatrix::from_fn(N_SAMPLES, 1, |_, _| normal(&mut rng));
    (x, y)
}

/// Weights and biases in the order `w1, b1, w2, b2`. Biases are row vectors.
struct Mlp {
    params: [DMatrix<f64>; 4],
}

impl Mlp {
    fn new(input: usize, hidden: usize, rng: &mut fastrand::Rng) -> Self {
        let mut uniform = |rows: usize, cols: usize, fan_in: usize| {
            #[allow(clippy::cast_precision_loss)]
            let bound = 1.0 / (fan_in as f64).sqrt();
            DMatrix::from_fn(rows, cols, |_, _| (rng.f64() * 2.0 - 1.0) * bound)
        };
        Self {
            params: [
                uniform(input, hidden, input),
                uniform(1, hidden, input),
                uniform(hidden, 1, hidden),
                uniform(1, 1, hidden),
            ],
        }
    }

    /// Mean squared error on `(x, y)` and its gradient for every parameter.
    fn loss_and_grads(&self, x: &DMatrix<f64>, y: &DMatrix<f64>) -> (f64, [DMatrix<f64>; 4]) {
        let [w1, b1, w2, b2] = &self.params;
        let ones = DMatrix::from_element(x.nrows(), 1, 1.0);
        #[allow(clippy::cast_precision_loss)]
        let n = x.nrows() as f64;

        let z1 = x * w1 + &ones * b1;
        let a1 = z1.map(|v| v.max(0.0));
        let residual = &a1 * w2 + &ones * b2 - y;
        let loss = residual.norm_squared() / n;

        let d_out = residual * (2.0 / n);
        let d_w2 = a1.transpose() * &d_out;
        let d_b2 = ones.transpose() * &d_out;
        let d_z1 = (&d_out * w2.transpose()).zip_map(&z1, |g, z| if z > 0.0 { g } else { 0.0 });
        let d_w1 = x.transpose() * &d_z1;
        let d_b1 = ones.transpose() * &d_z1;

        (loss, [d_w1, d_b1, d_w2, d_b2])
    }
}

enum Optimizer {
    Sgd {
        lr: f64,
    },
    Adam {
        lr: f64,
        step: i32,
        m: Vec<DMatrix<f64>>,
        v: Vec<DMatrix<f64>>,
    },
}

impl Optimizer {
    const BETA1: f64 = 0.9;
    const BETA2: f64 = 0.999;
    const EPS: f64 = 1e-8;

    fn new(name: &str, lr: f64, model: &Mlp) -> Result<Self> {
        let zeros = || {
            model
                .params
                .iter()
                .map(|p| DMatrix::zeros(p.nrows(), p.ncols()))
                .collect::<Vec<_>>()
        };
        match name {
            "SGD" => Ok(Self::Sgd { lr }),
            "Adam" => Ok(Self::Adam {
                lr,
                step: 0,
                m: zeros(),
                v: zeros(),
            }),
            other => Err(Error::Config(format!("unknown optimizer `{other}`"))),
        }
    }

    fn step(&mut self, model: &mut Mlp, grads: &[DMatrix<f64>; 4]) {
        match self {
            Self::Sgd { lr } => {
                for (param, grad) in model.params.iter_mut().zip(grads) {
                    *param -= grad * *lr;
                }
            }
            Self::Adam { lr, step, m, v } => {
                *step += 1;
                let bias1 = 1.0 - Self::BETA1.powi(*step);
                let bias2 = 1.0 - Self::BETA2.powi(*step);
                for (((param, grad), m), v) in
                    model.params.iter_mut().zip(grads).zip(m).zip(v)
                {
                    *m = &*m * Self::BETA1 + grad * (1.0 - Self::BETA1);
                    *v = &*v * Self::BETA2 + grad.map(|g| g * g) * (1.0 - Self::BETA2);
                    let update = m.zip_map(&*v, |m, v| {
                        (m / bias1) / ((v / bias2).sqrt() + Self::EPS)
                    });
                    *param -= update * *lr;
                }
            }
        }
    }
}

fn objective(trial: &mut Trial, x: &DMatrix<f64>, y: &DMatrix<f64>) -> Result<f64> {
    let hidden_size = trial.suggest_int("hidden_size", 8, 128)?;
    let optimizer_name = trial.suggest_categorical("optimizer", &["Adam", "SGD"])?;
    let lr = trial.suggest_float_log("lr", 1e-5, 1e-1)?;

    let hidden = usize::try_from(hidden_size)
        .map_err(|_| Error::Internal("hidden size out of range"))?;
    let mut rng = fastrand::Rng::with_seed(DATA_SEED.wrapping_add(trial.number()));
    let mut model = Mlp::new(INPUT_SIZE, hidden, &mut rng);
    let mut optimizer = Optimizer::new(&optimizer_name, lr, &model)?;

    for _ in 0..EPOCHS {
        let (_, grads) = model.loss_and_grads(x, y);
        optimizer.step(&mut model, &grads);
    }
    let (loss, _) = model.loss_and_grads(x, y);
    Ok(loss)
}

fn run(cli: &Cli) -> Result<()> {
    let (x, y) = synthetic_data();
    let registry = get_registry()?;
    let study = registry.get_study(&cli.study_name)?;
    study.optimize(cli.n_trials, |trial: &mut Trial| objective(trial, &x, &y))?;
    println!("Best hyperparameters: {}", format_params(&study.best_params()?));
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = docktuna::logging::init_subscriber() {
        eprintln!("Error: {e}");
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
