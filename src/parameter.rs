//! Central parameter trait and built-in parameter types.
//!
//! The [`Parameter`] trait provides a unified way to define a named search
//! dimension and suggest values for it from a [`Trial`]. Parameters are keyed
//! by name, so the same name always refers to the same stored column of a
//! study's trial history.
//!
//! # Example
//!
//! ```
//! use docktuna::Trial;
//! use docktuna::parameter::{BoolParam, FloatParam, IntParam, Parameter};
//!
//! let mut trial = Trial::new(0);
//!
//! let lr = FloatParam::new("lr", 1e-5, 1e-1)
//!     .log_scale()
//!     .suggest(&mut trial)
//!     .unwrap();
//! let layers = IntParam::new("layers", 1, 10).suggest(&mut trial).unwrap();
//! let dropout = BoolParam::new("dropout").suggest(&mut trial).unwrap();
//! assert!((1e-5..=1e-1).contains(&lr));
//! assert!((1..=10).contains(&layers));
//! # let _ = dropout;
//! ```

use core::fmt::Debug;

use crate::distribution::{
    CategoricalDistribution, Distribution, FloatDistribution, IntDistribution,
};
use crate::error::{Error, Result};
use crate::param::ParamValue;
use crate::trial::Trial;

/// A trait for defining parameter types that can be suggested by a [`Trial`].
///
/// Implementors specify the distribution to sample from and how to convert
/// the raw [`ParamValue`] back into a typed value.
pub trait Parameter: Debug {
    /// The typed value returned after sampling.
    type Value;

    /// The name under which the value is recorded.
    fn name(&self) -> &str;

    /// Returns the distribution that this parameter samples from.
    fn distribution(&self) -> Distribution;

    /// Converts a raw [`ParamValue`] into the typed value.
    ///
    /// # Errors
    ///
    /// Returns an error if the `ParamValue` variant doesn't match what this parameter expects.
    fn cast_param_value(&self, param_value: &ParamValue) -> Result<Self::Value>;

    /// Validates the parameter configuration.
    ///
    /// Called before sampling. The default implementation accepts all configurations.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter configuration is invalid.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Suggests a value for this parameter from the given trial.
    ///
    /// This is a convenience method that delegates to [`Trial::suggest_param`].
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails, the parameter conflicts with
    /// a previously suggested parameter of the same name, or sampling fails.
    fn suggest(&self, trial: &mut Trial) -> Result<Self::Value>
    where
        Self: Sized,
    {
        trial.suggest_param(self)
    }
}

/// A floating-point parameter with optional log-scale and step size.
#[derive(Clone, Debug)]
pub struct FloatParam {
    name: String,
    low: f64,
    high: f64,
    log_scale: bool,
    step: Option<f64>,
}

impl FloatParam {
    /// Creates a new float parameter with the given bounds.
    #[must_use]
    pub fn new(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            name: name.into(),
            low,
            high,
            log_scale: false,
            step: None,
        }
    }

    /// Enables log-scale sampling.
    #[must_use]
    pub fn log_scale(mut self) -> Self {
        self.log_scale = true;
        self
    }

    /// Sets a step size for discretized sampling.
    #[must_use]
    pub fn step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }
}

impl Parameter for FloatParam {
    type Value = f64;

    fn name(&self) -> &str {
        &self.name
    }

    fn distribution(&self) -> Distribution {
        Distribution::Float(FloatDistribution {
            low: self.low,
            high: self.high,
            log_scale: self.log_scale,
            step: self.step,
        })
    }

    fn cast_param_value(&self, param_value: &ParamValue) -> Result<f64> {
        match param_value {
            ParamValue::Float(v) => Ok(*v),
            _ => Err(Error::Internal(
                "Float distribution should return Float value",
            )),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.low > self.high {
            return Err(Error::InvalidBounds {
                low: self.low,
                high: self.high,
            });
        }
        if self.log_scale && self.low <= 0.0 {
            return Err(Error::InvalidLogBounds);
        }
        match self.step {
            Some(step) if step <= 0.0 => Err(Error::InvalidStep),
            _ => Ok(()),
        }
    }
}

/// An integer parameter with optional log-scale and step size.
#[derive(Clone, Debug)]
pub struct IntParam {
    name: String,
    low: i64,
    high: i64,
    log_scale: bool,
    step: Option<i64>,
}

impl IntParam {
    /// Creates a new integer parameter with the given bounds.
    #[must_use]
    pub fn new(name: impl Into<String>, low: i64, high: i64) -> Self {
        Self {
            name: name.into(),
            low,
            high,
            log_scale: false,
            step: None,
        }
    }

    /// Enables log-scale sampling.
    #[must_use]
    pub fn log_scale(mut self) -> Self {
        self.log_scale = true;
        self
    }

    /// Sets a step size for discretized sampling.
    #[must_use]
    pub fn step(mut self, step: i64) -> Self {
        self.step = Some(step);
        self
    }
}

impl Parameter for IntParam {
    type Value = i64;

    fn name(&self) -> &str {
        &self.name
    }

    fn distribution(&self) -> Distribution {
        Distribution::Int(IntDistribution {
            low: self.low,
            high: self.high,
            log_scale: self.log_scale,
            step: self.step,
        })
    }

    fn cast_param_value(&self, param_value: &ParamValue) -> Result<i64> {
        match param_value {
            ParamValue::Int(v) => Ok(*v),
            _ => Err(Error::Internal("Int distribution should return Int value")),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn validate(&self) -> Result<()> {
        if self.low > self.high {
            return Err(Error::InvalidBounds {
                low: self.low as f64,
                high: self.high as f64,
            });
        }
        if self.log_scale && self.low < 1 {
            return Err(Error::InvalidLogBounds);
        }
        match self.step {
            Some(step) if step <= 0 => Err(Error::InvalidStep),
            _ => Ok(()),
        }
    }
}

/// A categorical parameter that selects one label from a list of choices.
///
/// # Example
///
/// ```
/// use docktuna::Trial;
/// use docktuna::parameter::{CategoricalParam, Parameter};
///
/// let mut trial = Trial::new(0);
/// let opt = CategoricalParam::new("optimizer", ["Adam", "SGD"])
///     .suggest(&mut trial)
///     .unwrap();
/// assert!(opt == "Adam" || opt == "SGD");
/// ```
#[derive(Clone, Debug)]
pub struct CategoricalParam {
    name: String,
    choices: Vec<String>,
}

impl CategoricalParam {
    /// Creates a new categorical parameter with the given choices.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }
}

impl Parameter for CategoricalParam {
    type Value = String;

    fn name(&self) -> &str {
        &self.name
    }

    fn distribution(&self) -> Distribution {
        Distribution::Categorical(CategoricalDistribution {
            choices: self.choices.clone(),
        })
    }

    fn cast_param_value(&self, param_value: &ParamValue) -> Result<String> {
        match param_value {
            ParamValue::Str(label) if self.choices.contains(label) => Ok(label.clone()),
            ParamValue::Str(_) => Err(Error::ParameterConflict {
                name: self.name.clone(),
                reason: "value is not one of the declared choices".to_string(),
            }),
            _ => Err(Error::Internal(
                "Categorical distribution should return Str value",
            )),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.choices.is_empty() {
            return Err(Error::EmptyChoices);
        }
        Ok(())
    }
}

/// A boolean parameter.
#[derive(Clone, Debug)]
pub struct BoolParam {
    name: String,
}

impl BoolParam {
    /// Creates a new boolean parameter.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Parameter for BoolParam {
    type Value = bool;

    fn name(&self) -> &str {
        &self.name
    }

    fn distribution(&self) -> Distribution {
        Distribution::Bool
    }

    fn cast_param_value(&self, param_value: &ParamValue) -> Result<bool> {
        match param_value {
            ParamValue::Bool(v) => Ok(*v),
            _ => Err(Error::Internal("Bool distribution should return Bool value")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_bounds_are_validated() {
        assert!(matches!(
            FloatParam::new("x", 1.0, 0.0).validate(),
            Err(Error::InvalidBounds { .. })
        ));
        assert!(matches!(
            FloatParam::new("lr", 0.0, 1.0).log_scale().validate(),
            Err(Error::InvalidLogBounds)
        ));
        assert!(matches!(
            FloatParam::new("x", 0.0, 1.0).step(0.0).validate(),
            Err(Error::InvalidStep)
        ));
        assert!(FloatParam::new("x", -1.0, 1.0).step(0.5).validate().is_ok());
    }

    #[test]
    fn int_log_scale_needs_positive_low() {
        assert!(matches!(
            IntParam::new("n", 0, 10).log_scale().validate(),
            Err(Error::InvalidLogBounds)
        ));
        assert!(IntParam::new("n", 1, 10).log_scale().validate().is_ok());
    }

    #[test]
    fn empty_categorical_is_rejected() {
        let p = CategoricalParam::new("opt", Vec::<String>::new());
        assert!(matches!(p.validate(), Err(Error::EmptyChoices)));
    }

    #[test]
    fn categorical_rejects_foreign_label() {
        let p = CategoricalParam::new("opt", ["Adam", "SGD"]);
        assert_eq!(
            p.cast_param_value(&ParamValue::from("SGD")).unwrap(),
            "SGD"
        );
        assert!(p.cast_param_value(&ParamValue::from("RMSprop")).is_err());
    }
}
