//! Parameter value storage types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Represents a sampled parameter value.
///
/// Trial parameters are heterogeneous, so each value carries its own tag.
/// Categorical parameters store the chosen label as [`ParamValue::Str`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamValue {
    /// An integer parameter value.
    Int(i64),
    /// A floating-point parameter value.
    Float(f64),
    /// A categorical parameter value.
    Str(String),
    /// A boolean parameter value.
    Bool(bool),
}

impl ParamValue {
    /// Returns the value as `f64` when it is numeric.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Str(_) | Self::Bool(_) => None,
        }
    }
}

impl core::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "'{v}'"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// Renders a parameter map as `{lr: 0.01, optimizer: 'Adam'}`.
#[must_use]
pub fn format_params(params: &BTreeMap<String, ParamValue>) -> String {
    let body = params
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{body}}}")
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_keeps_the_tag() {
        let json = serde_json::to_string(&ParamValue::Float(2.0)).unwrap();
        assert_eq!(json, r#"{"float":2.0}"#);
        let back: ParamValue = serde_json::from_str(r#"{"int":2}"#).unwrap();
        assert_eq!(back, ParamValue::Int(2));
    }

    #[test]
    fn display_quotes_strings() {
        assert_eq!(ParamValue::from("Adam").to_string(), "'Adam'");
        assert_eq!(ParamValue::from(3_i64).to_string(), "3");
    }

    #[test]
    fn params_render_sorted_by_name() {
        let mut params = BTreeMap::new();
        params.insert("optimizer".to_string(), ParamValue::from("Adam"));
        params.insert("lr".to_string(), ParamValue::Float(0.5));
        assert_eq!(format_params(&params), "{lr: 0.5, optimizer: 'Adam'}");
        assert_eq!(format_params(&BTreeMap::new()), "{}");
    }
}
