//! Declared numeric parameters: range, default, JSON extraction and schema.
//!
//! Every tunable number in [`FlowConfig`](crate::config::FlowConfig) is
//! described by one [`ParamSpec`]. The same spec drives lenient extraction
//! from JSON (missing or mistyped keys fall back to the default, numbers are
//! clamped), strict validation of live updates, and the schema handed to a
//! control surface.

use crate::error::FlowError;
use serde_json::{json, Value};

/// A named numeric parameter with an inclusive valid range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default: f64,
    pub min: f64,
    pub max: f64,
    pub description: &'static str,
    /// Integer-valued; reported as `"integer"` in the schema.
    pub integer: bool,
}

impl ParamSpec {
    pub const fn number(
        name: &'static str,
        default: f64,
        min: f64,
        max: f64,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            default,
            min,
            max,
            description,
            integer: false,
        }
    }

    pub const fn integer(
        name: &'static str,
        default: f64,
        min: f64,
        max: f64,
        description: &'static str,
    ) -> Self {
        Self {
            integer: true,
            ..Self::number(name, default, min, max, description)
        }
    }

    /// Reads `params[name]`, clamped into range; the default if missing,
    /// non-numeric, or NaN.
    pub fn extract(&self, params: &Value) -> f64 {
        params
            .get(self.name)
            .and_then(Value::as_f64)
            .filter(|v| !v.is_nan())
            .map_or(self.default, |v| v.clamp(self.min, self.max))
    }

    /// Accepts `value` only if it lies within range.
    pub fn validate(&self, value: f64) -> Result<f64, FlowError> {
        if value.is_nan() || value < self.min || value > self.max {
            return Err(FlowError::ParamOutOfRange {
                name: self.name.to_owned(),
                value,
                min: self.min,
                max: self.max,
            });
        }
        Ok(value)
    }

    /// Schema entry: type, default, min, max, description.
    pub fn schema(&self) -> Value {
        json!({
            "type": if self.integer { "integer" } else { "number" },
            "default": self.default,
            "min": self.min,
            "max": self.max,
            "description": self.description,
        })
    }
}

/// Reads a boolean flag, falling back to `default` if missing or mistyped.
pub fn param_bool(params: &Value, name: &str, default: bool) -> bool {
    params.get(name).and_then(Value::as_bool).unwrap_or(default)
}

/// Reads a string, falling back to `default` if missing or mistyped.
pub fn param_str<'a>(params: &'a Value, name: &str, default: &'a str) -> &'a str {
    params.get(name).and_then(Value::as_str).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEED: ParamSpec = ParamSpec::number("speed", 20.0, 0.0, 40.0, "Speed");

    #[test]
    fn extract_reads_present_value() {
        assert!((SPEED.extract(&json!({"speed": 12.5})) - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn extract_accepts_integers() {
        assert!((SPEED.extract(&json!({"speed": 3})) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn extract_defaults_when_missing_or_mistyped() {
        assert!((SPEED.extract(&json!({})) - 20.0).abs() < f64::EPSILON);
        assert!((SPEED.extract(&json!({"speed": "fast"})) - 20.0).abs() < f64::EPSILON);
        assert!((SPEED.extract(&json!({"speed": null})) - 20.0).abs() < f64::EPSILON);
        assert!((SPEED.extract(&json!("not an object")) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn extract_clamps_into_range() {
        assert!((SPEED.extract(&json!({"speed": 99.0})) - 40.0).abs() < f64::EPSILON);
        assert!(SPEED.extract(&json!({"speed": -3.0})).abs() < f64::EPSILON);
    }

    #[test]
    fn validate_accepts_bounds_inclusive() {
        assert!(SPEED.validate(0.0).is_ok());
        assert!(SPEED.validate(40.0).is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_and_nan() {
        assert!(matches!(
            SPEED.validate(40.5),
            Err(FlowError::ParamOutOfRange { .. })
        ));
        assert!(SPEED.validate(f64::NAN).is_err());
    }

    #[test]
    fn schema_has_expected_structure() {
        let s = SPEED.schema();
        assert_eq!(s["type"], "number");
        assert_eq!(s["min"], 0.0);
        assert_eq!(s["max"], 40.0);
        assert_eq!(s["default"], 20.0);
        let count = ParamSpec::integer("count", 10.0, 1.0, 100.0, "Count");
        assert_eq!(count.schema()["type"], "integer");
    }

    #[test]
    fn param_bool_and_str_fall_back() {
        let p = json!({"on": true, "mode": "edges", "bad": 1});
        assert!(param_bool(&p, "on", false));
        assert!(!param_bool(&p, "bad", false));
        assert_eq!(param_str(&p, "mode", "motion"), "edges");
        assert_eq!(param_str(&p, "missing", "motion"), "motion");
    }
}
