//! Joint limit lookup.
//!
//! The classifier asks a [`LimitsSource`] for the range of every revolute or
//! prismatic joint. [`FeatureLimits`] answers from the assembly feature
//! list: a mate feature carries a `limitsEnabled` flag and min/max quantity
//! parameters whose expressions (`"90 deg"`, `"-#stroke"`, ...) are read
//! here and converted to radians or meters.

use std::collections::HashMap;
use std::f64::consts::PI;

use mateforge_types::api::{FeatureList, ParameterEntry};
use mateforge_types::{JointLimits, JointType, MateError};
use tracing::warn;

/// Supplies joint limits by mate name.
pub trait LimitsSource {
    /// Limits of the joint defined by mate `mate_name`, or `None` when the
    /// joint has no limits.
    fn limits(&self, mate_name: &str, joint_type: JointType)
    -> Result<Option<JointLimits>, MateError>;
}

/// A source that never reports limits.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLimits;

impl LimitsSource for NoLimits {
    fn limits(&self, _: &str, _: JointType) -> Result<Option<JointLimits>, MateError> {
        Ok(None)
    }
}

/// Fixed limits per mate name, mostly useful in tests.
impl LimitsSource for HashMap<String, JointLimits> {
    fn limits(&self, mate_name: &str, _: JointType) -> Result<Option<JointLimits>, MateError> {
        Ok(self.get(mate_name).copied())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Configuration parameters
// ────────────────────────────────────────────────────────────────────────────

/// Parse a configuration string such as `"arm_length=250 mm;collisions=true"`
/// into a parameter map.  `"default"` and the empty string yield no
/// parameters.
///
/// The service reports the resolved configuration of an assembly with `+`
/// in place of spaces (`"arm_length=250+mm"`); both forms are accepted.
pub fn parse_configuration(configuration: &str) -> HashMap<String, String> {
    if configuration == "default" {
        return HashMap::new();
    }
    configuration
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.replace('+', " ").trim().to_string()))
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Expressions
// ────────────────────────────────────────────────────────────────────────────

/// Read a `"<value> <unit>"` expression into SI units (radians or meters).
///
/// The whole expression may be a configuration variable (`#name`) or its
/// negation (`-#name`).  Radians additionally accept `(PI)` as the value.
pub fn read_expression(
    expression: &str,
    parameters: &HashMap<String, String>,
) -> Result<f64, String> {
    let lookup = |name: &str| {
        parameters
            .get(name)
            .cloned()
            .ok_or_else(|| format!("configuration variable \"{name}\" is not set"))
    };

    let expression = expression.trim();
    let expanded = if let Some(var) = expression.strip_prefix("-#") {
        format!("-{}", lookup(var)?)
    } else if let Some(var) = expression.strip_prefix('#') {
        lookup(var)?
    } else {
        expression.to_string()
    };

    let parts: Vec<&str> = expanded.split_whitespace().collect();
    let [value, unit] = parts[..] else {
        return Err(format!("expected \"<value> <unit>\", got \"{expanded}\""));
    };

    let number = |raw: &str| {
        raw.parse::<f64>()
            .map_err(|_| format!("\"{raw}\" is not a number"))
    };

    match unit {
        "deg" => Ok(number(value)?.to_radians()),
        "rad" | "radian" => match value {
            "(PI)" => Ok(PI),
            "-(PI)" => Ok(-PI),
            v => number(v),
        },
        "mm" => Ok(number(value)? / 1000.0),
        "cm" => Ok(number(value)? / 100.0),
        "m" => number(value),
        "in" => Ok(number(value)? * 0.0254),
        other => Err(format!("unknown unit \"{other}\"")),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// FeatureLimits
// ────────────────────────────────────────────────────────────────────────────

/// [`LimitsSource`] backed by the assembly feature list.
pub struct FeatureLimits<'a> {
    features: &'a FeatureList,
    parameters: HashMap<String, String>,
}

impl<'a> FeatureLimits<'a> {
    /// `configuration` is the configuration string the assembly was fetched
    /// with; it resolves `#variables` and configured parameters.
    pub fn new(features: &'a FeatureList, configuration: &str) -> Self {
        Self {
            features,
            parameters: parse_configuration(configuration),
        }
    }

    /// Fill the parameters `configuration` left unset from the assembly's
    /// resolved configuration (`rootAssembly.fullConfiguration`), which
    /// carries the default value of every configuration parameter.
    pub fn with_defaults(mut self, full_configuration: &str) -> Self {
        for (name, value) in parse_configuration(full_configuration) {
            self.parameters.entry(name).or_insert(value);
        }
        self
    }

    fn read_parameter(&self, mate: &str, parameter: &ParameterEntry) -> Result<f64, MateError> {
        let invalid = |reason: String| MateError::InvalidLimitExpression {
            mate: mate.to_string(),
            reason,
        };
        let message = &parameter.message;

        match parameter.type_name.as_str() {
            "BTMParameterNullableQuantity" => {
                if message.is_null {
                    return Ok(0.0);
                }
                read_expression(&message.expression, &self.parameters).map_err(invalid)
            }
            "BTMParameterConfigured" => {
                let current = self
                    .parameters
                    .get(&message.configuration_parameter_id)
                    .ok_or_else(|| {
                        invalid(format!(
                            "configuration parameter \"{}\" is not set",
                            message.configuration_parameter_id
                        ))
                    })?;
                for configured in &message.values {
                    let value = &configured.message;
                    let selected = match configured.type_name.as_str() {
                        "BTMConfiguredValueByBoolean" => {
                            value.boolean_value == Some(current == "true")
                        }
                        "BTMConfiguredValueByEnum" => {
                            value.enum_value.as_deref() == Some(current.as_str())
                        }
                        other => {
                            return Err(invalid(format!("unsupported configured value {other}")));
                        }
                    };
                    if selected {
                        let inner = value
                            .value
                            .as_ref()
                            .ok_or_else(|| invalid("configured value is empty".to_string()))?;
                        return read_expression(&inner.message.expression, &self.parameters)
                            .map_err(invalid);
                    }
                }
                Err(invalid(format!(
                    "no value configured for \"{}\" = \"{current}\"",
                    message.configuration_parameter_id
                )))
            }
            other => Err(invalid(format!("unsupported parameter type {other}"))),
        }
    }
}

impl LimitsSource for FeatureLimits<'_> {
    fn limits(
        &self,
        mate_name: &str,
        joint_type: JointType,
    ) -> Result<Option<JointLimits>, MateError> {
        let (min_id, max_id) = match joint_type {
            JointType::Revolute => ("limitAxialZMin", "limitAxialZMax"),
            JointType::Prismatic => ("limitZMin", "limitZMax"),
            JointType::Fixed => return Ok(None),
        };

        let Some(feature) = self
            .features
            .features
            .iter()
            .find(|f| f.message.name == mate_name)
        else {
            warn!(joint = mate_name, "no feature found for this joint, it has no limits");
            return Ok(None);
        };

        let mut enabled = false;
        let (mut lower, mut upper) = (0.0, 0.0);
        for parameter in &feature.message.parameters {
            match parameter.message.parameter_id.as_str() {
                "limitsEnabled" => {
                    enabled = parameter.message.value.as_bool().unwrap_or(false);
                }
                id if id == min_id => lower = self.read_parameter(mate_name, parameter)?,
                id if id == max_id => upper = self.read_parameter(mate_name, parameter)?,
                _ => {}
            }
        }

        if enabled {
            Ok(Some(JointLimits::new(lower, upper)))
        } else {
            warn!(joint = mate_name, %joint_type, "joint has no limits");
            Ok(None)
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
