//! Variable sweep expansion: turns one declarative variable spec into an
//! ordered list of discrete values, so downstream code never branches on
//! the original shape again.

use crate::config::VariableSpec;
use crate::errors::InvalidSweepError;

/// Resolved form of a variable spec.
#[derive(Debug, Clone, PartialEq)]
pub enum SweepSpec {
    ExplicitValues(Vec<serde_json::Value>),
    SteppedRange { start: f64, end: f64, step: f64 },
}

impl VariableSpec {
    /// Classify the spec. Fails if neither form is present, or if both are.
    pub fn sweep(&self) -> Result<SweepSpec, InvalidSweepError> {
        match (&self.values, self.start, self.end, self.step) {
            (Some(values), None, None, None) => {
                Ok(SweepSpec::ExplicitValues(values.clone()))
            }
            (None, Some(start), Some(end), Some(step)) => {
                Ok(SweepSpec::SteppedRange { start, end, step })
            }
            (Some(_), _, _, _) => Err(InvalidSweepError(format!(
                "variable '{}' mixes explicit values with a range",
                self.name
            ))),
            _ => Err(InvalidSweepError(format!(
                "variable '{}' has neither 'values' nor a complete start/end/step range",
                self.name
            ))),
        }
    }

    /// Expand to the ordered value sequence.
    pub fn expand(&self) -> Result<Vec<serde_json::Value>, InvalidSweepError> {
        match self.sweep()? {
            SweepSpec::ExplicitValues(values) => Ok(values),
            SweepSpec::SteppedRange { start, end, step } => {
                expand_range(&self.name, start, end, step)
            }
        }
    }
}

fn expand_range(
    name: &str,
    start: f64,
    end: f64,
    step: f64,
) -> Result<Vec<serde_json::Value>, InvalidSweepError> {
    if step == 0.0 {
        return Err(InvalidSweepError(format!(
            "variable '{}' has step 0",
            name
        )));
    }
    if (step > 0.0 && start > end) || (step < 0.0 && start < end) {
        return Err(InvalidSweepError(format!(
            "variable '{}' range {}..{} never reaches its end with step {}",
            name, start, end, step
        )));
    }

    // Integer ranges stay integers so flag formatting matches the YAML.
    let integral = start.fract() == 0.0 && step.fract() == 0.0;
    let sign = step.signum();
    let mut out = Vec::new();
    let mut current = start;
    while sign * current <= sign * end {
        if integral {
            out.push(serde_json::Value::from(current as i64));
        } else {
            out.push(
                serde_json::Number::from_f64(current)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null),
            );
        }
        current += step;
    }
    Ok(out)
}
