//! Case-matrix generation: combines every suite's variable sweeps with its
//! fixed parameters into the full, ordered list of concrete cases for a
//! task. Ordering is model-major (a model switch is a contiguous block)
//! and, within a suite, row-major with the last-declared axis fastest.

use crate::config::{CombinePolicy, SuiteConfig, TaskConfig};
use crate::errors::{ConfigError, NoCasesGeneratedError};
use std::collections::BTreeMap;

/// One concrete, fully-resolved parameter combination.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchCase {
    /// 1-based position in the task-wide execution order.
    pub index: usize,
    pub suite_name: String,
    pub suite_description: String,
    pub model: String,
    pub params: BTreeMap<String, serde_json::Value>,
    /// Which keys of `params` came from a sweep axis (the rest are fixed).
    pub variable_names: Vec<String>,
}

impl BenchCase {
    /// Swept parameters as strings, the shape the variable-value table
    /// stores. Null or empty values are not eligible.
    pub fn variable_values(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for name in &self.variable_names {
            if let Some(v) = self.params.get(name) {
                let s = flag_string(v);
                if !s.is_empty() {
                    out.insert(name.clone(), s);
                }
            }
        }
        out
    }
}

/// Render a parameter value the way it appears on the tool's command line.
pub fn flag_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn generate_cases(cfg: &TaskConfig) -> anyhow::Result<Vec<BenchCase>> {
    let mut cases = Vec::new();

    // Model dimension is outer to everything else so downstream progress
    // display and suite caching see each model as one contiguous block.
    for model in &cfg.global.models {
        for suite in &cfg.suites {
            for params in suite_combinations(suite)? {
                cases.push(BenchCase {
                    index: 0,
                    suite_name: suite.name.clone(),
                    suite_description: suite.description.clone(),
                    model: model.clone(),
                    params,
                    variable_names: suite.variables.iter().map(|v| v.name.clone()).collect(),
                });
            }
        }
    }

    if cases.is_empty() {
        return Err(NoCasesGeneratedError(format!(
            "task '{}' expanded to zero cases",
            cfg.task_name
        ))
        .into());
    }
    for (i, case) in cases.iter_mut().enumerate() {
        case.index = i + 1;
    }
    tracing::info!(total = cases.len(), task = %cfg.task_name, "generated case matrix");
    Ok(cases)
}

fn suite_combinations(
    suite: &SuiteConfig,
) -> anyhow::Result<Vec<BTreeMap<String, serde_json::Value>>> {
    if suite.variables.is_empty() {
        // No axes: the fixed parameters alone are the single case.
        return Ok(vec![suite.fixed_params.clone()]);
    }

    let mut axes = Vec::with_capacity(suite.variables.len());
    for var in &suite.variables {
        axes.push((var.name.clone(), var.expand()?));
    }

    let combos = match suite.combine {
        CombinePolicy::Product => cartesian(&axes),
        CombinePolicy::Zip => zip_axes(&suite.name, &axes)?,
    };

    let mut out = Vec::with_capacity(combos.len());
    for combo in combos {
        let mut params = suite.fixed_params.clone();
        // Variable values win over fixed params on key collision.
        for (name, value) in combo {
            params.insert(name, value);
        }
        out.push(params);
    }
    Ok(out)
}

/// Row-major product: the last-declared axis varies fastest.
fn cartesian(axes: &[(String, Vec<serde_json::Value>)]) -> Vec<Vec<(String, serde_json::Value)>> {
    let mut combos: Vec<Vec<(String, serde_json::Value)>> = vec![Vec::new()];
    for (name, values) in axes {
        let mut next = Vec::with_capacity(combos.len() * values.len());
        for prefix in &combos {
            for value in values {
                let mut combo = prefix.clone();
                combo.push((name.clone(), value.clone()));
                next.push(combo);
            }
        }
        combos = next;
    }
    combos
}

fn zip_axes(
    suite_name: &str,
    axes: &[(String, Vec<serde_json::Value>)],
) -> anyhow::Result<Vec<Vec<(String, serde_json::Value)>>> {
    let len = axes[0].1.len();
    if axes.iter().any(|(_, v)| v.len() != len) {
        return Err(ConfigError(format!(
            "suite '{}' uses combine: zip but its axes have unequal lengths",
            suite_name
        ))
        .into());
    }
    Ok((0..len)
        .map(|i| {
            axes.iter()
                .map(|(name, values)| (name.clone(), values[i].clone()))
                .collect()
        })
        .collect())
}

/// Per-suite case counts for preview display, in declared order.
pub fn plan_summary(cases: &[BenchCase]) -> Vec<(String, String, usize)> {
    let mut out: Vec<(String, String, usize)> = Vec::new();
    for case in cases {
        match out
            .iter_mut()
            .find(|(suite, model, _)| suite == &case.suite_name && model == &case.model)
        {
            Some((_, _, n)) => *n += 1,
            None => out.push((case.suite_name.clone(), case.model.clone(), 1)),
        }
    }
    out
}
