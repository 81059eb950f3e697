use crate::errors::{ConfigError, InvalidTimeoutError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Declarative sweep definition for one batch run: global settings plus a
/// list of suites, each a variable sweep over fixed parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    pub task_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "global_config")]
    pub global: GlobalConfig,
    #[serde(rename = "benchmark_suites", alias = "benchmark_suits")]
    pub suites: Vec<SuiteConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub models: Vec<String>,
    /// Per-case hard timeout in seconds. Must be positive.
    #[serde(rename = "timeout")]
    pub timeout_seconds: u64,
    /// Optional CPU-affinity prefix command, e.g. "taskset -c 0-3".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taskset: Option<String>,
}

/// How co-declared variables combine into cases.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CombinePolicy {
    /// Full Cartesian product, last-declared axis varying fastest.
    #[default]
    Product,
    /// Index-aligned lock-step; all axes must have equal length.
    Zip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    #[serde(rename = "suite_name", alias = "suit_name")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub combine: CombinePolicy,
    #[serde(default)]
    pub variables: Vec<VariableSpec>,
    #[serde(default)]
    pub fixed_params: BTreeMap<String, serde_json::Value>,
}

/// One variable axis: either an explicit value list or an inclusive
/// numeric range. Which form applies is resolved once, in `sweep.rs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
}

pub fn load_task_config(path: &Path, strict: bool) -> Result<TaskConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read task file {}: {}", path.display(), e)))?;

    let mut ignored_keys = std::collections::HashSet::new();
    let deserializer = serde_yaml::Deserializer::from_str(&raw);

    // serde_ignored wrapper to capture unknown fields
    let cfg: TaskConfig = serde_ignored::deserialize(deserializer, |path| {
        ignored_keys.insert(path.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;

    if !ignored_keys.is_empty() {
        let meaningful: Vec<_> = ignored_keys
            .iter()
            .filter(|k| !k.starts_with('_') && !k.starts_with("x-"))
            .collect();
        if !meaningful.is_empty() {
            if strict {
                return Err(ConfigError(format!(
                    "unknown fields in strict mode: {:?} (file: {})",
                    meaningful,
                    path.display()
                )));
            }
            tracing::warn!(?meaningful, "ignored unknown task config fields");
        }
    }

    validate_task_config(&cfg)?;
    Ok(cfg)
}

fn validate_task_config(cfg: &TaskConfig) -> Result<(), ConfigError> {
    validate_timeout(cfg.global.timeout_seconds)
        .map_err(|e| ConfigError(e.to_string()))?;
    if cfg.global.models.is_empty() {
        return Err(ConfigError("global_config.models is empty".into()));
    }
    if cfg.suites.is_empty() {
        return Err(ConfigError("task has no benchmark suites".into()));
    }
    for suite in &cfg.suites {
        if suite.name.trim().is_empty() {
            return Err(ConfigError("suite with empty name".into()));
        }
    }
    Ok(())
}

pub fn validate_timeout(timeout_seconds: u64) -> Result<(), InvalidTimeoutError> {
    if timeout_seconds == 0 {
        return Err(InvalidTimeoutError(
            "timeout must be a positive number of seconds".into(),
        ));
    }
    Ok(())
}

/// Model alias -> llm_bench config path registry, loaded from its own
/// YAML file so task files stay host-independent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelRegistry {
    #[serde(default)]
    pub models: BTreeMap<String, String>,
}

/// A model alias resolved against the registry: config path verified to
/// exist, model name taken from the config's parent directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedModel {
    pub alias: String,
    pub name: String,
    pub config_path: PathBuf,
}

impl ModelRegistry {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ConfigError(format!("failed to read models file {}: {}", path.display(), e))
        })?;
        serde_yaml::from_str(&raw)
            .map_err(|e| ConfigError(format!("failed to parse models YAML: {}", e)))
    }

    pub fn resolve(&self, alias: &str) -> Result<ResolvedModel, ConfigError> {
        let raw_path = self.models.get(alias).ok_or_else(|| {
            ConfigError(format!(
                "unknown model alias '{}' (available: {:?})",
                alias,
                self.models.keys().collect::<Vec<_>>()
            ))
        })?;
        let config_path = expand_home(raw_path);
        if !config_path.exists() {
            return Err(ConfigError(format!(
                "model config for '{}' does not exist: {}",
                alias,
                config_path.display()
            )));
        }
        let name = config_path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| alias.to_string());
        Ok(ResolvedModel {
            alias: alias.to_string(),
            name,
            config_path,
        })
    }
}

fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return Path::new(&home).join(rest);
        }
    }
    PathBuf::from(raw)
}

pub fn write_sample_task(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(
        path,
        r#"task_name: thread_scaling_sample
description: Thread-count scaling sweep over two precision levels.
global_config:
  timeout: 300
  models: [qwen3_0_6b, deepseek_r1_1_5b]
benchmark_suites:
  - suite_name: thread_scaling
    description: threads x precision sweep
    variables:
      - name: threads
        start: 1
        end: 8
        step: 2
      - name: precision
        values: [0, 2]
    fixed_params:
      n_prompt: 256
      n_gen: 128
      kv_cache: "true"
  - suite_name: pg_combination
    description: paired prompt/gen shorthand (produces pp+tg rows)
    variables:
      - name: prompt_gen
        values: ["32,16", "64,32"]
    fixed_params:
      threads: 8
      n_repeat: 3
"#,
    )
    .map_err(|e| ConfigError(format!("failed to write sample task: {}", e)))
}

pub fn write_sample_models(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(
        path,
        r#"models:
  qwen3_0_6b: ~/models/qwen3_0_6b/config.json
  deepseek_r1_1_5b: ~/models/deepseek_r1_1_5b/config.json
"#,
    )
    .map_err(|e| ConfigError(format!("failed to write sample models: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn load_minimal_task() {
        let f = write_tmp(
            r#"task_name: t
global_config:
  timeout: 60
  models: [m1]
benchmark_suites:
  - suite_name: s
    fixed_params:
      n_prompt: 64
"#,
        );
        let cfg = load_task_config(f.path(), true).unwrap();
        assert_eq!(cfg.task_name, "t");
        assert_eq!(cfg.suites[0].name, "s");
        assert_eq!(cfg.suites[0].combine, CombinePolicy::Product);
    }

    #[test]
    fn zero_timeout_rejected() {
        let f = write_tmp(
            r#"task_name: t
global_config:
  timeout: 0
  models: [m1]
benchmark_suites:
  - suite_name: s
"#,
        );
        let err = load_task_config(f.path(), true).unwrap_err();
        assert!(err.0.contains("timeout"), "{}", err);
    }

    #[test]
    fn unknown_fields_rejected_in_strict_mode() {
        let f = write_tmp(
            r#"task_name: t
bogus_key: 1
global_config:
  timeout: 60
  models: [m1]
benchmark_suites:
  - suite_name: s
"#,
        );
        assert!(load_task_config(f.path(), true).is_err());
        assert!(load_task_config(f.path(), false).is_ok());
    }

    #[test]
    fn legacy_suit_spelling_accepted() {
        let f = write_tmp(
            r#"task_name: t
global_config:
  timeout: 60
  models: [m1]
benchmark_suits:
  - suit_name: s
"#,
        );
        let cfg = load_task_config(f.path(), true).unwrap();
        assert_eq!(cfg.suites[0].name, "s");
    }

    #[test]
    fn registry_rejects_unknown_alias_and_missing_file() {
        let reg = ModelRegistry {
            models: [("m".to_string(), "/definitely/not/here.json".to_string())]
                .into_iter()
                .collect(),
        };
        assert!(reg.resolve("nope").is_err());
        assert!(reg.resolve("m").is_err());

        let dir = tempfile::tempdir().unwrap();
        let model_dir = dir.path().join("qwen_test");
        std::fs::create_dir(&model_dir).unwrap();
        let cfg = model_dir.join("config.json");
        std::fs::write(&cfg, "{}").unwrap();
        let reg = ModelRegistry {
            models: [("m".to_string(), cfg.to_string_lossy().into_owned())]
                .into_iter()
                .collect(),
        };
        let resolved = reg.resolve("m").unwrap();
        assert_eq!(resolved.name, "qwen_test");
    }
}
