//! Sequential batch execution: walks the generated case matrix, invokes
//! the tool per case, parses the result file and writes everything through
//! to the store as it goes. A crash mid-run loses at most the in-flight
//! case.

use crate::cases::{generate_cases, BenchCase};
use crate::config::{ModelRegistry, ResolvedModel, TaskConfig};
use crate::exec::BenchTool;
use crate::model::{CaseStatus, PromptType, RunSummary};
use crate::parse::parse_output_file;
use crate::report::console;
use crate::storage::store::Store;
use anyhow::Context;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Default)]
pub struct RunnerOptions {
    /// When set, keep a copy of every raw tool output file under
    /// `<results_dir>/raw_outputs/<model>/<suite>/`.
    pub results_dir: Option<PathBuf>,
}

/// What a finished run leaves behind, for callers that report or exit on it.
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    pub task_id: i64,
    pub summary: RunSummary,
    pub runtime_seconds: f64,
}

pub struct Runner {
    store: Store,
    tool: Arc<dyn BenchTool>,
    registry: ModelRegistry,
    options: RunnerOptions,
}

impl Runner {
    pub fn new(
        store: Store,
        tool: Arc<dyn BenchTool>,
        registry: ModelRegistry,
        options: RunnerOptions,
    ) -> Self {
        Self {
            store,
            tool,
            registry,
            options,
        }
    }

    /// Execute every case of the task in matrix order. Setup problems
    /// (unresolvable model, unusable database) abort before any case
    /// runs; a failure inside one case is recorded and the run continues.
    pub async fn run_task(&self, cfg: &TaskConfig) -> anyhow::Result<RunArtifacts> {
        crate::config::validate_timeout(cfg.global.timeout_seconds)?;
        let cases = generate_cases(cfg)?;

        // Resolve every model up front so a bad alias fails the whole run
        // before anything is executed or persisted.
        let mut models: HashMap<String, ResolvedModel> = HashMap::new();
        for alias in &cfg.global.models {
            models.insert(alias.clone(), self.registry.resolve(alias)?);
        }

        let task_id = self.store.create_task(cfg)?;
        let scratch = tempfile::tempdir().context("failed to create scratch directory")?;

        let started = Instant::now();
        let total = cases.len();
        let mut summary = RunSummary {
            total_cases: total,
            ..Default::default()
        };
        let mut suite_ids: HashMap<(String, String), i64> = HashMap::new();
        let mut current_model: Option<String> = None;
        let mut current_suite: Option<(String, String)> = None;

        for case in &cases {
            let resolved = &models[&case.model];
            if current_model.as_deref() != Some(case.model.as_str()) {
                console::model_banner(&resolved.name, &case.model);
                current_model = Some(case.model.clone());
                current_suite = None;
            }
            let suite_key = (case.suite_name.clone(), case.model.clone());
            if current_suite.as_ref() != Some(&suite_key) {
                console::suite_banner(&case.suite_name, &case.suite_description);
                current_suite = Some(suite_key);
            }
            console::case_line(case.index, total, case);

            match self
                .execute_case(cfg, case, resolved, task_id, &mut suite_ids, scratch.path())
                .await
            {
                Ok(CaseOutcome::Success { rows }) => {
                    summary.successful_cases += 1;
                    console::case_result(case.index, total, &format!("ok, {} results", rows));
                }
                Ok(CaseOutcome::Empty) => {
                    summary.successful_cases += 1;
                    summary.empty_cases += 1;
                    console::case_result(case.index, total, "ok, no parseable results");
                }
                Ok(CaseOutcome::Failed(status)) => {
                    summary.failed_cases += 1;
                    console::case_result(case.index, total, status.as_str());
                }
                Err(e) => {
                    // Persistence or I/O trouble for a single case; keep going.
                    summary.failed_cases += 1;
                    tracing::error!(case = case.index, error = %e, "case aborted");
                    console::case_result(case.index, total, "error");
                }
            }
        }

        let runtime_seconds = started.elapsed().as_secs_f64();
        self.store.finalize_task(task_id, runtime_seconds, &summary)?;
        console::run_summary(&summary, runtime_seconds);

        Ok(RunArtifacts {
            task_id,
            summary,
            runtime_seconds,
        })
    }

    /// Everything fallible about one case, suite persistence included, so
    /// a store error here is attributed to the case and never aborts the
    /// batch loop.
    async fn execute_case(
        &self,
        cfg: &TaskConfig,
        case: &BenchCase,
        resolved: &ResolvedModel,
        task_id: i64,
        suite_ids: &mut HashMap<(String, String), i64>,
        scratch: &Path,
    ) -> anyhow::Result<CaseOutcome> {
        let suite_key = (case.suite_name.clone(), case.model.clone());
        let suite_id = match suite_ids.get(&suite_key) {
            Some(id) => *id,
            None => {
                let suite_json = suite_json_for(cfg, &case.suite_name)?;
                let id = self.store.find_or_create_suite(
                    task_id,
                    &case.suite_name,
                    &resolved.name,
                    &resolved.config_path.to_string_lossy(),
                    &suite_json,
                )?;
                suite_ids.insert(suite_key, id);
                id
            }
        };

        let params_json = serde_json::to_string(&case.params)?;
        let case_id = self.store.find_or_create_case(suite_id, case.index, &params_json)?;
        self.store
            .write_variable_values(case_id, &case.variable_values())?;

        let stamp = chrono::Utc::now().timestamp();
        let output_file = scratch.join(format!("{}_{}_raw.txt", case.model, stamp));

        let outcome = self
            .tool
            .run_case(
                &resolved.config_path,
                &output_file,
                &case.params,
                cfg.global.timeout_seconds,
                cfg.global.taskset.as_deref(),
            )
            .await?;

        if let Err(e) = self.retain_raw_output(case, resolved, &output_file) {
            tracing::warn!(case = case.index, error = %e, "failed to retain raw output");
        }

        if outcome.timed_out {
            tracing::warn!(case = case.index, command = %outcome.command, "case timed out");
            self.store
                .mark_case_failed(case_id, CaseStatus::Timeout, outcome.runtime_seconds)?;
            return Ok(CaseOutcome::Failed(CaseStatus::Timeout));
        }
        if outcome.return_code != 0 {
            tracing::warn!(
                case = case.index,
                code = outcome.return_code,
                stderr = %outcome.stderr.trim(),
                "tool exited nonzero"
            );
            self.store
                .mark_case_failed(case_id, CaseStatus::Failed, outcome.runtime_seconds)?;
            return Ok(CaseOutcome::Failed(CaseStatus::Failed));
        }

        let parsed = parse_output_file(&output_file, default_prompt_type(case));
        if parsed.rows.is_empty() {
            self.store
                .mark_case_failed(case_id, CaseStatus::NoResults, outcome.runtime_seconds)?;
            return Ok(CaseOutcome::Empty);
        }

        self.store.write_results(case_id, &parsed.rows)?;
        self.store.update_case_execution(
            case_id,
            &parsed.metadata.unwrap_or_default(),
            outcome.runtime_seconds,
        )?;
        Ok(CaseOutcome::Success {
            rows: parsed.rows.len(),
        })
    }

    fn retain_raw_output(
        &self,
        case: &BenchCase,
        resolved: &ResolvedModel,
        output_file: &Path,
    ) -> anyhow::Result<()> {
        let Some(results_dir) = &self.options.results_dir else {
            return Ok(());
        };
        if !output_file.exists() {
            return Ok(());
        }
        let dest_dir = results_dir
            .join("raw_outputs")
            .join(&resolved.name)
            .join(&case.suite_name);
        std::fs::create_dir_all(&dest_dir)?;
        std::fs::copy(output_file, dest_dir.join(format!("{}_raw.txt", case.index)))?;
        Ok(())
    }
}

enum CaseOutcome {
    Success { rows: usize },
    Empty,
    Failed(CaseStatus),
}

/// The declared prompt source for a case, before any per-row `pType`
/// column overrides it.
fn default_prompt_type(case: &BenchCase) -> PromptType {
    if case.params.get("prompt_file").is_some_and(|v| !v.is_null()) {
        PromptType::File
    } else if case
        .params
        .get("variable_prompt")
        .is_some_and(|v| !v.is_null())
    {
        PromptType::Variable
    } else {
        PromptType::Fix
    }
}

fn suite_json_for(cfg: &TaskConfig, suite_name: &str) -> anyhow::Result<String> {
    let suite = cfg
        .suites
        .iter()
        .find(|s| s.name == suite_name)
        .with_context(|| format!("suite '{}' vanished from config", suite_name))?;
    Ok(serde_json::to_string(suite)?)
}
