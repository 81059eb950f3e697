//! Subprocess execution for the external llm_bench binary: command-line
//! construction from case parameters, hard timeout enforcement, and raw
//! output capture. A failing case is a value, not an error; the batch loop
//! decides whether to continue.

use crate::cases::flag_string;
use crate::config::validate_timeout;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::time::{timeout, Duration};

/// Sentinel return code for a killed-on-timeout run. Real exit codes on
/// unix are 0..=255, so this never collides.
pub const TIMEOUT_RETURN_CODE: i32 = -1;

/// Raw outcome of one tool invocation, success or not.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecOutcome {
    pub command: String,
    pub return_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub runtime_seconds: f64,
    pub timed_out: bool,
}

impl ExecOutcome {
    pub fn succeeded(&self) -> bool {
        !self.timed_out && self.return_code == 0
    }
}

/// Seam between the batch runner and the external binary, so tests can
/// substitute a scripted tool.
#[async_trait]
pub trait BenchTool: Send + Sync {
    async fn run_case(
        &self,
        model_config: &Path,
        output_file: &Path,
        params: &BTreeMap<String, serde_json::Value>,
        timeout_seconds: u64,
        taskset: Option<&str>,
    ) -> anyhow::Result<ExecOutcome>;
}

/// The real tool: MNN's llm_bench binary on disk.
pub struct MnnBenchTool {
    bench_path: PathBuf,
}

/// Known parameter keys in the order their flags appear on the command
/// line. Anything else in the case params is carried in the database but
/// never turned into a flag.
const FLAG_TABLE: &[(&str, &str)] = &[
    ("threads", "-t"),
    ("precision", "-c"),
    ("n_prompt", "-p"),
    ("n_gen", "-n"),
    ("prompt_gen", "-pg"),
    ("n_repeat", "-rep"),
    ("kv_cache", "-kv"),
    ("mmap", "-mmp"),
    ("dynamicOption", "-dyo"),
    ("variable_prompt", "-vp"),
    ("prompt_file", "-pf"),
];

impl MnnBenchTool {
    pub fn new(bench_path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let bench_path = bench_path.into();
        if !bench_path.exists() {
            anyhow::bail!("llm_bench binary not found: {}", bench_path.display());
        }
        Ok(Self { bench_path })
    }

    /// Build the full argv. A flag is omitted entirely when its parameter
    /// is absent or null, so the tool's own defaults apply.
    pub fn build_command(
        &self,
        model_config: &Path,
        output_file: &Path,
        params: &BTreeMap<String, serde_json::Value>,
    ) -> Vec<String> {
        let mut cmd = vec![
            self.bench_path.to_string_lossy().into_owned(),
            "-m".into(),
            model_config.to_string_lossy().into_owned(),
            "-fp".into(),
            output_file.to_string_lossy().into_owned(),
        ];
        for (key, flag) in FLAG_TABLE {
            match params.get(*key) {
                None | Some(serde_json::Value::Null) => continue,
                Some(value) => {
                    cmd.push((*flag).into());
                    cmd.push(flag_string(value));
                }
            }
        }
        cmd
    }
}

#[async_trait]
impl BenchTool for MnnBenchTool {
    async fn run_case(
        &self,
        model_config: &Path,
        output_file: &Path,
        params: &BTreeMap<String, serde_json::Value>,
        timeout_seconds: u64,
        taskset: Option<&str>,
    ) -> anyhow::Result<ExecOutcome> {
        validate_timeout(timeout_seconds)?;

        let mut argv = self.build_command(model_config, output_file, params);
        if let Some(prefix) = taskset {
            let mut prefixed: Vec<String> =
                prefix.split_whitespace().map(String::from).collect();
            prefixed.append(&mut argv);
            argv = prefixed;
        }
        run_argv(&argv, timeout_seconds).await
    }
}

async fn run_argv(argv: &[String], timeout_seconds: u64) -> anyhow::Result<ExecOutcome> {
    let command = argv.join(" ");
    tracing::info!(%command, timeout_seconds, "spawning benchmark");

    let start = Instant::now();
    let child = tokio::process::Command::new(&argv[0])
        .args(&argv[1..])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    match timeout(
        Duration::from_secs(timeout_seconds),
        child.wait_with_output(),
    )
    .await
    {
        Ok(output) => {
            let output = output?;
            let runtime_seconds = start.elapsed().as_secs_f64();
            let outcome = ExecOutcome {
                command,
                return_code: output.status.code().unwrap_or(TIMEOUT_RETURN_CODE),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                runtime_seconds,
                timed_out: false,
            };
            if outcome.return_code == 0 {
                tracing::info!(runtime_seconds, "benchmark finished");
            } else {
                tracing::error!(
                    return_code = outcome.return_code,
                    stderr = %outcome.stderr,
                    "benchmark failed"
                );
            }
            Ok(outcome)
        }
        Err(_) => {
            // wait_with_output consumed the child; kill_on_drop reaps it.
            let runtime_seconds = start.elapsed().as_secs_f64();
            tracing::error!(timeout_seconds, "benchmark timed out");
            Ok(ExecOutcome {
                command,
                return_code: TIMEOUT_RETURN_CODE,
                stdout: String::new(),
                stderr: format!("benchmark timed out (>{timeout_seconds}s)"),
                runtime_seconds,
                timed_out: true,
            })
        }
    }
}
