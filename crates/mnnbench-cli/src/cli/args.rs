use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "mnnbench",
    version,
    about = "Batch benchmark driver for the MNN llm_bench tool"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Execute every case of a task and persist the results
    Run(RunArgs),
    /// Preview the case matrix without executing anything
    Plan(PlanArgs),
    /// Write sample task and model-registry files
    Init(InitArgs),
    /// List recorded runs from the results database
    Status(StatusArgs),
    Version,
}

#[derive(Parser, Clone)]
pub struct RunArgs {
    /// Task definition YAML
    #[arg(long, default_value = "task.yaml")]
    pub task: PathBuf,

    /// Model registry YAML mapping aliases to config paths
    #[arg(long, default_value = "models.yaml")]
    pub models: PathBuf,

    /// Path to the llm_bench binary
    #[arg(long, env = "LLM_BENCH_PATH", default_value = "./llm_bench")]
    pub bench: PathBuf,

    #[arg(long, default_value = "results/benchmark.db")]
    pub db: PathBuf,

    /// Keep a copy of every raw tool output under this directory
    #[arg(long)]
    pub results_dir: Option<PathBuf>,

    /// Reject unknown keys in the task file instead of warning
    #[arg(long)]
    pub strict: bool,
}

#[derive(Parser, Clone)]
pub struct PlanArgs {
    #[arg(long, default_value = "task.yaml")]
    pub task: PathBuf,

    #[arg(long)]
    pub strict: bool,
}

#[derive(Parser, Clone)]
pub struct InitArgs {
    #[arg(long, default_value = "task.yaml")]
    pub task: PathBuf,

    #[arg(long, default_value = "models.yaml")]
    pub models: PathBuf,
}

#[derive(Parser, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = "results/benchmark.db")]
    pub db: PathBuf,

    /// Only show runs of this logical task name
    #[arg(long)]
    pub task_name: Option<String>,
}
