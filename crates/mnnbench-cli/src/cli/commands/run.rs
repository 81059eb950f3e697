use super::exit_codes;
use crate::cli::args::RunArgs;
use mnnbench_core::config::{load_task_config, ModelRegistry};
use mnnbench_core::engine::{Runner, RunnerOptions};
use mnnbench_core::exec::{BenchTool, MnnBenchTool};
use mnnbench_core::model::TaskStatus;
use mnnbench_core::storage::store::Store;
use std::sync::Arc;

pub async fn cmd_run(args: RunArgs) -> anyhow::Result<i32> {
    let cfg = match load_task_config(&args.task, args.strict) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };
    let registry = match ModelRegistry::load(&args.models) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{e}");
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };
    let tool: Arc<dyn BenchTool> = match MnnBenchTool::new(&args.bench) {
        Ok(t) => Arc::new(t),
        Err(e) => {
            eprintln!("config error: {e}");
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    let store = Store::open(&args.db)?;
    store.init_schema()?;

    let runner = Runner::new(
        store,
        tool,
        registry,
        RunnerOptions {
            results_dir: args.results_dir.clone(),
        },
    );
    let artifacts = runner.run_task(&cfg).await?;

    match artifacts.summary.status() {
        TaskStatus::Completed => Ok(exit_codes::OK),
        _ => Ok(exit_codes::RUN_FAILED),
    }
}
