use super::exit_codes;
use crate::cli::args::PlanArgs;
use mnnbench_core::cases::{generate_cases, plan_summary};
use mnnbench_core::config::load_task_config;
use mnnbench_core::report::console;

pub fn cmd_plan(args: PlanArgs) -> anyhow::Result<i32> {
    let cfg = match load_task_config(&args.task, args.strict) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };
    let cases = match generate_cases(&cfg) {
        Ok(cases) => cases,
        Err(e) => {
            eprintln!("config error: {e}");
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };
    console::plan_table(&cfg.task_name, &plan_summary(&cases), cases.len());
    Ok(exit_codes::OK)
}
