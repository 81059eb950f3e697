//! Progress and summary lines for interactive runs. All of this goes to
//! stderr so stdout stays clean for machine-readable output.

use crate::cases::{flag_string, BenchCase};
use crate::model::RunSummary;

pub fn model_banner(model_name: &str, alias: &str) {
    eprintln!();
    eprintln!("==============================================================");
    eprintln!("  Model: {model_name} ({alias})");
    eprintln!("==============================================================");
}

pub fn suite_banner(suite_name: &str, description: &str) {
    eprintln!();
    if description.is_empty() {
        eprintln!("--- Suite: {suite_name} ---");
    } else {
        eprintln!("--- Suite: {suite_name} ({description}) ---");
    }
}

pub fn case_line(index: usize, total: usize, case: &BenchCase) {
    let params: Vec<String> = case
        .params
        .iter()
        .map(|(k, v)| format!("{}={}", k, flag_string(v)))
        .collect();
    eprintln!("[{index}/{total}] {}", params.join(" "));
}

pub fn case_result(index: usize, total: usize, verdict: &str) {
    eprintln!("[{index}/{total}] -> {verdict}");
}

pub fn run_summary(summary: &RunSummary, runtime_seconds: f64) {
    eprintln!();
    eprintln!("Run finished in {:.1}s", runtime_seconds);
    eprintln!(
        "  cases: {} total, {} ok, {} failed, {} empty",
        summary.total_cases,
        summary.successful_cases,
        summary.failed_cases,
        summary.empty_cases
    );
    eprintln!(
        "  status: {} ({:.0}% success)",
        summary.status().as_str(),
        summary.success_rate()
    );
}

/// Preview table for `plan`: per-suite counts without executing anything.
pub fn plan_table(task_name: &str, rows: &[(String, String, usize)], total: usize) {
    eprintln!("Plan for task '{task_name}':");
    for (suite, model, count) in rows {
        eprintln!("  {suite} / {model}: {count} case(s)");
    }
    eprintln!("Total: {total} case(s)");
}
