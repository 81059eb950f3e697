use super::exit_codes;
use crate::cli::args::StatusArgs;
use mnnbench_core::storage::store::Store;

pub fn cmd_status(args: StatusArgs) -> anyhow::Result<i32> {
    if !args.db.exists() {
        eprintln!("no results database at {}", args.db.display());
        return Ok(exit_codes::CONFIG_ERROR);
    }
    let store = Store::open(&args.db)?;
    store.init_schema()?;

    let rows = store.task_overview(args.task_name.as_deref())?;
    if rows.is_empty() {
        println!("no recorded runs");
        return Ok(exit_codes::OK);
    }
    println!(
        "{:<5} {:<40} {:>4} {:<16} {:>6} {}",
        "id", "task", "run", "status", "cases", "created"
    );
    for row in rows {
        println!(
            "{:<5} {:<40} {:>4} {:<16} {:>6} {}",
            row.id,
            row.name,
            row.run_number.unwrap_or(1),
            row.status.as_str(),
            row.case_count,
            row.created_at
        );
    }
    Ok(exit_codes::OK)
}
