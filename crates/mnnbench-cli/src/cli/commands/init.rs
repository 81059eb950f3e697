use super::exit_codes;
use crate::cli::args::InitArgs;
use std::path::Path;

pub fn cmd_init(args: InitArgs) -> anyhow::Result<i32> {
    write_if_missing(&args.task, |p| {
        mnnbench_core::config::write_sample_task(p).map_err(Into::into)
    })?;
    write_if_missing(&args.models, |p| {
        mnnbench_core::config::write_sample_models(p).map_err(Into::into)
    })?;
    Ok(exit_codes::OK)
}

fn write_if_missing(
    path: &Path,
    write: impl Fn(&Path) -> anyhow::Result<()>,
) -> anyhow::Result<()> {
    if path.exists() {
        eprintln!("note: {} already exists (skipped)", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write(path)?;
    eprintln!("created {}", path.display());
    Ok(())
}
