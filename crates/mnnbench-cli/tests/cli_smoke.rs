use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn mnnbench() -> Command {
    Command::cargo_bin("mnnbench").unwrap()
}

#[test]
fn init_writes_sample_files_and_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let task = dir.path().join("task.yaml");
    let models = dir.path().join("models.yaml");

    mnnbench()
        .args(["init", "--task"])
        .arg(&task)
        .arg("--models")
        .arg(&models)
        .assert()
        .success()
        .stderr(predicate::str::contains("created"));
    assert!(task.exists());
    assert!(models.exists());

    mnnbench()
        .args(["init", "--task"])
        .arg(&task)
        .arg("--models")
        .arg(&models)
        .assert()
        .success()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn plan_previews_case_counts_without_executing() {
    let dir = TempDir::new().unwrap();
    let task = dir.path().join("task.yaml");
    std::fs::write(
        &task,
        r#"task_name: preview
global_config:
  timeout: 60
  models: [m1, m2]
benchmark_suites:
  - suite_name: threads
    variables:
      - name: threads
        values: [1, 2, 4]
"#,
    )
    .unwrap();

    mnnbench()
        .args(["plan", "--task"])
        .arg(&task)
        .assert()
        .success()
        .stderr(predicate::str::contains("Total: 6 case(s)"));
}

#[test]
fn plan_rejects_missing_task_file() {
    mnnbench()
        .args(["plan", "--task", "/nonexistent/task.yaml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("config error"));
}

#[test]
fn strict_mode_rejects_unknown_keys() {
    let dir = TempDir::new().unwrap();
    let task = dir.path().join("task.yaml");
    std::fs::write(
        &task,
        r#"task_name: typo
global_config:
  timeout: 60
  models: [m1]
  tasket: "taskset -c 0"
benchmark_suites:
  - suite_name: s
    variables:
      - name: threads
        values: [1]
"#,
    )
    .unwrap();

    mnnbench()
        .args(["plan", "--strict", "--task"])
        .arg(&task)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("tasket"));
}

#[test]
fn status_without_database_reports_config_error() {
    mnnbench()
        .args(["status", "--db", "/nonexistent/bench.db"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no results database"));
}

#[cfg(unix)]
mod run_with_stub_tool {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    const STUB: &str = r#"#!/bin/sh
out=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "-fp" ]; then out="$arg"; fi
  prev="$arg"
done
cat > "$out" <<'EOF'
| model | modelSize | backend | threads | precision | llm_demo | speed(tok/s) |
| --- | --- | --- | --- | --- | --- | --- |
| stub | 606.95M | CPU | 4 | Low | prompt=64<br>decode=32 | 100.00 ± 1.00<br>40.00 ± 0.50 |
EOF
"#;

    #[test]
    fn run_executes_and_records_a_completed_task() {
        let dir = TempDir::new().unwrap();

        let bench = dir.path().join("llm_bench");
        std::fs::write(&bench, STUB).unwrap();
        std::fs::set_permissions(&bench, std::fs::Permissions::from_mode(0o755)).unwrap();

        let model_dir = dir.path().join("stub_model");
        std::fs::create_dir_all(&model_dir).unwrap();
        let config = model_dir.join("config.json");
        std::fs::write(&config, "{}").unwrap();

        let task = dir.path().join("task.yaml");
        std::fs::write(
            &task,
            r#"task_name: stub_run
global_config:
  timeout: 60
  models: [stub_model]
benchmark_suites:
  - suite_name: threads
    variables:
      - name: threads
        values: [1, 2]
"#,
        )
        .unwrap();
        let models = dir.path().join("models.yaml");
        std::fs::write(
            &models,
            format!("models:\n  stub_model: {}\n", config.display()),
        )
        .unwrap();

        let db = dir.path().join("results/bench.db");
        mnnbench()
            .args(["run", "--task"])
            .arg(&task)
            .arg("--models")
            .arg(&models)
            .arg("--bench")
            .arg(&bench)
            .arg("--db")
            .arg(&db)
            .assert()
            .success()
            .stderr(predicate::str::contains("status: completed"));

        mnnbench()
            .args(["status", "--db"])
            .arg(&db)
            .assert()
            .success()
            .stdout(predicate::str::contains("stub_run"))
            .stdout(predicate::str::contains("completed"));
    }
}
