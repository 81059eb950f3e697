use mnnbench_core::config::{GlobalConfig, TaskConfig};
use mnnbench_core::model::{
    CaseMetadata, CaseStatus, PromptType, ResultKind, ResultRow, RunSummary, TaskStatus,
};
use mnnbench_core::storage::store::Store;
use tempfile::tempdir;

fn sample_task(name: &str) -> TaskConfig {
    TaskConfig {
        task_name: name.into(),
        description: "smoke".into(),
        global: GlobalConfig {
            models: vec!["m1".into()],
            timeout_seconds: 60,
            taskset: None,
        },
        suites: vec![],
    }
}

#[test]
fn run_numbers_increment_per_logical_task() -> anyhow::Result<()> {
    let store = Store::memory()?;
    store.init_schema()?;

    store.create_task(&sample_task("scaling"))?;
    store.create_task(&sample_task("scaling"))?;
    store.create_task(&sample_task("other"))?;

    let rows = store.task_overview(Some("scaling"))?;
    assert_eq!(rows.len(), 2);
    // newest first
    assert_eq!(rows[0].run_number, Some(2));
    assert_eq!(rows[1].run_number, Some(1));
    assert!(rows[1].name.starts_with("scaling_"));

    let other = store.task_overview(Some("other"))?;
    assert_eq!(other.len(), 1);
    assert_eq!(other[0].run_number, Some(1));
    Ok(())
}

#[test]
fn suite_and_case_lookups_are_idempotent() -> anyhow::Result<()> {
    let store = Store::memory()?;
    store.init_schema()?;
    let task_id = store.create_task(&sample_task("t"))?;

    let s1 = store.find_or_create_suite(task_id, "latency", "qwen", "/m/config.json", "{}")?;
    let s2 = store.find_or_create_suite(task_id, "latency", "qwen", "/m/config.json", "{}")?;
    assert_eq!(s1, s2);
    // same suite name under a different model is a distinct row
    let s3 = store.find_or_create_suite(task_id, "latency", "deepseek", "/n/config.json", "{}")?;
    assert_ne!(s1, s3);

    let c1 = store.find_or_create_case(s1, 1, r#"{"threads":4}"#)?;
    let c2 = store.find_or_create_case(s1, 1, r#"{"threads":4}"#)?;
    assert_eq!(c1, c2);
    assert_eq!(store.count_rows("case_definitions")?, 1);
    Ok(())
}

#[test]
fn result_upsert_replaces_prior_measurement() -> anyhow::Result<()> {
    let store = Store::memory()?;
    store.init_schema()?;
    let task_id = store.create_task(&sample_task("t"))?;
    let suite_id = store.find_or_create_suite(task_id, "s", "m", "/m/config.json", "{}")?;
    let case_id = store.find_or_create_case(suite_id, 1, "{}")?;

    let first = ResultRow::new(ResultKind::Pp, "64", 100.0, Some(1.0), PromptType::Fix);
    let second = ResultRow::new(ResultKind::Pp, "64", 250.0, None, PromptType::Fix);
    store.write_results(case_id, &[first])?;
    store.write_results(case_id, &[second])?;

    let rows = store.fetch_case_results(case_id)?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].mean, 250.0);
    assert_eq!(rows[0].std, None);
    Ok(())
}

#[test]
fn variable_values_upsert_and_skip_empty() -> anyhow::Result<()> {
    let store = Store::memory()?;
    store.init_schema()?;
    let task_id = store.create_task(&sample_task("t"))?;
    let suite_id = store.find_or_create_suite(task_id, "s", "m", "/m/config.json", "{}")?;
    let case_id = store.find_or_create_case(suite_id, 1, "{}")?;

    let mut values = std::collections::BTreeMap::new();
    values.insert("threads".to_string(), "4".to_string());
    values.insert("blank".to_string(), String::new());
    store.write_variable_values(case_id, &values)?;

    values.insert("threads".to_string(), "8".to_string());
    store.write_variable_values(case_id, &values)?;

    assert_eq!(store.count_rows("case_variable_values")?, 1);
    Ok(())
}

#[test]
fn deleting_a_task_cascades_to_all_children() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = Store::open(&dir.path().join("bench.db"))?;
    store.init_schema()?;

    let task_id = store.create_task(&sample_task("t"))?;
    let suite_id = store.find_or_create_suite(task_id, "s", "m", "/m/config.json", "{}")?;
    let case_id = store.find_or_create_case(suite_id, 1, "{}")?;
    store.write_variable_values(
        case_id,
        &[("threads".to_string(), "2".to_string())].into_iter().collect(),
    )?;
    store.write_results(
        case_id,
        &[ResultRow::new(ResultKind::Tg, "32", 40.0, Some(0.5), PromptType::Fix)],
    )?;

    store.delete_task(task_id)?;
    for table in ["tasks", "suites", "case_definitions", "case_variable_values", "benchmark_results"] {
        assert_eq!(store.count_rows(table)?, 0, "{table} not empty");
    }
    Ok(())
}

#[test]
fn case_execution_and_failure_updates() -> anyhow::Result<()> {
    let store = Store::memory()?;
    store.init_schema()?;
    let task_id = store.create_task(&sample_task("t"))?;
    let suite_id = store.find_or_create_suite(task_id, "s", "m", "/m/config.json", "{}")?;

    let ok_case = store.find_or_create_case(suite_id, 1, "{}")?;
    let meta = CaseMetadata {
        model_size: Some("606.95M".into()),
        backend: Some("CPU".into()),
        threads: Some(4),
        precision: Some("Low".into()),
    };
    store.update_case_execution(ok_case, &meta, 12.5)?;

    let bad_case = store.find_or_create_case(suite_id, 2, "{}")?;
    store.mark_case_failed(bad_case, CaseStatus::Timeout, 300.0)?;

    let conn = store.conn.lock().unwrap();
    let (status, backend): (String, Option<String>) = conn.query_row(
        "SELECT status, backend FROM case_definitions WHERE id = ?1",
        [ok_case],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    assert_eq!(status, "success");
    assert_eq!(backend.as_deref(), Some("CPU"));

    let status: String = conn.query_row(
        "SELECT status FROM case_definitions WHERE id = ?1",
        [bad_case],
        |r| r.get(0),
    )?;
    assert_eq!(status, "timeout");
    Ok(())
}

#[test]
fn finalize_records_status_and_summary() -> anyhow::Result<()> {
    let store = Store::memory()?;
    store.init_schema()?;
    let task_id = store.create_task(&sample_task("t"))?;

    let summary = RunSummary {
        total_cases: 4,
        successful_cases: 3,
        failed_cases: 1,
        empty_cases: 0,
    };
    store.finalize_task(task_id, 98.7, &summary)?;

    let rows = store.task_overview(Some("t"))?;
    assert_eq!(rows[0].status, TaskStatus::PartialFailure);

    let conn = store.conn.lock().unwrap();
    let (summary_json, secs): (String, f64) = conn.query_row(
        "SELECT summary_json, execution_time_seconds FROM tasks WHERE id = ?1",
        [task_id],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    assert!(summary_json.contains("\"total_cases\":4"));
    assert!((secs - 98.7).abs() < 1e-9);
    Ok(())
}

#[test]
fn reopening_an_existing_database_is_safe() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let db_path = dir.path().join("bench.db");
    {
        let store = Store::open(&db_path)?;
        store.init_schema()?;
        store.create_task(&sample_task("t"))?;
    }
    let store = Store::open(&db_path)?;
    store.init_schema()?;
    assert_eq!(store.count_rows("tasks")?, 1);
    Ok(())
}
