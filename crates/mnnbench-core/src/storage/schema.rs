//! Four-level results schema: task -> suite -> case -> (variable values,
//! results). All deletes cascade downward.

pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    original_name TEXT,
    run_number INTEGER,
    description TEXT,
    config_json TEXT NOT NULL,
    summary_json TEXT,
    execution_time_seconds REAL,
    status TEXT DEFAULT 'pending',
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS suites (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    task_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    model_name TEXT NOT NULL,
    model_path TEXT NOT NULL,
    suite_json TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (task_id) REFERENCES tasks(id) ON DELETE CASCADE,
    UNIQUE(task_id, name, model_name)
);

CREATE TABLE IF NOT EXISTS case_definitions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    suite_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    base_parameters TEXT NOT NULL,
    model_size TEXT,
    backend TEXT,
    threads INTEGER,
    precision TEXT,
    execution_time_seconds REAL,
    status TEXT DEFAULT 'pending',
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (suite_id) REFERENCES suites(id) ON DELETE CASCADE,
    UNIQUE(suite_id, name)
);

CREATE TABLE IF NOT EXISTS case_variable_values (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    case_id INTEGER NOT NULL,
    variable_name TEXT NOT NULL,
    variable_value TEXT NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (case_id) REFERENCES case_definitions(id) ON DELETE CASCADE,
    UNIQUE(case_id, variable_name)
);

CREATE TABLE IF NOT EXISTS benchmark_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    case_id INTEGER NOT NULL,
    result_type TEXT NOT NULL,
    result_parameter TEXT NOT NULL,
    mean_value REAL NOT NULL,
    std_value REAL,
    unit TEXT DEFAULT 'tokens/sec',
    ptypes TEXT DEFAULT 'fix',
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (case_id) REFERENCES case_definitions(id) ON DELETE CASCADE,
    UNIQUE(case_id, result_type, result_parameter)
);

CREATE INDEX IF NOT EXISTS idx_suites_task_id ON suites(task_id);
CREATE INDEX IF NOT EXISTS idx_cases_suite_id ON case_definitions(suite_id);
CREATE INDEX IF NOT EXISTS idx_results_case_id ON benchmark_results(case_id);
CREATE INDEX IF NOT EXISTS idx_case_variables_case_id ON case_variable_values(case_id);
CREATE INDEX IF NOT EXISTS idx_tasks_original_name ON tasks(original_name);
"#;
