use serde::{Deserialize, Serialize};

/// What a single performance measurement refers to: prefill, decode, the
/// combined `-pg` form, or something the tool emitted that we don't know.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Pp,
    Tg,
    PpTg,
    Unknown,
}

impl ResultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultKind::Pp => "pp",
            ResultKind::Tg => "tg",
            ResultKind::PpTg => "pp+tg",
            ResultKind::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "pp" => ResultKind::Pp,
            "tg" => ResultKind::Tg,
            "pp+tg" => ResultKind::PpTg,
            _ => ResultKind::Unknown,
        }
    }
}

/// How the prompt fed to the tool was sourced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PromptType {
    Fix,
    Variable,
    File,
}

impl PromptType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptType::Fix => "fix",
            PromptType::Variable => "variable",
            PromptType::File => "file",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fix" => Some(PromptType::Fix),
            "variable" => Some(PromptType::Variable),
            "file" => Some(PromptType::File),
            _ => None,
        }
    }
}

/// One normalized performance measurement parsed from the tool's output.
/// Unique per (case, kind, parameter) once persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultRow {
    pub kind: ResultKind,
    /// The nominal parameter the measurement corresponds to: a prompt or
    /// generation length, or `"<p>,<g>"` for the combined kind.
    pub parameter: String,
    pub mean: f64,
    pub std: Option<f64>,
    pub unit: String,
    pub prompt_type: PromptType,
}

impl ResultRow {
    pub fn new(kind: ResultKind, parameter: impl Into<String>, mean: f64, std: Option<f64>, prompt_type: PromptType) -> Self {
        Self {
            kind,
            parameter: parameter.into(),
            mean,
            std,
            unit: "tokens/sec".into(),
            prompt_type,
        }
    }
}

/// Execution metadata the tool reports alongside its measurements.
/// Absent fields stay absent; the tool's own defaults are never invented.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CaseMetadata {
    pub model_size: Option<String>,
    pub backend: Option<String>,
    pub threads: Option<i64>,
    pub precision: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Pending,
    Success,
    Failed,
    Timeout,
    NoResults,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Pending => "pending",
            CaseStatus::Success => "success",
            CaseStatus::Failed => "failed",
            CaseStatus::Timeout => "timeout",
            CaseStatus::NoResults => "no_results",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Completed,
    PartialFailure,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
            TaskStatus::PartialFailure => "partial_failure",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "completed" => TaskStatus::Completed,
            "partial_failure" => TaskStatus::PartialFailure,
            "failed" => TaskStatus::Failed,
            _ => TaskStatus::Pending,
        }
    }
}

/// Aggregated counts for one finished batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub total_cases: usize,
    pub successful_cases: usize,
    pub failed_cases: usize,
    /// Cases that executed cleanly but produced no parseable rows.
    pub empty_cases: usize,
}

impl RunSummary {
    /// Overall status from the success ratio: every case clean ->
    /// completed, none -> failed, anything in between -> partial_failure.
    pub fn status(&self) -> TaskStatus {
        if self.failed_cases == 0 {
            TaskStatus::Completed
        } else if self.failed_cases == self.total_cases {
            TaskStatus::Failed
        } else {
            TaskStatus::PartialFailure
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_cases == 0 {
            return 0.0;
        }
        self.successful_cases as f64 / self.total_cases as f64 * 100.0
    }
}
