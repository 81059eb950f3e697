//! Parsing of the tool's result file: a single Markdown pipe table in one
//! of two shapes. Dual-stage output packs a prefill and a decode
//! measurement into one `<br>`-delimited row; single-stage output is one
//! measurement per row. Everything degrades to warnings, never aborts.

use crate::model::{CaseMetadata, PromptType, ResultKind, ResultRow};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedOutput {
    pub rows: Vec<ResultRow>,
    /// Execution metadata from the first data row, when present.
    pub metadata: Option<CaseMetadata>,
}

/// Typed classification of one table row, resolved before lowering to the
/// common `ResultRow` shape.
#[derive(Debug, Clone, PartialEq)]
pub enum RowShape {
    DualStage {
        prompt: i64,
        decode: i64,
        prefill_perf: String,
        decode_perf: String,
    },
    SingleStage {
        test: String,
        perf: String,
    },
}

pub fn parse_output_file(path: &Path, default_prompt_type: PromptType) -> ParsedOutput {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "result file missing or unreadable");
            return ParsedOutput::default();
        }
    };
    parse_output(&content, default_prompt_type)
}

pub fn parse_output(content: &str, default_prompt_type: PromptType) -> ParsedOutput {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    // header + separator + at least one data row
    if lines.len() < 3 {
        tracing::warn!(lines = lines.len(), "result table too short, no rows recorded");
        return ParsedOutput::default();
    }

    let headers = split_row(lines[0]);
    let mut out = ParsedOutput::default();

    for (row_index, line) in lines[2..].iter().enumerate() {
        if !line.starts_with('|') {
            continue;
        }
        let values = split_row(line);
        if values.len() != headers.len() {
            tracing::warn!(
                row = row_index,
                expected = headers.len(),
                actual = values.len(),
                "column count mismatch, row skipped"
            );
            continue;
        }
        let fields: BTreeMap<&str, &str> =
            headers.iter().map(String::as_str).zip(values.iter().map(String::as_str)).collect();

        if out.metadata.is_none() {
            out.metadata = Some(extract_metadata(&fields));
        }
        let prompt_type = fields
            .get("pType")
            .and_then(|s| PromptType::parse(s.trim()))
            .unwrap_or(default_prompt_type);

        if let Some(shape) = classify_row(row_index, &fields) {
            out.rows.extend(lower_row(shape, prompt_type));
        }
    }
    out
}

fn split_row(line: &str) -> Vec<String> {
    let trimmed = line.trim().trim_start_matches('|').trim_end_matches('|');
    trimmed.split('|').map(|c| c.trim().to_string()).collect()
}

/// Which of the two formats a row uses: a populated `llm_demo` column
/// marks dual-stage output, a `test` column marks single-stage. Skipped
/// rows warn with the cell that actually broke.
fn classify_row(row_index: usize, fields: &BTreeMap<&str, &str>) -> Option<RowShape> {
    if let Some(demo) = fields.get("llm_demo").filter(|s| !s.is_empty()) {
        let Some((prompt, decode)) = parse_llm_demo(demo) else {
            tracing::warn!(row = row_index, llm_demo = %demo, "malformed llm_demo cell, row skipped");
            return None;
        };
        let speed = fields.get("speed(tok/s)").copied().unwrap_or_default();
        let Some((prefill_perf, decode_perf)) = speed.split_once("<br>") else {
            tracing::warn!(
                row = row_index,
                speed = %speed,
                "dual-stage speed cell has no '<br>' separator, row skipped"
            );
            return None;
        };
        return Some(RowShape::DualStage {
            prompt,
            decode,
            prefill_perf: prefill_perf.trim().to_string(),
            decode_perf: decode_perf.trim().to_string(),
        });
    }
    if let Some(test) = fields.get("test").filter(|s| !s.is_empty()) {
        let perf = fields.get("t/s").copied().unwrap_or_default();
        return Some(RowShape::SingleStage {
            test: test.to_string(),
            perf: perf.to_string(),
        });
    }
    tracing::warn!(row = row_index, "row has neither llm_demo nor test column, skipped");
    None
}

fn lower_row(shape: RowShape, prompt_type: PromptType) -> Vec<ResultRow> {
    match shape {
        RowShape::DualStage {
            prompt,
            decode,
            prefill_perf,
            decode_perf,
        } => {
            let mut rows = Vec::with_capacity(2);
            if let Some((mean, std)) = parse_perf(&prefill_perf) {
                rows.push(ResultRow::new(
                    ResultKind::Pp,
                    prompt.to_string(),
                    mean,
                    Some(std),
                    prompt_type,
                ));
            } else {
                tracing::warn!(perf = %prefill_perf, "unparseable prefill measurement");
            }
            if let Some((mean, std)) = parse_perf(&decode_perf) {
                rows.push(ResultRow::new(
                    ResultKind::Tg,
                    decode.to_string(),
                    mean,
                    Some(std),
                    prompt_type,
                ));
            } else {
                tracing::warn!(perf = %decode_perf, "unparseable decode measurement");
            }
            rows
        }
        RowShape::SingleStage { test, perf } => {
            let Some((mean, std)) = parse_perf(&perf) else {
                tracing::warn!(perf = %perf, "unparseable measurement");
                return Vec::new();
            };
            let (kind, parameter) = classify_test_name(&test);
            vec![ResultRow::new(kind, parameter, mean, Some(std), prompt_type)]
        }
    }
}

/// `"prompt=<P><br>decode=<D>"` -> (P, D).
fn parse_llm_demo(s: &str) -> Option<(i64, i64)> {
    let (prompt_part, decode_part) = s.split_once("<br>")?;
    let prompt = prompt_part.trim().split_once('=')?.1.trim().parse().ok()?;
    let decode = decode_part.trim().split_once('=')?.1.trim().parse().ok()?;
    Some((prompt, decode))
}

/// Test names classify by shape: `pp512`, `tg128`, or combined `pp32+tg64`.
fn classify_test_name(test: &str) -> (ResultKind, String) {
    if test.contains('+') {
        let numbers: Vec<&str> = test
            .split('+')
            .map(|part| part.trim_start_matches(|c: char| !c.is_ascii_digit()))
            .collect();
        return (ResultKind::PpTg, numbers.join(","));
    }
    if let Some(n) = test.strip_prefix("pp") {
        if let Ok(v) = n.trim().parse::<i64>() {
            return (ResultKind::Pp, v.to_string());
        }
    }
    if let Some(n) = test.strip_prefix("tg") {
        if let Ok(v) = n.trim().parse::<i64>() {
            return (ResultKind::Tg, v.to_string());
        }
    }
    (ResultKind::Unknown, test.to_string())
}

/// `"<mean> ± <std>"` -> (mean, std). No `±` means std 0; an empty string
/// is explicitly (0, 0) so garbled tool output never aborts the file.
pub fn parse_perf(s: &str) -> Option<(f64, f64)> {
    let s = s.trim();
    if s.is_empty() {
        return Some((0.0, 0.0));
    }
    match s.split_once('±') {
        Some((mean, std)) => {
            Some((mean.trim().parse().ok()?, std.trim().parse().ok()?))
        }
        None => Some((s.parse().ok()?, 0.0)),
    }
}

fn extract_metadata(fields: &BTreeMap<&str, &str>) -> CaseMetadata {
    let get = |key: &str| -> Option<String> {
        fields
            .get(key)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };
    CaseMetadata {
        model_size: get("modelSize"),
        backend: get("backend"),
        threads: get("threads").and_then(|s| s.parse().ok()),
        precision: get("precision"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perf_string_variants() {
        assert_eq!(parse_perf("327.85 ± 4.00"), Some((327.85, 4.00)));
        assert_eq!(parse_perf("42.0"), Some((42.0, 0.0)));
        assert_eq!(parse_perf(""), Some((0.0, 0.0)));
        assert_eq!(parse_perf("  18.5 ±0.2 "), Some((18.5, 0.2)));
        assert_eq!(parse_perf("n/a"), None);
    }

    #[test]
    fn dual_stage_row_yields_pp_and_tg() {
        let table = "\
| modelSize | backend | threads | llm_demo | speed(tok/s) |
| --- | --- | --- | --- | --- |
| 356.33 MiB | CPU | 4 | prompt=64<br>decode=32 | 658.19 ± 12.64<br>67.75 ± 0.79 |
";
        let parsed = parse_output(table, PromptType::Fix);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(
            parsed.rows[0],
            ResultRow::new(ResultKind::Pp, "64", 658.19, Some(12.64), PromptType::Fix)
        );
        assert_eq!(
            parsed.rows[1],
            ResultRow::new(ResultKind::Tg, "32", 67.75, Some(0.79), PromptType::Fix)
        );
        let meta = parsed.metadata.unwrap();
        assert_eq!(meta.model_size.as_deref(), Some("356.33 MiB"));
        assert_eq!(meta.backend.as_deref(), Some("CPU"));
        assert_eq!(meta.threads, Some(4));
    }

    #[test]
    fn single_stage_rows_classify_by_test_name() {
        let table = "\
| modelSize | test | t/s |
| --- | --- | --- |
| 1.2 GiB | pp512 | 327.85 ± 4.00 |
| 1.2 GiB | tg128 | 25.17 ± 0.30 |
| 1.2 GiB | warmup | 1.0 |
";
        let parsed = parse_output(table, PromptType::Fix);
        assert_eq!(parsed.rows.len(), 3);
        assert_eq!(parsed.rows[0].kind, ResultKind::Pp);
        assert_eq!(parsed.rows[0].parameter, "512");
        assert_eq!(parsed.rows[1].kind, ResultKind::Tg);
        assert_eq!(parsed.rows[1].parameter, "128");
        assert_eq!(parsed.rows[2].kind, ResultKind::Unknown);
    }

    #[test]
    fn combined_test_name_joins_parameters() {
        let table = "\
| test | t/s |
| --- | --- |
| pp32+tg64 | 120.5 ± 1.1 |
";
        let parsed = parse_output(table, PromptType::Fix);
        assert_eq!(
            parsed.rows,
            vec![ResultRow::new(
                ResultKind::PpTg,
                "32,64",
                120.5,
                Some(1.1),
                PromptType::Fix
            )]
        );
    }

    #[test]
    fn mismatched_columns_skip_row_only() {
        let table = "\
| test | t/s |
| --- | --- |
| pp64 | 10.0 | extra |
| tg32 | 20.0 |
";
        let parsed = parse_output(table, PromptType::Fix);
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].parameter, "32");
    }

    #[test]
    fn short_or_missing_file_is_empty_not_fatal() {
        assert!(parse_output("| test | t/s |\n| --- | --- |\n", PromptType::Fix)
            .rows
            .is_empty());
        let parsed = parse_output_file(Path::new("/no/such/output.txt"), PromptType::Fix);
        assert!(parsed.rows.is_empty());
        assert!(parsed.metadata.is_none());
    }

    #[test]
    fn ptype_column_overrides_default() {
        let table = "\
| pType | test | t/s |
| --- | --- | --- |
| variable | pp64 | 10.0 |
";
        let parsed = parse_output(table, PromptType::Fix);
        assert_eq!(parsed.rows[0].prompt_type, PromptType::Variable);
    }

    #[test]
    fn dual_stage_row_without_speed_separator_is_skipped() {
        let table = "\
| llm_demo | speed(tok/s) |
| --- | --- |
| prompt=64<br>decode=32 | 658.19 ± 12.64 |
| prompt=64<br>decode=32 | 100.0 ± 1.0<br>40.0 ± 0.5 |
";
        let parsed = parse_output(table, PromptType::Fix);
        // only the well-formed second row contributes
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].mean, 100.0);
    }

    #[test]
    fn garbled_perf_is_skipped_with_rest_intact() {
        let table = "\
| test | t/s |
| --- | --- |
| pp64 | garbage value |
| tg32 | 20.0 |
";
        let parsed = parse_output(table, PromptType::Fix);
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].kind, ResultKind::Tg);
    }
}
