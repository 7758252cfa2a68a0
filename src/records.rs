// src/records.rs

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::table::{RawTable, RowRef};

/// Column headers of the published PreACT files.
pub mod columns {
    pub const SCHOOL_YEAR: &str = "SCHOOL_YEAR";
    pub const DISTRICT_CODE: &str = "DISTRICT_CODE";
    pub const DISTRICT_NAME: &str = "DISTRICT_NAME";
    pub const SCHOOL_CODE: &str = "SCHOOL_CODE";
    pub const SCHOOL_NAME: &str = "SCHOOL_NAME";
    pub const GRADE_LEVEL: &str = "GRADE_LEVEL";
    pub const TEST_SUBJECT: &str = "TEST_SUBJECT";
    pub const TEST_GROUP: &str = "TEST_GROUP";
    pub const GROUP_BY: &str = "GROUP_BY";
    pub const GROUP_BY_VALUE: &str = "GROUP_BY_VALUE";
    pub const STUDENT_COUNT: &str = "STUDENT_COUNT";
    pub const GROUP_COUNT: &str = "GROUP_COUNT";
    pub const AVERAGE_SCORE: &str = "AVERAGE_SCORE";
    pub const TEST_RESULT: &str = "TEST_RESULT";
    pub const TEST_RESULT_CODE: &str = "TEST_RESULT_CODE";
    pub const CHARTER_IND: &str = "CHARTER_IND";
}

/// Cell value the publisher uses for suppressed counts and scores.
pub const SUPPRESSED: &str = "*";

/// One normalized test-result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub school_year: String,
    pub district_code: String,
    pub district_name: String,
    pub school_code: Option<String>,
    pub school_name: Option<String>,
    pub grade_level: i64,
    pub test_subject: String,
    pub test_group: String,
    pub group_by: String,
    pub group_by_value: String,
    pub student_count: Option<i64>,
    pub group_count: Option<i64>,
    pub average_score: Option<f64>,
    pub test_result: Option<String>,
    pub test_result_code: Option<String>,
    pub charter: bool,
}

#[derive(Debug, Error, PartialEq)]
pub enum RowError {
    #[error("missing required field {0}")]
    Missing(&'static str),
    #[error("grade level {0:?} is not an integer")]
    InvalidGrade(String),
}

/// Trimmed cell text, or `None` for missing, blank and suppressed cells.
pub fn present(raw: Option<&str>) -> Option<&str> {
    let s = raw?.trim();
    (!s.is_empty() && s != SUPPRESSED).then_some(s)
}

pub fn coerce_f64(raw: Option<&str>) -> Option<f64> {
    present(raw)?.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integer parse that also accepts integral decimals such as `"12.0"`.
pub fn coerce_i64(raw: Option<&str>) -> Option<i64> {
    let s = present(raw)?;
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let v = s.parse::<f64>().ok()?;
    (v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64).then_some(v as i64)
}

fn text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn required(row: &RowRef<'_>, column: &'static str) -> Result<String, RowError> {
    text(row.get(column)).ok_or(RowError::Missing(column))
}

/// Convert one raw row. Optional numeric fields never fail; only the
/// identity fields and the grade level can reject a row.
pub fn normalize(row: &RowRef<'_>) -> Result<ScoreRecord, RowError> {
    let grade_raw = row.get(columns::GRADE_LEVEL);
    let grade_level = match coerce_i64(grade_raw) {
        Some(g) => g,
        None if present(grade_raw).is_none() => return Err(RowError::Missing(columns::GRADE_LEVEL)),
        None => return Err(RowError::InvalidGrade(grade_raw.unwrap_or_default().to_string())),
    };

    Ok(ScoreRecord {
        school_year: text(row.get(columns::SCHOOL_YEAR)).unwrap_or_default(),
        district_code: required(row, columns::DISTRICT_CODE)?,
        district_name: required(row, columns::DISTRICT_NAME)?,
        school_code: text(row.get(columns::SCHOOL_CODE)),
        school_name: text(row.get(columns::SCHOOL_NAME)),
        grade_level,
        test_subject: required(row, columns::TEST_SUBJECT)?,
        test_group: required(row, columns::TEST_GROUP)?,
        group_by: text(row.get(columns::GROUP_BY)).unwrap_or_default(),
        group_by_value: text(row.get(columns::GROUP_BY_VALUE)).unwrap_or_default(),
        student_count: coerce_i64(row.get(columns::STUDENT_COUNT)),
        group_count: coerce_i64(row.get(columns::GROUP_COUNT)),
        average_score: coerce_f64(row.get(columns::AVERAGE_SCORE)),
        test_result: text(row.get(columns::TEST_RESULT)),
        test_result_code: text(row.get(columns::TEST_RESULT_CODE)),
        charter: row
            .get(columns::CHARTER_IND)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("yes")),
    })
}

/// Normalize every row, skipping (and logging) the ones that fail.
pub fn normalize_table(table: &RawTable) -> Vec<ScoreRecord> {
    let mut skipped = 0usize;
    let records: Vec<ScoreRecord> = table
        .rows()
        .filter_map(|row| match normalize(&row) {
            Ok(rec) => Some(rec),
            Err(e) => {
                warn!(row = row.index(), error = %e, "skipping invalid record");
                skipped += 1;
                None
            }
        })
        .collect();
    debug!(kept = records.len(), skipped, "normalized records");
    records
}
