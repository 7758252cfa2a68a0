//! Views over normalized records. Each view is a filter over the records
//! of one district followed by a group-by or a sort.

use crate::records::{coerce_i64, ScoreRecord};

pub mod districts;
pub mod readiness;
pub mod subgroups;
pub mod summary;
pub mod trends;

pub use districts::{district_catalog, DistrictEntry};
pub use readiness::{readiness_breakdown, ReadinessBreakdown};
pub use subgroups::{subgroup_performance, SubgroupPerformance};
pub use summary::{assemble, summarize, DistrictSummary};
pub use trends::{district_trends, DistrictTrend};

pub const ALL_STUDENTS: &str = "All Students";
pub const PREACT: &str = "PreACT";
pub const COMPOSITE: &str = "Composite";

/// District codes are compared as integers when both sides parse, so
/// `"0100"` and `"100"` name the same district.
pub fn same_district(requested: &str, code: &str) -> bool {
    match (coerce_i64(Some(requested)), coerce_i64(Some(code))) {
        (Some(a), Some(b)) => a == b,
        _ => requested.trim() == code.trim(),
    }
}

/// Rows that summarize the whole district rather than one school.
pub fn is_district_level(rec: &ScoreRecord) -> bool {
    match rec.school_code.as_deref() {
        None => true,
        Some(code) => coerce_i64(Some(code)) == Some(0),
    }
}

fn in_district_slice(rec: &ScoreRecord, district_code: &str) -> bool {
    same_district(district_code, &rec.district_code)
        && is_district_level(rec)
        && rec.test_group == PREACT
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::records::ScoreRecord;

    /// A district-level "All Students" PreACT record; tests tweak the rest.
    pub fn record(year: &str, grade: i64, subject: &str) -> ScoreRecord {
        ScoreRecord {
            school_year: year.to_string(),
            district_code: "100".to_string(),
            district_name: "Lakeside".to_string(),
            school_code: None,
            school_name: None,
            grade_level: grade,
            test_subject: subject.to_string(),
            test_group: "PreACT".to_string(),
            group_by: "All Students".to_string(),
            group_by_value: "All Students".to_string(),
            student_count: None,
            group_count: None,
            average_score: None,
            test_result: None,
            test_result_code: None,
            charter: false,
        }
    }

    pub fn scored(
        year: &str,
        grade: i64,
        subject: &str,
        score: Option<f64>,
        count: Option<i64>,
    ) -> ScoreRecord {
        ScoreRecord {
            average_score: score,
            student_count: count,
            ..record(year, grade, subject)
        }
    }
}
