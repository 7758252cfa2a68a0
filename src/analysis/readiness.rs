use serde::{Deserialize, Serialize};

use super::{in_district_slice, ALL_STUDENTS};
use crate::records::ScoreRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessBreakdown {
    pub school_year: String,
    pub district_code: String,
    pub district_name: String,
    pub grade_level: i64,
    pub test_subject: String,
    pub test_result: Option<String>,
    pub student_count: Option<i64>,
}

/// Result labels of the district's "All Students" rows, one per record.
pub fn readiness_breakdown(records: &[ScoreRecord], district_code: &str) -> Vec<ReadinessBreakdown> {
    let mut out: Vec<ReadinessBreakdown> = records
        .iter()
        .filter(|r| in_district_slice(r, district_code) && r.group_by == ALL_STUDENTS)
        .map(|r| ReadinessBreakdown {
            school_year: r.school_year.clone(),
            district_code: district_code.to_string(),
            district_name: r.district_name.clone(),
            grade_level: r.grade_level,
            test_subject: r.test_subject.clone(),
            test_result: r.test_result.clone(),
            student_count: r.student_count,
        })
        .collect();

    out.sort_by(|a, b| {
        (a.school_year.as_str(), a.grade_level, a.test_subject.as_str()).cmp(&(
            b.school_year.as_str(),
            b.grade_level,
            b.test_subject.as_str(),
        ))
    });
    out
}
