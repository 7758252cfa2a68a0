use serde::{Deserialize, Serialize};

use super::{in_district_slice, ALL_STUDENTS, COMPOSITE};
use crate::records::ScoreRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubgroupPerformance {
    pub school_year: String,
    pub district_code: String,
    pub district_name: String,
    pub grade_level: i64,
    pub subgroup_category: String,
    pub subgroup_value: String,
    pub composite_score: f64,
    pub student_count: i64,
}

/// Composite scores of every demographic subgroup of the district. Rows
/// with a suppressed score or count are left out.
pub fn subgroup_performance(
    records: &[ScoreRecord],
    district_code: &str,
) -> Vec<SubgroupPerformance> {
    let mut out: Vec<SubgroupPerformance> = records
        .iter()
        .filter(|r| {
            in_district_slice(r, district_code)
                && r.test_subject == COMPOSITE
                && r.group_by != ALL_STUDENTS
        })
        .filter_map(|r| {
            Some(SubgroupPerformance {
                school_year: r.school_year.clone(),
                district_code: district_code.to_string(),
                district_name: r.district_name.clone(),
                grade_level: r.grade_level,
                subgroup_category: r.group_by.clone(),
                subgroup_value: r.group_by_value.clone(),
                composite_score: r.average_score?,
                student_count: r.student_count?,
            })
        })
        .collect();

    out.sort_by(|a, b| {
        (a.school_year.as_str(), a.grade_level, a.subgroup_category.as_str()).cmp(&(
            b.school_year.as_str(),
            b.grade_level,
            b.subgroup_category.as_str(),
        ))
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::scored;

    fn subgroup(
        year: &str,
        grade: i64,
        category: &str,
        value: &str,
        score: Option<f64>,
        count: Option<i64>,
    ) -> ScoreRecord {
        ScoreRecord {
            group_by: category.to_string(),
            group_by_value: value.to_string(),
            ..scored(year, grade, "Composite", score, count)
        }
    }

    #[test]
    fn rows_missing_score_or_count_are_dropped() {
        let records = vec![
            subgroup("2023-24", 9, "Gender", "Female", Some(19.5), Some(120)),
            subgroup("2023-24", 9, "Gender", "Male", Some(18.5), None),
            subgroup("2023-24", 9, "Race/Ethnicity", "Asian", None, Some(12)),
        ];
        let out = subgroup_performance(&records, "100");

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].subgroup_value, "Female");
        assert_eq!(out[0].composite_score, 19.5);
        assert_eq!(out[0].student_count, 120);
    }

    #[test]
    fn all_students_and_other_subjects_are_excluded() {
        let mut english = subgroup("2023-24", 9, "Gender", "Female", Some(19.0), Some(10));
        english.test_subject = "English".to_string();
        let records = vec![
            scored("2023-24", 9, "Composite", Some(20.0), Some(200)),
            english,
        ];
        assert!(subgroup_performance(&records, "100").is_empty());
    }

    #[test]
    fn sorted_by_year_grade_category_and_stable_within() {
        let records = vec![
            subgroup("2023-24", 9, "Race/Ethnicity", "White", Some(1.0), Some(1)),
            subgroup("2023-24", 9, "Gender", "Male", Some(2.0), Some(1)),
            subgroup("2022-23", 10, "Gender", "Female", Some(3.0), Some(1)),
            subgroup("2023-24", 9, "Gender", "Female", Some(4.0), Some(1)),
        ];
        let order: Vec<_> = subgroup_performance(&records, "100")
            .into_iter()
            .map(|s| (s.school_year, s.subgroup_category, s.subgroup_value))
            .collect();
        assert_eq!(
            order,
            vec![
                ("2022-23".into(), "Gender".into(), "Female".into()),
                ("2023-24".into(), "Gender".into(), "Male".into()),
                ("2023-24".into(), "Gender".into(), "Female".into()),
                ("2023-24".into(), "Race/Ethnicity".into(), "White".into()),
            ]
        );
    }
}
