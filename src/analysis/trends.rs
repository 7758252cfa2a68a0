use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::{in_district_slice, ALL_STUDENTS, COMPOSITE};
use crate::records::ScoreRecord;

/// District-wide scores for one grade in one school year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictTrend {
    pub district_code: String,
    pub district_name: String,
    pub school_year: String,
    pub grade_level: i64,
    pub composite_score: Option<f64>,
    pub english_score: Option<f64>,
    pub math_score: Option<f64>,
    pub reading_score: Option<f64>,
    pub science_score: Option<f64>,
    pub stem_score: Option<f64>,
    pub total_students: i64,
}

/// One trend per (school year, grade) of the district's "All Students"
/// PreACT rows, ordered by year then grade.
pub fn district_trends(records: &[ScoreRecord], district_code: &str) -> Vec<DistrictTrend> {
    let slice: Vec<&ScoreRecord> = records
        .iter()
        .filter(|r| in_district_slice(r, district_code) && r.group_by == ALL_STUDENTS)
        .collect();
    let Some(first) = slice.first() else {
        return Vec::new();
    };
    let district_name = first.district_name.clone();

    let mut groups: BTreeMap<(&str, i64), Vec<&ScoreRecord>> = BTreeMap::new();
    for &rec in &slice {
        groups
            .entry((rec.school_year.as_str(), rec.grade_level))
            .or_default()
            .push(rec);
    }

    groups
        .into_iter()
        .map(|((school_year, grade_level), rows)| {
            // later rows for the same subject win
            let scores: HashMap<String, f64> = rows
                .iter()
                .filter_map(|r| r.average_score.map(|s| (r.test_subject.to_lowercase(), s)))
                .collect();
            let total_students = rows
                .iter()
                .find(|r| r.test_subject == COMPOSITE)
                .and_then(|r| r.student_count)
                .unwrap_or(0);

            DistrictTrend {
                district_code: district_code.to_string(),
                district_name: district_name.clone(),
                school_year: school_year.to_string(),
                grade_level,
                composite_score: scores.get("composite").copied(),
                english_score: scores.get("english").copied(),
                math_score: scores
                    .get("mathematics")
                    .or_else(|| scores.get("math"))
                    .copied(),
                reading_score: scores.get("reading").copied(),
                science_score: scores.get("science").copied(),
                stem_score: scores.get("stem").copied(),
                total_students,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::{record, scored};

    #[test]
    fn composite_and_math_fold_into_one_trend() {
        let records = vec![
            scored("2023-24", 9, "Composite", Some(20.0), Some(50)),
            scored("2023-24", 9, "Math", Some(19.0), None),
        ];
        let trends = district_trends(&records, "100");

        assert_eq!(trends.len(), 1);
        let t = &trends[0];
        assert_eq!(t.composite_score, Some(20.0));
        assert_eq!(t.math_score, Some(19.0));
        assert_eq!(t.english_score, None);
        assert_eq!(t.total_students, 50);
        assert_eq!(t.district_name, "Lakeside");
        assert_eq!(t.district_code, "100");
    }

    #[test]
    fn all_subjects_map_to_their_fields() {
        let records = vec![
            scored("2022-23", 10, "Composite", Some(18.0), Some(40)),
            scored("2022-23", 10, "English", Some(17.0), Some(40)),
            scored("2022-23", 10, "Mathematics", Some(18.5), Some(40)),
            scored("2022-23", 10, "Reading", Some(19.0), Some(40)),
            scored("2022-23", 10, "Science", Some(18.2), Some(40)),
            scored("2022-23", 10, "STEM", Some(18.4), Some(40)),
        ];
        let t = &district_trends(&records, "100")[0];
        assert_eq!(t.english_score, Some(17.0));
        assert_eq!(t.math_score, Some(18.5));
        assert_eq!(t.reading_score, Some(19.0));
        assert_eq!(t.science_score, Some(18.2));
        assert_eq!(t.stem_score, Some(18.4));
    }

    #[test]
    fn missing_composite_count_is_zero() {
        let records = vec![scored("2023-24", 9, "Composite", Some(20.0), None)];
        assert_eq!(district_trends(&records, "100")[0].total_students, 0);
    }

    #[test]
    fn output_is_sorted_by_year_then_grade() {
        let records = vec![
            scored("2023-24", 10, "Composite", Some(1.0), Some(1)),
            scored("2021-22", 10, "Composite", Some(2.0), Some(1)),
            scored("2023-24", 9, "Composite", Some(3.0), Some(1)),
            scored("2021-22", 9, "Composite", Some(4.0), Some(1)),
            scored("2021-22", 9, "English", Some(5.0), Some(1)),
        ];
        let keys: Vec<_> = district_trends(&records, "100")
            .into_iter()
            .map(|t| (t.school_year, t.grade_level))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("2021-22".to_string(), 9),
                ("2021-22".to_string(), 10),
                ("2023-24".to_string(), 9),
                ("2023-24".to_string(), 10),
            ]
        );
    }

    #[test]
    fn other_slices_are_excluded() {
        let mut school_row = scored("2023-24", 9, "Composite", Some(30.0), Some(5));
        school_row.school_code = Some("0040".to_string());
        let mut subgroup_row = scored("2023-24", 9, "Composite", Some(31.0), Some(5));
        subgroup_row.group_by = "Gender".to_string();
        let mut other_test = scored("2023-24", 9, "Composite", Some(32.0), Some(5));
        other_test.test_group = "ACT".to_string();
        let mut other_district = record("2023-24", 9, "Composite");
        other_district.district_code = "200".to_string();

        let records = vec![school_row, subgroup_row, other_test, other_district];
        assert!(district_trends(&records, "100").is_empty());
    }
}
