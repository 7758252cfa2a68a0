// src/year.rs

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})$").expect("school year regex should compile"));

/// Academic year label of the form `YYYY-YY`, e.g. `2020-21`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchoolYear(String);

impl SchoolYear {
    /// Label for the year starting in `year` (2020 → `2020-21`).
    pub fn from_start_year(year: i32) -> Self {
        SchoolYear(format!("{}-{:02}", year, (year.rem_euclid(100) + 1) % 100))
    }

    /// Accepts only well-formed labels whose second half follows the first.
    pub fn parse(s: &str) -> Option<Self> {
        let caps = LABEL_RE.captures(s.trim())?;
        let start: i32 = caps[1].parse().ok()?;
        let end: i32 = caps[2].parse().ok()?;
        ((start + 1).rem_euclid(100) == end).then(|| Self::from_start_year(start))
    }

    pub fn start_year(&self) -> i32 {
        self.0[..4].parse().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchoolYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_from_start_year() {
        assert_eq!(SchoolYear::from_start_year(2020).as_str(), "2020-21");
        assert_eq!(SchoolYear::from_start_year(2099).as_str(), "2099-00");
        assert_eq!(SchoolYear::from_start_year(2008).as_str(), "2008-09");
    }

    #[test]
    fn extreme_start_years_do_not_overflow() {
        assert_eq!(SchoolYear::from_start_year(i32::MAX).as_str(), "2147483647-48");
        assert_eq!(SchoolYear::from_start_year(-1).as_str(), "-1-00");
    }

    #[test]
    fn parse_validates_shape_and_sequence() {
        assert_eq!(SchoolYear::parse("2023-24"), Some(SchoolYear::from_start_year(2023)));
        assert_eq!(SchoolYear::parse(" 2023-24 ").unwrap().start_year(), 2023);
        assert_eq!(SchoolYear::parse("2023-25"), None);
        assert_eq!(SchoolYear::parse("2023"), None);
        assert_eq!(SchoolYear::parse("latest"), None);
    }
}
