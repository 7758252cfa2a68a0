use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, instrument};

use super::{district_trends, subgroup_performance, DistrictTrend, SubgroupPerformance};
use crate::{acquire::Acquirer, fetch::Remote, records::normalize_table, table::RawTable};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictSummary {
    pub district_code: String,
    pub district_name: String,
    pub years_available: Vec<String>,
    pub trends: Vec<DistrictTrend>,
    pub subgroup_performance: Vec<SubgroupPerformance>,
    pub total_students_tested: i64,
}

/// Builds the summary from an already merged table. `None` when the
/// district has no "All Students" PreACT rows in it.
pub fn assemble(district_code: &str, table: &RawTable) -> Option<DistrictSummary> {
    let records = normalize_table(table);
    let trends = district_trends(&records, district_code);
    let first = trends.first()?;

    let district_name = first.district_name.clone();
    let years_available: Vec<String> = trends
        .iter()
        .map(|t| t.school_year.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect();
    let total_students_tested = trends.iter().map(|t| t.total_students).sum();
    let subgroup_performance = subgroup_performance(&records, district_code);

    Some(DistrictSummary {
        district_code: district_code.to_string(),
        district_name,
        years_available,
        trends,
        subgroup_performance,
        total_students_tested,
    })
}

/// Merge the requested years, then assemble.
#[instrument(level = "info", skip(acquirer))]
pub async fn summarize<R: Remote>(
    acquirer: &Acquirer<R>,
    district_code: &str,
    start_year: Option<i32>,
    end_year: Option<i32>,
    force_refresh: bool,
) -> Option<DistrictSummary> {
    let table = acquirer.merge(start_year, end_year, force_refresh).await?;
    let summary = assemble(district_code, &table);
    if summary.is_none() {
        info!("no district-level PreACT results for district");
    }
    summary
}
