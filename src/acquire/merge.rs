use tracing::{error, info, instrument};

use super::Acquirer;
use crate::{fetch::Remote, table::RawTable, year::SchoolYear};

impl<R: Remote> Acquirer<R> {
    /// One table covering school years `start_year..=end_year`, fetched one
    /// year at a time in ascending order. Years with no data are skipped.
    /// Without both bounds this is a single auto-detected `acquire(None)`.
    #[instrument(level = "info", skip(self))]
    pub async fn merge(
        &self,
        start_year: Option<i32>,
        end_year: Option<i32>,
        force_refresh: bool,
    ) -> Option<RawTable> {
        let (Some(start), Some(end)) = (start_year, end_year) else {
            info!("auto-detecting available data");
            return self.acquire(None, force_refresh).await;
        };

        let mut tables = Vec::new();
        for year in start..=end {
            let label = SchoolYear::from_start_year(year);
            match self.acquire(Some(&label), force_refresh).await {
                Some(table) => tables.push(table),
                None => info!(year = %label, "no data for school year"),
            }
        }

        match RawTable::concat(tables) {
            Ok(Some(table)) => {
                info!(records = table.num_rows(), "total records loaded");
                Some(table)
            }
            Ok(None) => None,
            Err(e) => {
                error!(error = %e, "failed to combine yearly tables");
                None
            }
        }
    }
}
