use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{
    records::{columns, present},
    table::RawTable,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictEntry {
    pub code: String,
    pub name: String,
}

/// Every distinct (code, name) pair in the table, ordered by name. Rows
/// without both values are ignored.
pub fn district_catalog(table: &RawTable) -> Vec<DistrictEntry> {
    let pairs: BTreeSet<(&str, &str)> = table
        .rows()
        .filter_map(|row| {
            let code = present(row.get(columns::DISTRICT_CODE))?;
            let name = present(row.get(columns::DISTRICT_NAME))?;
            Some((name, code))
        })
        .collect();

    pairs
        .into_iter()
        .map(|(name, code)| DistrictEntry {
            code: code.to_string(),
            name: name.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_pairs_sorted_by_name() {
        let table = RawTable::from_rows(
            &[columns::DISTRICT_CODE, columns::DISTRICT_NAME],
            &[
                vec![Some("6174"), Some("Waukesha")],
                vec![Some("100"), Some("Appleton")],
                vec![Some("6174"), Some("Waukesha")],
                vec![None, Some("Nowhere")],
                vec![Some("3619"), Some("Madison")],
            ],
        )
        .unwrap();

        let names: Vec<_> = district_catalog(&table)
            .into_iter()
            .map(|d| (d.code, d.name))
            .collect();
        assert_eq!(
            names,
            vec![
                ("100".to_string(), "Appleton".to_string()),
                ("3619".to_string(), "Madison".to_string()),
                ("6174".to_string(), "Waukesha".to_string()),
            ]
        );
    }
}
