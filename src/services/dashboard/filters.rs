use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::types::{Classification, ColumnType, Table, MISSING_LABEL};
use super::utils::normalize_label;

/// Active column = value constraints. All of them must hold for a row to survive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    filters: BTreeMap<String, String>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Click-to-filter: sets `column = value`, or clears it when already set to `value`.
    /// Returns whether the filter is active afterwards.
    pub fn toggle(&mut self, column: &str, value: &str) -> bool {
        if self.filters.get(column).map(String::as_str) == Some(value) {
            self.filters.remove(column);
            tracing::info!("Filter removed: {} = \"{}\"", column, value);
            false
        } else {
            self.filters.insert(column.to_string(), value.to_string());
            tracing::info!("Filter applied: {} = \"{}\"", column, value);
            true
        }
    }

    /// Explicit selection from a filter control. `None` means "all values".
    pub fn select(&mut self, column: &str, value: Option<&str>) {
        match value {
            Some(value) => {
                self.filters.insert(column.to_string(), value.to_string());
            }
            None => {
                self.filters.remove(column);
            }
        }
    }

    pub fn clear(&mut self) {
        self.filters.clear();
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.filters.get(column).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.filters.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Rows whose normalized value matches every active filter. A filter on a column
/// the table does not have keeps nothing.
pub fn apply_filters(table: &Table, filters: &FilterState, date_format: &str) -> Table {
    if filters.is_empty() {
        return table.clone();
    }

    let constraints: Option<Vec<(usize, &str)>> = filters
        .iter()
        .map(|(column, value)| table.column_index(column).map(|idx| (idx, value)))
        .collect();

    let Some(constraints) = constraints else {
        tracing::warn!("Filter references a column missing from the table; no rows match");
        return table.retain_rows(|_| false);
    };

    let filtered = table.retain_rows(|row| {
        constraints
            .iter()
            .all(|&(idx, value)| normalize_label(&row[idx], date_format) == value)
    });

    tracing::debug!(
        "Filters kept {} of {} rows",
        filtered.row_count(),
        table.row_count()
    );
    filtered
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOption {
    pub column: String,
    pub values: Vec<String>,
}

/// Choices for a filter control: every date or categorical column with its
/// sorted distinct values, blanks left out.
pub fn filter_options(table: &Table, classification: &Classification, date_format: &str) -> Vec<FilterOption> {
    classification
        .columns
        .iter()
        .filter(|profile| matches!(profile.data_type, ColumnType::Date | ColumnType::Categorical))
        .map(|profile| {
            let values: BTreeSet<String> = table
                .column_values(&profile.name)
                .map(|cell| normalize_label(cell, date_format))
                .filter(|label| label != MISSING_LABEL)
                .collect();
            FilterOption {
                column: profile.name.clone(),
                values: values.into_iter().collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::dashboard::classifier::classify;
    use crate::services::dashboard::types::CellValue;
    use pretty_assertions::assert_eq;

    const FMT: &str = "%d/%m/%Y";

    fn sample() -> Table {
        Table::new(
            vec!["Region".into(), "Day".into(), "Sales".into()],
            vec![
                vec!["South".into(), 45306.0.into(), 10.0.into()],
                vec!["North".into(), 45307.0.into(), 20.0.into()],
                vec!["South".into(), 45307.0.into(), 30.0.into()],
                vec![CellValue::Empty, 45306.0.into(), 40.0.into()],
            ],
        )
    }

    #[test]
    fn toggling_twice_clears() {
        let mut filters = FilterState::new();
        assert!(filters.toggle("Region", "South"));
        assert_eq!(filters.get("Region"), Some("South"));
        assert!(!filters.toggle("Region", "South"));
        assert!(filters.is_empty());
        assert_eq!(apply_filters(&sample(), &filters, FMT), sample());
    }

    #[test]
    fn toggle_to_other_value_replaces() {
        let mut filters = FilterState::new();
        filters.toggle("Region", "South");
        assert!(filters.toggle("Region", "North"));
        assert_eq!(filters.get("Region"), Some("North"));
    }

    #[test]
    fn filters_compose_with_and() {
        let mut filters = FilterState::new();
        filters.select("Region", Some("South"));
        filters.select("Day", Some("16/01/2024"));
        let filtered = apply_filters(&sample(), &filters, FMT);
        assert_eq!(filtered.row_count(), 1);
        assert_eq!(filtered.rows()[0][2], CellValue::Number(30.0));
    }

    #[test]
    fn blank_cells_match_missing_label() {
        let mut filters = FilterState::new();
        filters.toggle("Region", "N/A");
        let filtered = apply_filters(&sample(), &filters, FMT);
        assert_eq!(filtered.row_count(), 1);
    }

    #[test]
    fn unknown_column_matches_nothing() {
        let mut filters = FilterState::new();
        filters.select("Missing", Some("x"));
        assert!(apply_filters(&sample(), &filters, FMT).is_empty());
        filters.select("Missing", None);
        assert!(filters.is_empty());
    }

    #[test]
    fn options_skip_numeric_and_blank() {
        let t = sample();
        let options = filter_options(&t, &classify(&t), FMT);
        assert_eq!(
            options,
            vec![
                FilterOption {
                    column: "Region".into(),
                    values: vec!["North".into(), "South".into()],
                },
                FilterOption {
                    column: "Day".into(),
                    values: vec!["15/01/2024".into(), "16/01/2024".into()],
                },
            ]
        );
    }
}
