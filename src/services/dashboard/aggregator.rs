use std::collections::HashMap;

use super::types::{Aggregation, Table};
use super::utils::{normalize_label, parse_number};

/// Groups rows by the normalized label and sums the value column.
///
/// Labels keep their first-seen order. Rows whose value does not parse are
/// skipped, so a label backed only by invalid values never shows up.
pub fn aggregate(table: &Table, label_column: &str, value_column: &str, date_format: &str) -> Aggregation {
    let (Some(label_idx), Some(value_idx)) = (
        table.column_index(label_column),
        table.column_index(value_column),
    ) else {
        tracing::debug!(
            "Skipping aggregation of {} by {}: column not in table",
            value_column,
            label_column
        );
        return Aggregation::default();
    };

    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut aggregation = Aggregation::default();

    for row in table.rows() {
        let Some(value) = parse_number(&row[value_idx]) else {
            continue;
        };
        let label = normalize_label(&row[label_idx], date_format);

        match positions.get(&label) {
            Some(&pos) => aggregation.values[pos] += value,
            None => {
                positions.insert(label.clone(), aggregation.labels.len());
                aggregation.labels.push(label);
                aggregation.values.push(value);
            }
        }
    }

    aggregation
}
