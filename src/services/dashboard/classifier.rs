use std::collections::HashSet;

use rayon::prelude::*;
use smallvec::SmallVec;

use super::types::*;
use super::utils::{is_date_value, parse_number};

/// Assigns a [`ColumnType`] to every column and splits the names into the
/// numeric, categorical and date lists. Empty columns land in none of them.
pub fn classify(table: &Table) -> Classification {
    let start = std::time::Instant::now();

    let columns: Vec<ColumnProfile> = table
        .columns()
        .par_iter()
        .map(|name| profile_column(table, name))
        .collect();

    let mut classification = Classification {
        columns: Vec::with_capacity(columns.len()),
        ..Classification::default()
    };

    for profile in columns {
        match profile.data_type {
            ColumnType::Numeric => classification.numeric_columns.push(profile.name.clone()),
            ColumnType::Date => classification.date_columns.push(profile.name.clone()),
            ColumnType::Categorical => classification.categorical_columns.push(profile.name.clone()),
            ColumnType::Empty => {}
        }
        classification.columns.push(profile);
    }

    tracing::debug!(
        "Classified {} columns in {:?}: numeric={:?} date={:?} categorical={:?}",
        classification.columns.len(),
        start.elapsed(),
        classification.numeric_columns,
        classification.date_columns,
        classification.categorical_columns
    );

    classification
}

/// Date dominates numeric: a column of serial dates parses as numbers too,
/// but summing it would be meaningless.
pub fn detect_column_type<'a, I>(values: I) -> ColumnType
where
    I: IntoIterator<Item = &'a CellValue>,
{
    let mut seen_any = false;
    let mut is_numeric = true;
    let mut is_date = true;

    for value in values.into_iter().filter(|v| !v.is_empty()) {
        seen_any = true;
        is_numeric = is_numeric && parse_number(value).is_some();
        is_date = is_date && is_date_value(value);
        if !is_numeric && !is_date {
            break;
        }
    }

    match () {
        _ if !seen_any => ColumnType::Empty,
        _ if is_date => ColumnType::Date,
        _ if is_numeric => ColumnType::Numeric,
        _ => ColumnType::Categorical,
    }
}

fn profile_column(table: &Table, name: &str) -> ColumnProfile {
    let mut sample_values = SmallVec::<[String; SAMPLE_SIZE]>::new();
    let mut seen = HashSet::new();
    let mut null_count = 0;
    let mut value_count = 0;

    for value in table.column_values(name) {
        if value.is_empty() {
            null_count += 1;
            continue;
        }
        value_count += 1;
        let display = value.to_string();
        if sample_values.len() < SAMPLE_SIZE {
            sample_values.push(display.clone());
        }
        seen.insert(display);
    }

    ColumnProfile {
        name: name.to_string(),
        data_type: detect_column_type(table.column_values(name)),
        sample_values,
        value_count,
        null_count,
        unique_count: seen.len(),
        has_duplicates: seen.len() < value_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table(columns: &[&str], rows: Vec<Vec<CellValue>>) -> Table {
        Table::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    #[test]
    fn serial_dates_win_over_numbers() {
        let t = table(
            &["d"],
            vec![vec![25570.0.into()], vec![25571.0.into()], vec![25572.0.into()]],
        );
        let c = classify(&t);
        assert_eq!(c.type_of("d"), Some(ColumnType::Date));
        assert_eq!(c.date_columns, vec!["d".to_string()]);
        assert!(c.numeric_columns.is_empty());
    }

    #[test]
    fn mixed_columns() {
        let t = table(
            &["cat", "val", "when", "blank"],
            vec![
                vec!["A".into(), 10.0.into(), "2024-01-01".into(), CellValue::Empty],
                vec!["B".into(), "5".into(), "2024-01-02".into(), "  ".into()],
                vec![CellValue::Empty, 3.0.into(), CellValue::Empty, CellValue::Empty],
            ],
        );
        let c = classify(&t);

        assert_eq!(c.type_of("cat"), Some(ColumnType::Categorical));
        assert_eq!(c.type_of("val"), Some(ColumnType::Numeric));
        assert_eq!(c.type_of("when"), Some(ColumnType::Date));
        assert_eq!(c.type_of("blank"), Some(ColumnType::Empty));
        assert_eq!(c.categorical_columns, vec!["cat".to_string()]);
        assert_eq!(c.numeric_columns, vec!["val".to_string()]);
        assert_eq!(c.date_columns, vec!["when".to_string()]);

        let cat = &c.columns[0];
        assert_eq!(cat.null_count, 1);
        assert_eq!(cat.unique_count, 2);
        assert!(!cat.has_duplicates);
    }

    #[test]
    fn loose_numeric_prefix_is_categorical() {
        let t = table(&["code"], vec![vec!["42abc".into()], vec!["7".into()]]);
        assert_eq!(classify(&t).type_of("code"), Some(ColumnType::Categorical));
    }

    #[test]
    fn small_integers_stay_numeric() {
        let t = table(&["qty"], vec![vec![1.0.into()], vec![250.0.into()]]);
        assert_eq!(classify(&t).type_of("qty"), Some(ColumnType::Numeric));
    }

    #[test]
    fn bad_cell_does_not_leak_into_other_columns() {
        let t = table(
            &["val", "other"],
            vec![
                vec!["not a number".into(), 1.0.into()],
                vec![2.0.into(), 2.0.into()],
            ],
        );
        let c = classify(&t);
        assert_eq!(c.type_of("val"), Some(ColumnType::Categorical));
        assert_eq!(c.type_of("other"), Some(ColumnType::Numeric));
    }

    #[test]
    fn empty_table_has_empty_columns() {
        let c = classify(&table(&["a"], vec![]));
        assert_eq!(c.type_of("a"), Some(ColumnType::Empty));
        assert!(c.numeric_columns.is_empty());
    }
}
