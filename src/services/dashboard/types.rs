use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;

use super::utils::{format_number, parse_number_str};

pub const SAMPLE_SIZE: usize = 3;

/// Label used for blank cells once they are grouped or filtered on.
pub const MISSING_LABEL: &str = "N/A";

/// A raw cell, resolved once when the table is ingested.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

impl CellValue {
    /// Blank and whitespace-only text collapses to `Empty`.
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value)
        }
    }

    /// Resolves raw text from a file: blanks are `Empty`, whole-string numbers are
    /// `Number`, everything else stays `Text`.
    pub fn parse(raw: &str) -> Self {
        match parse_number_str(raw) {
            Some(n) => CellValue::Number(n),
            None => CellValue::text(raw),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::text(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::text(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Empty, Into::into)
    }
}

impl From<&serde_json::Value> for CellValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => CellValue::Empty,
            serde_json::Value::Number(n) => n.as_f64().map_or(CellValue::Empty, CellValue::Number),
            serde_json::Value::String(s) => CellValue::parse(s),
            serde_json::Value::Bool(b) => CellValue::Text(b.to_string()),
            other => CellValue::Text(other.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => f.write_str(&format_number(*n)),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Empty => Ok(()),
        }
    }
}

/// Column names plus rows of cells aligned with them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Rows shorter than the header are padded with `Empty`; longer rows are cut.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Builds a table from JSON-like records. The column set is the key set of the
    /// first record; keys only present in later records are ignored.
    pub fn from_records(records: &[serde_json::Map<String, serde_json::Value>]) -> Self {
        let columns: Vec<String> = records
            .first()
            .map(|first| first.keys().cloned().collect())
            .unwrap_or_default();

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|column| record.get(column).map_or(CellValue::Empty, CellValue::from))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Every cell of a column, top to bottom. Unknown columns yield nothing.
    pub fn column_values<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a CellValue> + 'a {
        let idx = self.column_index(name);
        self.rows
            .iter()
            .filter_map(move |row| idx.and_then(|i| row.get(i)))
    }

    /// Same columns, only the rows the predicate keeps.
    pub fn retain_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&[CellValue]) -> bool,
    {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|row| keep(row)).cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Numeric,
    Date,
    Categorical,
    Empty,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Numeric => "numeric",
            ColumnType::Date => "date",
            ColumnType::Categorical => "categorical",
            ColumnType::Empty => "empty",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub data_type: ColumnType,
    pub sample_values: SmallVec<[String; SAMPLE_SIZE]>,
    pub value_count: usize,
    pub null_count: usize,
    pub unique_count: usize,
    pub has_duplicates: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Classification {
    pub columns: Vec<ColumnProfile>,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub date_columns: Vec<String>,
}

impl Classification {
    pub fn type_of(&self, column: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|profile| profile.name == column)
            .map(|profile| profile.data_type)
    }

    pub fn column_types(&self) -> BTreeMap<String, ColumnType> {
        self.columns
            .iter()
            .map(|profile| (profile.name.clone(), profile.data_type))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregation {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl Aggregation {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Highest aggregate, first one wins on ties.
    pub fn top(&self) -> Option<(&str, f64)> {
        top_entry(&self.labels, &self.values)
    }
}

fn top_entry<'a>(labels: &'a [String], values: &[f64]) -> Option<(&'a str, f64)> {
    labels
        .iter()
        .zip(values.iter().copied())
        .fold(None, |best: Option<(&str, f64)>, (label, value)| match best {
            Some((_, best_value)) if best_value >= value => best,
            _ => Some((label.as_str(), value)),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Pie,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
            ChartKind::Pie => "pie",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    /// Shape the chart renders as.
    pub kind: ChartKind,
    /// Shape the selector asked for before small-cardinality correction.
    pub requested_kind: ChartKind,
    pub title: String,
    pub label_column: String,
    pub value_column: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub tooltip: String,
}

impl ChartSpec {
    /// Label with the highest value, first one wins on ties.
    pub fn top(&self) -> Option<(&str, f64)> {
        top_entry(&self.labels, &self.values)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KpiKind {
    Total,
    Average,
    Max,
    Min,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpi {
    pub title: String,
    pub source_column: String,
    pub formatted_value: String,
    pub raw_value: f64,
    pub kind: KpiKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub associated_category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insight {
    pub icon: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn records_take_columns_from_first_row() {
        let records: Vec<serde_json::Map<String, serde_json::Value>> = vec![
            json!({"a": 1, "b": "x"}).as_object().unwrap().clone(),
            json!({"a": null, "c": 3}).as_object().unwrap().clone(),
        ];
        let table = Table::from_records(&records);

        assert_eq!(table.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(table.rows()[1], vec![CellValue::Empty, CellValue::Empty]);
        assert_eq!(table.rows()[0][0], CellValue::Number(1.0));
    }

    #[test]
    fn blank_text_is_empty() {
        assert_eq!(CellValue::from("   "), CellValue::Empty);
        assert_eq!(CellValue::from(Some("x")), CellValue::Text("x".into()));
        assert_eq!(CellValue::from(None::<f64>), CellValue::Empty);
    }

    #[test]
    fn numeric_text_resolves_to_number_on_ingestion() {
        assert_eq!(CellValue::parse(" 10.50 "), CellValue::Number(10.5));
        assert_eq!(CellValue::parse("42abc"), CellValue::Text("42abc".into()));
        assert_eq!(CellValue::parse(""), CellValue::Empty);
        assert_eq!(CellValue::from(&json!("45306")), CellValue::Number(45306.0));
        assert_eq!(CellValue::Number(1e21).to_string(), "1e+21");
    }

    #[test]
    fn top_keeps_first_of_ties() {
        let agg = Aggregation {
            labels: vec!["a".into(), "b".into(), "c".into()],
            values: vec![2.0, 5.0, 5.0],
        };
        assert_eq!(agg.top(), Some(("b", 5.0)));
        assert_eq!(Aggregation::default().top(), None);
    }
}
