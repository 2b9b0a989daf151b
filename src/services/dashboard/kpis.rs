use serde::Serialize;

use super::types::*;
use super::utils::parse_number;
use crate::config::{Config, CurrencyFormat};

const ICON_MAX: &str = "fas fa-award";
const ICON_MIN: &str = "fas fa-caret-down";
const ICON_TOP_CATEGORY: &str = "fas fa-trophy";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KpiReport {
    pub kpis: Vec<Kpi>,
    pub insights: Vec<Insight>,
}

/// Running statistics for one numeric column. Extremum rows are kept so the
/// representative category can be read afterwards.
#[derive(Debug, Clone, Copy)]
struct ColumnStats {
    sum: f64,
    count: usize,
    max: f64,
    max_row: Option<usize>,
    min: f64,
    min_row: Option<usize>,
}

impl Default for ColumnStats {
    fn default() -> Self {
        Self {
            sum: 0.0,
            count: 0,
            max: f64::NEG_INFINITY,
            max_row: None,
            min: f64::INFINITY,
            min_row: None,
        }
    }
}

impl ColumnStats {
    fn collect(table: &Table, column_idx: usize) -> Self {
        let mut stats = Self::default();
        for (row_idx, row) in table.rows().iter().enumerate() {
            let Some(value) = parse_number(&row[column_idx]) else {
                continue;
            };
            stats.sum += value;
            stats.count += 1;
            if value > stats.max {
                stats.max = value;
                stats.max_row = Some(row_idx);
            }
            if value < stats.min {
                stats.min = value;
                stats.min_row = Some(row_idx);
            }
        }
        stats
    }
}

fn kpi(
    kind: KpiKind,
    column: &str,
    value: f64,
    currency: &CurrencyFormat,
    associated_category: Option<String>,
) -> Kpi {
    let title = match kind {
        KpiKind::Total => format!("Total de {}", column),
        KpiKind::Average => format!("Média de {}", column),
        KpiKind::Max => format!("Máximo de {}", column),
        KpiKind::Min => format!("Mínimo de {}", column),
    };
    Kpi {
        title,
        source_column: column.to_string(),
        formatted_value: currency.format(value),
        raw_value: value,
        kind,
        associated_category,
    }
}

/// Display value of the representative column on `row`, if that cell is filled in.
fn category_at(table: &Table, category_idx: Option<usize>, row: Option<usize>) -> Option<String> {
    let (category_idx, row) = (category_idx?, row?);
    let cell = table.rows().get(row)?.get(category_idx)?;
    (!cell.is_empty()).then(|| cell.to_string())
}

/// Total, average, max and min for every numeric column, plus the extremum insights.
pub fn extract_kpis(table: &Table, classification: &Classification, config: &Config) -> KpiReport {
    let currency = &config.locale.currency;
    let mut report = KpiReport::default();

    let representative = config
        .representative_hints
        .first_match(&classification.categorical_columns);
    let representative_idx = representative.and_then(|name| table.column_index(name));

    for column in &classification.numeric_columns {
        let Some(column_idx) = table.column_index(column) else {
            continue;
        };
        let stats = ColumnStats::collect(table, column_idx);
        if stats.count == 0 {
            tracing::debug!("Column '{}' has no valid numbers, no KPIs emitted", column);
            continue;
        }

        report.kpis.push(kpi(KpiKind::Total, column, stats.sum, currency, None));
        report.kpis.push(kpi(
            KpiKind::Average,
            column,
            stats.sum / stats.count as f64,
            currency,
            None,
        ));

        if stats.max.is_finite() {
            let category = category_at(table, representative_idx, stats.max_row);
            if let Some(category) = &category {
                report.insights.push(Insight {
                    icon: ICON_MAX.to_string(),
                    text: format!(
                        "O maior valor de {} foi {} em \"{}\".",
                        column,
                        currency.format(stats.max),
                        category
                    ),
                });
            }
            report.kpis.push(kpi(KpiKind::Max, column, stats.max, currency, category));
        }

        if stats.min.is_finite() {
            let category = category_at(table, representative_idx, stats.min_row);
            if let Some(category) = &category {
                report.insights.push(Insight {
                    icon: ICON_MIN.to_string(),
                    text: format!(
                        "O menor valor de {} foi {} em \"{}\".",
                        column,
                        currency.format(stats.min),
                        category
                    ),
                });
            }
            report.kpis.push(kpi(KpiKind::Min, column, stats.min, currency, category));
        }
    }

    report
}

/// One insight per bar/pie chart naming its top category, when that total is positive.
pub fn chart_insights(charts: &[ChartSpec], currency: &CurrencyFormat) -> Vec<Insight> {
    charts
        .iter()
        .filter(|chart| chart.kind != ChartKind::Line)
        .filter_map(|chart| {
            let (label, total) = chart.top()?;
            (total > 0.0).then(|| Insight {
                icon: ICON_TOP_CATEGORY.to_string(),
                text: format!(
                    "A categoria de {} com maior {} é \"{}\", totalizando {}.",
                    chart.label_column,
                    chart.value_column,
                    label,
                    currency.format(total)
                ),
            })
        })
        .collect()
}

/// Removes and returns the headline KPI: a sales-like total, else any total,
/// else the first KPI.
pub fn split_headline(kpis: &mut Vec<Kpi>, config: &Config) -> Option<Kpi> {
    let is_total = |k: &Kpi| k.kind == KpiKind::Total;
    let position = kpis
        .iter()
        .position(|k| is_total(k) && config.headline_keywords.matches(&k.title))
        .or_else(|| kpis.iter().position(is_total))
        .or_else(|| (!kpis.is_empty()).then_some(0))?;
    Some(kpis.remove(position))
}
