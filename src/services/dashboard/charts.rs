use std::collections::HashSet;
use std::ops::RangeInclusive;

use serde::Serialize;

use super::aggregator::aggregate;
use super::types::*;
use crate::config::Config;

/// A requested bar chart with this many labels renders as a pie instead.
pub const PROMOTE_TO_PIE: RangeInclusive<usize> = 2..=7;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSelection {
    pub charts: Vec<ChartSpec>,
    /// Charts that were considered but dropped, in human readable form.
    pub notices: Vec<String>,
}

pub fn chart_title(value_column: &str, label_column: &str) -> String {
    format!("{} por {}", value_column, label_column)
}

/// Shape for a categorical chart with `label_count` distinct labels, or `None`
/// when there are too many categories to draw legibly.
pub fn shape_for_cardinality(label_count: usize, config: &Config) -> Option<ChartKind> {
    if label_count > 1 && label_count <= config.pie_max_categories {
        Some(ChartKind::Pie)
    } else if label_count <= config.bar_max_categories {
        Some(ChartKind::Bar)
    } else {
        None
    }
}

/// Small-cardinality bars read better as proportions.
pub fn resolve_kind(requested: ChartKind, label_count: usize) -> ChartKind {
    match requested {
        ChartKind::Bar if PROMOTE_TO_PIE.contains(&label_count) => ChartKind::Pie,
        other => other,
    }
}

fn tooltip(kind: ChartKind, label_column: &str, value_column: &str) -> String {
    let hint = match kind {
        ChartKind::Line => "Ideal para analisar tendências ao longo do tempo.",
        ChartKind::Bar => "Utilize para comparar valores entre diferentes categorias.",
        ChartKind::Pie => "Mostra a proporção de cada categoria em relação ao total.",
    };
    format!(
        "Este gráfico exibe \"{}\" agrupado por \"{}\". {}",
        value_column, label_column, hint
    )
}

fn chart_from_aggregation(
    aggregation: Aggregation,
    label_column: &str,
    value_column: &str,
    requested: ChartKind,
) -> ChartSpec {
    let kind = resolve_kind(requested, aggregation.len());
    ChartSpec {
        kind,
        requested_kind: requested,
        title: chart_title(value_column, label_column),
        label_column: label_column.to_string(),
        value_column: value_column.to_string(),
        labels: aggregation.labels,
        values: aggregation.values,
        tooltip: tooltip(kind, label_column, value_column),
    }
}

/// Aggregates `value_column` by `label_column` into a chart of the requested shape,
/// applying the small-cardinality correction.
pub fn build_chart(
    table: &Table,
    label_column: &str,
    value_column: &str,
    requested: ChartKind,
    config: &Config,
) -> ChartSpec {
    let aggregation = aggregate(table, label_column, value_column, &config.locale.date_format);
    chart_from_aggregation(aggregation, label_column, value_column, requested)
}

/// Line charts first, then everything by title.
pub fn sort_charts(charts: &mut [ChartSpec]) {
    charts.sort_by(|a, b| {
        (a.kind != ChartKind::Line)
            .cmp(&(b.kind != ChartKind::Line))
            .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
            .then_with(|| a.title.cmp(&b.title))
    });
}

struct Selector<'a> {
    table: &'a Table,
    config: &'a Config,
    generated: HashSet<(String, String, ChartKind)>,
    selection: ChartSelection,
}

impl<'a> Selector<'a> {
    fn push(&mut self, chart: ChartSpec) {
        let key = (
            chart.label_column.clone(),
            chart.value_column.clone(),
            chart.requested_kind,
        );
        if self.generated.insert(key) {
            self.selection.charts.push(chart);
        }
    }

    fn already_generated(&self, label: &str, value: &str, kind: ChartKind) -> bool {
        self.generated
            .contains(&(label.to_string(), value.to_string(), kind))
    }

    fn temporal(&mut self, date_columns: &[&str], numeric_columns: &[String]) {
        for &label in date_columns {
            for value in numeric_columns {
                if self.already_generated(label, value, ChartKind::Line) {
                    continue;
                }
                let chart = build_chart(self.table, label, value, ChartKind::Line, self.config);
                self.push(chart);
            }
        }
    }

    fn categorical(&mut self, label_columns: &[&str], numeric_columns: &[String]) {
        for &label in label_columns {
            for value in numeric_columns {
                let aggregation =
                    aggregate(self.table, label, value, &self.config.locale.date_format);
                if aggregation.is_empty() {
                    continue;
                }

                let label_count = aggregation.len();
                let Some(requested) = shape_for_cardinality(label_count, self.config) else {
                    tracing::warn!(
                        "Column '{}' has too many categories ({}) to chart '{}'",
                        label,
                        label_count,
                        value
                    );
                    self.selection.notices.push(format!(
                        "Coluna '{}' tem muitas categorias ({}). O gráfico de '{}' não foi gerado.",
                        label, label_count, value
                    ));
                    continue;
                };

                if self.already_generated(label, value, requested) {
                    continue;
                }
                self.push(chart_from_aggregation(aggregation, label, value, requested));
            }
        }
    }
}

/// Picks the (label, value) pairs worth charting, shapes and orders them.
pub fn select_charts(table: &Table, classification: &Classification, config: &Config) -> ChartSelection {
    let mut selector = Selector {
        table,
        config,
        generated: HashSet::new(),
        selection: ChartSelection::default(),
    };

    if classification.numeric_columns.is_empty() {
        tracing::debug!("No numeric columns, no charts to select");
        return selector.selection;
    }

    let mut date_columns = config.date_hints.rank(&classification.date_columns);
    if date_columns.is_empty() {
        date_columns.extend(classification.date_columns.first().map(String::as_str));
    }
    selector.temporal(&date_columns, &classification.numeric_columns);

    let mut category_columns = config.category_hints.rank(&classification.categorical_columns);
    if category_columns.is_empty() {
        category_columns = classification
            .categorical_columns
            .iter()
            .map(String::as_str)
            .collect();
    }
    selector.categorical(&category_columns, &classification.numeric_columns);

    let mut selection = selector.selection;
    sort_charts(&mut selection.charts);

    tracing::debug!(
        "Selected {} charts ({} suppressed)",
        selection.charts.len(),
        selection.notices.len()
    );
    selection
}
