pub mod aggregator;
pub mod charts;
pub mod classifier;
pub mod filters;
pub mod kpis;
pub mod templates;
pub mod types;
pub mod utils;

use std::collections::BTreeMap;

use serde::Serialize;

pub use aggregator::aggregate;
pub use charts::{build_chart, select_charts, ChartSelection};
pub use classifier::classify;
pub use filters::{apply_filters, filter_options, FilterOption, FilterState};
pub use kpis::{chart_insights, extract_kpis, split_headline, KpiReport};
pub use templates::{DashboardTemplate, KpiCard, PlacedChart, TemplateView};
pub use types::*;

use crate::config::Config;
use crate::error::{DashboardError, Result};

/// Everything the rendering layer needs for one table snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dashboard {
    pub row_count: usize,
    pub column_types: BTreeMap<String, ColumnType>,
    pub columns: Vec<ColumnProfile>,
    pub charts: Vec<ChartSpec>,
    pub headline_kpi: Option<Kpi>,
    /// Remaining KPIs; the headline one is not repeated here.
    pub kpis: Vec<Kpi>,
    pub insights: Vec<Insight>,
    pub notices: Vec<String>,
    pub filter_options: Vec<FilterOption>,
}

impl Dashboard {
    /// Runs the pipeline on a freshly loaded table. An empty table means the
    /// upload had nothing usable and is refused instead of rendering an empty board.
    pub fn build(table: &Table, config: &Config) -> Result<Self> {
        if table.is_empty() {
            return Err(DashboardError::NoUsableData(
                "the table has no rows".to_string(),
            ));
        }
        if table.columns().is_empty() {
            return Err(DashboardError::NoUsableData(
                "the table has no columns".to_string(),
            ));
        }
        Ok(Self::from_table(table, config))
    }

    /// classify → select charts → extract KPIs and insights. Never fails; an empty
    /// table gives an empty dashboard.
    pub fn from_table(table: &Table, config: &Config) -> Self {
        let start = std::time::Instant::now();

        let classification = classify(table);
        let selection = select_charts(table, &classification, config);
        let mut report = extract_kpis(table, &classification, config);
        report
            .insights
            .extend(chart_insights(&selection.charts, &config.locale.currency));
        let headline_kpi = split_headline(&mut report.kpis, config);
        let filter_options = filter_options(table, &classification, &config.locale.date_format);

        tracing::info!(
            "Dashboard built in {:?}: {} rows, {} charts, {} KPIs, {} insights",
            start.elapsed(),
            table.row_count(),
            selection.charts.len(),
            report.kpis.len() + usize::from(headline_kpi.is_some()),
            report.insights.len()
        );

        Dashboard {
            row_count: table.row_count(),
            column_types: classification.column_types(),
            columns: classification.columns,
            charts: selection.charts,
            headline_kpi,
            kpis: report.kpis,
            insights: report.insights,
            notices: selection.notices,
            filter_options,
        }
    }

    /// Chart generated for `label_column` × `value_column` from a `requested` shape,
    /// whatever it finally renders as.
    pub fn find_chart(&self, label_column: &str, value_column: &str, requested: ChartKind) -> Option<&ChartSpec> {
        self.charts.iter().find(|chart| {
            chart.label_column == label_column
                && chart.value_column == value_column
                && chart.requested_kind == requested
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_is_refused_but_derivations_are_empty() {
        let table = Table::new(vec!["a".to_string()], vec![]);
        let config = Config::default();

        assert!(matches!(
            Dashboard::build(&table, &config),
            Err(DashboardError::NoUsableData(_))
        ));

        let board = Dashboard::from_table(&table, &config);
        assert!(board.charts.is_empty());
        assert!(board.kpis.is_empty());
        assert!(board.headline_kpi.is_none());
        assert!(board.insights.is_empty());
    }

    #[test]
    fn find_chart_uses_requested_kind() {
        let table = Table::new(
            vec!["Produto".to_string(), "Vendas".to_string()],
            vec![
                vec!["A".into(), 1.0.into()],
                vec!["B".into(), 2.0.into()],
            ],
        );
        let board = Dashboard::build(&table, &Config::default()).unwrap();
        let chart = board.find_chart("Produto", "Vendas", ChartKind::Pie).unwrap();
        assert_eq!(chart.kind, ChartKind::Pie);
        assert!(board.find_chart("Produto", "Vendas", ChartKind::Line).is_none());
        assert_eq!(board.headline_kpi.as_ref().map(|k| k.title.as_str()), Some("Total de Vendas"));
    }
}
