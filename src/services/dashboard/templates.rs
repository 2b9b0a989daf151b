use serde::{Deserialize, Serialize};

use super::types::{ChartKind, ChartSpec, Kpi, KpiKind};
use super::Dashboard;

/// Shown in a KPI card whose column produced no KPI.
pub const NOT_AVAILABLE: &str = "N/D";

pub const DEFAULT_TEMPLATE: &str = "default";

fn default_kpi_kind() -> KpiKind {
    KpiKind::Total
}

/// A named KPI card filled from the KPI of `column`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiSlot {
    pub title: String,
    pub column: String,
    #[serde(default = "default_kpi_kind")]
    pub kind: KpiKind,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

/// A chart placement matched by label column, value column and requested shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSlot {
    pub id: String,
    pub label_column: String,
    pub value_column: String,
    pub kind: ChartKind,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardTemplate {
    pub name: String,
    #[serde(default)]
    pub kpis: Vec<KpiSlot>,
    #[serde(default)]
    pub main_kpi: Option<KpiSlot>,
    #[serde(default)]
    pub charts: Vec<ChartSlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiCard {
    pub title: String,
    /// Formatted KPI value, or [`NOT_AVAILABLE`].
    pub value: String,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub kpi: Option<Kpi>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedChart {
    pub slot_id: String,
    pub title: String,
    pub chart: ChartSpec,
}

/// A dashboard laid out by a template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateView {
    pub template: String,
    pub kpi_cards: Vec<KpiCard>,
    pub main_kpi: Option<KpiCard>,
    /// Only slots with a matching chart; unmatched slots are left out.
    pub charts: Vec<PlacedChart>,
}

fn kpi_slot(title: &str, column: &str, color: Option<&str>, icon: Option<&str>) -> KpiSlot {
    KpiSlot {
        title: title.to_string(),
        column: column.to_string(),
        kind: KpiKind::Total,
        color: color.map(str::to_string),
        icon: icon.map(str::to_string),
    }
}

fn chart_slot(id: &str, label: &str, value: &str, kind: ChartKind, title: Option<&str>) -> ChartSlot {
    ChartSlot {
        id: id.to_string(),
        label_column: label.to_string(),
        value_column: value.to_string(),
        kind,
        title: title.map(str::to_string),
    }
}

impl DashboardTemplate {
    /// Sales follow-up layout: four KPI cards, a large quantity card and five charts.
    pub fn acompanhamento_vendas() -> Self {
        Self {
            name: "acompanhamento_vendas".to_string(),
            kpis: vec![
                kpi_slot("Faturamento", "Faturamento", Some("#FF6384"), Some("💰")),
                kpi_slot("Custo", "Custo", Some("#36A2EB"), Some("💸")),
                kpi_slot("Lucro", "Lucro", Some("rgb(57, 181, 74)"), Some("📈")),
                kpi_slot("Ticket Médio", "Ticket Médio", Some("#FFCE56"), Some("🎟️")),
            ],
            main_kpi: Some(kpi_slot("Quantidade", "Quantidade", Some("rgb(57, 181, 74)"), Some("📦"))),
            charts: vec![
                chart_slot("faturamento-mensal-chart", "Mês", "Faturamento", ChartKind::Line, Some("FATURAMENTO MENSAL")),
                chart_slot("top10-clientes-chart", "Cliente", "Faturamento", ChartKind::Bar, Some("TOP 10 FATURAMENTO CLIENTES")),
                chart_slot("faturamento-vendedor-chart", "Vendedor", "Faturamento", ChartKind::Bar, Some("FATURAMENTO POR VENDEDOR")),
                chart_slot("canal-vendas-chart", "Canal de Vendas", "Vendas", ChartKind::Pie, Some("CANAL DE VENDAS")),
                chart_slot("top10-produtos-chart", "Produto", "Faturamento", ChartKind::Bar, Some("TOP 10 FATURAMENTO PRODUTOS")),
            ],
        }
    }

    pub fn default_layout() -> Self {
        Self {
            name: DEFAULT_TEMPLATE.to_string(),
            kpis: vec![
                kpi_slot("Total de Vendas", "Vendas", None, None),
                kpi_slot("Total de Custo", "Custo", None, None),
            ],
            main_kpi: None,
            charts: vec![
                chart_slot("faturamento-mensal-chart", "Data", "Vendas", ChartKind::Line, None),
                chart_slot("top10-clientes-chart", "Produto", "Vendas", ChartKind::Bar, None),
                chart_slot("canal-vendas-chart", "Regiao", "Vendas", ChartKind::Pie, None),
            ],
        }
    }

    pub fn built_in() -> Vec<Self> {
        vec![Self::acompanhamento_vendas(), Self::default_layout()]
    }

    /// Adds `extra` templates, replacing built-ins with the same name.
    pub fn merge(mut templates: Vec<Self>, extra: Vec<Self>) -> Vec<Self> {
        for template in extra {
            match templates.iter_mut().find(|t| t.name == template.name) {
                Some(existing) => *existing = template,
                None => templates.push(template),
            }
        }
        templates
    }
}

fn card(slot: &KpiSlot, kpi: Option<&Kpi>) -> KpiCard {
    KpiCard {
        title: slot.title.clone(),
        value: kpi.map_or_else(|| NOT_AVAILABLE.to_string(), |k| k.formatted_value.clone()),
        color: slot.color.clone(),
        icon: slot.icon.clone(),
        kpi: kpi.cloned(),
    }
}

impl Dashboard {
    /// KPI of `kind` computed over `column`, the headline included.
    pub fn find_kpi(&self, column: &str, kind: KpiKind) -> Option<&Kpi> {
        self.headline_kpi
            .iter()
            .chain(&self.kpis)
            .find(|kpi| kpi.source_column == column && kpi.kind == kind)
    }

    pub fn apply_template(&self, template: &DashboardTemplate) -> TemplateView {
        let kpi_cards = template
            .kpis
            .iter()
            .map(|slot| card(slot, self.find_kpi(&slot.column, slot.kind)))
            .collect();
        let main_kpi = template
            .main_kpi
            .as_ref()
            .map(|slot| card(slot, self.find_kpi(&slot.column, slot.kind)));

        let charts: Vec<PlacedChart> = template
            .charts
            .iter()
            .filter_map(|slot| {
                let chart = self.find_chart(&slot.label_column, &slot.value_column, slot.kind)?;
                Some(PlacedChart {
                    slot_id: slot.id.clone(),
                    title: slot.title.clone().unwrap_or_else(|| chart.title.clone()),
                    chart: chart.clone(),
                })
            })
            .collect();

        tracing::debug!(
            "Template '{}' placed {} of {} charts",
            template.name,
            charts.len(),
            template.charts.len()
        );

        TemplateView {
            template: template.name.clone(),
            kpi_cards,
            main_kpi,
            charts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::services::dashboard::types::{CellValue, Table};
    use pretty_assertions::assert_eq;

    fn sales_board() -> Dashboard {
        let table = Table::new(
            vec!["Data".to_string(), "Regiao".to_string(), "Vendas".to_string()],
            vec![
                vec![CellValue::Number(45306.0), "Sul".into(), 10.0.into()],
                vec![CellValue::Number(45307.0), "Norte".into(), 20.0.into()],
                vec![CellValue::Number(45307.0), "Sul".into(), 5.0.into()],
            ],
        );
        Dashboard::build(&table, &Config::default()).unwrap()
    }

    #[test]
    fn default_layout_fills_matching_slots() {
        let view = sales_board().apply_template(&DashboardTemplate::default_layout());

        assert_eq!(view.template, "default");
        assert_eq!(view.kpi_cards[0].title, "Total de Vendas");
        assert_eq!(view.kpi_cards[0].value, "R$\u{a0}35,00");
        assert!(view.kpi_cards[0].kpi.is_some());

        let slots: Vec<(&str, ChartKind)> = view
            .charts
            .iter()
            .map(|p| (p.slot_id.as_str(), p.chart.kind))
            .collect();
        assert_eq!(
            slots,
            vec![
                ("faturamento-mensal-chart", ChartKind::Line),
                ("canal-vendas-chart", ChartKind::Pie),
            ]
        );
        assert_eq!(view.charts[0].title, "Vendas por Data");
    }

    #[test]
    fn missing_kpi_column_shows_not_available() {
        let view = sales_board().apply_template(&DashboardTemplate::default_layout());
        assert_eq!(view.kpi_cards[1].title, "Total de Custo");
        assert_eq!(view.kpi_cards[1].value, NOT_AVAILABLE);
        assert!(view.kpi_cards[1].kpi.is_none());
        assert!(view.main_kpi.is_none());
    }

    #[test]
    fn sales_template_keeps_slot_titles_and_main_card() {
        let view = sales_board().apply_template(&DashboardTemplate::acompanhamento_vendas());
        assert!(view.kpi_cards.iter().all(|c| c.value == NOT_AVAILABLE));
        let main = view.main_kpi.unwrap();
        assert_eq!(main.title, "Quantidade");
        assert_eq!(main.icon.as_deref(), Some("📦"));
        assert!(view.charts.is_empty());
    }

    #[test]
    fn custom_templates_replace_by_name() {
        let custom: Vec<DashboardTemplate> = serde_json::from_str(
            r#"[{"name": "default", "kpis": [{"title": "Maior venda", "column": "Vendas", "kind": "max"}]},
                {"name": "regional", "charts": [{"id": "r", "label_column": "Regiao", "value_column": "Vendas", "kind": "pie"}]}]"#,
        )
        .unwrap();
        let templates = DashboardTemplate::merge(DashboardTemplate::built_in(), custom);
        assert_eq!(templates.len(), 3);

        let board = sales_board();
        let default = templates.iter().find(|t| t.name == "default").unwrap();
        let view = board.apply_template(default);
        assert_eq!(view.kpi_cards[0].value, "R$\u{a0}20,00");
        assert!(view.charts.is_empty());

        let regional = templates.iter().find(|t| t.name == "regional").unwrap();
        assert_eq!(board.apply_template(regional).charts[0].title, "Vendas por Regiao");
    }
}
