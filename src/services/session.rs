use crate::config::Config;
use crate::error::{DashboardError, Result};
use crate::services::dashboard::{
    apply_filters, classify, filter_options, Dashboard, FilterState, Table, TemplateView,
};
use crate::services::file_loader::Sheet;

/// The one active spreadsheet plus its filter state. Every change re-derives the
/// dashboard from scratch; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct DashboardSession {
    config: Config,
    sheets: Vec<Sheet>,
    active: usize,
    filters: FilterState,
}

impl DashboardSession {
    /// Refuses input without a single usable sheet, so a failed upload never
    /// leaves a half-built session behind.
    pub fn new(sheets: Vec<Sheet>, config: Config) -> Result<Self> {
        let sheets: Vec<Sheet> = sheets
            .into_iter()
            .filter(|sheet| !sheet.table.is_empty())
            .collect();
        if sheets.is_empty() {
            return Err(DashboardError::NoUsableData(
                "no sheet has data rows".to_string(),
            ));
        }

        tracing::info!(
            "Session started with {} sheet(s), active sheet '{}'",
            sheets.len(),
            sheets[0].name
        );
        Ok(Self {
            config,
            sheets,
            active: 0,
            filters: FilterState::new(),
        })
    }

    pub fn from_table(name: &str, table: Table, config: Config) -> Result<Self> {
        Self::new(
            vec![Sheet {
                name: name.to_string(),
                table,
            }],
            config,
        )
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|sheet| sheet.name.as_str()).collect()
    }

    pub fn active_sheet(&self) -> &Sheet {
        &self.sheets[self.active]
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    /// Switching sheets drops every filter.
    pub fn switch_sheet(&mut self, name: &str) -> Result<()> {
        let idx = self
            .sheets
            .iter()
            .position(|sheet| sheet.name == name)
            .ok_or_else(|| DashboardError::UnknownSheet(name.to_string()))?;

        self.active = idx;
        self.filters.clear();
        tracing::info!("Switched to sheet '{}'", name);
        Ok(())
    }

    /// Click on a chart segment: filter by it, or clear it if it was already active.
    pub fn toggle_filter(&mut self, column: &str, value: &str) -> bool {
        self.filters.toggle(column, value)
    }

    pub fn select_filter(&mut self, column: &str, value: Option<&str>) {
        self.filters.select(column, value);
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        tracing::info!("All filters cleared");
    }

    /// Active sheet narrowed by the current filters.
    pub fn filtered_table(&self) -> Table {
        apply_filters(
            &self.active_sheet().table,
            &self.filters,
            &self.config.locale.date_format,
        )
    }

    /// Dashboard for the filtered rows. Filter choices always come from the whole
    /// sheet so a filtered-out value can still be picked.
    pub fn dashboard(&self) -> Dashboard {
        let full = &self.active_sheet().table;
        let filtered = self.filtered_table();
        let mut dashboard = Dashboard::from_table(&filtered, &self.config);

        if !self.filters.is_empty() {
            dashboard.filter_options =
                filter_options(full, &classify(full), &self.config.locale.date_format);
        }
        dashboard
    }

    /// Current dashboard laid out by the named template, or the configured default.
    pub fn template_view(&self, name: Option<&str>) -> Result<TemplateView> {
        let name = name.unwrap_or(&self.config.default_template);
        let template = self
            .config
            .template(name)
            .ok_or_else(|| DashboardError::InvalidInput(format!("Unknown template: {}", name)))?;
        Ok(self.dashboard().apply_template(template))
    }
}
