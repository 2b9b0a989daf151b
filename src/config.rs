use std::str::FromStr;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use regex::Regex;

use crate::services::dashboard::templates::{DashboardTemplate, DEFAULT_TEMPLATE};

fn default_max_file_size() -> usize {
    // 10 MB in bytes
    10 * 1024 * 1024
}

const DEFAULT_LOG_FILTER: &str = "info";

const DEFAULT_PIE_MAX: usize = 10;
const DEFAULT_BAR_MAX: usize = 25;

const DEFAULT_DATE_COLUMNS: &[&str] = &[
    "Data",
    "DATA DE CARREGAMENTO",
    "Data do Pedido",
    "Data de Expedição",
];

const DEFAULT_CATEGORY_COLUMNS: &[&str] = &[
    "RESP.CARREG",
    "MOTORISTA",
    "ESTADO",
    "NOME.CLIENTE",
    "FORMA DE ENVIO",
    "PRODUTO",
    "ITEM",
];

const DEFAULT_REPRESENTATIVE_COLUMNS: &[&str] = &["produto", "nome.cliente", "item"];

const DEFAULT_HEADLINE_KEYWORDS: &[&str] = &["venda", "faturamento", "receita", "sales", "revenue"];

/// A single column-name predicate.
#[derive(Debug, Clone)]
pub enum ColumnHint {
    /// Whole name, compared case-insensitively after trimming.
    Exact(String),
    /// Lowercase fragment anywhere in the name.
    Contains(String),
    Pattern(Regex),
}

impl ColumnHint {
    /// Parses `re:<regex>`, `contains:<fragment>` or a plain exact name.
    pub fn parse(entry: &str) -> Result<Self> {
        let entry = entry.trim();
        if let Some(pattern) = entry.strip_prefix("re:") {
            let re = Regex::new(pattern)
                .with_context(|| format!("Invalid column hint pattern: {}", pattern))?;
            Ok(ColumnHint::Pattern(re))
        } else if let Some(fragment) = entry.strip_prefix("contains:") {
            Ok(ColumnHint::Contains(fragment.trim().to_lowercase()))
        } else {
            Ok(ColumnHint::Exact(entry.to_string()))
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            ColumnHint::Exact(expected) => expected.trim().to_lowercase() == name.trim().to_lowercase(),
            ColumnHint::Contains(fragment) => name.to_lowercase().contains(fragment.as_str()),
            ColumnHint::Pattern(re) => re.is_match(name),
        }
    }
}

/// Ranked list of column-name predicates. Earlier hints rank higher.
#[derive(Debug, Clone, Default)]
pub struct ColumnHints(Vec<ColumnHint>);

impl ColumnHints {
    pub fn new(hints: Vec<ColumnHint>) -> Self {
        Self(hints)
    }

    pub fn exact(names: &[&str]) -> Self {
        Self(names.iter().map(|n| ColumnHint::Exact(n.to_string())).collect())
    }

    pub fn contains(fragments: &[&str]) -> Self {
        Self(fragments.iter().map(|f| ColumnHint::Contains(f.to_lowercase())).collect())
    }

    /// Comma separated list of entries accepted by [`ColumnHint::parse`].
    pub fn parse_list(raw: &str) -> Result<Self> {
        raw.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(ColumnHint::parse)
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, name: &str) -> bool {
        self.0.iter().any(|hint| hint.matches(name))
    }

    /// Candidates that match any hint, ordered by the first hint they match.
    pub fn rank<'a>(&self, candidates: &'a [String]) -> Vec<&'a str> {
        let mut ranked: Vec<&'a str> = Vec::new();
        for hint in &self.0 {
            for candidate in candidates {
                if hint.matches(candidate) && !ranked.contains(&candidate.as_str()) {
                    ranked.push(candidate.as_str());
                }
            }
        }
        ranked
    }

    /// First candidate, in candidate order, matching any hint.
    pub fn first_match<'a>(&self, candidates: &'a [String]) -> Option<&'a str> {
        candidates
            .iter()
            .find(|candidate| self.matches(candidate))
            .map(String::as_str)
    }
}

/// Currency rendering used for KPI values, tooltips and insights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyFormat {
    pub symbol: String,
    /// Placed between the symbol and the digits.
    pub symbol_separator: String,
    pub thousands_separator: char,
    pub decimal_separator: char,
    pub decimals: usize,
}

impl CurrencyFormat {
    /// Brazilian Real, `R$ 1.234,56` with a non-breaking space.
    pub fn brl() -> Self {
        Self {
            symbol: "R$".to_string(),
            symbol_separator: "\u{a0}".to_string(),
            thousands_separator: '.',
            decimal_separator: ',',
            decimals: 2,
        }
    }

    /// US dollar, `$1,234.56`.
    pub fn usd() -> Self {
        Self {
            symbol: "$".to_string(),
            symbol_separator: String::new(),
            thousands_separator: ',',
            decimal_separator: '.',
            decimals: 2,
        }
    }

    pub fn format(&self, value: f64) -> String {
        if !value.is_finite() {
            return value.to_string();
        }

        let fixed = format!("{:.*}", self.decimals, value.abs());
        let (int_part, frac_part) = match fixed.split_once('.') {
            Some((int_part, frac_part)) => (int_part, Some(frac_part)),
            None => (fixed.as_str(), None),
        };

        let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
        for (idx, digit) in int_part.chars().enumerate() {
            if idx > 0 && (int_part.len() - idx) % 3 == 0 {
                grouped.push(self.thousands_separator);
            }
            grouped.push(digit);
        }
        if let Some(frac_part) = frac_part {
            grouped.push(self.decimal_separator);
            grouped.push_str(frac_part);
        }

        let is_zero = fixed.chars().all(|c| c == '0' || c == '.');
        let sign = if value < 0.0 && !is_zero { "-" } else { "" };
        format!("{}{}{}{}", sign, self.symbol, self.symbol_separator, grouped)
    }
}

/// Locale-dependent rendering of currency values and calendar dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleFormat {
    pub currency: CurrencyFormat,
    /// `chrono` format string used for Excel serial dates turned into labels.
    pub date_format: String,
}

impl LocaleFormat {
    pub fn pt_br() -> Self {
        Self {
            currency: CurrencyFormat::brl(),
            date_format: "%d/%m/%Y".to_string(),
        }
    }

    pub fn en_us() -> Self {
        Self {
            currency: CurrencyFormat::usd(),
            date_format: "%-m/%-d/%Y".to_string(),
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag.trim().to_lowercase().as_str() {
            "pt-br" | "pt_br" => Ok(Self::pt_br()),
            "en-us" | "en_us" => Ok(Self::en_us()),
            other => Err(anyhow::anyhow!("Unsupported locale: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub max_file_size: usize,
    pub locale: LocaleFormat,
    /// Upper bound (inclusive) of distinct labels for a pie chart.
    pub pie_max_categories: usize,
    /// Upper bound (inclusive) of distinct labels for a bar chart; above it the chart is dropped.
    pub bar_max_categories: usize,
    pub date_hints: ColumnHints,
    pub category_hints: ColumnHints,
    /// Columns whose values name the product/customer behind a KPI extremum.
    pub representative_hints: ColumnHints,
    /// Matched against KPI titles when picking the headline KPI.
    pub headline_keywords: ColumnHints,
    /// Built-in layouts plus any loaded from `DASHBOARD_TEMPLATES_FILE`.
    pub templates: Vec<DashboardTemplate>,
    pub default_template: String,
    /// Tracing directives used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            locale: LocaleFormat::pt_br(),
            pie_max_categories: DEFAULT_PIE_MAX,
            bar_max_categories: DEFAULT_BAR_MAX,
            date_hints: ColumnHints::exact(DEFAULT_DATE_COLUMNS),
            category_hints: ColumnHints::exact(DEFAULT_CATEGORY_COLUMNS),
            representative_hints: ColumnHints::contains(DEFAULT_REPRESENTATIVE_COLUMNS),
            headline_keywords: ColumnHints::contains(DEFAULT_HEADLINE_KEYWORDS),
            templates: DashboardTemplate::built_in(),
            default_template: DEFAULT_TEMPLATE.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        let mut config = Config::default();

        if let Some(tag) = env_var("DASHBOARD_LOCALE") {
            config.locale = LocaleFormat::from_tag(&tag)?;
        }
        config.max_file_size = env_parse("DASHBOARD_MAX_FILE_SIZE", config.max_file_size)?;
        config.pie_max_categories = env_parse("DASHBOARD_PIE_MAX", config.pie_max_categories)?;
        config.bar_max_categories = env_parse("DASHBOARD_BAR_MAX", config.bar_max_categories)?;

        if config.pie_max_categories > config.bar_max_categories {
            return Err(anyhow::anyhow!(
                "DASHBOARD_PIE_MAX ({}) must not exceed DASHBOARD_BAR_MAX ({})",
                config.pie_max_categories,
                config.bar_max_categories
            ));
        }

        if let Some(raw) = env_var("DASHBOARD_DATE_COLUMNS") {
            config.date_hints = ColumnHints::parse_list(&raw)?;
        }
        if let Some(raw) = env_var("DASHBOARD_CATEGORY_COLUMNS") {
            config.category_hints = ColumnHints::parse_list(&raw)?;
        }
        if let Some(raw) = env_var("DASHBOARD_REPRESENTATIVE_COLUMNS") {
            config.representative_hints = ColumnHints::parse_list(&raw)?;
        }
        if let Some(raw) = env_var("DASHBOARD_HEADLINE_KEYWORDS") {
            config.headline_keywords = ColumnHints::parse_list(&raw)?;
        }

        if let Some(path) = env_var("DASHBOARD_TEMPLATES_FILE") {
            let raw = std::fs::read_to_string(path.trim())
                .with_context(|| format!("Failed to read templates file {}", path))?;
            config.templates = load_templates(config.templates, &raw)?;
        }
        if let Some(name) = env_var("DASHBOARD_TEMPLATE") {
            config.default_template = name.trim().to_string();
        }
        if config.template(&config.default_template).is_none() {
            return Err(anyhow::anyhow!(
                "DASHBOARD_TEMPLATE '{}' is not a known template",
                config.default_template
            ));
        }
        if let Some(filter) = env_var("DASHBOARD_LOG") {
            config.log_filter = filter.trim().to_string();
        }

        tracing::debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    pub fn template(&self, name: &str) -> Option<&DashboardTemplate> {
        self.templates.iter().find(|template| template.name == name)
    }
}

/// Parses a JSON array of templates and merges it over `templates`.
fn load_templates(templates: Vec<DashboardTemplate>, raw: &str) -> Result<Vec<DashboardTemplate>> {
    let extra: Vec<DashboardTemplate> =
        serde_json::from_str(raw).context("Invalid dashboard templates JSON")?;
    Ok(DashboardTemplate::merge(templates, extra))
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", key, e)),
        None => Ok(default),
    }
}
