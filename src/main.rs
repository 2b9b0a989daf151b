use anyhow::{Context, Result};
use std::path::PathBuf;

use sheet_dashboard::services::file_loader;
use sheet_dashboard::{logging, Config, DashboardSession};

const USAGE: &str = "usage: sheet_dashboard <file.xlsx|file.csv|file.json> [--sheet NAME] [--template NAME] [column=value ...]";

#[derive(Debug)]
struct Args {
    path: PathBuf,
    sheet: Option<String>,
    template: Option<String>,
    filters: Vec<(String, String)>,
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Result<Args> {
    let path = raw
        .next()
        .map(PathBuf::from)
        .ok_or_else(|| anyhow::anyhow!(USAGE))?;

    let mut sheet = None;
    let mut template = None;
    let mut filters = Vec::new();
    while let Some(arg) = raw.next() {
        if arg == "--sheet" {
            sheet = Some(raw.next().ok_or_else(|| anyhow::anyhow!("--sheet needs a name"))?);
        } else if arg == "--template" {
            template = Some(raw.next().ok_or_else(|| anyhow::anyhow!("--template needs a name"))?);
        } else if let Some((column, value)) = arg.split_once('=') {
            filters.push((column.to_string(), value.to_string()));
        } else {
            return Err(anyhow::anyhow!("Unexpected argument '{}'\n{}", arg, USAGE));
        }
    }

    Ok(Args {
        path,
        sheet,
        template,
        filters,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::new()?;

    // Initialize logging
    logging::init_logging(&config.log_filter)?;

    let args = parse_args(std::env::args().skip(1))?;

    let start = std::time::Instant::now();
    let sheets = file_loader::load_from_path(&args.path, &config)
        .await
        .with_context(|| format!("Failed to load {}", args.path.display()))?;

    let mut session = DashboardSession::new(sheets, config)?;
    if let Some(sheet) = &args.sheet {
        session.switch_sheet(sheet)?;
    }
    for (column, value) in &args.filters {
        session.toggle_filter(column, value);
    }

    let output = match &args.template {
        Some(name) => serde_json::to_string_pretty(&session.template_view(Some(name))?)?,
        None => serde_json::to_string_pretty(&session.dashboard())?,
    };
    tracing::info!("Total processing completed in {:?}", start.elapsed());

    println!("{}", output);
    Ok(())
}
