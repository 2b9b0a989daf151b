use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;

use bytes::Bytes;
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};

use crate::config::Config;
use crate::error::{DashboardError, Result};
use crate::models::RecordsPayload;
use crate::services::dashboard::types::{CellValue, Table};
use crate::services::dashboard::utils::unique_header;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Xlsx,
    Csv,
    /// Records already parsed upstream, see [`RecordsPayload`].
    Json,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "xlsx" | "xlsm" => Ok(SourceKind::Xlsx),
            "csv" => Ok(SourceKind::Csv),
            "json" => Ok(SourceKind::Json),
            other => Err(DashboardError::InvalidInput(format!(
                "Unsupported file type: '{}' (expected .xlsx, .csv or .json)",
                other
            ))),
        }
    }
}

/// One worksheet turned into a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub table: Table,
}

/// Reads and decodes a spreadsheet from disk. Decoding runs on a blocking task.
pub async fn load_from_path(path: &Path, config: &Config) -> Result<Vec<Sheet>> {
    let start = std::time::Instant::now();
    let kind = SourceKind::from_path(path)?;

    let metadata = tokio::fs::metadata(path).await?;
    let size = metadata.len() as usize;
    if size > config.max_file_size {
        tracing::error!("File {} is {} bytes, above the limit", path.display(), size);
        return Err(DashboardError::FileTooLarge {
            size,
            limit: config.max_file_size,
        });
    }

    let file_data = Bytes::from(tokio::fs::read(path).await?);
    tracing::info!(
        "Read {} ({}KB) in {:?}",
        path.display(),
        file_data.len() / 1024,
        start.elapsed()
    );

    let fallback_name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("Sheet1")
        .to_string();

    tokio::task::spawn_blocking(move || load_from_bytes(file_data, kind, &fallback_name))
        .await
        .map_err(|e| DashboardError::Internal(format!("Loader task failed: {}", e)))?
}

/// Decodes an in-memory spreadsheet. Sheets without data rows are skipped; if
/// nothing is left the load fails with [`DashboardError::NoUsableData`].
/// `default_sheet_name` names the single sheet of CSV input and bare JSON arrays.
pub fn load_from_bytes(file_data: Bytes, kind: SourceKind, default_sheet_name: &str) -> Result<Vec<Sheet>> {
    let sheets = match kind {
        SourceKind::Xlsx => read_workbook(file_data)?,
        SourceKind::Csv => vec![Sheet {
            name: default_sheet_name.to_string(),
            table: read_csv(&file_data)?,
        }],
        SourceKind::Json => read_records(&file_data, default_sheet_name)?,
    };

    let usable: Vec<Sheet> = sheets
        .into_iter()
        .filter(|sheet| {
            let keep = !sheet.table.is_empty() && !sheet.table.columns().is_empty();
            if !keep {
                tracing::warn!("Sheet {} has no data rows, skipping", sheet.name);
            }
            keep
        })
        .collect();

    if usable.is_empty() {
        tracing::error!("No valid data found after processing all sheets");
        return Err(DashboardError::NoUsableData(
            "the spreadsheet is empty or has no valid rows".to_string(),
        ));
    }

    tracing::info!("Loaded {} sheet(s)", usable.len());
    Ok(usable)
}

fn read_workbook(file_data: Bytes) -> Result<Vec<Sheet>> {
    let cursor = Cursor::new(file_data);
    let mut workbook: Xlsx<_> = open_workbook_from_rs(cursor).map_err(|e| {
        tracing::error!("Failed to open Excel file: {}", e);
        DashboardError::Workbook(e)
    })?;

    let sheet_names = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(DashboardError::NoSheets);
    }
    tracing::info!("Found {} sheets: {:?}", sheet_names.len(), sheet_names);

    let mut sheets = Vec::with_capacity(sheet_names.len());
    for sheet_name in &sheet_names {
        match workbook.worksheet_range(sheet_name) {
            Ok(range) => {
                let rows: Vec<Vec<CellValue>> = range
                    .rows()
                    .map(|row| row.iter().map(cell_from_excel).collect())
                    .collect();
                sheets.push(Sheet {
                    name: sheet_name.clone(),
                    table: table_from_rows(rows),
                });
            }
            Err(e) => {
                tracing::warn!("Failed to read worksheet {}: {}", sheet_name, e);
            }
        }
    }

    Ok(sheets)
}

fn read_csv(file_data: &[u8]) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file_data);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(CellValue::parse).collect());
    }

    Ok(table_from_rows(rows))
}

fn read_records(file_data: &[u8], default_sheet_name: &str) -> Result<Vec<Sheet>> {
    let payload: RecordsPayload = serde_json::from_slice(file_data)?;
    let sheets = match payload {
        RecordsPayload::Records(records) => vec![Sheet {
            name: default_sheet_name.to_string(),
            table: Table::from_records(&records),
        }],
        RecordsPayload::Sheets { sheets } => sheets
            .into_iter()
            .map(|sheet| Sheet {
                table: Table::from_records(&sheet.records),
                name: sheet.name,
            })
            .collect(),
    };
    Ok(sheets)
}

/// First non-blank row is the header. Fully blank rows are dropped.
fn table_from_rows(rows: Vec<Vec<CellValue>>) -> Table {
    let mut rows = rows
        .into_iter()
        .filter(|row| row.iter().any(|cell| !cell.is_empty()));

    let Some(header) = rows.next() else {
        return Table::default();
    };

    let mut existing_names = HashSet::new();
    let columns = header
        .iter()
        .enumerate()
        .map(|(idx, cell)| unique_header(&cell.to_string(), idx, &mut existing_names))
        .collect();

    Table::new(columns, rows.collect())
}

/// Excel datetimes keep their serial number so date detection stays uniform.
pub fn cell_from_excel(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::DateTime(d) => CellValue::Number(d.as_f64()),
        Data::String(s) => CellValue::parse(s),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::text(s.as_str()),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::Error(_) | Data::Empty => CellValue::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn csv_header_and_blank_rows() {
        let data = Bytes::from_static(b"Produto,Vendas,\nCaneta,10,x\n,,\nCaderno,5\n");
        let sheets = load_from_bytes(data, SourceKind::Csv, "vendas").unwrap();
        assert_eq!(sheets.len(), 1);

        let table = &sheets[0].table;
        assert_eq!(sheets[0].name, "vendas");
        assert_eq!(
            table.columns(),
            &["Produto".to_string(), "Vendas".to_string(), "col_3".to_string()]
        );
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows()[0][1], CellValue::Number(10.0));
        assert_eq!(table.rows()[1][2], CellValue::Empty);
    }

    #[test]
    fn csv_serial_dates_classify_like_json() {
        use crate::services::dashboard::{classify, ChartKind, ColumnType, Dashboard};

        let csv = load_from_bytes(
            Bytes::from_static(b"Data,Vendas\n45306,10\n45307,20.50\n"),
            SourceKind::Csv,
            "vendas",
        )
        .unwrap();
        let json = load_from_bytes(
            Bytes::from_static(br#"[{"Data": 45306, "Vendas": 10}, {"Data": 45307, "Vendas": 20.5}]"#),
            SourceKind::Json,
            "vendas",
        )
        .unwrap();

        let csv_table = &csv[0].table;
        assert_eq!(classify(csv_table).type_of("Data"), Some(ColumnType::Date));
        assert_eq!(csv_table, &json[0].table);

        let board = Dashboard::build(csv_table, &Config::default()).unwrap();
        let line = board.find_chart("Data", "Vendas", ChartKind::Line).unwrap();
        assert_eq!(line.labels, vec!["15/01/2024".to_string(), "16/01/2024".to_string()]);
        assert_eq!(line.values, vec![10.0, 20.5]);
    }

    #[test]
    fn header_only_csv_is_unusable() {
        let data = Bytes::from_static(b"a,b\n");
        assert!(matches!(
            load_from_bytes(data, SourceKind::Csv, "x"),
            Err(DashboardError::NoUsableData(_))
        ));
    }

    #[test]
    fn garbage_is_not_a_workbook() {
        let data = Bytes::from_static(b"definitely not a zip");
        assert!(matches!(
            load_from_bytes(data, SourceKind::Xlsx, "x"),
            Err(DashboardError::Workbook(_))
        ));
    }

    #[test]
    fn json_records_keep_key_order() {
        let data = Bytes::from_static(br#"[{"Produto": "A", "Vendas": 2}, {"Produto": null, "Vendas": "3"}]"#);
        let sheets = load_from_bytes(data, SourceKind::Json, "dados").unwrap();
        let table = &sheets[0].table;
        assert_eq!(table.columns(), &["Produto".to_string(), "Vendas".to_string()]);
        assert_eq!(table.rows()[1], vec![CellValue::Empty, CellValue::Number(3.0)]);
    }

    #[test]
    fn json_named_sheets() {
        let data = Bytes::from_static(
            br#"{"sheets": [{"name": "Jan", "records": [{"x": 1}]}, {"name": "Fev", "records": []}]}"#,
        );
        let sheets = load_from_bytes(data, SourceKind::Json, "dados").unwrap();
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].name, "Jan");
    }

    #[test]
    fn excel_cells_convert() {
        assert_eq!(cell_from_excel(&Data::Int(3)), CellValue::Number(3.0));
        assert_eq!(cell_from_excel(&Data::String(" ".into())), CellValue::Empty);
        assert_eq!(cell_from_excel(&Data::Bool(true)), CellValue::Text("true".into()));
        assert_eq!(cell_from_excel(&Data::Empty), CellValue::Empty);
        assert_eq!(cell_from_excel(&Data::String("45306".into())), CellValue::Number(45306.0));
    }

    #[test]
    fn extension_decides_kind() {
        assert_eq!(SourceKind::from_path(Path::new("a.XLSX")).unwrap(), SourceKind::Xlsx);
        assert_eq!(SourceKind::from_path(Path::new("a.csv")).unwrap(), SourceKind::Csv);
        assert!(SourceKind::from_path(Path::new("a.pdf")).is_err());
    }
}
