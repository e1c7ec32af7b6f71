use calamine::{Data, Reader, Xlsx, XlsxError};
use csv::{ReaderBuilder, StringRecord, Trim, Writer};
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tracing::{info, warn};

use crate::energy::records::{parse_timestamp, EnergyDataset, EnergyRecord};
use crate::errors::{TwinError, TwinResult};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Csv,
    Xlsx,
}

impl UploadFormat {
    pub fn from_file_name(name: &str) -> TwinResult<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".csv") {
            Ok(UploadFormat::Csv)
        } else if lower.ends_with(".xlsx") {
            Ok(UploadFormat::Xlsx)
        } else {
            Err(TwinError::import(format!(
                "Unsupported file type for {}: expected .csv or .xlsx",
                name
            )))
        }
    }
}

/// Column positions resolved from the header row.
struct Columns {
    timestamp: Option<usize>,
    consumption_kwh: usize,
    rate_per_kwh: Option<usize>,
    cost: Option<usize>,
    category: Option<usize>,
    device: Option<usize>,
    location: Option<usize>,
    notes: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> TwinResult<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };

        Ok(Self {
            timestamp: find("timestamp"),
            consumption_kwh: find("consumption_kwh")
                .ok_or_else(|| TwinError::import("Missing required column: consumption_kwh"))?,
            rate_per_kwh: find("rate_per_kwh"),
            cost: find("cost"),
            category: find("category"),
            device: find("device"),
            location: find("location"),
            notes: find("notes"),
        })
    }

    fn text(row: &StringRecord, index: Option<usize>) -> String {
        index
            .and_then(|i| row.get(i))
            .map(str::to_string)
            .unwrap_or_default()
    }

    fn number(row: &StringRecord, index: Option<usize>) -> Option<f64> {
        index
            .and_then(|i| row.get(i))
            .filter(|v| !v.is_empty())
            .map(|v| v.parse().unwrap_or(0.0))
    }

    fn record(&self, row: &StringRecord) -> EnergyRecord {
        let consumption_kwh = Self::number(row, Some(self.consumption_kwh)).unwrap_or(0.0);
        let rate_per_kwh = Self::number(row, self.rate_per_kwh).unwrap_or(0.0);

        EnergyRecord {
            timestamp: self
                .timestamp
                .and_then(|i| row.get(i))
                .and_then(parse_timestamp),
            consumption_kwh,
            rate_per_kwh,
            cost: Self::number(row, self.cost).unwrap_or(consumption_kwh * rate_per_kwh),
            category: Self::text(row, self.category),
            device: Self::text(row, self.device),
            location: Self::text(row, self.location),
            notes: Self::text(row, self.notes),
        }
    }
}

fn upload_error(err: csv::Error) -> TwinError {
    TwinError::import(format!("Error processing file: {}", err))
}

fn workbook_error(err: XlsxError) -> TwinError {
    TwinError::import(format!("Error processing file: {}", err))
}

/// Reads energy records from CSV with a header row. Unparsable numbers read as 0,
/// an absent cost is derived from consumption and rate.
pub fn import_csv<R: Read>(reader: R) -> TwinResult<Vec<EnergyRecord>> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let columns = Columns::resolve(reader.headers().map_err(upload_error)?)?;
    if columns.timestamp.is_none() {
        warn!("Uploaded data has no timestamp column; daily views will be empty");
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(upload_error)?;
        records.push(columns.record(&row));
    }
    Ok(records)
}

pub fn import_csv_str(data: &str) -> TwinResult<Vec<EnergyRecord>> {
    import_csv(data.as_bytes())
}

/// Spreadsheet cells as the text a CSV export of the sheet would carry.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) | Data::DateTimeIso(s) => s.trim().to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => u8::from(*b).to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn sheet_row(cells: &[Data]) -> StringRecord {
    cells.iter().map(cell_text).collect()
}

/// Reads energy records from the first sheet of a workbook. The first row is the
/// header and goes through the same column resolution as CSV uploads.
pub fn import_xlsx<R: Read + Seek>(reader: R) -> TwinResult<Vec<EnergyRecord>> {
    let mut workbook = Xlsx::new(reader).map_err(workbook_error)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| TwinError::import("Workbook has no sheets"))?
        .map_err(workbook_error)?;

    let mut rows = range.rows();
    let headers = rows
        .next()
        .map(sheet_row)
        .ok_or_else(|| TwinError::import("Missing required column: consumption_kwh"))?;
    let columns = Columns::resolve(&headers)?;
    if columns.timestamp.is_none() {
        warn!("Uploaded workbook has no timestamp column; daily views will be empty");
    }

    Ok(rows
        .map(sheet_row)
        .filter(|row| row.iter().any(|cell| !cell.is_empty()))
        .map(|row| columns.record(&row))
        .collect())
}

pub fn import_file(path: &Path) -> TwinResult<EnergyDataset> {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    match UploadFormat::from_file_name(&name)? {
        UploadFormat::Csv => {
            let file = std::fs::File::open(path)?;
            let records = import_csv(file)?;
            info!(path = %path.display(), records = records.len(), "Imported energy data");
            Ok(EnergyDataset::new(records))
        }
        UploadFormat::Xlsx => {
            let file = std::fs::File::open(path)?;
            let records = import_xlsx(BufReader::new(file))?;
            info!(path = %path.display(), records = records.len(), "Imported energy data");
            Ok(EnergyDataset::new(records))
        }
    }
}

pub fn export_csv(records: &[EnergyRecord]) -> TwinResult<String> {
    let mut writer = Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| TwinError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| TwinError::import(e.to_string()))
}
