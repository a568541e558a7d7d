// ==========================================
// Tabular Import - File loader
// ==========================================
// Stage 0 of the pipeline: path -> [TabularSource]
// Supports: CSV (.csv) / spreadsheets (.xlsx/.xlsm/.xlsb/.xls/.ods)
// Red line: no database access
// ==========================================

use crate::domain::{CellValue, TabularSource};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::{ImportError, PipelineResult};
use calamine::{open_workbook_auto, Data, DataType, Range, Reader};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, instrument};

const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Parses one file format into sources.
pub trait SourceParser: Send + Sync {
    fn parse(&self, path: &Path, cleaner: &DataCleaner) -> PipelineResult<Vec<TabularSource>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Spreadsheet,
}

impl FileFormat {
    /// Detect the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> PipelineResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => Ok(FileFormat::Csv),
            e if SPREADSHEET_EXTENSIONS.contains(&e) => Ok(FileFormat::Spreadsheet),
            "" => Err(ImportError::UnsupportedFormat(format!(
                "{} has no extension",
                path.display()
            ))),
            other => Err(ImportError::UnsupportedFormat(format!(".{other}"))),
        }
    }
}

// ==========================================
// Loader options
// ==========================================
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    pub csv_delimiter: u8,
    pub extra_missing_tokens: Vec<String>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            csv_delimiter: b',',
            extra_missing_tokens: Vec::new(),
        }
    }
}

// ==========================================
// CSV parser
// ==========================================
pub struct CsvSourceParser {
    delimiter: u8,
}

impl CsvSourceParser {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }
}

impl SourceParser for CsvSourceParser {
    fn parse(&self, path: &Path, cleaner: &DataCleaner) -> PipelineResult<Vec<TabularSource>> {
        let file_label = path.display().to_string();
        let file = File::open(path).map_err(|e| ImportError::parse(&file_label, e))?;

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // short records are padded below
            .delimiter(self.delimiter)
            .from_reader(file);

        let raw_headers: Vec<String> = reader
            .headers()
            .map_err(|e| ImportError::parse(&file_label, e))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        if raw_headers.is_empty() {
            return Err(ImportError::EmptySource(file_label));
        }
        let columns = cleaner.normalize_column_names(&raw_headers);
        let width = columns.len();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| ImportError::parse(&file_label, e))?;
            if record.len() > width {
                let line = record.position().map(|p| p.line()).unwrap_or(0);
                return Err(ImportError::parse(
                    &file_label,
                    format!(
                        "line {line} has {} fields but the header declares {width}",
                        record.len()
                    ),
                ));
            }

            let mut cells: Vec<CellValue> =
                record.iter().map(|v| cleaner.normalize_cell(v)).collect();
            cells.resize(width, CellValue::Missing);
            rows.push(cells);
        }

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| file_label.clone());

        debug!(file = %file_label, rows = rows.len(), columns = width, "CSV parsed");
        Ok(vec![TabularSource::new(name, columns, rows)?])
    }
}

// ==========================================
// Spreadsheet parser
// ==========================================
pub struct SpreadsheetSourceParser;

impl SourceParser for SpreadsheetSourceParser {
    fn parse(&self, path: &Path, cleaner: &DataCleaner) -> PipelineResult<Vec<TabularSource>> {
        let file_label = path.display().to_string();
        let mut workbook =
            open_workbook_auto(path).map_err(|e| ImportError::parse(&file_label, e))?;

        let sheet_names = workbook.sheet_names().to_vec();
        let mut sources = Vec::with_capacity(sheet_names.len());

        for sheet in sheet_names {
            let range = workbook
                .worksheet_range(&sheet)
                .map_err(|e| ImportError::parse(&file_label, format!("sheet '{sheet}': {e}")))?;

            match sheet_to_source(&sheet, &range, cleaner)? {
                Some(source) => {
                    debug!(sheet = %sheet, rows = source.row_count(), "worksheet parsed");
                    sources.push(source);
                }
                None => debug!(sheet = %sheet, "empty worksheet skipped"),
            }
        }

        if sources.is_empty() {
            return Err(ImportError::EmptySource(file_label));
        }
        Ok(sources)
    }
}

/// Convert one worksheet. `None` for a worksheet without any non-empty cell.
fn sheet_to_source(
    sheet: &str,
    range: &Range<Data>,
    cleaner: &DataCleaner,
) -> PipelineResult<Option<TabularSource>> {
    let mut rows_iter = range
        .rows()
        .skip_while(|row| row.iter().all(|c| matches!(c, Data::Empty)));

    let header_row = match rows_iter.next() {
        Some(row) => row,
        None => return Ok(None),
    };

    let raw_headers: Vec<String> = header_row
        .iter()
        .map(|c| cell_to_text(c).unwrap_or_default())
        .collect();
    let columns = cleaner.normalize_column_names(&raw_headers);
    let width = columns.len();

    let mut rows = Vec::new();
    for row in rows_iter {
        // range padding
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        let mut cells: Vec<CellValue> = row
            .iter()
            .map(|c| match cell_to_text(c) {
                Some(text) => cleaner.normalize_cell(&text),
                None => CellValue::Missing,
            })
            .collect();
        cells.resize(width, CellValue::Missing);
        rows.push(cells);
    }

    Ok(Some(TabularSource::new(sheet, columns, rows)?))
}

/// Raw text of a cell; `None` for empty cells, NaN and spreadsheet error values.
fn cell_to_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) if f.is_nan() => None,
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                Some((*f as i64).to_string())
            } else {
                Some(f.to_string())
            }
        }
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => Some(match cell.as_datetime() {
            Some(ndt) => ndt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.as_f64().to_string(),
        }),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
    }
}

// ==========================================
// FileLoader (dispatch by extension)
// ==========================================
pub struct FileLoader {
    cleaner: DataCleaner,
    csv: CsvSourceParser,
    spreadsheet: SpreadsheetSourceParser,
}

impl Default for FileLoader {
    fn default() -> Self {
        Self::new(LoaderOptions::default())
    }
}

impl FileLoader {
    pub fn new(options: LoaderOptions) -> Self {
        Self {
            cleaner: DataCleaner::with_extra_tokens(&options.extra_missing_tokens),
            csv: CsvSourceParser::new(options.csv_delimiter),
            spreadsheet: SpreadsheetSourceParser,
        }
    }

    pub fn cleaner(&self) -> &DataCleaner {
        &self.cleaner
    }

    /// Parse `path` into one source (CSV) or one source per non-empty worksheet.
    ///
    /// # Errors
    /// - `UnsupportedFormat`: extension not recognized (checked before any I/O)
    /// - `ParseError`: unreadable file or undecodable content
    /// - `EmptySource`: no columns anywhere in the file
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn load<P: AsRef<Path>>(&self, path: P) -> PipelineResult<Vec<TabularSource>> {
        let path = path.as_ref();
        let format = FileFormat::from_path(path)?;

        let parser: &dyn SourceParser = match format {
            FileFormat::Csv => &self.csv,
            FileFormat::Spreadsheet => &self.spreadsheet,
        };
        let sources = parser.parse(path, &self.cleaner)?;

        info!(
            format = ?format,
            sources = sources.len(),
            rows = sources.iter().map(|s| s.row_count()).sum::<usize>(),
            "file loaded"
        );
        Ok(sources)
    }
}
