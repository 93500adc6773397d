//! Result export: turn the aggregate text or a parsed table into
//! downloadable byte blobs.
//!
//! * Text: UTF-8 with a byte-order mark, so spreadsheet software opening a
//!   `.csv` does not guess the wrong encoding. Named `ocr_result.<format>`.
//! * Spreadsheet: a single-sheet XLSX workbook, header row first. Named
//!   `ocr_result.xlsx`.

use crate::config::OutputFormat;
use crate::error::OcrError;
use crate::table::Table;
use rust_xlsxwriter::{Format, Workbook};
use std::path::{Path, PathBuf};
use tracing::debug;

/// UTF-8 byte-order mark.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Stem shared by every download.
pub const RESULT_FILE_STEM: &str = "ocr_result";

/// Name of the only worksheet in the exported workbook.
pub const SHEET_NAME: &str = "OCR Result";

/// MIME type of the exported workbook.
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A downloadable file held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Download {
    /// Write the blob to `dir/<file_name>`.
    ///
    /// Uses atomic write (temp file + rename) to prevent partial files.
    pub async fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf, OcrError> {
        let dir = dir.as_ref();
        let path = dir.join(&self.file_name);

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| OcrError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;

        let tmp_path = dir.join(format!("{}.tmp", self.file_name));
        tokio::fs::write(&tmp_path, &self.bytes)
            .await
            .map_err(|e| OcrError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;

        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| OcrError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;

        debug!("Wrote {} ({} bytes)", path.display(), self.bytes.len());
        Ok(path)
    }
}

/// Encode `text` as BOM-prefixed UTF-8 named after `format`.
pub fn export_text(text: &str, format: OutputFormat) -> Download {
    let mut bytes = Vec::with_capacity(UTF8_BOM.len() + text.len());
    bytes.extend_from_slice(UTF8_BOM);
    bytes.extend_from_slice(text.as_bytes());

    Download {
        file_name: format!("{RESULT_FILE_STEM}.{}", format.as_str()),
        mime_type: format.mime_type(),
        bytes,
    }
}

/// Write `table` into a single-sheet XLSX workbook.
///
/// The header row is bold; every cell is written as a string, in the order
/// the rows were parsed.
pub fn export_spreadsheet(table: &Table) -> Result<Download, OcrError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, header) in table.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, column_index(col)?, header, &header_format)?;
    }
    for (r, row) in table.rows.iter().enumerate() {
        let row_num = row_index(r + 1)?;
        for (col, cell) in row.iter().enumerate() {
            worksheet.write_string(row_num, column_index(col)?, cell)?;
        }
    }

    let bytes = workbook.save_to_buffer()?;
    debug!(
        "Spreadsheet: {} columns × {} rows → {} bytes",
        table.headers.len(),
        table.rows.len(),
        bytes.len()
    );

    Ok(Download {
        file_name: format!("{RESULT_FILE_STEM}.xlsx"),
        mime_type: XLSX_MIME.to_string(),
        bytes,
    })
}

fn column_index(col: usize) -> Result<u16, OcrError> {
    u16::try_from(col).map_err(|_| OcrError::Internal(format!("column {col} out of range")))
}

fn row_index(row: usize) -> Result<u32, OcrError> {
    u32::try_from(row).map_err(|_| OcrError::Internal(format!("row {row} out of range")))
}
