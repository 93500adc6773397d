//! Interactive session state owned by the front-end.
//!
//! A [`Session`] holds the latest aggregate result and the output format it
//! was produced in, across interactions. The core keeps no hidden global
//! state: the front-end owns the session, hands batch reports to it and asks
//! it which downloads to offer.

use crate::batch::{BatchReport, Outcome};
use crate::config::OutputFormat;
use crate::error::OcrError;
use crate::export::{self, Download};
use crate::table::parse_markdown_table;
use tracing::{debug, warn};

/// What the spreadsheet download slot should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpreadsheetOffer {
    /// The output format has no spreadsheet form, or there is no result yet.
    NotApplicable,
    /// Markdown output, but no usable table was found in it.
    TableNotFound,
    /// A workbook ready to download.
    Ready(Download),
}

/// Result text and format carried from one interaction to the next.
#[derive(Debug, Clone, Default)]
pub struct Session {
    result_text: String,
    output_format: OutputFormat,
    last_outcome: Option<Outcome>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session from an already existing result (e.g. an edited file).
    pub fn from_text(text: impl Into<String>, format: OutputFormat) -> Self {
        Self {
            result_text: text.into(),
            output_format: format,
            last_outcome: None,
        }
    }

    /// Record a finished batch, overwriting the previous result.
    ///
    /// A batch without results clears the text rather than leaving a stale
    /// result from an earlier run.
    pub fn apply(&mut self, report: &BatchReport) {
        self.output_format = report.format;
        self.last_outcome = Some(report.outcome);
        if report.outcome.has_results() {
            self.result_text = report.text.clone();
        } else {
            warn!("Batch produced no text; clearing previous result");
            self.result_text.clear();
        }
    }

    /// Replace the result with a user-edited version.
    pub fn edit_result(&mut self, text: impl Into<String>) {
        self.result_text = text.into();
    }

    pub fn result_text(&self) -> &str {
        &self.result_text
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn last_outcome(&self) -> Option<Outcome> {
        self.last_outcome
    }

    pub fn has_result(&self) -> bool {
        !self.result_text.is_empty()
    }

    /// The text download, offered only while there is a result.
    pub fn text_download(&self) -> Option<Download> {
        self.has_result()
            .then(|| export::export_text(&self.result_text, self.output_format))
    }

    /// The spreadsheet download for the current (possibly edited) result.
    pub fn spreadsheet_offer(&self) -> Result<SpreadsheetOffer, OcrError> {
        if !self.has_result() || !self.output_format.supports_spreadsheet() {
            return Ok(SpreadsheetOffer::NotApplicable);
        }

        match parse_markdown_table(&self.result_text) {
            Some(table) if !table.is_empty() => {
                debug!(
                    "Found table: {} columns, {} rows",
                    table.headers.len(),
                    table.rows.len()
                );
                Ok(SpreadsheetOffer::Ready(export::export_spreadsheet(&table)?))
            }
            _ => {
                warn!("No Markdown table found in the result");
                Ok(SpreadsheetOffer::TableNotFound)
            }
        }
    }
}
