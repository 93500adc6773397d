//! Instruction texts sent to the vision model with each image.
//!
//! The instruction depends on two user choices, the [`ContentCategory`] of
//! the images and the requested [`OutputFormat`]. Every one of the nine
//! combinations has its own text; [`instruction`] matches on both enums so
//! a missing cell is a compile error. [`select_instruction`] is the
//! string-keyed entry point for callers holding raw keys; it falls back to
//! [`FALLBACK_INSTRUCTION`] when either key is unknown.

use crate::config::{ContentCategory, OutputFormat};

/// Generic instruction used when a category or format key is not recognised.
pub const FALLBACK_INSTRUCTION: &str = "Extract the text from this image.";

const TABLE_CSV: &str = r#"You are a professional data-entry clerk. Output the table shown in this image as CSV, exactly as it appears.

# Rules
- Identify the header row in the image and make it the first CSV line.
- Every data row must have exactly as many fields as the header.
- Treat cells without data as empty fields so that columns never shift.
- Remove thousands separators from numbers, e.g. output `10000`.
- Ignore anything that is not a pure data row, such as table titles or total rows.
- Output the CSV data only, without any explanation before or after it."#;

const TABLE_TXT: &str = "This image contains tabular data. Recognise its content and write it out as text formatted for easy human reading.";

const TABLE_MD: &str = "This image contains tabular data. Recognise its content and output it formatted as a Markdown table.";

const DOCUMENT_CSV: &str = "This image contains an ordinary document. Extract the main entities (names of people and places, dates, and so on) and key points from its content and output a summary of them as CSV.";

const DOCUMENT_TXT: &str = "This image contains an ordinary document. Interpret its content and write it out as plain text with paragraphs and similar structure tidied up.";

const DOCUMENT_MD: &str = "This image contains an ordinary document. Interpret headings, lists and bullet points appropriately and output the content formatted as Markdown.";

const RAW_TEXT_CSV: &str = "Write out all the text contained in this image into the first column of a CSV, as far as possible.";

const RAW_TEXT_TXT: &str = "Write out all the text contained in this image as plain text, reproducing the layout and line breaks of the original image as faithfully as possible.";

const RAW_TEXT_MD: &str = "Write out the text contained in this image inside a Markdown code block, keeping the layout of the original image.";

/// Instruction for a known (category, format) pair.
pub fn instruction(category: ContentCategory, format: OutputFormat) -> &'static str {
    match (category, format) {
        (ContentCategory::Table, OutputFormat::Csv) => TABLE_CSV,
        (ContentCategory::Table, OutputFormat::Txt) => TABLE_TXT,
        (ContentCategory::Table, OutputFormat::Md) => TABLE_MD,
        (ContentCategory::Document, OutputFormat::Csv) => DOCUMENT_CSV,
        (ContentCategory::Document, OutputFormat::Txt) => DOCUMENT_TXT,
        (ContentCategory::Document, OutputFormat::Md) => DOCUMENT_MD,
        (ContentCategory::RawText, OutputFormat::Csv) => RAW_TEXT_CSV,
        (ContentCategory::RawText, OutputFormat::Txt) => RAW_TEXT_TXT,
        (ContentCategory::RawText, OutputFormat::Md) => RAW_TEXT_MD,
    }
}

/// Instruction for raw string keys. Never fails.
///
/// An unknown category yields [`FALLBACK_INSTRUCTION`] whatever the format;
/// a known category with an unknown format yields the same fallback.
pub fn select_instruction(category: &str, format: &str) -> &'static str {
    match (category.parse::<ContentCategory>(), format.parse::<OutputFormat>()) {
        (Ok(c), Ok(f)) => instruction(c, f),
        _ => FALLBACK_INSTRUCTION,
    }
}
