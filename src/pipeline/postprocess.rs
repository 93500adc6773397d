//! Post-processing: normalise the raw text returned by the vision model.
//!
//! Models asked for CSV or Markdown often wrap the answer in a fenced code
//! block (` ```csv … ``` `) even when told not to. [`clean_response`] strips
//! those fences together with line-ending and invisible-character noise so
//! the text can be saved or parsed as-is.
//!
//! ## Rule Order
//!
//! 1. Normalise line endings (CRLF → LF)
//! 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
//! 3. Strip fences and surrounding whitespace until nothing changes
//!
//! Every rule is idempotent and rule 3 runs to a fixed point, so
//! `clean_response(clean_response(x)) == clean_response(x)` for any input.

use crate::config::OutputFormat;
use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all normalisation rules to a model response.
pub fn clean_response(input: &str, format: OutputFormat) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    strip_fences(&s, format)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ──────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Strip code fences ────────────────────────────────────────────────
//
// An opener tagged with the output format (or one of its aliases) is removed
// whole; a bare ``` opener is removed on its own, which leaves any other tag
// behind as text. A trailing ``` is removed. Whitespace is trimmed after each
// step and the loop repeats until the text stops changing.

static RE_TAGGED_OPENER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```([A-Za-z0-9_+\-]+)").unwrap());

const FENCE: &str = "```";

fn strip_fences(input: &str, format: OutputFormat) -> String {
    let mut text = input.trim();
    loop {
        let before = text;

        if let Some(caps) = RE_TAGGED_OPENER.captures(text) {
            let tag = caps[1].to_lowercase();
            if format.fence_tags().contains(&tag.as_str()) {
                text = text[caps[0].len()..].trim_start();
            }
        }
        if let Some(rest) = text.strip_prefix(FENCE) {
            text = rest.trim_start();
        }
        if let Some(rest) = text.strip_suffix(FENCE) {
            text = rest.trim_end();
        }
        text = text.trim();

        if text == before {
            return text.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tagged_csv_fence() {
        let input = "```csv\nName,Age\nAlice,30\n```";
        assert_eq!(clean_response(input, OutputFormat::Csv), "Name,Age\nAlice,30");
    }

    #[test]
    fn strips_markdown_alias_for_md() {
        let input = "```markdown\n| A |\n|---|\n| 1 |\n```\n";
        assert_eq!(clean_response(input, OutputFormat::Md), "| A |\n|---|\n| 1 |");
    }

    #[test]
    fn strips_bare_fence() {
        let input = "```\nplain text\n```";
        assert_eq!(clean_response(input, OutputFormat::Txt), "plain text");
    }

    #[test]
    fn foreign_tag_is_left_as_text() {
        // Only the bare opener is removed; "python" stays.
        let input = "```python\nprint(1)\n```";
        assert_eq!(clean_response(input, OutputFormat::Txt), "python\nprint(1)");
    }

    #[test]
    fn unfenced_text_is_only_trimmed() {
        assert_eq!(clean_response("  hello\n\n", OutputFormat::Txt), "hello");
    }

    #[test]
    fn crlf_and_invisible_chars_removed() {
        let input = "\u{FEFF}```csv\r\na,b\u{200B}\r\n```";
        assert_eq!(clean_response(input, OutputFormat::Csv), "a,b");
    }

    #[test]
    fn idempotent_on_tricky_inputs() {
        let inputs = [
            "``````x",
            "```csv```csv\nrow\n``````",
            "```",
            "``` ```",
            "```md\n```md\n| a |\n```\n```",
            "",
            "   \n",
            "text ending with ```",
            "```txt text```",
            "```python\n```csv\nx\n```",
        ];
        for format in OutputFormat::ALL {
            for input in inputs {
                let once = clean_response(input, format);
                let twice = clean_response(&once, format);
                assert_eq!(once, twice, "not idempotent for {input:?} / {format}");
            }
        }
    }

    #[test]
    fn nested_fences_fully_removed() {
        assert_eq!(clean_response("``````x", OutputFormat::Csv), "x");
        assert_eq!(clean_response("```", OutputFormat::Md), "");
    }
}
