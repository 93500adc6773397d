//! Integration tests for the batch pipeline with a scripted extractor.
//!
//! No network: every model answer comes from [`ScriptedExtractor`], which
//! also records the instruction and the order of the calls it receives.

use async_trait::async_trait;
use edgequake_ocr::{
    clean_response, resolve_inputs, run_batch, select_instruction, BatchProgressCallback,
    ContentCategory, ImageError, OcrConfig, OcrError, Outcome, OutputFormat, Session,
    SpreadsheetOffer, UploadedImage,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Replies from a fixed script keyed by image name.
///
/// Names missing from the script fail with `LlmFailed`. Replies go through
/// [`clean_response`] like the production extractor's do.
#[derive(Default)]
struct ScriptedExtractor {
    replies: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
    instructions: Mutex<Vec<String>>,
}

impl ScriptedExtractor {
    fn new(replies: &[(&str, &str)]) -> Self {
        Self {
            replies: replies
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl edgequake_ocr::Extractor for ScriptedExtractor {
    async fn extract(
        &self,
        instruction: &str,
        image: &UploadedImage,
        format: OutputFormat,
    ) -> Result<String, ImageError> {
        self.calls.lock().unwrap().push(image.name().to_string());
        self.instructions
            .lock()
            .unwrap()
            .push(instruction.to_string());
        match self.replies.get(image.name()) {
            Some(reply) => Ok(clean_response(reply, format)),
            None => Err(ImageError::LlmFailed {
                file: image.name().to_string(),
                detail: "503 Service Unavailable".into(),
            }),
        }
    }
}

fn img(name: &str, size: usize) -> UploadedImage {
    UploadedImage::new(name, vec![0u8; size])
}

/// Records every progress event as a string.
#[derive(Default)]
struct RecordingCallback {
    events: Mutex<Vec<String>>,
}

impl BatchProgressCallback for RecordingCallback {
    fn on_batch_start(&self, total: usize) {
        self.events.lock().unwrap().push(format!("start {total}"));
    }
    fn on_image_start(&self, index: usize, total: usize, name: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("begin {index}/{total} {name}"));
    }
    fn on_image_complete(&self, index: usize, total: usize, name: &str, _text_len: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("ok {index}/{total} {name}"));
    }
    fn on_image_error(&self, index: usize, total: usize, name: &str, _error: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("err {index}/{total} {name}"));
    }
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("done {success_count}/{total}"));
    }
}

// ── Aggregation ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_image_is_skipped_and_order_is_kept() {
    let ex = ScriptedExtractor::new(&[("b.png", "B text"), ("c.png", "C text")]);
    let config = OcrConfig::default();
    let images = vec![img("a.png", 10), img("b.png", 10), img("c.png", 10)];

    let report = run_batch(&ex, &images, ContentCategory::Document, OutputFormat::Txt, &config)
        .await
        .unwrap();

    assert_eq!(ex.calls(), vec!["a.png", "b.png", "c.png"]);
    assert_eq!(report.outcome, Outcome::PartialFailure);
    assert_eq!(
        report.text,
        "--- OCR Result for: b.png ---\n\nB text\n\n--- OCR Result for: c.png ---\n\nC text\n\n"
    );
    assert!(!report.text.contains("a.png"));
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].file(), "a.png");
}

#[tokio::test]
async fn one_image_gets_no_header() {
    let ex = ScriptedExtractor::new(&[("scan.jpg", "hello")]);
    let config = OcrConfig::default();

    let report = run_batch(
        &ex,
        &[img("scan.jpg", 10)],
        ContentCategory::RawText,
        OutputFormat::Txt,
        &config,
    )
    .await
    .unwrap();

    assert_eq!(report.outcome, Outcome::Success);
    assert_eq!(report.text, "hello\n\n");
}

#[tokio::test]
async fn fenced_replies_are_cleaned_before_aggregation() {
    let ex = ScriptedExtractor::new(&[("t.png", "```csv\nName,Age\nAlice,30\n```")]);
    let config = OcrConfig::default();

    let report = run_batch(
        &ex,
        &[img("t.png", 10)],
        ContentCategory::Table,
        OutputFormat::Csv,
        &config,
    )
    .await
    .unwrap();

    assert_eq!(report.text, "Name,Age\nAlice,30\n\n");
}

#[tokio::test]
async fn one_instruction_per_run() {
    let ex = ScriptedExtractor::new(&[("a.png", "x"), ("b.png", "y")]);
    let config = OcrConfig::default();

    run_batch(
        &ex,
        &[img("a.png", 1), img("b.png", 1)],
        ContentCategory::Table,
        OutputFormat::Md,
        &config,
    )
    .await
    .unwrap();

    let expected = select_instruction("table", "md");
    let seen = ex.instructions.lock().unwrap().clone();
    assert_eq!(seen, vec![expected.to_string(), expected.to_string()]);
}

// ── Size limit ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn total_exactly_at_limit_is_accepted() {
    let ex = ScriptedExtractor::new(&[("a.png", "a"), ("b.png", "b")]);
    let config = OcrConfig::builder().max_total_bytes(100).build().unwrap();

    let report = run_batch(
        &ex,
        &[img("a.png", 60), img("b.png", 40)],
        ContentCategory::Table,
        OutputFormat::Csv,
        &config,
    )
    .await
    .unwrap();

    assert_eq!(report.total_bytes, 100);
    assert_eq!(ex.calls().len(), 2);
}

#[tokio::test]
async fn one_byte_over_limit_makes_no_calls() {
    let ex = ScriptedExtractor::new(&[("a.png", "a"), ("b.png", "b")]);
    let config = OcrConfig::builder().max_total_bytes(100).build().unwrap();

    let err = run_batch(
        &ex,
        &[img("a.png", 60), img("b.png", 41)],
        ContentCategory::Table,
        OutputFormat::Csv,
        &config,
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        OcrError::UploadTooLarge {
            total_bytes: 101,
            limit_bytes: 100
        }
    ));
    assert!(ex.calls().is_empty());
}

// ── Outcomes and session ─────────────────────────────────────────────────────

#[tokio::test]
async fn all_failures_publish_nothing() {
    let ex = ScriptedExtractor::new(&[]);
    let config = OcrConfig::default();

    let report = run_batch(
        &ex,
        &[img("a.png", 1), img("b.png", 1)],
        ContentCategory::Table,
        OutputFormat::Md,
        &config,
    )
    .await
    .unwrap();

    assert_eq!(report.outcome, Outcome::NoResults);
    assert!(report.text.is_empty());
    assert_eq!(report.failures.len(), 2);

    let mut session = Session::from_text("| stale |\n|---|\n| 1 |", OutputFormat::Md);
    session.apply(&report);
    assert!(session.text_download().is_none());
    assert_eq!(
        session.spreadsheet_offer().unwrap(),
        SpreadsheetOffer::NotApplicable
    );
}

#[tokio::test]
async fn markdown_batch_to_files() {
    let ex = ScriptedExtractor::new(&[(
        "invoice.png",
        "```markdown\n| Item | Qty | Note |\n|---|---|---|\n| Pen | 2 |  |\n| Ink | 1 |  |\n```",
    )]);
    let config = OcrConfig::default();

    let report = run_batch(
        &ex,
        &[img("invoice.png", 10)],
        ContentCategory::Table,
        OutputFormat::Md,
        &config,
    )
    .await
    .unwrap();

    let mut session = Session::new();
    session.apply(&report);

    let dir = tempfile::tempdir().unwrap();
    let text = session.text_download().expect("text offered");
    let text_path = text.write_to(dir.path()).await.unwrap();
    assert_eq!(text_path.file_name().unwrap(), "ocr_result.md");

    let written = std::fs::read(&text_path).unwrap();
    assert!(written.starts_with(b"\xEF\xBB\xBF| Item | Qty | Note |"));

    let SpreadsheetOffer::Ready(workbook) = session.spreadsheet_offer().unwrap() else {
        panic!("expected a workbook");
    };
    let xlsx_path = workbook.write_to(dir.path()).await.unwrap();
    assert_eq!(xlsx_path.file_name().unwrap(), "ocr_result.xlsx");
    let bytes = std::fs::read(&xlsx_path).unwrap();
    assert!(bytes.starts_with(b"PK"));
}

// ── Progress ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn progress_events_follow_submission_order() {
    let ex = ScriptedExtractor::new(&[("dir/one.png", "1"), ("three.png", "3")]);
    let cb = Arc::new(RecordingCallback::default());
    let config = OcrConfig::builder()
        .progress_callback(cb.clone())
        .build()
        .unwrap();

    run_batch(
        &ex,
        &[img("dir/one.png", 1), img("two.png", 1), img("three.png", 1)],
        ContentCategory::Table,
        OutputFormat::Csv,
        &config,
    )
    .await
    .unwrap();

    let events = cb.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "start 3",
            "begin 1/3 one.png",
            "ok 1/3 one.png",
            "begin 2/3 two.png",
            "err 2/3 two.png",
            "begin 3/3 three.png",
            "ok 3/3 three.png",
            "done 2/3",
        ]
    );
}

// ── Input resolution ─────────────────────────────────────────────────────────

#[tokio::test]
async fn local_files_are_read_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let png = dir.path().join("first.png");
    let jpg = dir.path().join("second.jpg");
    image::RgbImage::new(4, 4).save(&png).unwrap();
    image::RgbImage::new(4, 4).save(&jpg).unwrap();

    let inputs = vec![
        png.to_string_lossy().into_owned(),
        jpg.to_string_lossy().into_owned(),
    ];
    let images = resolve_inputs(&inputs, 5).await.unwrap();

    assert_eq!(images.len(), 2);
    assert_eq!(images[0].base_name(), "first.png");
    assert_eq!(images[1].base_name(), "second.jpg");
}

#[tokio::test]
async fn non_image_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.png");
    std::fs::write(&path, b"definitely not an image").unwrap();

    let err = resolve_inputs(&[path.to_string_lossy().into_owned()], 5)
        .await
        .unwrap_err();
    assert!(matches!(err, OcrError::UnsupportedImage { .. }));
}

#[tokio::test]
async fn missing_file_is_reported() {
    let err = resolve_inputs(&["/nonexistent/scan.png".to_string()], 5)
        .await
        .unwrap_err();
    assert!(matches!(err, OcrError::FileNotFound { .. }));
}
