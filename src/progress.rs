//! Progress-callback trait for per-image batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::OcrConfigBuilder::progress_callback`] to receive events
//! as the batch works through its images. Progress is a side channel: it
//! never changes what [`crate::batch::run_batch`] returns.
//!
//! Images are processed strictly one after another, so events arrive in
//! submission order.
//!
//! # Example
//!
//! ```rust
//! use edgequake_ocr::{BatchProgressCallback, OcrConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_image_complete(&self, index: usize, total: usize, name: &str, text_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{name} ({index}/{total}) → {text_len} bytes");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = OcrConfig::builder()
//!     .progress_callback(counter as Arc<dyn BatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch orchestrator as it processes each image.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `index` is 1-based.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once, after validation, before the first API call.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called just before the request for an image is sent.
    fn on_image_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when an image produced text.
    fn on_image_complete(&self, index: usize, total: usize, name: &str, text_len: usize) {
        let _ = (index, total, name, text_len);
    }

    /// Called when an image was skipped because of an error.
    fn on_image_error(&self, index: usize, total: usize, name: &str, error: &str) {
        let _ = (index, total, name, error);
    }

    /// Called once after every image has been attempted.
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::OcrConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl BatchProgressCallback for Recorder {
        fn on_batch_start(&self, total: usize) {
            self.events.lock().unwrap().push(format!("start {total}"));
        }

        fn on_image_start(&self, index: usize, total: usize, name: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("begin {index}/{total} {name}"));
        }

        fn on_image_error(&self, index: usize, _total: usize, _name: &str, error: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("error {index} {error}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_image_start(1, 2, "a.png");
        cb.on_image_complete(1, 2, "a.png", 42);
        cb.on_image_error(2, 2, "b.png", "boom");
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn partial_override_records_only_its_events() {
        let rec = Recorder::default();
        rec.on_batch_start(2);
        rec.on_image_start(1, 2, "a.png");
        rec.on_image_complete(1, 2, "a.png", 10);
        rec.on_image_error(2, 2, "b.png", "timeout");
        rec.on_batch_complete(2, 1);

        let events = rec.events.lock().unwrap();
        assert_eq!(
            *events,
            vec!["start 2", "begin 1/2 a.png", "error 2 timeout"]
        );
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(10);
        cb.on_image_start(1, 10, "x.bmp");
    }
}
