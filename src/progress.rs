//! Event-callback trait for reconstruction progress.
//!
//! Inject an [`Arc<dyn ReconstructionEvents>`] via
//! [`crate::config::ReconstructConfigBuilder::events`] to be told when figures
//! are saved or skipped, when Markdown files land on disk, and when pages
//! start, finish, fail, or are skipped.
//!
//! The pipeline also logs every one of these through `tracing`; the callback
//! exists so hosts (the CLI progress bar, tests) can observe the run as data
//! instead of scraping console output.
//!
//! # Example
//!
//! ```rust
//! use page2md::{ReconstructConfig, ReconstructionEvents, SkippedBlock};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountSkips(AtomicUsize);
//!
//! impl ReconstructionEvents for CountSkips {
//!     fn on_figure_skipped(&self, _skip: &SkippedBlock) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = ReconstructConfig::builder()
//!     .events(Arc::new(CountSkips(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{DocumentArtifact, ExportedFigure, SkippedBlock};
use std::sync::Arc;

/// Called by the reconstruction pipeline as it works through a document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Pages are processed sequentially, but the trait is
/// `Send + Sync` so a sink can be shared with other threads (e.g. a UI).
pub trait ReconstructionEvents: Send + Sync {
    /// Called once before the first page.
    ///
    /// # Arguments
    /// * `total_pages`: number of selected pages that will be attempted
    fn on_document_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before the layout engine runs on a page.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called after a figure file was written.
    fn on_figure_saved(&self, figure: &ExportedFigure) {
        let _ = figure;
    }

    /// Called when an image block produced no file.
    fn on_figure_skipped(&self, skip: &SkippedBlock) {
        let _ = skip;
    }

    /// Called after a sub-page's Markdown file was written.
    fn on_markdown_saved(&self, artifact: &DocumentArtifact) {
        let _ = artifact;
    }

    /// Called when a page is skipped because its raster cannot be read.
    fn on_page_skipped(&self, page_num: usize, total_pages: usize, reason: &str) {
        let _ = (page_num, total_pages, reason);
    }

    /// Called when every sub-page of a page was reconstructed.
    ///
    /// # Arguments
    /// * `subpages`: number of sub-page results the engine returned
    fn on_page_complete(&self, page_num: usize, total_pages: usize, subpages: usize) {
        let _ = (page_num, total_pages, subpages);
    }

    /// Called when a page failed (engine error or write failure).
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after all pages have been attempted.
    ///
    /// # Arguments
    /// * `total_pages`  : selected pages
    /// * `success_count`: pages reconstructed without error
    fn on_document_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op sink, used when no callback is configured.
pub struct NoopEvents;

impl ReconstructionEvents for NoopEvents {}

/// Convenience alias matching the type stored in [`crate::config::ReconstructConfig`].
pub type EventSink = Arc<dyn ReconstructionEvents>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{ExportMode, SkipReason};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingEvents {
        saved: AtomicUsize,
        skipped: AtomicUsize,
        pages_done: AtomicUsize,
        page_errors: AtomicUsize,
    }

    impl ReconstructionEvents for TrackingEvents {
        fn on_figure_saved(&self, _figure: &ExportedFigure) {
            self.saved.fetch_add(1, Ordering::SeqCst);
        }

        fn on_figure_skipped(&self, _skip: &SkippedBlock) {
            self.skipped.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _page_num: usize, _total_pages: usize, _subpages: usize) {
            self.pages_done.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_error(&self, _page_num: usize, _total_pages: usize, _error: &str) {
            self.page_errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn figure(index: usize) -> ExportedFigure {
        ExportedFigure {
            figure_index: index,
            original_reference: None,
            confidence: None,
            file_path: PathBuf::from(format!("page_0001_01_img_{index:02}.png")),
            export_mode: ExportMode::Direct,
        }
    }

    #[test]
    fn noop_events_do_not_panic() {
        let sink = NoopEvents;
        sink.on_document_start(2);
        sink.on_page_start(1, 2);
        sink.on_figure_saved(&figure(1));
        sink.on_page_skipped(2, 2, "unreadable");
        sink.on_document_complete(2, 1);
    }

    #[test]
    fn tracking_events_receive_calls() {
        let tracker = TrackingEvents::default();
        tracker.on_figure_saved(&figure(1));
        tracker.on_figure_saved(&figure(3));
        tracker.on_figure_skipped(&SkippedBlock {
            page_num: 1,
            subpage_num: 1,
            figure_index: 2,
            original_reference: Some("imgs/b.jpg".into()),
            reason: SkipReason::NoPixelsOrBox,
        });
        tracker.on_page_complete(1, 2, 1);
        tracker.on_page_error(2, 2, "disk full");

        assert_eq!(tracker.saved.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.skipped.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.pages_done.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.page_errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_sink_works() {
        let sink: EventSink = Arc::new(NoopEvents);
        sink.on_document_start(10);
        sink.on_page_complete(1, 10, 3);
    }
}
