//! Error types for the page2md library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Page2MdError`] is **fatal**: the operation cannot proceed at all
//!   (missing input, unwritable output directory, corrupt PDF). Returned as
//!   `Err(Page2MdError)` from the pipeline entry points.
//!
//! * [`PageError`] is **non-fatal**: a single page failed (unreadable raster,
//!   engine error, write failure on one sub-page) while other pages are fine.
//!   Stored inside [`crate::output::PageReport`] so a document run keeps going
//!   and callers can inspect partial success afterwards.
//!
//! Missing result fields and unexportable image blocks are neither: they are
//! absorbed by the pipeline and only show up as log lines and events.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the page2md library.
#[derive(Debug, Error)]
pub enum Page2MdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file has a `.pdf` extension but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The page selection matches none of the document's pages.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/dir/containing/libpdfium or install pdfium system-wide.\n\
Image inputs (PNG/JPEG) do not need pdfium."
    )]
    PdfiumBindingFailed(String),

    // ── Engine result errors ──────────────────────────────────────────────
    /// No precomputed engine result exists for a page.
    #[error("No layout results found at '{path}'")]
    ResultsNotFound { path: PathBuf },

    /// The engine result file exists but is not usable JSON.
    #[error("Invalid layout results in '{path}': {detail}")]
    InvalidResults { path: PathBuf, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create an output directory.
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not encode or write an exported figure.
    #[error("Failed to write figure '{path}': {source}")]
    FigureWriteFailed {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Could not write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every selected page was skipped or failed and no Markdown file was written.
    #[error("All {total} pages failed.\nFirst error: {first_error}")]
    AllPagesFailed { total: usize, first_error: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// Stored in [`crate::output::PageReport`]. The document run continues with
/// the next page unless every page ends up failing.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The page raster could not be opened or decoded.
    #[error("Page {page}: unreadable image '{path}': {detail}")]
    Unreadable {
        page: usize,
        path: PathBuf,
        detail: String,
    },

    /// The layout engine returned no usable results.
    #[error("Page {page}: layout engine failed: {detail}")]
    EngineFailed { page: usize, detail: String },

    /// A figure or Markdown file for one of the page's sub-pages could not be written.
    #[error("Page {page}: write failed: {detail}")]
    WriteFailed { page: usize, detail: String },
}

impl PageError {
    /// 1-indexed page number the error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::Unreadable { page, .. }
            | PageError::EngineFailed { page, .. }
            | PageError::WriteFailed { page, .. } => *page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_pages_failed_display() {
        let e = Page2MdError::AllPagesFailed {
            total: 3,
            first_error: "Page 1: unreadable".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("All 3 pages"), "got: {msg}");
        assert!(msg.contains("Page 1: unreadable"));
    }

    #[test]
    fn output_write_failed_keeps_source() {
        use std::error::Error as _;
        let e = Page2MdError::OutputWriteFailed {
            path: PathBuf::from("/nope/page_0001_01.md"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(e.to_string().contains("page_0001_01.md"));
        assert!(e.source().is_some());
    }

    #[test]
    fn page_error_reports_page_number() {
        let e = PageError::WriteFailed {
            page: 7,
            detail: "disk full".into(),
        };
        assert_eq!(e.page(), 7);
        assert!(e.to_string().starts_with("Page 7"));
    }

    #[test]
    fn page_error_serialises() {
        let e = PageError::EngineFailed {
            page: 2,
            detail: "no results".into(),
        };
        let json = serde_json::to_string(&e).expect("serialise");
        assert!(json.contains("EngineFailed"));
    }
}
