//! # page2md
//!
//! Rebuild per-page Markdown documents, with their figures, from the output of
//! a document-layout / OCR engine.
//!
//! ## Why this crate?
//!
//! Layout engines emit Markdown fragments plus a list of image blocks, and the
//! image links inside that Markdown point at paths that only existed inside
//! the engine (`imgs/img_in_image_box_12_40_300_220.jpg`). This crate saves
//! every figure to disk, with a stable name, and rewrites those links so the
//! Markdown renders from where it is written.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / image
//!  │
//!  ├─ 1. Input     check the file, sniff PDF magic bytes
//!  ├─ 2. Render    rasterise PDF pages via pdfium (images are used as-is)
//!  ├─ 3. Engine    LayoutEngine::predict → one result per sub-page
//!  ├─ 4. Extract   markdown fragments + image blocks, across result shapes
//!  ├─ 5. Export    decoded figure, or a crop of the page raster
//!  ├─ 6. Rewrite   <img src> and ![](…) → relative paths to exported files
//!  └─ 7. Output    output_md/page_####_##.md + output_images/*.png
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use page2md::{reconstruct_document, PrecomputedResults, ReconstructConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Results the layout engine dumped as output/json/page_0001.json, …
//!     let engine = PrecomputedResults::open("output/json")?;
//!     let config = ReconstructConfig::builder().out_dir("output").dpi(300).build()?;
//!     let report = reconstruct_document("document.pdf", &engine, &config)?;
//!     for path in report.markdown_paths() {
//!         println!("{}", path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `page2md` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! page2md = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod reconstruct;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PageSelection, ReconstructConfig, ReconstructConfigBuilder};
pub use engine::{parse_results, LayoutEngine, PrecomputedResults};
pub use error::{Page2MdError, PageError};
pub use output::{
    DocumentArtifact, ExportMode, ExportedFigure, FigureExport, PageReport, ReconstructionReport,
    ReconstructionStats, SkipReason, SkippedBlock,
};
pub use pipeline::accessor::{
    extract, ImageBlock, JsonPageResult, MarkdownFragments, PageContent, PageResultSource,
};
pub use pipeline::assemble::assemble;
pub use pipeline::crop::{crop, BoundingBox};
pub use pipeline::decode::{ChannelOrder, DecodeError};
pub use pipeline::mapping::{build_path_mapping, relative_path};
pub use pipeline::rewrite::{rewrite, PathMapping};
pub use progress::{EventSink, NoopEvents, ReconstructionEvents};
pub use reconstruct::{
    reconstruct_content, reconstruct_document, reconstruct_page, reconstruct_subpage, OutputDirs,
};
