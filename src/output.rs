//! Output types: what the pipeline writes and what it reports back.

use crate::error::PageError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How a figure's pixels were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportMode {
    /// The engine supplied decoded pixels; saved as-is.
    Direct,
    /// Only a bounding box was available; pixels cropped from the page raster.
    FallbackCrop,
}

/// One image block that was written to disk.
///
/// `figure_index` is the block's 1-based position among *all* blocks of its
/// sub-page, so it matches the number in the file name even when earlier
/// blocks were skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedFigure {
    pub figure_index: usize,
    /// Path the engine used for this figure inside its own Markdown.
    pub original_reference: Option<String>,
    pub confidence: Option<f64>,
    pub file_path: PathBuf,
    pub export_mode: ExportMode,
}

/// Why an image block produced no file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Neither decoded pixels nor a bounding box.
    NoPixelsOrBox,
    /// The bounding box clamped to zero area.
    EmptyCrop,
}

/// One image block that produced no file. Its figure index is still consumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedBlock {
    pub page_num: usize,
    pub subpage_num: usize,
    pub figure_index: usize,
    pub original_reference: Option<String>,
    pub reason: SkipReason,
}

/// Result of exporting one sub-page's image blocks.
///
/// `figures.len() + skipped.len()` always equals the number of blocks passed in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FigureExport {
    pub figures: Vec<ExportedFigure>,
    pub skipped: Vec<SkippedBlock>,
}

impl FigureExport {
    /// Number of figure indices handed out, exported or not.
    pub fn consumed_indices(&self) -> usize {
        self.figures.len() + self.skipped.len()
    }
}

/// The reconstructed Markdown of one sub-page and the figures it references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentArtifact {
    /// 1-indexed page number.
    pub page_num: usize,
    /// 1-indexed sub-page number within the page.
    pub subpage_num: usize,
    pub markdown_path: PathBuf,
    /// Final (rewritten) Markdown, exactly as written to `markdown_path`.
    pub markdown: String,
    pub figures: Vec<ExportedFigure>,
    pub skipped: Vec<SkippedBlock>,
}

/// Outcome for one selected page of the input document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageReport {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Raster the page was read from.
    pub source: PathBuf,
    /// One artifact per sub-page, in engine order.
    pub artifacts: Vec<DocumentArtifact>,
    /// `Some` if the page failed or was skipped.
    pub error: Option<PageError>,
}

impl PageReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Run-level counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconstructionStats {
    /// Pages in the input document (1 for image inputs).
    pub total_pages: usize,
    pub processed_pages: usize,
    pub failed_pages: usize,
    /// Pages whose raster could not be read.
    pub skipped_pages: usize,
    pub subpages: usize,
    pub figures_direct: usize,
    pub figures_fallback: usize,
    pub figures_skipped: usize,
    pub total_duration_ms: u64,
}

/// Everything a document run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconstructionReport {
    pub pages: Vec<PageReport>,
    pub stats: ReconstructionStats,
}

impl ReconstructionReport {
    /// All Markdown files written during the run, in page/sub-page order.
    pub fn markdown_paths(&self) -> Vec<&PathBuf> {
        self.pages
            .iter()
            .flat_map(|p| p.artifacts.iter().map(|a| &a.markdown_path))
            .collect()
    }
}
