//! Canonical output file names.
//!
//! Every name is derived from the 1-based page, sub-page and figure indices,
//! so names never collide within a run and never depend on processing order.

use crate::output::ExportMode;

/// `page_{p:04}_{s:02}.md`
pub fn markdown_file_name(page_num: usize, subpage_num: usize) -> String {
    format!("page_{page_num:04}_{subpage_num:02}.md")
}

/// `page_{p:04}_{s:02}_img_{i:02}.png`, with `_fallback` before the extension
/// for cropped figures.
pub fn figure_file_name(
    page_num: usize,
    subpage_num: usize,
    figure_index: usize,
    mode: ExportMode,
) -> String {
    let suffix = match mode {
        ExportMode::Direct => "",
        ExportMode::FallbackCrop => "_fallback",
    };
    format!("page_{page_num:04}_{subpage_num:02}_img_{figure_index:02}{suffix}.png")
}

/// `page_{n:04}.png`, used for rasterised PDF pages.
pub fn raster_file_name(page_num: usize) -> String {
    format!("page_{page_num:04}.png")
}
