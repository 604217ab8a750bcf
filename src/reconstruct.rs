//! Page orchestration: turn engine results into Markdown files on disk.
//!
//! Three entry points, from narrow to wide:
//!
//! * [`reconstruct_content`]: one sub-page, already extracted into plain data
//! * [`reconstruct_page`]: every sub-page result of one page raster
//! * [`reconstruct_document`]: the page loop over a PDF or image input
//!
//! Per sub-page the steps are fixed: export figures → build the path mapping
//! → assemble fragments → rewrite image links → write `page_####_##.md`.
//! Nothing is retried. A write failure ends the sub-page (and its page) with
//! an error; sub-pages written before it are kept, and [`reconstruct_document`]
//! records both before moving on to the next page.

use crate::config::{PageSelection, ReconstructConfig};
use crate::engine::LayoutEngine;
use crate::error::{Page2MdError, PageError};
use crate::output::{
    DocumentArtifact, ExportMode, PageReport, ReconstructionReport, ReconstructionStats,
};
use crate::pipeline::accessor::{self, PageContent, PageResultSource};
use crate::pipeline::input::{self, InputDocument};
use crate::pipeline::naming::markdown_file_name;
use crate::pipeline::{assemble, export, mapping, render, rewrite};
use crate::progress::{NoopEvents, ReconstructionEvents};
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Where a page's output goes.
#[derive(Debug, Clone)]
pub struct OutputDirs {
    pub md_dir: PathBuf,
    pub img_dir: PathBuf,
}

impl OutputDirs {
    pub fn new(md_dir: impl AsRef<Path>, img_dir: impl AsRef<Path>) -> Self {
        Self {
            md_dir: md_dir.as_ref().to_path_buf(),
            img_dir: img_dir.as_ref().to_path_buf(),
        }
    }

    /// `<out_dir>/output_md` and `<out_dir>/output_images`.
    pub fn from_config(config: &ReconstructConfig) -> Self {
        Self::new(config.md_dir(), config.img_dir())
    }

    /// Create both directories.
    pub fn create(&self) -> Result<(), Page2MdError> {
        for dir in [&self.md_dir, &self.img_dir] {
            std::fs::create_dir_all(dir).map_err(|source| Page2MdError::OutputDirFailed {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Reconstruct one sub-page from already-extracted content.
pub fn reconstruct_content(
    content: &PageContent,
    source: &RgbImage,
    page_num: usize,
    subpage_num: usize,
    dirs: &OutputDirs,
    events: &dyn ReconstructionEvents,
) -> Result<DocumentArtifact, Page2MdError> {
    let figures = export::export_figures(
        &content.blocks,
        source,
        page_num,
        subpage_num,
        &dirs.img_dir,
        events,
    )?;

    let md_path = dirs.md_dir.join(markdown_file_name(page_num, subpage_num));
    let path_mapping = mapping::build_path_mapping(&figures.figures, &dirs.md_dir);
    debug!(
        "Page {page_num} sub-page {subpage_num}: {} figures, {} mapped references",
        figures.figures.len(),
        path_mapping.len()
    );

    let markdown = assemble::assemble(&content.fragments);
    let markdown = rewrite::rewrite(&markdown, &path_mapping);

    write_markdown(&md_path, &markdown)?;
    info!("MD saved (rewritten): {}", md_path.display());

    let artifact = DocumentArtifact {
        page_num,
        subpage_num,
        markdown_path: md_path,
        markdown,
        figures: figures.figures,
        skipped: figures.skipped,
    };
    events.on_markdown_saved(&artifact);
    Ok(artifact)
}

/// Reconstruct one sub-page straight from an engine result.
pub fn reconstruct_subpage<S: PageResultSource + ?Sized>(
    result: &S,
    source: &RgbImage,
    page_num: usize,
    subpage_num: usize,
    dirs: &OutputDirs,
    events: &dyn ReconstructionEvents,
) -> Result<DocumentArtifact, Page2MdError> {
    let content = accessor::extract(result);
    reconstruct_content(&content, source, page_num, subpage_num, dirs, events)
}

/// Reconstruct every sub-page result of page `page_num`, numbering them from 1.
///
/// Stops at the first sub-page that fails to write. The artifacts of the
/// sub-pages finished before it are returned alongside the error, since their
/// files are already on disk.
pub fn reconstruct_page<S: PageResultSource>(
    results: &[S],
    source: &RgbImage,
    page_num: usize,
    dirs: &OutputDirs,
    events: &dyn ReconstructionEvents,
) -> (Vec<DocumentArtifact>, Option<Page2MdError>) {
    let mut artifacts = Vec::with_capacity(results.len());
    for (i, result) in results.iter().enumerate() {
        match reconstruct_subpage(result, source, page_num, i + 1, dirs, events) {
            Ok(artifact) => artifacts.push(artifact),
            Err(e) => return (artifacts, Some(e)),
        }
    }
    (artifacts, None)
}

/// Atomic write: temp file next to the target, then rename.
fn write_markdown(path: &Path, markdown: &str) -> Result<(), Page2MdError> {
    let tmp_path = path.with_extension("md.tmp");
    std::fs::write(&tmp_path, markdown).map_err(|source| Page2MdError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::rename(&tmp_path, path).map_err(|source| {
        let _ = std::fs::remove_file(&tmp_path);
        Page2MdError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        }
    })
}

// ── Document driver ──────────────────────────────────────────────────────

/// Page rasters of the input document.
///
/// For PDFs the rasters live in a temp directory that is removed when this
/// value is dropped.
struct PageRasters {
    paths: Vec<PathBuf>,
    _scratch: Option<TempDir>,
}

fn page_rasters(doc: &InputDocument, config: &ReconstructConfig) -> Result<PageRasters, Page2MdError> {
    match doc {
        InputDocument::Image(path) => Ok(PageRasters {
            paths: vec![path.clone()],
            _scratch: None,
        }),
        InputDocument::Pdf(path) => {
            info!("Converting PDF → images @ {} dpi", config.dpi);
            let scratch = tempfile::Builder::new()
                .prefix("page2md_")
                .tempdir()
                .map_err(|e| Page2MdError::Internal(format!("tempdir: {e}")))?;
            let paths = render::rasterize_pdf(
                path,
                config.dpi,
                config.max_rendered_pixels,
                config.password.as_deref(),
                scratch.path(),
            )?;
            Ok(PageRasters {
                paths,
                _scratch: Some(scratch),
            })
        }
    }
}

/// Reconstruct a whole PDF or image document.
///
/// # Errors
/// Fatal errors only: bad input, output directories that cannot be created,
/// rasterisation failure, an empty page selection, or every page failing
/// without a single Markdown file written. Individual page failures are
/// reported in [`PageReport::error`], next to any sub-pages the page did finish.
pub fn reconstruct_document(
    input_path: impl AsRef<Path>,
    engine: &dyn LayoutEngine,
    config: &ReconstructConfig,
) -> Result<ReconstructionReport, Page2MdError> {
    let total_start = Instant::now();
    let noop = NoopEvents;
    let events: &dyn ReconstructionEvents = match &config.events {
        Some(sink) => sink.as_ref(),
        None => &noop,
    };

    let dirs = OutputDirs::from_config(config);
    dirs.create()?;

    let doc = input::resolve_input(input_path)?;
    info!("Starting reconstruction: {}", doc.path().display());
    let rasters = page_rasters(&doc, config)?;
    let total_pages = rasters.paths.len();

    let selected = config.pages.to_indices(total_pages);
    if selected.is_empty() {
        let page = match &config.pages {
            PageSelection::All => 1,
            PageSelection::Single(p) | PageSelection::Range(p, _) => *p,
            PageSelection::Set(pages) => pages.first().copied().unwrap_or(1),
        };
        return Err(Page2MdError::PageOutOfRange {
            page,
            total: total_pages,
        });
    }
    let total_selected = selected.len();
    events.on_document_start(total_selected);

    let mut pages = Vec::with_capacity(total_selected);
    for &idx in &selected {
        let page_num = idx + 1;
        let path = &rasters.paths[idx];
        events.on_page_start(page_num, total_selected);

        let report = |artifacts: Vec<DocumentArtifact>, error: Option<PageError>| PageReport {
            page_num,
            source: path.clone(),
            artifacts,
            error,
        };

        let image = match image::open(path) {
            Ok(img) => img.to_rgb8(),
            Err(e) => {
                warn!("Skipping unreadable image: {} ({})", path.display(), e);
                let error = PageError::Unreadable {
                    page: page_num,
                    path: path.clone(),
                    detail: e.to_string(),
                };
                events.on_page_skipped(page_num, total_selected, &error.to_string());
                pages.push(report(Vec::new(), Some(error)));
                continue;
            }
        };

        info!(
            "Processing page {} ({})",
            page_num,
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        let results = match engine.predict(page_num, &image) {
            Ok(r) => r,
            Err(e) => {
                warn!("Page {}: layout engine failed: {}", page_num, e);
                let error = PageError::EngineFailed {
                    page: page_num,
                    detail: e.to_string(),
                };
                events.on_page_error(page_num, total_selected, &error.to_string());
                pages.push(report(Vec::new(), Some(error)));
                continue;
            }
        };

        match reconstruct_page(&results, &image, page_num, &dirs, events) {
            (artifacts, None) => {
                events.on_page_complete(page_num, total_selected, artifacts.len());
                pages.push(report(artifacts, None));
            }
            (artifacts, Some(e)) => {
                warn!(
                    "Page {}: {} ({} sub-page(s) written before the failure)",
                    page_num,
                    e,
                    artifacts.len()
                );
                let error = PageError::WriteFailed {
                    page: page_num,
                    detail: e.to_string(),
                };
                events.on_page_error(page_num, total_selected, &error.to_string());
                pages.push(report(artifacts, Some(error)));
            }
        }
    }

    let stats = compute_stats(&pages, total_pages, total_start);

    if stats.processed_pages == 0 && stats.subpages == 0 {
        let first_error = pages
            .iter()
            .find_map(|p| p.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(Page2MdError::AllPagesFailed {
            total: pages.len(),
            first_error,
        });
    }

    info!(
        "Done: {}/{} pages, {} sub-pages, {}ms → {}",
        stats.processed_pages,
        total_selected,
        stats.subpages,
        stats.total_duration_ms,
        config.out_dir.display()
    );
    events.on_document_complete(total_selected, stats.processed_pages);

    Ok(ReconstructionReport { pages, stats })
}

fn compute_stats(pages: &[PageReport], total_pages: usize, start: Instant) -> ReconstructionStats {
    let artifacts = || pages.iter().flat_map(|p| p.artifacts.iter());
    let figures = || artifacts().flat_map(|a| a.figures.iter());
    ReconstructionStats {
        total_pages,
        processed_pages: pages.iter().filter(|p| p.is_success()).count(),
        failed_pages: pages
            .iter()
            .filter(|p| matches!(p.error, Some(ref e) if !matches!(e, PageError::Unreadable { .. })))
            .count(),
        skipped_pages: pages
            .iter()
            .filter(|p| matches!(p.error, Some(PageError::Unreadable { .. })))
            .count(),
        subpages: artifacts().count(),
        figures_direct: figures()
            .filter(|f| f.export_mode == ExportMode::Direct)
            .count(),
        figures_fallback: figures()
            .filter(|f| f.export_mode == ExportMode::FallbackCrop)
            .count(),
        figures_skipped: artifacts().map(|a| a.skipped.len()).sum(),
        total_duration_ms: start.elapsed().as_millis() as u64,
    }
}
