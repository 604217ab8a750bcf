//! Figure export: write every image block of a sub-page to a canonical file.
//!
//! Figure indices are handed out by position among *all* blocks, before any
//! block is filtered. A skipped block burns its index so the numbers in later
//! file names stay aligned with the engine's block order, and each
//! [`ExportedFigure`] carries its own `original_reference` so link mapping
//! never has to zip two independently filtered lists.

use crate::error::Page2MdError;
use crate::output::{ExportMode, ExportedFigure, FigureExport, SkipReason, SkippedBlock};
use crate::pipeline::accessor::ImageBlock;
use crate::pipeline::crop;
use crate::pipeline::naming::figure_file_name;
use crate::progress::ReconstructionEvents;
use image::{DynamicImage, ImageFormat, RgbImage};
use std::path::Path;
use tracing::{info, warn};

/// Export `blocks` for sub-page `subpage_num` of page `page_num` into `out_dir`.
///
/// * decoded pixels → saved as-is, [`ExportMode::Direct`]
/// * bounding box only → cropped from `source`, [`ExportMode::FallbackCrop`]
/// * neither, or a zero-area crop → no file, recorded in `skipped`
///
/// A zero-area decoded image counts as no pixels.
///
/// # Errors
/// [`Page2MdError::FigureWriteFailed`] on the first figure that cannot be
/// written. Files already written for this sub-page are left in place.
pub fn export_figures(
    blocks: &[ImageBlock],
    source: &RgbImage,
    page_num: usize,
    subpage_num: usize,
    out_dir: &Path,
    events: &dyn ReconstructionEvents,
) -> Result<FigureExport, Page2MdError> {
    let mut export = FigureExport::default();

    for (i, block) in blocks.iter().enumerate() {
        let figure_index = i + 1;

        let decoded = block
            .decoded_pixels
            .as_ref()
            .filter(|img| img.width() > 0 && img.height() > 0);
        if decoded.is_none() && block.decoded_pixels.is_some() {
            warn!(
                "Figure {figure_index} of page {page_num} sub-page {subpage_num}: \
                 decoded image has zero area, ignoring it"
            );
        }

        let (mode, pixels) = if let Some(img) = decoded {
            (ExportMode::Direct, Pixels::Decoded(img))
        } else if let Some(bbox) = block.bounding_box {
            let cropped = crop::crop(source, bbox);
            if cropped.width() == 0 || cropped.height() == 0 {
                warn!(
                    "Skipping figure {figure_index} of page {page_num} sub-page {subpage_num}: \
                     box {bbox:?} is empty after clamping to {}x{}",
                    source.width(),
                    source.height()
                );
                let at = (page_num, subpage_num, figure_index);
                skip(&mut export, block, at, SkipReason::EmptyCrop, events);
                continue;
            }
            (ExportMode::FallbackCrop, Pixels::Cropped(cropped))
        } else {
            warn!(
                "Skipping figure {figure_index} of page {page_num} sub-page {subpage_num}: \
                 no pixels and no coordinates"
            );
            let at = (page_num, subpage_num, figure_index);
            skip(&mut export, block, at, SkipReason::NoPixelsOrBox, events);
            continue;
        };

        let file_path = out_dir.join(figure_file_name(page_num, subpage_num, figure_index, mode));
        pixels
            .save_png(&file_path)
            .map_err(|source| Page2MdError::FigureWriteFailed {
                path: file_path.clone(),
                source,
            })?;

        let figure = ExportedFigure {
            figure_index,
            original_reference: block.original_reference.clone(),
            confidence: block.confidence,
            file_path,
            export_mode: mode,
        };
        match mode {
            ExportMode::Direct => info!("Figure saved: {}", figure.file_path.display()),
            ExportMode::FallbackCrop => {
                info!("Figure (fallback) saved: {}", figure.file_path.display())
            }
        }
        events.on_figure_saved(&figure);
        export.figures.push(figure);
    }

    Ok(export)
}

enum Pixels<'a> {
    Decoded(&'a DynamicImage),
    Cropped(RgbImage),
}

impl Pixels<'_> {
    /// Both variants are RGB(A) in memory, which is what the PNG encoder
    /// consumes, so neither needs a channel swap here.
    fn save_png(&self, path: &Path) -> Result<(), image::ImageError> {
        match self {
            Pixels::Decoded(img) => img.save_with_format(path, ImageFormat::Png),
            Pixels::Cropped(img) => img.save_with_format(path, ImageFormat::Png),
        }
    }
}

fn skip(
    export: &mut FigureExport,
    block: &ImageBlock,
    (page_num, subpage_num, figure_index): (usize, usize, usize),
    reason: SkipReason,
    events: &dyn ReconstructionEvents,
) {
    let skipped = SkippedBlock {
        page_num,
        subpage_num,
        figure_index,
        original_reference: block.original_reference.clone(),
        reason,
    };
    events.on_figure_skipped(&skipped);
    export.skipped.push(skipped);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::crop::BoundingBox;
    use crate::progress::NoopEvents;
    use image::Rgb;

    fn page(w: u32, h: u32) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb([200, 10, 10]))
    }

    fn decoded(w: u32, h: u32) -> ImageBlock {
        ImageBlock {
            decoded_pixels: Some(DynamicImage::ImageRgb8(RgbImage::from_pixel(
                w,
                h,
                Rgb([0, 0, 255]),
            ))),
            ..ImageBlock::default()
        }
    }

    fn boxed(b: [i64; 4]) -> ImageBlock {
        ImageBlock {
            bounding_box: Some(BoundingBox::from(b)),
            ..ImageBlock::default()
        }
    }

    #[test]
    fn direct_export_uses_plain_name() {
        let dir = tempfile::tempdir().unwrap();
        let out = export_figures(&[decoded(3, 2)], &page(10, 10), 1, 1, dir.path(), &NoopEvents)
            .unwrap();
        assert_eq!(out.figures.len(), 1);
        let f = &out.figures[0];
        assert_eq!(f.export_mode, ExportMode::Direct);
        assert_eq!(f.file_path, dir.path().join("page_0001_01_img_01.png"));
        let saved = image::open(&f.file_path).unwrap();
        assert_eq!((saved.width(), saved.height()), (3, 2));
    }

    #[test]
    fn fallback_export_crops_and_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        let out = export_figures(
            &[boxed([10, 10, 5000, 5000])],
            &page(200, 200),
            2,
            3,
            dir.path(),
            &NoopEvents,
        )
        .unwrap();
        let f = &out.figures[0];
        assert_eq!(f.export_mode, ExportMode::FallbackCrop);
        assert_eq!(f.file_path, dir.path().join("page_0002_03_img_01_fallback.png"));
        let saved = image::open(&f.file_path).unwrap().to_rgb8();
        assert_eq!(saved.dimensions(), (190, 190));
    }

    #[test]
    fn fallback_crop_keeps_rgb_order_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let out = export_figures(
            &[boxed([0, 0, 4, 4])],
            &page(8, 8),
            1,
            1,
            dir.path(),
            &NoopEvents,
        )
        .unwrap();
        let saved = image::open(&out.figures[0].file_path).unwrap().to_rgb8();
        assert_eq!(saved.get_pixel(0, 0), &Rgb([200, 10, 10]));
    }

    #[test]
    fn decoded_pixels_take_precedence_over_box() {
        let dir = tempfile::tempdir().unwrap();
        let mut block = decoded(2, 2);
        block.bounding_box = Some(BoundingBox::new(0, 0, 5, 5));
        let out =
            export_figures(&[block], &page(10, 10), 1, 1, dir.path(), &NoopEvents).unwrap();
        assert_eq!(out.figures[0].export_mode, ExportMode::Direct);
    }

    #[test]
    fn skipped_block_consumes_its_index() {
        let dir = tempfile::tempdir().unwrap();
        let blocks = vec![decoded(2, 2), ImageBlock::default(), boxed([0, 0, 3, 3])];
        let out =
            export_figures(&blocks, &page(10, 10), 1, 1, dir.path(), &NoopEvents).unwrap();

        assert_eq!(out.consumed_indices(), 3);
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(out.skipped[0].figure_index, 2);
        assert_eq!(out.skipped[0].reason, SkipReason::NoPixelsOrBox);

        let names: Vec<_> = out
            .figures
            .iter()
            .map(|f| f.file_path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["page_0001_01_img_01.png", "page_0001_01_img_03_fallback.png"]
        );
        assert!(!dir.path().join("page_0001_01_img_02.png").exists());
    }

    #[test]
    fn empty_crop_is_skipped_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let out = export_figures(
            &[boxed([50, 50, 10, 10])],
            &page(20, 20),
            1,
            1,
            dir.path(),
            &NoopEvents,
        )
        .unwrap();
        assert!(out.figures.is_empty());
        assert_eq!(out.skipped[0].reason, SkipReason::EmptyCrop);
        assert!(!dir
            .path()
            .join("page_0001_01_img_01_fallback.png")
            .exists());
    }

    #[test]
    fn zero_area_decoded_image_falls_back_to_box() {
        let dir = tempfile::tempdir().unwrap();
        let mut with_box = decoded(0, 0);
        with_box.bounding_box = Some(BoundingBox::new(0, 0, 4, 4));
        let blocks = vec![decoded(0, 0), with_box];
        let out =
            export_figures(&blocks, &page(10, 10), 1, 1, dir.path(), &NoopEvents).unwrap();

        assert_eq!(out.consumed_indices(), 2);
        assert_eq!(out.skipped[0].figure_index, 1);
        assert_eq!(out.skipped[0].reason, SkipReason::NoPixelsOrBox);
        assert_eq!(out.figures[0].figure_index, 2);
        assert_eq!(out.figures[0].export_mode, ExportMode::FallbackCrop);
        assert!(!dir.path().join("page_0001_01_img_01.png").exists());
        assert!(dir.path().join("page_0001_01_img_02_fallback.png").exists());
    }

    #[test]
    fn original_reference_travels_with_figure() {
        let dir = tempfile::tempdir().unwrap();
        let mut block = decoded(1, 1);
        block.original_reference = Some("imgs/a.jpg".into());
        block.confidence = Some(0.5);
        let out =
            export_figures(&[block], &page(4, 4), 1, 1, dir.path(), &NoopEvents).unwrap();
        assert_eq!(out.figures[0].original_reference.as_deref(), Some("imgs/a.jpg"));
        assert_eq!(out.figures[0].confidence, Some(0.5));
    }

    #[test]
    fn missing_out_dir_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does/not/exist");
        let err = export_figures(&[decoded(1, 1)], &page(4, 4), 1, 1, &missing, &NoopEvents)
            .unwrap_err();
        assert!(matches!(err, Page2MdError::FigureWriteFailed { .. }));
    }
}
