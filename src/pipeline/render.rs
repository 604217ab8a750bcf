//! PDF rasterisation: render every page to a PNG file via pdfium.
//!
//! Pages are written as `page_####.png` into a caller-owned directory (usually
//! a [`tempfile::TempDir`] that lives for the whole run), and the file paths
//! are returned in page order. The page loop then treats PDF pages exactly like
//! a user-supplied image.
//!
//! Bounding boxes from the layout engine are in raster pixels, so the DPI here
//! must match the DPI the engine was run at.

use crate::error::Page2MdError;
use crate::pipeline::naming::raster_file_name;
use image::ImageFormat;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming a directory that contains libpdfium.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// PDF user-space units per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Rasterise all pages of `pdf_path` at `dpi` into `out_dir`.
///
/// # Returns
/// One PNG path per page, in page order.
pub fn rasterize_pdf(
    pdf_path: &Path,
    dpi: u32,
    max_pixels: u32,
    password: Option<&str>,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, Page2MdError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                Page2MdError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                Page2MdError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            Page2MdError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages, rendering at {} dpi", total_pages, dpi);

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(dpi as f32 / POINTS_PER_INCH)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut paths = Vec::with_capacity(total_pages);

    for (idx, page) in pages.iter().enumerate() {
        let page_num = idx + 1;
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            Page2MdError::RasterisationFailed {
                page: page_num,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            page_num,
            image.width(),
            image.height()
        );

        let path = out_dir.join(raster_file_name(page_num));
        image
            .to_rgb8()
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| Page2MdError::RasterisationFailed {
                page: page_num,
                detail: format!("writing {}: {}", path.display(), e),
            })?;
        paths.push(path);
    }

    Ok(paths)
}

/// Bind to `$PDFIUM_LIB_PATH/libpdfium.*` if set, else the system library.
fn bind_pdfium() -> Result<Pdfium, Page2MdError> {
    let bindings = match std::env::var_os(PDFIUM_LIB_PATH_ENV) {
        Some(dir) => {
            debug!("Binding pdfium from {:?}", dir);
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&PathBuf::from(
                dir,
            )))
        }
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| Page2MdError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}
