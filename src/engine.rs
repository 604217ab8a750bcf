//! Layout-engine boundary.
//!
//! The OCR/layout model is not part of this crate. [`LayoutEngine`] is the
//! seam it plugs into: given a page raster, return that page's sub-page
//! results. [`PrecomputedResults`] is the shipped implementation; it serves
//! results the engine already dumped to JSON.

use crate::error::Page2MdError;
use crate::pipeline::accessor::{JsonPageResult, PageResultSource};
use image::RgbImage;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Produces sub-page results for one page image.
pub trait LayoutEngine {
    /// Run on the RGB raster of 1-indexed page `page_num`.
    ///
    /// Results are returned in engine order; sub-page numbers are assigned
    /// from that order starting at 1.
    fn predict(
        &self,
        page_num: usize,
        image: &RgbImage,
    ) -> Result<Vec<Box<dyn PageResultSource>>, Page2MdError>;
}

/// Engine results read from JSON dumps.
///
/// Each file holds either an array (one element per sub-page) or a single
/// object (one sub-page).
#[derive(Debug, Clone)]
pub enum PrecomputedResults {
    /// One file, answering for page 1 only. Used with single-image inputs.
    File(PathBuf),
    /// A directory of `page_####.json` files, one per page.
    Dir(PathBuf),
}

impl PrecomputedResults {
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        PrecomputedResults::File(path.as_ref().to_path_buf())
    }

    pub fn from_dir(path: impl AsRef<Path>) -> Self {
        PrecomputedResults::Dir(path.as_ref().to_path_buf())
    }

    /// Directory → [`Self::Dir`], anything else → [`Self::File`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Page2MdError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Page2MdError::ResultsNotFound {
                path: path.to_path_buf(),
            });
        }
        Ok(if path.is_dir() {
            Self::from_dir(path)
        } else {
            Self::from_file(path)
        })
    }

    /// File that holds the results for `page_num`.
    pub fn results_path(&self, page_num: usize) -> Result<PathBuf, Page2MdError> {
        match self {
            PrecomputedResults::File(p) if page_num == 1 => Ok(p.clone()),
            PrecomputedResults::File(p) => Err(Page2MdError::ResultsNotFound {
                path: p.with_file_name(format!("page_{page_num:04}.json")),
            }),
            PrecomputedResults::Dir(d) => Ok(d.join(format!("page_{page_num:04}.json"))),
        }
    }
}

/// Parse one results document into sub-page results.
pub fn parse_results(json: &str, origin: &Path) -> Result<Vec<JsonPageResult>, Page2MdError> {
    let value: Value = serde_json::from_str(json).map_err(|e| Page2MdError::InvalidResults {
        path: origin.to_path_buf(),
        detail: e.to_string(),
    })?;
    match value {
        Value::Array(items) => Ok(items.into_iter().map(JsonPageResult::new).collect()),
        obj @ Value::Object(_) => Ok(vec![JsonPageResult::new(obj)]),
        other => Err(Page2MdError::InvalidResults {
            path: origin.to_path_buf(),
            detail: format!("expected an object or an array, got {other}"),
        }),
    }
}

impl LayoutEngine for PrecomputedResults {
    fn predict(
        &self,
        page_num: usize,
        image: &RgbImage,
    ) -> Result<Vec<Box<dyn PageResultSource>>, Page2MdError> {
        let path = self.results_path(page_num)?;
        let json = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Page2MdError::ResultsNotFound { path });
            }
            Err(e) => {
                return Err(Page2MdError::InvalidResults {
                    path,
                    detail: e.to_string(),
                })
            }
        };
        let results = parse_results(&json, &path)?;
        debug!(
            "Loaded {} sub-page results for page {} ({}x{}) from {}",
            results.len(),
            page_num,
            image.width(),
            image.height(),
            path.display()
        );
        Ok(results
            .into_iter()
            .map(|r| Box::new(r) as Box<dyn PageResultSource>)
            .collect())
    }
}
