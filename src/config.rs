//! Configuration types for page reconstruction.
//!
//! All run behaviour is controlled through [`ReconstructConfig`], built via
//! its [`ReconstructConfigBuilder`]. Setters normalise out-of-range values;
//! [`ReconstructConfigBuilder::build`] rejects what cannot be normalised.

use crate::error::Page2MdError;
use crate::progress::EventSink;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Sub-directory of `out_dir` that receives Markdown files.
pub const MARKDOWN_DIR_NAME: &str = "output_md";

/// Sub-directory of `out_dir` that receives exported figures.
pub const IMAGE_DIR_NAME: &str = "output_images";

/// Configuration for a reconstruction run.
///
/// # Example
/// ```rust
/// use page2md::{PageSelection, ReconstructConfig};
///
/// let config = ReconstructConfig::builder()
///     .out_dir("./output")
///     .dpi(200)
///     .pages(PageSelection::Range(1, 3))
///     .build()
///     .unwrap();
/// assert!(config.md_dir().ends_with("output_md"));
/// ```
#[derive(Clone)]
pub struct ReconstructConfig {
    /// Output root. Markdown lands in `<out_dir>/output_md`, figures in
    /// `<out_dir>/output_images`. Default: `./output`.
    pub out_dir: PathBuf,

    /// DPI used when rasterising PDF pages. Range: 72–600. Default: 300.
    ///
    /// Bounding boxes in engine results are in raster pixel coordinates, so
    /// this must match the DPI the engine saw.
    pub dpi: u32,

    /// Cap on either rendered page dimension in pixels. Default: 10 000.
    pub max_rendered_pixels: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Page selection. Default: all pages.
    pub pages: PageSelection,

    /// Receives pipeline events. Default: none.
    pub events: Option<EventSink>,
}

impl Default for ReconstructConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("./output"),
            dpi: 300,
            max_rendered_pixels: 10_000,
            password: None,
            pages: PageSelection::default(),
            events: None,
        }
    }
}

impl fmt::Debug for ReconstructConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconstructConfig")
            .field("out_dir", &self.out_dir)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pages", &self.pages)
            .field("events", &self.events.as_ref().map(|_| "<dyn ReconstructionEvents>"))
            .finish()
    }
}

impl ReconstructConfig {
    /// Create a new builder for `ReconstructConfig`.
    pub fn builder() -> ReconstructConfigBuilder {
        ReconstructConfigBuilder {
            config: Self::default(),
        }
    }

    /// Directory receiving `page_####_##.md` files.
    pub fn md_dir(&self) -> PathBuf {
        self.out_dir.join(MARKDOWN_DIR_NAME)
    }

    /// Directory receiving `page_####_##_img_##.png` files.
    pub fn img_dir(&self) -> PathBuf {
        self.out_dir.join(IMAGE_DIR_NAME)
    }
}

/// Builder for [`ReconstructConfig`].
#[derive(Debug)]
pub struct ReconstructConfigBuilder {
    config: ReconstructConfig,
}

impl ReconstructConfigBuilder {
    pub fn out_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.out_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn events(mut self, sink: EventSink) -> Self {
        self.config.events = Some(sink);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ReconstructConfig, Page2MdError> {
        let c = &self.config;
        if c.out_dir.as_os_str().is_empty() {
            return Err(Page2MdError::InvalidConfig(
                "Output directory must not be empty".into(),
            ));
        }
        if let PageSelection::Range(start, end) = c.pages {
            if start == 0 || start > end {
                return Err(Page2MdError::InvalidConfig(format!(
                    "Invalid page range {start}-{end}: pages are 1-indexed and start must be <= end"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Page selection ───────────────────────────────────────────────────────

/// Specifies which pages of the input document to reconstruct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// All pages (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}
