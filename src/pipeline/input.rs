//! Input resolution: validate the user-supplied document and classify it.
//!
//! We check PDF magic bytes (`%PDF`) up front so a mislabelled file fails with
//! a clear error instead of deep inside pdfium.

use crate::error::Page2MdError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A validated input document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputDocument {
    /// A PDF that must be rasterised first.
    Pdf(PathBuf),
    /// A single page raster (PNG, JPEG, ...).
    Image(PathBuf),
}

impl InputDocument {
    pub fn path(&self) -> &Path {
        match self {
            InputDocument::Pdf(p) | InputDocument::Image(p) => p,
        }
    }
}

/// True if `path` has a `.pdf` extension (case-insensitive).
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Resolve a local path, validating existence, readability and PDF magic bytes.
pub fn resolve_input(path: impl AsRef<Path>) -> Result<InputDocument, Page2MdError> {
    let path = path.as_ref().to_path_buf();

    if !path.exists() {
        return Err(Page2MdError::FileNotFound { path });
    }

    let mut file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Page2MdError::PermissionDenied { path });
        }
        Err(_) => return Err(Page2MdError::FileNotFound { path }),
    };

    if is_pdf(&path) {
        let mut magic = [0u8; 4];
        if file.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
            return Err(Page2MdError::NotAPdf { path, magic });
        }
        debug!("Resolved PDF input: {}", path.display());
        Ok(InputDocument::Pdf(path))
    } else {
        debug!("Resolved image input: {}", path.display());
        Ok(InputDocument::Image(path))
    }
}
