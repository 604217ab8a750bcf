//! Pipeline stages for page reconstruction.
//!
//! Each submodule implements exactly one transformation step and is tested on
//! its own. [`crate::reconstruct`] wires them together.
//!
//! ## Data Flow
//!
//! ```text
//!  engine result ──▶ accessor ──┬──▶ export ──▶ mapping ──┐
//!  (JSON / dyn)      (fields)   │   (PNG files) (rel paths)│
//!                               └──▶ assemble ──▶ rewrite ◀┘──▶ page_####_##.md
//! ```
//!
//! 1. [`accessor`]: resolve `markdown` / `imgs_in_doc` across result shapes;
//!    [`decode`] turns serialised `img` payloads into images
//! 2. [`export`]: save decoded figures, or [`crop`] them from the page raster
//! 3. [`mapping`]: engine path → exported path relative to the Markdown dir
//! 4. [`assemble`]: join fragments with blank lines
//! 5. [`rewrite`]: swap image URLs in HTML and Markdown syntax
//!
//! [`input`] and [`render`] sit in front of all of this and turn the user's
//! document into page rasters.

pub mod accessor;
pub mod assemble;
pub mod crop;
pub mod decode;
pub mod export;
pub mod input;
pub mod mapping;
pub mod naming;
pub mod render;
pub mod rewrite;
