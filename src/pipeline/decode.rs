//! Image decoding: engine `img` payload → in-memory `DynamicImage`.
//!
//! Engines serialise decoded figures in one of two ways:
//!
//! * a base64 string holding an encoded image file (PNG/JPEG), optionally as
//!   a `data:image/png;base64,...` URI;
//! * an object `{width, height, channel_order, data}` where `data` is base64 of
//!   a tightly packed 8-bit, 3-channel pixel buffer. OpenCV-backed engines
//!   emit these in BGR order.
//!
//! Everything downstream works in RGB, and the PNG encoder in `image`
//! consumes RGB in memory order. The one channel swap in the crate therefore
//! happens here, on the way in.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, RgbImage};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Byte order of a 3-channel pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

/// Swap the first and third channel of every pixel (RGB ↔ BGR).
pub fn swap_red_blue(img: &mut RgbImage) {
    for px in img.pixels_mut() {
        px.0.swap(0, 2);
    }
}

/// Return `img` in RGB order given the order its bytes are currently in.
pub fn to_rgb(mut img: RgbImage, order: ChannelOrder) -> RgbImage {
    if order == ChannelOrder::Bgr {
        swap_red_blue(&mut img);
    }
    img
}

/// Why an `img` payload could not be turned into an image.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("undecodable image: {0}")]
    Image(#[from] image::ImageError),

    #[error("raw pixel object: {0}")]
    RawPayload(#[from] serde_json::Error),

    #[error("pixel buffer is {len} bytes, expected {expected} for {width}x{height}x3")]
    BufferSize {
        len: usize,
        expected: usize,
        width: u32,
        height: u32,
    },

    #[error("image has zero area ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("unsupported img payload type: {0}")]
    UnsupportedPayload(&'static str),
}

#[derive(Debug, Deserialize)]
struct RawPixels {
    width: u32,
    height: u32,
    #[serde(default)]
    channel_order: ChannelOrder,
    data: String,
}

/// Decode an engine `img` payload.
///
/// Zero-area images are rejected so the block can fall back to its box. The
/// caller decides whether an error is fatal (it never is in the pipeline).
pub fn decode_payload(value: &Value) -> Result<DynamicImage, DecodeError> {
    let img = match value {
        Value::String(s) => decode_encoded(s)?,
        Value::Object(_) => decode_raw(&RawPixels::deserialize(value)?)?,
        other => return Err(DecodeError::UnsupportedPayload(json_type(other))),
    };
    if img.width() == 0 || img.height() == 0 {
        return Err(DecodeError::EmptyImage {
            width: img.width(),
            height: img.height(),
        });
    }
    Ok(img)
}

fn decode_encoded(s: &str) -> Result<DynamicImage, DecodeError> {
    let b64 = match s.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => s,
    };
    let bytes = STANDARD.decode(b64.trim())?;
    let img = image::load_from_memory(&bytes)?;
    debug!("Decoded img payload → {}x{} px", img.width(), img.height());
    Ok(img)
}

fn decode_raw(raw: &RawPixels) -> Result<DynamicImage, DecodeError> {
    if raw.width == 0 || raw.height == 0 {
        return Err(DecodeError::EmptyImage {
            width: raw.width,
            height: raw.height,
        });
    }
    let bytes = STANDARD.decode(raw.data.trim())?;
    let expected = raw.width as usize * raw.height as usize * 3;
    if bytes.len() != expected {
        return Err(DecodeError::BufferSize {
            len: bytes.len(),
            expected,
            width: raw.width,
            height: raw.height,
        });
    }
    let img = RgbImage::from_raw(raw.width, raw.height, bytes).ok_or(DecodeError::BufferSize {
        len: expected,
        expected,
        width: raw.width,
        height: raw.height,
    })?;
    Ok(DynamicImage::ImageRgb8(to_rgb(img, raw.channel_order)))
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
