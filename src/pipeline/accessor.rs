//! Result access: normalise an engine page result into fragments + image blocks.
//!
//! Layout engines change the shape of their result objects between builds.
//! The same field may be a direct attribute, an entry of a key→value store,
//! or only visible in a generic object-state dump. [`PageResultSource`] models
//! those three lookups; [`markdown_fragments`] and [`image_blocks`] walk them in
//! a fixed order, first hit wins, and fall back to "empty" instead of failing.
//! Nothing past this module ever looks at the raw shape.

use crate::pipeline::crop::BoundingBox;
use crate::pipeline::decode;
use image::DynamicImage;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Field holding the engine's Markdown object.
pub const MARKDOWN_FIELD: &str = "markdown";
/// Key inside the Markdown object holding the text fragments.
pub const MARKDOWN_TEXTS_KEY: &str = "markdown_texts";
/// Field holding the list of image blocks.
pub const IMAGES_FIELD: &str = "imgs_in_doc";

/// One engine sub-page result, seen through the three lookup styles.
///
/// Each hook returns `None` when the result does not expose `field` that way.
/// Implementors only override the hooks their shape supports.
pub trait PageResultSource {
    /// Attribute-style access: the field sits directly on the result.
    fn attribute(&self, field: &str) -> Option<&Value> {
        let _ = field;
        None
    }

    /// Mapping-style access: the result is (or wraps) a key→value store.
    fn entry(&self, field: &str) -> Option<&Value> {
        let _ = field;
        None
    }

    /// Last resort: the object's generic internal state.
    fn state(&self, field: &str) -> Option<&Value> {
        let _ = field;
        None
    }
}

/// Resolve `field` through attribute → mapping → state. `null` counts as absent.
pub fn resolve_field<'a, S: PageResultSource + ?Sized>(source: &'a S, field: &str) -> Option<&'a Value> {
    let present = |v: Option<&'a Value>| v.filter(|v| !v.is_null());
    if let Some(v) = present(source.attribute(field)) {
        debug!("{field}: resolved via attribute");
        return Some(v);
    }
    if let Some(v) = present(source.entry(field)) {
        debug!("{field}: resolved via mapping entry");
        return Some(v);
    }
    if let Some(v) = present(source.state(field)) {
        debug!("{field}: resolved via object state");
        return Some(v);
    }
    debug!("{field}: not present, treating as empty");
    None
}

// ── JSON-backed results ──────────────────────────────────────────────────

/// An engine result loaded from a JSON dump.
///
/// * attribute → top-level key
/// * mapping   → key inside the `"res"` object
/// * state     → key inside the `"state"` object
#[derive(Debug, Clone)]
pub struct JsonPageResult {
    value: Value,
}

impl JsonPageResult {
    pub const MAPPING_KEY: &'static str = "res";
    pub const STATE_KEY: &'static str = "state";

    pub fn new(value: Value) -> Self {
        Self { value }
    }

    fn nested(&self, container: &str, field: &str) -> Option<&Value> {
        self.value.get(container)?.as_object()?.get(field)
    }
}

impl From<Value> for JsonPageResult {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl PageResultSource for JsonPageResult {
    fn attribute(&self, field: &str) -> Option<&Value> {
        self.value.as_object()?.get(field)
    }

    fn entry(&self, field: &str) -> Option<&Value> {
        self.nested(Self::MAPPING_KEY, field)
    }

    fn state(&self, field: &str) -> Option<&Value> {
        self.nested(Self::STATE_KEY, field)
    }
}

impl<T: PageResultSource + ?Sized> PageResultSource for Box<T> {
    fn attribute(&self, field: &str) -> Option<&Value> {
        (**self).attribute(field)
    }

    fn entry(&self, field: &str) -> Option<&Value> {
        (**self).entry(field)
    }

    fn state(&self, field: &str) -> Option<&Value> {
        (**self).state(field)
    }
}

// ── Plain data ───────────────────────────────────────────────────────────

/// Markdown text as the engine provided it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkdownFragments {
    /// A single pre-joined string.
    Single(String),
    /// Ordered fragments, to be joined by the assembler.
    Many(Vec<String>),
}

impl Default for MarkdownFragments {
    fn default() -> Self {
        MarkdownFragments::Many(Vec::new())
    }
}

impl From<Vec<String>> for MarkdownFragments {
    fn from(v: Vec<String>) -> Self {
        MarkdownFragments::Many(v)
    }
}

impl From<&[&str]> for MarkdownFragments {
    fn from(v: &[&str]) -> Self {
        MarkdownFragments::Many(v.iter().map(|s| s.to_string()).collect())
    }
}

impl From<&str> for MarkdownFragments {
    fn from(s: &str) -> Self {
        MarkdownFragments::Single(s.to_string())
    }
}

/// A detected figure region.
#[derive(Debug, Clone, Default)]
pub struct ImageBlock {
    pub decoded_pixels: Option<DynamicImage>,
    pub bounding_box: Option<BoundingBox>,
    /// Path the engine used for this figure inside its own Markdown.
    pub original_reference: Option<String>,
    pub confidence: Option<f64>,
}

impl ImageBlock {
    /// True when the exporter can produce a file for this block.
    pub fn is_exportable(&self) -> bool {
        self.decoded_pixels.is_some() || self.bounding_box.is_some()
    }
}

/// Plain data extracted from one engine result.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    pub fragments: MarkdownFragments,
    pub blocks: Vec<ImageBlock>,
}

/// Extract fragments and image blocks from a result. Never fails.
pub fn extract<S: PageResultSource + ?Sized>(source: &S) -> PageContent {
    PageContent {
        fragments: markdown_fragments(source),
        blocks: image_blocks(source),
    }
}

/// Resolve `markdown.markdown_texts`.
///
/// A bare string or array at `markdown` is accepted as the texts themselves.
pub fn markdown_fragments<S: PageResultSource + ?Sized>(source: &S) -> MarkdownFragments {
    let Some(md) = resolve_field(source, MARKDOWN_FIELD) else {
        return MarkdownFragments::default();
    };
    let texts = match md {
        Value::Object(obj) => match obj.get(MARKDOWN_TEXTS_KEY) {
            Some(v) => v,
            None => return MarkdownFragments::default(),
        },
        other => other,
    };
    match texts {
        Value::String(s) => MarkdownFragments::Single(s.clone()),
        Value::Array(items) => MarkdownFragments::Many(items.iter().map(coerce_text).collect()),
        Value::Null => MarkdownFragments::default(),
        other => {
            debug!("markdown texts is a bare {other}, coercing to a single string");
            MarkdownFragments::Single(coerce_text(other))
        }
    }
}

/// Resolve `imgs_in_doc` into blocks, one per entry, in order.
pub fn image_blocks<S: PageResultSource + ?Sized>(source: &S) -> Vec<ImageBlock> {
    match resolve_field(source, IMAGES_FIELD) {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_block(i + 1, item))
            .collect(),
        Some(other) => {
            warn!("{IMAGES_FIELD} is not a list ({other}); treating as empty");
            Vec::new()
        }
        None => Vec::new(),
    }
}

fn coerce_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn parse_block(index: usize, item: &Value) -> ImageBlock {
    let Some(obj) = item.as_object() else {
        debug!("image block {index} is not an object; keeping an empty slot");
        return ImageBlock::default();
    };

    let original_reference = obj
        .get("path")
        .and_then(Value::as_str)
        .map(str::to_string);

    let decoded_pixels = match obj.get("img") {
        None | Some(Value::Null) => None,
        Some(payload) => match decode::decode_payload(payload) {
            Ok(img) => Some(img),
            Err(reason) => {
                warn!("image block {index}: ignoring undecodable img ({reason})");
                None
            }
        },
    };

    ImageBlock {
        decoded_pixels,
        bounding_box: parse_coordinate(index, obj),
        original_reference,
        confidence: obj.get("score").and_then(Value::as_f64),
    }
}

fn parse_coordinate(index: usize, obj: &Map<String, Value>) -> Option<BoundingBox> {
    let coords = match obj.get("coordinate")? {
        Value::Array(items) => items,
        Value::Null => return None,
        other => {
            warn!("image block {index}: coordinate is not a list ({other})");
            return None;
        }
    };
    if coords.len() != 4 {
        warn!(
            "image block {index}: coordinate has {} values, expected 4",
            coords.len()
        );
        return None;
    }
    let mut out = [0i64; 4];
    for (slot, v) in out.iter_mut().zip(coords) {
        let n = match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match n {
            Some(f) if f.is_finite() => *slot = f.trunc() as i64,
            _ => {
                warn!("image block {index}: non-numeric coordinate {v}");
                return None;
            }
        }
    }
    Some(BoundingBox::new(out[0], out[1], out[2], out[3]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// A result whose three lookup styles are populated independently.
    struct Layered {
        attr: Option<Value>,
        mapping: Option<Value>,
        state: Option<Value>,
    }

    impl PageResultSource for Layered {
        fn attribute(&self, field: &str) -> Option<&Value> {
            self.attr.as_ref()?.get(field)
        }
        fn entry(&self, field: &str) -> Option<&Value> {
            self.mapping.as_ref()?.get(field)
        }
        fn state(&self, field: &str) -> Option<&Value> {
            self.state.as_ref()?.get(field)
        }
    }

    fn texts(frags: MarkdownFragments) -> Vec<String> {
        match frags {
            MarkdownFragments::Many(v) => v,
            MarkdownFragments::Single(s) => vec![s],
        }
    }

    #[test]
    fn attribute_wins_over_mapping() {
        let r = Layered {
            attr: Some(json!({"markdown": {"markdown_texts": ["from attribute"]}})),
            mapping: Some(json!({"markdown": {"markdown_texts": ["from mapping"]}})),
            state: None,
        };
        assert_eq!(texts(markdown_fragments(&r)), vec!["from attribute"]);
    }

    #[test]
    fn mapping_wins_over_state() {
        let r = Layered {
            attr: None,
            mapping: Some(json!({"imgs_in_doc": [{"path": "m.jpg"}]})),
            state: Some(json!({"imgs_in_doc": [{"path": "s.jpg"}, {"path": "t.jpg"}]})),
        };
        let blocks = image_blocks(&r);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].original_reference.as_deref(), Some("m.jpg"));
    }

    #[test]
    fn state_is_last_resort() {
        let r = Layered {
            attr: Some(json!({"other": 1})),
            mapping: None,
            state: Some(json!({"imgs_in_doc": [{"coordinate": [1, 2, 3, 4]}]})),
        };
        let blocks = image_blocks(&r);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].bounding_box, Some(BoundingBox::new(1, 2, 3, 4)));
    }

    #[test]
    fn null_attribute_falls_through() {
        let r = Layered {
            attr: Some(json!({"imgs_in_doc": null})),
            mapping: Some(json!({"imgs_in_doc": [{}]})),
            state: None,
        };
        assert_eq!(image_blocks(&r).len(), 1);
    }

    #[test]
    fn missing_everything_is_empty() {
        let r = Layered {
            attr: None,
            mapping: None,
            state: None,
        };
        let content = extract(&r);
        assert_eq!(content.fragments, MarkdownFragments::Many(vec![]));
        assert!(content.blocks.is_empty());
    }

    #[test]
    fn json_result_maps_res_and_state() {
        let r = JsonPageResult::new(json!({
            "res": {"markdown": {"markdown_texts": "joined"}},
            "state": {"imgs_in_doc": [{"path": "imgs/a.jpg"}]},
        }));
        let content = extract(&r);
        assert_eq!(content.fragments, MarkdownFragments::Single("joined".into()));
        assert_eq!(content.blocks.len(), 1);
    }

    #[test]
    fn markdown_without_texts_key_is_empty() {
        let r = JsonPageResult::new(json!({"markdown": {"page_index": 0}}));
        assert_eq!(markdown_fragments(&r), MarkdownFragments::Many(vec![]));
    }

    #[test]
    fn bare_markdown_array_is_accepted() {
        let r = JsonPageResult::new(json!({"markdown": ["a", 2, null]}));
        assert_eq!(texts(markdown_fragments(&r)), vec!["a", "2", ""]);
    }

    #[test]
    fn coordinates_are_truncated_to_integers() {
        let r = JsonPageResult::new(json!({
            "imgs_in_doc": [{"coordinate": [10.9, "20.2", 30, -4.7], "score": 0.93}]
        }));
        let block = &image_blocks(&r)[0];
        assert_eq!(block.bounding_box, Some(BoundingBox::new(10, 20, 30, -4)));
        assert_eq!(block.confidence, Some(0.93));
    }

    #[test]
    fn malformed_coordinate_is_dropped() {
        let r = JsonPageResult::new(json!({
            "imgs_in_doc": [{"coordinate": [1, 2, 3]}, {"coordinate": "1,2,3,4"}]
        }));
        let blocks = image_blocks(&r);
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| b.bounding_box.is_none()));
    }

    #[test]
    fn non_object_block_keeps_its_slot() {
        let r = JsonPageResult::new(json!({
            "imgs_in_doc": ["junk", {"path": "imgs/b.jpg", "coordinate": [0, 0, 1, 1]}]
        }));
        let blocks = image_blocks(&r);
        assert_eq!(blocks.len(), 2);
        assert!(!blocks[0].is_exportable());
        assert!(blocks[1].is_exportable());
    }

    #[test]
    fn undecodable_img_falls_back_to_box() {
        let r = JsonPageResult::new(json!({
            "imgs_in_doc": [{"img": "%%%", "coordinate": [0, 0, 5, 5]}]
        }));
        let block = &image_blocks(&r)[0];
        assert!(block.decoded_pixels.is_none());
        assert!(block.bounding_box.is_some());
    }
}
