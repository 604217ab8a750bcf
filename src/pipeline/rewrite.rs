//! Link rewriting: point embedded image references at exported figures.
//!
//! Two independent, order-fixed passes over the whole text:
//!
//! 1. HTML `<img ... src="URL" ...>` (case-insensitive, single or double quotes)
//! 2. Markdown `![alt](URL)` (no nested parentheses in the URL)
//!
//! Each captured URL is looked up in the [`PathMapping`]. Hits are replaced,
//! misses are left exactly as they were. Only the URL characters ever change.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

/// Engine-internal figure path → exported path relative to the Markdown file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMapping {
    entries: HashMap<String, String>,
}

impl PathMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a mapping. A later insert for the same key replaces the earlier one.
    pub fn insert(&mut self, original: impl Into<String>, exported: impl Into<String>) {
        self.entries.insert(original.into(), exported.into());
    }

    pub fn get(&self, original: &str) -> Option<&str> {
        self.entries.get(original).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut m = PathMapping::new();
        for (k, v) in iter {
            m.insert(k, v);
        }
        m
    }
}

// Group 1: `<img ... src="`, group 2: URL, group 3: closing quote + rest of tag.
static RE_HTML_IMG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(<img\s+[^>]*\bsrc=["'])([^"']+)(["'][^>]*>)"#).unwrap()
});

// Group 1: `![alt](`, group 2: URL, group 3: `)`.
static RE_MD_IMG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(!\[[^\]]*\]\()([^)]+)(\))").unwrap());

/// Rewrite every HTML and Markdown image reference found in `mapping`.
pub fn rewrite(text: &str, mapping: &PathMapping) -> String {
    if mapping.is_empty() {
        return text.to_string();
    }
    let text = rewrite_html_images(text, mapping);
    rewrite_markdown_images(&text, mapping)
}

fn substitute(caps: &Captures<'_>, mapping: &PathMapping) -> String {
    let url = &caps[2];
    let target = mapping.get(url).unwrap_or(url);
    format!("{}{}{}", &caps[1], target, &caps[3])
}

fn rewrite_html_images(text: &str, mapping: &PathMapping) -> String {
    RE_HTML_IMG
        .replace_all(text, |caps: &Captures<'_>| substitute(caps, mapping))
        .into_owned()
}

fn rewrite_markdown_images(text: &str, mapping: &PathMapping) -> String {
    RE_MD_IMG
        .replace_all(text, |caps: &Captures<'_>| substitute(caps, mapping))
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> PathMapping {
        [
            ("imgs/a.jpg", "../output_images/page_0001_01_img_01.png"),
            ("imgs/b.jpg", "../output_images/page_0001_01_img_02_fallback.png"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn rewrites_markdown_image() {
        let out = rewrite("![x](imgs/a.jpg)", &mapping());
        assert_eq!(out, "![x](../output_images/page_0001_01_img_01.png)");
    }

    #[test]
    fn rewrites_markdown_image_with_empty_alt() {
        let out = rewrite("see ![](imgs/b.jpg) here", &mapping());
        assert_eq!(
            out,
            "see ![](../output_images/page_0001_01_img_02_fallback.png) here"
        );
    }

    #[test]
    fn rewrites_html_image_keeping_attributes() {
        let input = r#"<div style="text-align: center;"><img src="imgs/a.jpg" alt="Image" width="90%" /></div>"#;
        let out = rewrite(input, &mapping());
        assert_eq!(
            out,
            r#"<div style="text-align: center;"><img src="../output_images/page_0001_01_img_01.png" alt="Image" width="90%" /></div>"#
        );
    }

    #[test]
    fn html_match_is_case_insensitive_and_accepts_single_quotes() {
        let out = rewrite("<IMG alt='x' SRC='imgs/b.jpg'>", &mapping());
        assert_eq!(
            out,
            "<IMG alt='x' SRC='../output_images/page_0001_01_img_02_fallback.png'>"
        );
    }

    #[test]
    fn unknown_urls_are_untouched() {
        let input = "![x](imgs/zzz.jpg) <img src=\"imgs/zzz.jpg\">";
        assert_eq!(rewrite(input, &mapping()), input);
    }

    #[test]
    fn text_around_references_is_preserved() {
        let input = "# T\n\nbefore ![a](imgs/a.jpg) mid <img src=\"imgs/b.jpg\"> after\n";
        let out = rewrite(input, &mapping());
        assert!(out.starts_with("# T\n\nbefore ![a]("));
        assert!(out.ends_with("> after\n"));
        assert!(!out.contains("imgs/"));
    }

    #[test]
    fn all_occurrences_are_rewritten() {
        let out = rewrite("![1](imgs/a.jpg) ![2](imgs/a.jpg)", &mapping());
        assert_eq!(out.matches("page_0001_01_img_01.png").count(), 2);
    }

    #[test]
    fn second_pass_is_noop() {
        let input = "![x](imgs/a.jpg)\n<img src=\"imgs/b.jpg\">";
        let once = rewrite(input, &mapping());
        assert_eq!(rewrite(&once, &mapping()), once);
    }

    #[test]
    fn empty_mapping_returns_input() {
        let input = "![x](imgs/a.jpg)";
        assert_eq!(rewrite(input, &PathMapping::new()), input);
    }

    #[test]
    fn later_insert_wins() {
        let mut m = PathMapping::new();
        m.insert("k", "first");
        m.insert("k", "second");
        assert_eq!(m.get("k"), Some("second"));
        assert_eq!(m.len(), 1);
    }
}
