//! Markdown assembly: join engine fragments into one document string.

use crate::pipeline::accessor::MarkdownFragments;

/// Separator placed between fragments.
pub const FRAGMENT_SEPARATOR: &str = "\n\n";

/// Join fragments with a blank line between them.
///
/// A single pre-joined string comes back unchanged; no fragments yields `""`.
/// Fragments are not reordered, deduplicated, or inspected.
pub fn assemble(fragments: &MarkdownFragments) -> String {
    match fragments {
        MarkdownFragments::Single(s) => s.clone(),
        MarkdownFragments::Many(parts) => parts.join(FRAGMENT_SEPARATOR),
    }
}
