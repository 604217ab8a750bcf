//! Path mapping: engine figure reference → exported file, relative to the Markdown.

use crate::output::ExportedFigure;
use crate::pipeline::rewrite::PathMapping;
use std::path::{Component, Path, PathBuf};

/// Build the mapping for one sub-page from its exported figures.
///
/// Figures without an `original_reference` are not referenced by the engine's
/// text and contribute nothing. Paths are relative to `md_dir`, the directory
/// holding the sub-page's Markdown file.
pub fn build_path_mapping(figures: &[ExportedFigure], md_dir: &Path) -> PathMapping {
    figures
        .iter()
        .filter_map(|f| {
            let original = f.original_reference.as_ref()?;
            Some((original.clone(), relative_path(&f.file_path, md_dir)))
        })
        .collect()
}

/// Path of `target` as seen from directory `base`, `/`-separated.
///
/// Works across sibling directories (`../output_images/x.png`), not only for
/// descendants of `base`. Both paths are made absolute against the current
/// directory and normalised lexically first; symlinks are not resolved.
pub fn relative_path(target: &Path, base: &Path) -> String {
    let target = normalize(&absolutize(target));
    let base = normalize(&absolutize(base));

    let t: Vec<Component<'_>> = target.components().collect();
    let b: Vec<Component<'_>> = base.components().collect();
    let common = t.iter().zip(&b).take_while(|(x, y)| x == y).count();

    let mut parts: Vec<String> = Vec::new();
    parts.extend(std::iter::repeat_n("..".to_string(), b.len() - common));
    parts.extend(
        t[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

fn absolutize(p: &Path) -> PathBuf {
    if p.is_absolute() {
        return p.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(p),
        // Both sides stay relative to the same unknown root, which still
        // yields a correct relative path.
        Err(_) => p.to_path_buf(),
    }
}

fn normalize(p: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for c in p.components() {
        match c {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::ExportMode;

    fn figure(reference: Option<&str>, path: &str) -> ExportedFigure {
        ExportedFigure {
            figure_index: 1,
            original_reference: reference.map(str::to_string),
            confidence: None,
            file_path: PathBuf::from(path),
            export_mode: ExportMode::Direct,
        }
    }

    #[test]
    fn sibling_directories() {
        assert_eq!(
            relative_path(
                Path::new("/out/output_images/page_0001_01_img_01.png"),
                Path::new("/out/output_md")
            ),
            "../output_images/page_0001_01_img_01.png"
        );
    }

    #[test]
    fn same_directory() {
        assert_eq!(
            relative_path(Path::new("/out/a.png"), Path::new("/out")),
            "a.png"
        );
    }

    #[test]
    fn descendant_and_dot_segments() {
        assert_eq!(
            relative_path(Path::new("/out/./x/../imgs/a.png"), Path::new("/out/")),
            "imgs/a.png"
        );
    }

    #[test]
    fn deeper_base() {
        assert_eq!(
            relative_path(Path::new("/a/b.png"), Path::new("/a/c/d/e")),
            "../../../b.png"
        );
    }

    #[test]
    fn identical_paths() {
        assert_eq!(relative_path(Path::new("/a/b"), Path::new("/a/b")), ".");
    }

    #[test]
    fn relative_inputs_share_cwd() {
        assert_eq!(
            relative_path(Path::new("out/imgs/a.png"), Path::new("out/md")),
            "../imgs/a.png"
        );
    }

    #[test]
    fn parent_of_root_stays_root() {
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
    }

    #[test]
    fn mapping_skips_figures_without_reference() {
        let figures = vec![
            figure(Some("imgs/a.jpg"), "/o/output_images/page_0001_01_img_01.png"),
            figure(None, "/o/output_images/page_0001_01_img_02.png"),
            figure(Some("imgs/c.jpg"), "/o/output_images/page_0001_01_img_03_fallback.png"),
        ];
        let m = build_path_mapping(&figures, Path::new("/o/output_md"));
        assert_eq!(m.len(), 2);
        assert_eq!(
            m.get("imgs/a.jpg"),
            Some("../output_images/page_0001_01_img_01.png")
        );
        assert_eq!(
            m.get("imgs/c.jpg"),
            Some("../output_images/page_0001_01_img_03_fallback.png")
        );
    }
}
