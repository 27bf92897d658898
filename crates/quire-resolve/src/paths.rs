//! Relative reference rewriting for relocated content.
//!
//! When a partial is inlined into a page, or a page is written to a different
//! output directory, relative references inside it must be re-expressed from
//! the new location so they still point at the same files.

use std::path::{Component, Path, PathBuf};

const PAGE_EXTENSIONS: [&str; 2] = ["md", "mdx"];

/// Resolve `.` and `..` components without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if can_pop {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Compute the `/`-separated path leading from directory `from` to `to`.
pub fn relative_to(from: &Path, to: &Path) -> String {
    let from = normalize(from);
    let to = normalize(to);
    let from_parts: Vec<Component<'_>> = from.components().collect();
    let to_parts: Vec<Component<'_>> = to.components().collect();

    let common = from_parts
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = vec!["..".to_string(); from_parts.len() - common];
    segments.extend(
        to_parts[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );

    if segments.is_empty() {
        ".".to_string()
    } else {
        segments.join("/")
    }
}

/// Whether a reference carries a URL scheme such as `https:` or `mailto:`.
pub fn is_external(reference: &str) -> bool {
    if reference.starts_with("http") {
        return true;
    }
    match reference.split_once(':') {
        Some((scheme, _)) => {
            scheme.len() > 1
                && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Split `path?query#fragment` into the path and the rest.
fn split_suffix(reference: &str) -> (&str, &str) {
    let end = reference.find(['?', '#']).unwrap_or(reference.len());
    reference.split_at(end)
}

fn parent(doc: &Path) -> &Path {
    doc.parent().unwrap_or(Path::new(""))
}

/// Re-express `reference`, written in `containing_doc`, relative to `target_doc`.
///
/// Root-absolute paths and external URLs are returned unchanged, anchor-only
/// references are lower-cased.
pub fn rewrite_reference(reference: &str, containing_doc: &Path, target_doc: &Path) -> String {
    if reference.is_empty() || reference.starts_with('/') || is_external(reference) {
        return reference.to_string();
    }
    if reference.starts_with('#') {
        return reference.to_lowercase();
    }

    let (path, suffix) = split_suffix(reference);
    if path.is_empty() {
        return reference.to_string();
    }

    let target = parent(containing_doc).join(path);
    format!("{}{}", relative_to(parent(target_doc), &target), suffix)
}

/// Whether a reference points at a local file that is not a page.
pub fn is_local_asset(reference: &str) -> bool {
    if reference.is_empty()
        || reference.starts_with(['/', '#'])
        || is_external(reference)
    {
        return false;
    }
    let (path, _) = split_suffix(reference);
    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some(ext) => !PAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false,
    }
}

/// Rewrite a reference in a page copied from `source_doc` to `output_doc`.
///
/// Local assets are re-pointed at their source location; page links keep
/// their path (pages move together) with only the anchor lower-cased.
pub fn rewrite_asset_reference(reference: &str, source_doc: &Path, output_doc: &Path) -> String {
    if is_local_asset(reference) {
        return rewrite_reference(reference, source_doc, output_doc);
    }
    match reference.split_once('#') {
        Some((path, anchor)) if !is_external(reference) => {
            format!("{path}#{}", anchor.to_lowercase())
        }
        _ => reference.to_string(),
    }
}
