//! Identifier normalization shared by the repositories, the section parser and the builder.
//!
//! - [`slug`] turns arbitrary text (titles, wiki link targets) into an id-safe form.
//! - [`Slugger`] memoizes [`slug`] for the lifetime of its owner.
//! - [`document_id`] derives a document id from a file name or external identifier.
//! - [`relative_link_target`] maps a `./relative/link.md` url onto a document id.
//! - [`content_hash`] is a cheap, non-cryptographic checksum.

use std::{collections::HashMap, path::Path};
use unicode_normalization::UnicodeNormalization;

pub const MARKDOWN_EXTENSION: &str = "md";

/// Normalize `text` to a link name: spaces, slashes and dots become hyphens, the result is
/// lower-cased, accents are folded by canonical decomposition, and everything outside
/// `[a-z0-9-]` is dropped.
///
/// ```
/// use markdown_graph::paths::slug;
/// assert_eq!(slug("Café"), "cafe");
/// assert_eq!(slug("Section 1.1"), "section-1-1");
/// ```
pub fn slug(text: &str) -> String {
    text.replace([' ', '/', '\\', '.'], "-")
        .to_lowercase()
        .nfd()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

/// Memoization table for [`slug`].
#[derive(Debug, Default, Clone)]
pub struct Slugger {
    cache: HashMap<String, String>,
}

impl Slugger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slug(&mut self, text: &str) -> String {
        if let Some(cached) = self.cache.get(text) {
            return cached.clone();
        }
        let result = slug(text);
        self.cache.insert(text.to_string(), result.clone());
        result
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

fn strip_markdown_extension(name: &str) -> &str {
    name.strip_suffix(".md").unwrap_or(name)
}

/// Document id for a file name or path: basename only, `.md` stripped, lower-cased.
pub fn document_id(name: &str) -> String {
    let basename = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(name);
    strip_markdown_extension(basename).to_lowercase()
}

/// Canonical id for an identifier that is not a path (in-memory keys).
pub fn canonical_id(id: &str) -> String {
    strip_markdown_extension(id).to_lowercase()
}

/// Whether `path` names a markdown document.
pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == MARKDOWN_EXTENSION)
        .unwrap_or(false)
}

/// Target node id of a relative link url such as `./notes/Other.md#Some Heading`, or `None`
/// if `url` is not relative to the current document.
pub fn relative_link_target(url: &str, slugger: &mut Slugger) -> Option<String> {
    if !url.starts_with("./") {
        return None;
    }
    let (path, fragment) = match url.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (url, None),
    };
    let trimmed = strip_markdown_extension(path.trim_end_matches('/'));
    let stem = trimmed
        .rsplit_once('/')
        .map(|(_, last)| last)
        .unwrap_or(trimmed)
        .to_lowercase();
    if stem.is_empty() {
        return None;
    }
    match fragment.map(|f| slugger.slug(f)).filter(|f| !f.is_empty()) {
        Some(anchor) => Some(format!("{stem}#{anchor}")),
        None => Some(stem),
    }
}

/// Classic 31-multiplier string checksum over UTF-16 code units, rendered in base 36.
pub fn content_hash(source: &str) -> String {
    if source.is_empty() {
        return "0".to_string();
    }
    let hash = source.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(unit as i32)
    });
    to_base36((hash as i64).unsigned_abs())
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
