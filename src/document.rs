//! Documents as loaded from a repository: a lightweight [`DocumentReference`] and the resolved
//! [`MarkdownDocument`] with its frontmatter split off and flattened.

use serde_yaml::Value as YamlValue;
use std::collections::BTreeMap;

use crate::paths::content_hash;

/// Lightweight handle to a document, lazily resolvable to its content through the repository
/// that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentReference {
    pub id: String,
    pub content_hash: String,
    /// Repository specific location: root-relative path for files, canonical key in memory.
    pub location: String,
}

impl DocumentReference {
    pub fn new(id: String, location: String) -> Self {
        DocumentReference {
            content_hash: content_hash(&location),
            id,
            location,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownDocument {
    pub id: String,
    pub filename: String,
    /// Markdown content with the frontmatter removed.
    pub body: String,
    pub frontmatter: BTreeMap<String, String>,
    pub content_hash: String,
}

impl MarkdownDocument {
    pub fn from_source(reference: &DocumentReference, filename: &str, content: &str) -> Self {
        let Frontmatter { data, body } = split_frontmatter(content);
        MarkdownDocument {
            id: reference.id.clone(),
            filename: filename.to_string(),
            body,
            frontmatter: data,
            content_hash: reference.content_hash.clone(),
        }
    }
}

/// Result of splitting a document into its flattened frontmatter and markdown body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontmatter {
    pub data: BTreeMap<String, String>,
    pub body: String,
}

/// Render a visible diagnostic section that is appended to a document body.
pub fn diagnostic_block(heading: &str, message: &str) -> String {
    format!("\n\n## {heading}\n\n```txt\n{message}\n```")
}

fn is_fence(line: &str) -> bool {
    line.trim_end() == "---"
}

/// Split YAML frontmatter delimited by `---` lines from the top of `content`.
///
/// Never fails: if the YAML cannot be parsed the data map is empty and the original content is
/// returned with a "Frontmatter error" diagnostic block appended.
pub fn split_frontmatter(content: &str) -> Frontmatter {
    let mut lines = content.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return Frontmatter::default();
    };
    if !is_fence(first) {
        return Frontmatter {
            data: BTreeMap::new(),
            body: content.to_string(),
        };
    }

    let mut offset = first.len();
    let mut yaml_end = None;
    for line in lines {
        if is_fence(line) {
            yaml_end = Some((offset, offset + line.len()));
            break;
        }
        offset += line.len();
    }
    let Some((yaml_end, body_start)) = yaml_end else {
        // An opening fence without a closing one is ordinary markdown.
        return Frontmatter {
            data: BTreeMap::new(),
            body: content.to_string(),
        };
    };

    let yaml = &content[first.len()..yaml_end];
    let body = content[body_start..].to_string();
    if yaml.trim().is_empty() {
        return Frontmatter {
            data: BTreeMap::new(),
            body,
        };
    }
    match serde_yaml::from_str::<YamlValue>(yaml) {
        Ok(value) => {
            let mut data = BTreeMap::new();
            if let YamlValue::Mapping(_) = value {
                flatten_yaml(&value, "", &mut data);
            } else {
                tracing::debug!("Ignoring frontmatter that is not a mapping: {:?}", value);
            }
            Frontmatter { data, body }
        }
        Err(e) => {
            tracing::warn!("Frontmatter parse failed: {}", e);
            Frontmatter {
                data: BTreeMap::new(),
                body: format!(
                    "{content}{}",
                    diagnostic_block("Frontmatter error", &e.to_string())
                ),
            }
        }
    }
}

fn yaml_scalar_to_string(value: &YamlValue) -> String {
    match value {
        YamlValue::Null => "null".to_string(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::String(s) => s.clone(),
        YamlValue::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Flatten nested mappings into dotted keys and sequences into indexed keys.
fn flatten_yaml(value: &YamlValue, prefix: &str, out: &mut BTreeMap<String, String>) {
    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        }
    };
    match value {
        YamlValue::Mapping(map) => {
            for (key, item) in map.iter() {
                let key = yaml_scalar_to_string(key);
                flatten_yaml(item, &join(&key), out);
            }
        }
        YamlValue::Sequence(items) => {
            for (idx, item) in items.iter().enumerate() {
                out.insert(join(&idx.to_string()), yaml_scalar_to_string(item));
            }
        }
        scalar => {
            out.insert(prefix.to_string(), yaml_scalar_to_string(scalar));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_content_has_no_frontmatter() {
        let fm = split_frontmatter("# Title\n\nbody\n");
        assert!(fm.data.is_empty());
        assert_eq!(fm.body, "# Title\n\nbody\n");
    }

    #[test]
    fn frontmatter_is_flattened() {
        let content = "---\ntitle: Hello\ndraft: true\ncount: 3\nauthor:\n  name: Ann\ntags:\n  - a\n  - b\n---\n# Hello\n";
        let fm = split_frontmatter(content);
        assert_eq!(fm.body, "# Hello\n");
        assert_eq!(fm.data.get("title").map(String::as_str), Some("Hello"));
        assert_eq!(fm.data.get("draft").map(String::as_str), Some("true"));
        assert_eq!(fm.data.get("count").map(String::as_str), Some("3"));
        assert_eq!(fm.data.get("author.name").map(String::as_str), Some("Ann"));
        assert_eq!(fm.data.get("tags.0").map(String::as_str), Some("a"));
        assert_eq!(fm.data.get("tags.1").map(String::as_str), Some("b"));
    }

    #[test]
    fn empty_frontmatter_yields_empty_data() {
        let fm = split_frontmatter("---\n---\nbody");
        assert!(fm.data.is_empty());
        assert_eq!(fm.body, "body");
    }

    #[test]
    fn invalid_frontmatter_appends_diagnostic() {
        let content = "---\nfoo: bar\ninvalid: [unclosed array\nanother: value\n---\n# Invalid\n";
        let fm = split_frontmatter(content);
        assert!(fm.data.is_empty());
        assert!(fm.body.starts_with(content));
        assert!(fm.body.contains("\n\n## Frontmatter error\n\n```txt\n"));
        assert!(fm.body.ends_with("\n```"));
    }

    #[test]
    fn unclosed_fence_is_body() {
        let fm = split_frontmatter("---\nnot closed\n");
        assert!(fm.data.is_empty());
        assert_eq!(fm.body, "---\nnot closed\n");
    }

    #[test]
    fn document_carries_reference_identity() {
        let reference = DocumentReference::new("foo".into(), "dir/Foo.md".into());
        let doc = MarkdownDocument::from_source(&reference, "dir/Foo.md", "---\na: 1\n---\ntext");
        assert_eq!(doc.id, "foo");
        assert_eq!(doc.filename, "dir/Foo.md");
        assert_eq!(doc.body, "text");
        assert_eq!(doc.content_hash, reference.content_hash);
        assert_eq!(doc.frontmatter.get("a").map(String::as_str), Some("1"));
    }
}
