use async_trait::async_trait;
use std::{
    cmp::Ordering,
    io,
    path::{Path, PathBuf},
};
use walkdir::{DirEntry, WalkDir};

use crate::{
    document::{DocumentReference, MarkdownDocument},
    error::GraphError,
    paths::{canonical_id, document_id, is_markdown},
    repository::{DocumentReferences, DocumentRepository},
};

pub const DEFAULT_EXCLUDES: [&str; 2] = ["node_modules", "dist"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRepositoryOptions {
    /// Directory names that are never descended into.
    pub excludes: Vec<String>,
    pub include_hidden: bool,
}

impl Default for FileRepositoryOptions {
    fn default() -> Self {
        FileRepositoryOptions {
            excludes: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            include_hidden: false,
        }
    }
}

/// Markdown files beneath a root directory. The root is not checked until first use.
#[derive(Debug, Clone)]
pub struct FileRepository {
    root: PathBuf,
    options: FileRepositoryOptions,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

// Files sort before directories, then by name, so a depth-first walk visits every file of a
// directory before descending.
fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    (a.file_type().is_dir(), a.file_name()).cmp(&(b.file_type().is_dir(), b.file_name()))
}

impl FileRepository {
    pub fn new(root: impl Into<PathBuf>, options: FileRepositoryOptions) -> Self {
        FileRepository {
            root: root.into(),
            options,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> &FileRepositoryOptions {
        &self.options
    }

    async fn validate_root(&self) -> Result<(), GraphError> {
        match tokio::fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            _ => Err(GraphError::DirectoryNotFound(
                self.root.to_string_lossy().to_string(),
            )),
        }
    }

    /// Depth-first walk over every markdown file, yielding root-relative paths.
    fn walk(&self) -> impl Iterator<Item = PathBuf> + Send + 'static {
        let root = self.root.clone();
        let excludes = self.options.excludes.clone();
        let include_hidden = self.options.include_hidden;
        WalkDir::new(&self.root)
            .sort_by(files_first)
            .into_iter()
            .filter_entry(move |e| {
                if e.depth() == 0 {
                    return true;
                }
                if !include_hidden && is_hidden(e) {
                    return false;
                }
                !(e.file_type().is_dir()
                    && e.file_name()
                        .to_str()
                        .map(|name| excludes.iter().any(|x| x == name))
                        .unwrap_or(false))
            })
            .filter_map(|e| match e {
                Ok(e) => Some(e),
                Err(err) => {
                    tracing::warn!("Could not read directory entry: {}", err);
                    None
                }
            })
            .filter(|e| e.file_type().is_file() && is_markdown(e.path()))
            .filter_map(move |e| e.path().strip_prefix(&root).ok().map(Path::to_path_buf))
    }

    /// Run [`Self::walk`] on the blocking pool and collect its paths.
    async fn scan(&self) -> Result<Vec<PathBuf>, GraphError> {
        self.validate_root().await?;
        let repository = self.clone();
        let paths = tokio::task::spawn_blocking(move || repository.walk().collect::<Vec<_>>()).await?;
        Ok(paths)
    }
}

fn location_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[async_trait]
impl DocumentRepository for FileRepository {
    fn to_document_reference(&self, identifier: &str) -> DocumentReference {
        DocumentReference::new(document_id(identifier), identifier.to_string())
    }

    async fn find_all(&self) -> Result<DocumentReferences<'_>, GraphError> {
        let paths = self.scan().await?;
        Ok(Box::new(paths.into_iter().map(|relative| {
            let location = location_string(&relative);
            self.to_document_reference(&location)
        })))
    }

    async fn load_document(
        &self,
        reference: &DocumentReference,
    ) -> Result<MarkdownDocument, GraphError> {
        let path = self.root.join(&reference.location);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(GraphError::FileNotFound(path.to_string_lossy().to_string()))
            }
            Err(e) => {
                return Err(GraphError::MarkdownParsing {
                    filename: reference.location.clone(),
                    cause: e.to_string(),
                })
            }
        };
        let content = String::from_utf8(bytes).map_err(|e| GraphError::MarkdownParsing {
            filename: reference.location.clone(),
            cause: e.to_string(),
        })?;
        tracing::debug!("Loaded {} ({} bytes)", reference.location, content.len());
        Ok(MarkdownDocument::from_source(
            reference,
            &reference.location,
            &content,
        ))
    }

    async fn find(&self, id: &str) -> Result<MarkdownDocument, GraphError> {
        let wanted = format!("{}.md", canonical_id(id));
        let found = self.scan().await?.into_iter().find(|relative| {
            relative
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.to_lowercase() == wanted)
                .unwrap_or(false)
        });
        match found {
            Some(relative) => {
                let reference = self.to_document_reference(&location_string(&relative));
                self.load_document(&reference).await
            }
            None => Err(GraphError::FileNotFound(id.to_string())),
        }
    }
}
