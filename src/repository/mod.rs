//! Where documents come from.
//!
//! A [`DocumentRepository`] enumerates [`DocumentReference`]s and resolves them to
//! [`MarkdownDocument`]s on demand. Nothing is cached between calls: every
//! [`DocumentRepository::load_document`] reads the current content.
//!
//! Two implementations ship with the crate:
//!
//! - [`FileRepository`]: a directory tree on disk.
//! - [`InMemoryRepository`]: a map of id to markdown text, mostly for tests and embedders.
//!
//! [`RepositoryOptions::into_repository`] picks one from configuration.

use async_trait::async_trait;
use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use crate::{
    codec::builder::BuilderOptions,
    document::{DocumentReference, MarkdownDocument},
    error::GraphError,
};

pub mod file;
pub mod memory;

pub use file::{FileRepository, FileRepositoryOptions};
pub use memory::InMemoryRepository;

/// Finite, restartable sequence of references. Each call to
/// [`DocumentRepository::find_all`] produces a fresh one.
pub type DocumentReferences<'a> = Box<dyn Iterator<Item = DocumentReference> + Send + 'a>;

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Normalize an external identifier (file name, relative path or bare id) to a reference.
    fn to_document_reference(&self, identifier: &str) -> DocumentReference;

    async fn find_all(&self) -> Result<DocumentReferences<'_>, GraphError>;

    async fn load_document(
        &self,
        reference: &DocumentReference,
    ) -> Result<MarkdownDocument, GraphError>;

    /// Resolve a bare document id.
    async fn find(&self, id: &str) -> Result<MarkdownDocument, GraphError>;
}

/// Which repository to build, plus the builder switches applied to it.
#[derive(Debug, Clone)]
pub enum RepositoryOptions {
    File {
        path: Option<PathBuf>,
        excludes: Option<Vec<String>>,
        include_hidden: bool,
        output_path: Option<PathBuf>,
        builder: BuilderOptions,
    },
    InMemory {
        content: BTreeMap<String, String>,
        output_path: Option<PathBuf>,
        builder: BuilderOptions,
    },
}

impl RepositoryOptions {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        RepositoryOptions::File {
            path: Some(path.into()),
            excludes: None,
            include_hidden: false,
            output_path: None,
            builder: BuilderOptions::default(),
        }
    }

    pub fn in_memory<K, V>(content: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        RepositoryOptions::InMemory {
            content: content
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            output_path: None,
            builder: BuilderOptions::default(),
        }
    }

    pub fn with_builder(mut self, options: BuilderOptions) -> Self {
        match &mut self {
            RepositoryOptions::File { builder, .. } | RepositoryOptions::InMemory { builder, .. } => {
                *builder = options
            }
        }
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        match &mut self {
            RepositoryOptions::File { output_path, .. }
            | RepositoryOptions::InMemory { output_path, .. } => *output_path = Some(path.into()),
        }
        self
    }

    pub fn builder_options(&self) -> BuilderOptions {
        match self {
            RepositoryOptions::File { builder, .. } | RepositoryOptions::InMemory { builder, .. } => {
                *builder
            }
        }
    }

    /// Where a garden built from these options is saved by default: `.garden-graph.json` in the
    /// repository directory, or in the working directory for in-memory content.
    pub fn output_path(&self) -> PathBuf {
        match self {
            RepositoryOptions::File {
                output_path: Some(path),
                ..
            }
            | RepositoryOptions::InMemory {
                output_path: Some(path),
                ..
            } => path.clone(),
            RepositoryOptions::File {
                path: Some(dir), ..
            } => dir.join(crate::config::DEFAULT_OUTPUT_FILE),
            _ => PathBuf::from(crate::config::DEFAULT_OUTPUT_FILE),
        }
    }

    pub fn into_repository(&self) -> Result<Arc<dyn DocumentRepository>, GraphError> {
        match self {
            RepositoryOptions::File { path: None, .. } => Err(GraphError::Configuration(
                "File repository requires a path to be specified".to_string(),
            )),
            RepositoryOptions::File {
                path: Some(path),
                excludes,
                include_hidden,
                ..
            } => {
                let mut options = FileRepositoryOptions {
                    include_hidden: *include_hidden,
                    ..Default::default()
                };
                if let Some(excludes) = excludes {
                    options.excludes = excludes.clone();
                }
                Ok(Arc::new(FileRepository::new(path.clone(), options)))
            }
            RepositoryOptions::InMemory { content, .. } => {
                Ok(Arc::new(InMemoryRepository::new(content.clone())))
            }
        }
    }
}
