//! Incremental maintenance of one graph.
//!
//! [`GraphManager`] remembers, per document, exactly which node ids it contributed
//! ([`DocumentNodeMapping`]). When a file changes only that document is retracted and
//! re-merged; the rest of the graph is untouched.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    codec::{BuildDiagnostic, BuilderOptions, DocumentContribution, GraphBuilder},
    error::GraphError,
    graph::{Graph, GraphStats},
    repository::DocumentRepository,
};

/// What one document contributed the last time it was merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentNodeMapping {
    pub document_id: String,
    pub node_ids: Vec<String>,
    pub file_path: String,
}

impl From<&DocumentContribution> for DocumentNodeMapping {
    fn from(contribution: &DocumentContribution) -> Self {
        DocumentNodeMapping {
            document_id: contribution.document_id.clone(),
            node_ids: contribution.node_ids(),
            file_path: contribution.location.clone(),
        }
    }
}

pub struct GraphManager {
    repository: Arc<dyn DocumentRepository>,
    base_dir: PathBuf,
    builder: GraphBuilder,
    graph: Graph,
    mappings: HashMap<String, DocumentNodeMapping>,
    diagnostics: Vec<BuildDiagnostic>,
}

impl GraphManager {
    /// `base_dir` is the directory absolute file paths are made relative to before they are
    /// handed to the repository.
    pub fn new(
        repository: Arc<dyn DocumentRepository>,
        base_dir: impl Into<PathBuf>,
        options: BuilderOptions,
    ) -> Self {
        GraphManager {
            repository,
            base_dir: base_dir.into(),
            builder: GraphBuilder::new(options),
            graph: Graph::new(),
            mappings: HashMap::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn options(&self) -> BuilderOptions {
        self.builder.options()
    }

    /// Scan the whole repository and replace the current graph.
    ///
    /// Documents are loaded concurrently. A document that fails to load is logged, recorded in
    /// [`Self::diagnostics`] and skipped.
    #[tracing::instrument(skip_all)]
    pub async fn initialize(&mut self) -> Result<GraphStats, GraphError> {
        self.builder.reset();
        self.mappings.clear();

        let repository = self.repository.clone();
        let found = self.builder.add_repository(repository.as_ref()).await?;
        tracing::info!("Scanned {} documents", found);

        self.graph = self.builder.build();
        for contribution in self.builder.contributions() {
            self.mappings
                .insert(contribution.document_id.clone(), contribution.into());
        }
        self.diagnostics = self.builder.take_diagnostics();
        let stats = self.graph.stats();
        tracing::info!(
            "Graph initialized with {} nodes and {} links",
            stats.node_count,
            stats.link_count
        );
        Ok(stats)
    }

    fn relative_location(&self, path: &Path) -> Result<String, GraphError> {
        let relative = if path.is_absolute() {
            path.strip_prefix(&self.base_dir)?
        } else {
            path
        };
        Ok(relative.to_string_lossy().replace('\\', "/"))
    }

    /// Retract everything `document_id` contributed. Returns false if it contributed nothing.
    fn retract(&mut self, document_id: &str) -> bool {
        match self.mappings.remove(document_id) {
            Some(mapping) => {
                self.graph.retract(&mapping.node_ids);
                tracing::debug!(
                    "Retracted {} nodes of {}",
                    mapping.node_ids.len(),
                    mapping.document_id
                );
                true
            }
            None => false,
        }
    }

    /// Reload one file and replace its contribution.
    ///
    /// The old contribution is retracted first. If the reload fails the document is left out of
    /// the graph and the error is returned.
    pub async fn update_file(&mut self, path: impl AsRef<Path>) -> Result<GraphStats, GraphError> {
        let location = self.relative_location(path.as_ref())?;
        let reference = self.repository.to_document_reference(&location);
        self.retract(&reference.id);

        let contribution = if self.builder.options().is_reference_only() {
            self.builder.reference_contribution(&reference)
        } else {
            let document = self.repository.load_document(&reference).await?;
            self.builder.contribution(&document)
        };
        self.merge(contribution);
        Ok(self.graph.stats())
    }

    fn merge(&mut self, contribution: DocumentContribution) {
        self.graph.nodes.extend(contribution.nodes.iter().cloned());
        self.graph.links.extend(contribution.links.iter().cloned());
        let implicit: Vec<_> = contribution
            .resolved_candidates(|target| self.graph.contains_node(target))
            .cloned()
            .collect();
        self.graph.links.extend(implicit);
        self.mappings.insert(
            contribution.document_id.clone(),
            DocumentNodeMapping::from(&contribution),
        );
    }

    /// Drop a file's contribution without reloading it. Returns whether it had one.
    pub fn remove_file(&mut self, path: impl AsRef<Path>) -> Result<bool, GraphError> {
        let location = self.relative_location(path.as_ref())?;
        let reference = self.repository.to_document_reference(&location);
        Ok(self.retract(&reference.id))
    }

    /// A copy of the current graph.
    pub fn get_graph(&self) -> Graph {
        self.graph.clone()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn stats(&self) -> GraphStats {
        self.graph.stats()
    }

    pub fn mapping(&self, document_id: &str) -> Option<&DocumentNodeMapping> {
        self.mappings.get(document_id)
    }

    pub fn document_count(&self) -> usize {
        self.mappings.len()
    }

    /// Problems recorded by the last [`Self::initialize`].
    pub fn diagnostics(&self) -> &[BuildDiagnostic] {
        &self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{graph::Link, repository::InMemoryRepository};

    fn manager_over(docs: &[(&str, &str)]) -> (Arc<InMemoryRepository>, GraphManager) {
        let repository = Arc::new(InMemoryRepository::new(docs.iter().copied()));
        let manager = GraphManager::new(repository.clone(), "", BuilderOptions::default());
        (repository, manager)
    }

    #[tokio::test]
    async fn update_retracts_stale_links() {
        let (repository, mut manager) = manager_over(&[("a", "links to [[b]]"), ("b", "no links")]);
        manager.initialize().await.unwrap();
        assert_eq!(manager.graph().links, vec![Link::new("a", "b")]);

        repository.insert("a", "no longer linked");
        manager.update_file("a.md").await.unwrap();
        assert!(manager.graph().links.is_empty());
        assert!(manager.graph().contains_node("b"));

        assert!(manager.remove_file("b.md").unwrap());
        assert!(!manager.graph().contains_node("b"));
        assert!(!manager.remove_file("b.md").unwrap());
    }

    #[tokio::test]
    async fn mappings_track_section_nodes() {
        let (repository, mut manager) = manager_over(&[("doc", "# Doc\n\n## One\n\n## Two\n")]);
        manager.initialize().await.unwrap();
        assert_eq!(
            manager.mapping("doc").unwrap().node_ids,
            vec!["doc", "doc#one", "doc#two"]
        );

        repository.insert("doc", "# Doc\n\n## Three\n");
        manager.update_file("doc.md").await.unwrap();
        let ids: Vec<&String> = manager.graph().nodes.keys().collect();
        assert_eq!(ids, vec!["doc", "doc#three"]);
        assert_eq!(manager.stats().link_count, 1);
    }

    #[tokio::test]
    async fn failed_reload_is_a_net_removal() {
        let (repository, mut manager) = manager_over(&[("a", "# A"), ("b", "# B")]);
        manager.initialize().await.unwrap();
        repository.remove("a");
        let err = manager.update_file("a.md").await.err().unwrap();
        assert!(matches!(err, GraphError::DocumentNotFound { .. }));
        assert!(!manager.graph().contains_node("a"));
        assert!(manager.graph().contains_node("b"));
        assert!(manager.mapping("a").is_none());
    }

    #[tokio::test]
    async fn updated_documents_resolve_candidates_against_whole_graph() {
        let (repository, mut manager) = manager_over(&[("dog", "# Dog"), ("cat", "# Cat")]);
        manager.initialize().await.unwrap();
        assert!(manager.graph().links.is_empty());

        repository.insert("dog", "# Dog\n\nthe dog chases a cat");
        manager.update_file("dog.md").await.unwrap();
        assert_eq!(manager.graph().links, vec![Link::new("dog", "cat")]);
    }

    #[tokio::test]
    async fn get_graph_is_a_copy() {
        let (_, mut manager) = manager_over(&[("a", "# A")]);
        manager.initialize().await.unwrap();
        let mut copy = manager.get_graph();
        copy.nodes.clear();
        assert_eq!(manager.stats().node_count, 1);
    }
}
