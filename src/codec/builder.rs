//! Turns parsed documents into a `{nodes, links}` [`Graph`].
//!
//! Building happens in two phases:
//!
//! 1. [`GraphBuilder::contribution`] maps one document to a [`DocumentContribution`]: its
//!    nodes, its explicit and parent links, and its natural-language link candidates. This
//!    step only looks at the one document.
//! 2. [`GraphBuilder::build`] reduces every contribution into a graph and resolves the
//!    candidates once every node id is known.
//!
//! Two switches in [`BuilderOptions`] control granularity. With both on, documents are never
//! parsed at all: each reference becomes one empty node.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{
    codec::{
        diagnostic::BuildDiagnostic,
        md::{Section, SectionParser},
        natural::natural_links,
    },
    document::{DocumentReference, MarkdownDocument},
    error::GraphError,
    graph::{Graph, GraphStats, Link, Node},
    repository::DocumentRepository,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderOptions {
    /// Emit bare node keys only and skip every kind of link.
    #[serde(default)]
    pub just_node_names: bool,
    /// Keep only the root section of each document.
    #[serde(default)]
    pub no_sections: bool,
}

impl BuilderOptions {
    /// Whether documents can be added from their reference alone, without loading content.
    pub fn is_reference_only(&self) -> bool {
        self.just_node_names && self.no_sections
    }
}

/// Everything one document adds to a graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentContribution {
    pub document_id: String,
    /// Where the document came from, as reported by its repository.
    pub location: String,
    /// Node ids are unique within a contribution; document order is kept.
    pub nodes: Vec<(String, Node)>,
    /// Explicit and parent links. Inserted unconditionally.
    pub links: Vec<Link>,
    /// Natural-language links. Inserted only if the target node exists.
    pub candidates: Vec<Link>,
}

impl DocumentContribution {
    fn empty(document_id: &str, location: &str) -> Self {
        DocumentContribution {
            document_id: document_id.to_string(),
            location: location.to_string(),
            ..Default::default()
        }
    }

    fn push_node(&mut self, id: String, node: Node) {
        match self.nodes.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = node,
            None => self.nodes.push((id, node)),
        }
    }

    pub fn node_ids(&self) -> Vec<String> {
        self.nodes.iter().map(|(id, _)| id.clone()).collect()
    }

    /// Candidates whose target satisfies `exists`.
    pub fn resolved_candidates<'a, F>(&'a self, exists: F) -> impl Iterator<Item = &'a Link> + 'a
    where
        F: Fn(&str) -> bool + 'a,
    {
        self.candidates
            .iter()
            .filter(move |link| exists(&link.target))
    }

    /// This contribution as a standalone graph, candidates left unresolved.
    pub fn to_graph(&self) -> Graph {
        Graph {
            nodes: self.nodes.iter().cloned().collect(),
            links: self.links.clone(),
        }
    }
}

/// Id of the node for `section` of document `document_id`.
fn section_node_id(document_id: &str, section: &Section, parser: &mut SectionParser) -> String {
    if section.is_root() {
        document_id.to_string()
    } else {
        format!("{}#{}", document_id, parser.slugger().slug(&section.title))
    }
}

#[derive(Debug, Default)]
pub struct GraphBuilder {
    options: BuilderOptions,
    parser: SectionParser,
    contributions: Vec<DocumentContribution>,
    index: HashMap<String, usize>,
    diagnostics: Vec<BuildDiagnostic>,
    parsed_documents: usize,
}

impl GraphBuilder {
    pub fn new(options: BuilderOptions) -> Self {
        GraphBuilder {
            options,
            ..Default::default()
        }
    }

    pub fn options(&self) -> BuilderOptions {
        self.options
    }

    /// Number of documents run through the section parser since creation or [`Self::reset`].
    pub fn parsed_documents(&self) -> usize {
        self.parsed_documents
    }

    pub fn contributions(&self) -> &[DocumentContribution] {
        &self.contributions
    }

    pub fn diagnostics(&self) -> &[BuildDiagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<BuildDiagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Phase one: compute what `document` contributes, without adding it.
    pub fn contribution(&mut self, document: &MarkdownDocument) -> DocumentContribution {
        if self.options.is_reference_only() {
            return Self::bare_contribution(&document.id, &document.filename);
        }
        self.parsed_documents += 1;
        let mut sections = self.parser.parse(&document.body);
        if self.options.no_sections {
            sections.retain(Section::is_root);
        }

        let mut contribution = DocumentContribution::empty(&document.id, &document.filename);
        let meta = (!document.frontmatter.is_empty()).then(|| document.frontmatter.clone());
        for section in sections.iter() {
            let node_id = section_node_id(&document.id, section, &mut self.parser);
            let node = if self.options.just_node_names {
                Node::empty()
            } else {
                Node {
                    label: Some(section.title.clone()),
                    meta: meta.clone(),
                }
            };
            contribution.push_node(node_id.clone(), node);
            if self.options.just_node_names {
                continue;
            }

            for target in section.links.iter() {
                contribution.links.push(Link::new(&node_id, target));
            }
            if !section.is_root() {
                contribution.links.push(Link::new(&node_id, &document.id));
            }
            if let Some(brief) = section.brief.as_deref().filter(|b| !b.is_empty()) {
                for target in natural_links(brief, &[]) {
                    if target != document.id {
                        contribution.candidates.push(Link::new(&document.id, target));
                    }
                }
            }
        }
        contribution
    }

    fn bare_contribution(document_id: &str, location: &str) -> DocumentContribution {
        let mut contribution = DocumentContribution::empty(document_id, location);
        contribution.push_node(document_id.to_string(), Node::empty());
        contribution
    }

    /// The contribution of a document known only by its reference: one empty node.
    pub fn reference_contribution(&self, reference: &DocumentReference) -> DocumentContribution {
        Self::bare_contribution(&reference.id, &reference.location)
    }

    /// Add a contribution, replacing any earlier contribution with the same document id.
    pub fn insert(&mut self, contribution: DocumentContribution) -> &mut Self {
        match self.index.get(&contribution.document_id) {
            Some(&idx) => {
                let replaced = &self.contributions[idx];
                if replaced.location != contribution.location {
                    tracing::warn!(
                        "Document id {:?} is produced by both {} and {}; keeping {}",
                        contribution.document_id,
                        replaced.location,
                        contribution.location,
                        contribution.location
                    );
                    self.diagnostics.push(BuildDiagnostic::IdCollision {
                        id: contribution.document_id.clone(),
                        replaced: replaced.location.clone(),
                        kept: contribution.location.clone(),
                    });
                }
                self.contributions[idx] = contribution;
            }
            None => {
                self.index
                    .insert(contribution.document_id.clone(), self.contributions.len());
                self.contributions.push(contribution);
            }
        }
        self
    }

    pub fn add_document(&mut self, document: &MarkdownDocument) -> &mut Self {
        let contribution = self.contribution(document);
        self.insert(contribution)
    }

    /// Add a document from its reference alone. Only meaningful when both
    /// [`BuilderOptions`] switches are on; otherwise the reference is ignored.
    pub fn add_document_reference(&mut self, reference: &DocumentReference) -> &mut Self {
        if !self.options.is_reference_only() {
            tracing::debug!(
                "Ignoring reference {} since the builder needs document content",
                reference.id
            );
            return self;
        }
        let contribution = self.reference_contribution(reference);
        self.insert(contribution)
    }

    /// Add every document of `repository`. Returns how many were enumerated.
    ///
    /// In reference-only mode no document is loaded. Otherwise all loads are issued
    /// concurrently and each failure is recorded without stopping the others. Contributions are
    /// inserted in enumeration order regardless of which load finishes first.
    #[tracing::instrument(skip_all)]
    pub async fn add_repository(
        &mut self,
        repository: &dyn DocumentRepository,
    ) -> Result<usize, GraphError> {
        let references: Vec<DocumentReference> = repository.find_all().await?.collect();
        tracing::debug!("Found {} documents", references.len());

        if self.options.is_reference_only() {
            for reference in references.iter() {
                self.add_document_reference(reference);
            }
            return Ok(references.len());
        }

        let loads = join_all(
            references
                .iter()
                .map(|reference| repository.load_document(reference)),
        )
        .await;
        for (reference, loaded) in references.iter().zip(loads) {
            match loaded {
                Ok(document) => {
                    self.add_document(&document);
                }
                Err(e) => {
                    self.record_failure(&reference.location, e);
                }
            }
        }
        Ok(references.len())
    }

    /// Record that `document` could not be added.
    pub fn record_failure(&mut self, document: &str, error: GraphError) -> &mut Self {
        let diagnostic = BuildDiagnostic::skipped(document, error);
        tracing::warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
        self
    }

    /// Phase two: an independent snapshot of every contribution, with candidates resolved
    /// against the full node set. Calling it repeatedly returns equal graphs.
    pub fn build(&self) -> Graph {
        let mut graph = Graph::new();
        for contribution in self.contributions.iter() {
            graph.nodes.extend(contribution.nodes.iter().cloned());
            graph.links.extend(contribution.links.iter().cloned());
        }
        if !self.options.just_node_names {
            let mut implicit = Vec::new();
            for contribution in self.contributions.iter() {
                implicit.extend(
                    contribution
                        .resolved_candidates(|target| graph.contains_node(target))
                        .cloned(),
                );
            }
            graph.links.extend(implicit);
        }
        graph
    }

    pub fn reset(&mut self) -> &mut Self {
        self.contributions.clear();
        self.index.clear();
        self.diagnostics.clear();
        self.parsed_documents = 0;
        self
    }

    pub fn stats(&self) -> GraphStats {
        self.build().stats()
    }
}
