use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

use crate::{
    document::{DocumentReference, MarkdownDocument},
    error::GraphError,
    paths::canonical_id,
    repository::{DocumentReferences, DocumentRepository},
};

const SOURCE_DESCRIPTION: &str = "in-memory repository";

/// Markdown content keyed by canonical id (extension stripped, lower-cased).
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    content: RwLock<BTreeMap<String, String>>,
}

impl InMemoryRepository {
    pub fn new<K, V>(content: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        InMemoryRepository {
            content: RwLock::new(
                content
                    .into_iter()
                    .map(|(k, v)| (canonical_id(k.as_ref()), v.into()))
                    .collect(),
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.content.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.read().is_empty()
    }

    pub fn has_document(&self, id: &str) -> bool {
        self.content.read().contains_key(&canonical_id(id))
    }

    pub fn document_ids(&self) -> Vec<String> {
        self.content.read().keys().cloned().collect()
    }

    /// Add or replace a document. Returns the previous content.
    pub fn insert(&self, id: &str, content: impl Into<String>) -> Option<String> {
        self.content.write().insert(canonical_id(id), content.into())
    }

    pub fn remove(&self, id: &str) -> Option<String> {
        self.content.write().remove(&canonical_id(id))
    }
}

#[async_trait]
impl DocumentRepository for InMemoryRepository {
    fn to_document_reference(&self, identifier: &str) -> DocumentReference {
        let id = canonical_id(identifier);
        DocumentReference::new(id.clone(), id)
    }

    async fn find_all(&self) -> Result<DocumentReferences<'_>, GraphError> {
        let ids = self.document_ids();
        Ok(Box::new(
            ids.into_iter()
                .map(move |id| self.to_document_reference(&id)),
        ))
    }

    async fn load_document(
        &self,
        reference: &DocumentReference,
    ) -> Result<MarkdownDocument, GraphError> {
        let content = self.content.read().get(&reference.id).cloned();
        match content {
            Some(content) => Ok(MarkdownDocument::from_source(
                reference,
                &reference.id,
                &content,
            )),
            None => Err(GraphError::DocumentNotFound {
                id: reference.id.clone(),
                source_description: SOURCE_DESCRIPTION.to_string(),
            }),
        }
    }

    async fn find(&self, id: &str) -> Result<MarkdownDocument, GraphError> {
        let reference = self.to_document_reference(id);
        self.load_document(&reference).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keys_are_canonicalized() {
        let repo = InMemoryRepository::new([("Doc1.md", "# One"), ("doc2", "# Two")]);
        assert_eq!(repo.len(), 2);
        assert!(repo.has_document("DOC1"));
        assert!(repo.has_document("doc2.md"));
        assert_eq!(repo.document_ids(), vec!["doc1", "doc2"]);

        let doc = repo.find("DOC1.md").await.unwrap();
        assert_eq!(doc.id, "doc1");
        assert_eq!(doc.body, "# One");
    }

    #[tokio::test]
    async fn missing_id_is_document_not_found() {
        let repo = InMemoryRepository::new([("a", "x")]);
        match repo.find("b").await {
            Err(GraphError::DocumentNotFound {
                id,
                source_description,
            }) => {
                assert_eq!(id, "b");
                assert_eq!(source_description, "in-memory repository");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn find_all_reflects_mutations() {
        let repo = InMemoryRepository::new([("a", "x")]);
        repo.insert("B.md", "y");
        let ids: Vec<String> = repo.find_all().await.unwrap().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(repo.remove("a").as_deref(), Some("x"));
        assert_eq!(repo.find_all().await.unwrap().count(), 1);
    }
}
