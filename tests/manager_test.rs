//! Incremental maintenance against files on disk.

mod common;

use common::{create_test_notes, init_logging, write_doc};
use markdown_graph::{
    codec::{BuildDiagnostic, BuilderOptions},
    graph::Link,
    manager::GraphManager,
    repository::{FileRepository, FileRepositoryOptions},
    GraphError,
};
use std::{path::Path, sync::Arc};
use tempfile::TempDir;

fn manager_for(root: &Path) -> GraphManager {
    let repository = FileRepository::new(root, FileRepositoryOptions::default());
    GraphManager::new(Arc::new(repository), root, BuilderOptions::default())
}

#[tokio::test]
async fn test_initialize_records_one_mapping_per_document() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let root = create_test_notes(&temp_dir);
    let mut manager = manager_for(&root);

    let stats = manager.initialize().await.unwrap();
    assert_eq!(stats.node_count, 6);
    assert_eq!(stats.link_count, 6);
    assert_eq!(manager.document_count(), 5);

    let index = manager.mapping("index").unwrap();
    assert_eq!(index.node_ids, vec!["index", "index#getting-started"]);
    assert_eq!(index.file_path, "index.md");
    assert_eq!(manager.mapping("setup").unwrap().file_path, "guides/setup.md");
}

#[tokio::test]
async fn test_update_replaces_only_the_changed_document() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let root = create_test_notes(&temp_dir);
    let mut manager = manager_for(&root);
    manager.initialize().await.unwrap();

    let path = write_doc(&root, "index.md", "# Home\n\nNothing to see.\n");
    let stats = manager.update_file(&path).await.unwrap();

    assert_eq!(stats.node_count, 5);
    assert!(!manager.graph().contains_node("index#getting-started"));
    assert!(manager.graph().nodes["index"].meta.is_none());
    assert_eq!(
        manager.graph().links,
        vec![Link::new("animals", "dog"), Link::new("animals", "cat")]
    );
    assert_eq!(manager.mapping("index").unwrap().node_ids, vec!["index"]);
}

#[tokio::test]
async fn test_added_file_links_into_existing_graph() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let root = create_test_notes(&temp_dir);
    let mut manager = manager_for(&root);
    manager.initialize().await.unwrap();

    let path = write_doc(&root, "birds/bird.md", "# Bird\n\nA bird watches the dog.\n");
    manager.update_file(&path).await.unwrap();

    assert!(manager.graph().contains_node("bird"));
    assert_eq!(
        manager.graph().links_from("bird").collect::<Vec<_>>(),
        vec![&Link::new("bird", "dog")]
    );
    assert_eq!(manager.mapping("bird").unwrap().file_path, "birds/bird.md");
}

#[tokio::test]
async fn test_remove_retracts_node_and_incoming_links() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let root = create_test_notes(&temp_dir);
    let mut manager = manager_for(&root);
    manager.initialize().await.unwrap();

    let path = root.join("dog.md");
    std::fs::remove_file(&path).unwrap();
    assert!(manager.remove_file(&path).unwrap());

    assert!(!manager.graph().contains_node("dog"));
    assert!(manager
        .graph()
        .links
        .iter()
        .all(|link| link.source != "dog" && link.target != "dog"));
    assert!(manager.graph().links.contains(&Link::new("animals", "cat")));
    assert!(!manager.remove_file(&path).unwrap());
}

#[tokio::test]
async fn test_update_of_deleted_file_is_a_net_removal() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let root = create_test_notes(&temp_dir);
    let mut manager = manager_for(&root);
    manager.initialize().await.unwrap();

    let path = root.join("animals.md");
    std::fs::remove_file(&path).unwrap();
    let err = manager.update_file(&path).await.err().unwrap();

    assert!(matches!(err, GraphError::FileNotFound(_)));
    assert!(!manager.graph().contains_node("animals"));
    assert!(manager.graph().links.iter().all(|link| link.source != "animals"));
    assert!(manager.mapping("animals").is_none());
}

#[tokio::test]
async fn test_paths_outside_the_base_directory_are_rejected() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let root = create_test_notes(&temp_dir);
    let elsewhere = TempDir::new().unwrap();
    let stray = write_doc(elsewhere.path(), "cat.md", "# Stray cat\n");
    let mut manager = manager_for(&root);
    let before = manager.initialize().await.unwrap();

    assert!(manager.update_file(&stray).await.is_err());
    assert_eq!(manager.stats(), before);
    assert_eq!(manager.graph().nodes["cat"].label.as_deref(), Some("Cat"));
}

#[tokio::test]
async fn test_same_named_documents_last_loaded_wins() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_doc(root, "a/note.md", "# From A\n\n## Only In A\n");
    write_doc(root, "b/note.md", "# From B\n");
    let mut manager = manager_for(root);
    manager.initialize().await.unwrap();

    assert_eq!(manager.graph().nodes["note"].label.as_deref(), Some("From B"));
    assert!(!manager.graph().contains_node("note#only-in-a"));
    assert_eq!(manager.mapping("note").unwrap().file_path, "b/note.md");
    assert_eq!(
        manager.diagnostics(),
        &[BuildDiagnostic::IdCollision {
            id: "note".to_string(),
            replaced: "a/note.md".to_string(),
            kept: "b/note.md".to_string(),
        }]
    );
}
