//! One-shot generation over an on-disk corpus.

mod common;

use common::{create_test_notes, init_logging, write_doc};
use markdown_graph::{
    codec::BuilderOptions,
    garden::create_garden,
    graph::{Graph, Link},
    repository::RepositoryOptions,
};
use std::collections::BTreeSet;
use tempfile::TempDir;

fn node_ids(graph: &Graph) -> Vec<&str> {
    graph.nodes.keys().map(String::as_str).collect()
}

fn sorted_links(graph: &Graph) -> Vec<Link> {
    let mut links = graph.links.clone();
    links.sort();
    links
}

#[tokio::test]
async fn test_file_garden_builds_expected_graph() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let root = create_test_notes(&temp_dir);

    let garden = create_garden(RepositoryOptions::file(&root)).await.unwrap();
    let graph = &garden.graph;

    assert_eq!(
        node_ids(graph),
        vec!["animals", "cat", "dog", "index", "index#getting-started", "setup"],
        "hidden and excluded directories are not scanned"
    );
    assert_eq!(graph.nodes["index"].label.as_deref(), Some("Home"));
    assert_eq!(
        graph.nodes["index#getting-started"].label.as_deref(),
        Some("Getting Started")
    );

    let meta = graph.nodes["index"].meta.as_ref().unwrap();
    assert_eq!(meta.get("title").map(String::as_str), Some("Home"));
    assert_eq!(meta.get("tags.0").map(String::as_str), Some("start"));
    assert!(graph.nodes["dog"].meta.is_none());

    assert_eq!(
        sorted_links(graph),
        vec![
            Link::new("animals", "cat"),
            Link::new("animals", "dog"),
            Link::new("index", "animals"),
            Link::new("index", "setup"),
            Link::new("index", "setup"),
            Link::new("index#getting-started", "index"),
        ]
    );
    assert!(garden.diagnostics.is_empty());
}

#[tokio::test]
async fn test_hidden_files_can_be_included() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let root = create_test_notes(&temp_dir);

    let options = RepositoryOptions::File {
        path: Some(root.clone()),
        excludes: None,
        include_hidden: true,
        output_path: None,
        builder: BuilderOptions::default(),
    };
    let garden = create_garden(options).await.unwrap();
    assert!(garden.graph.contains_node("hidden"));
    assert!(!garden.graph.contains_node("readme"));
}

#[tokio::test]
async fn test_save_writes_default_output_that_reads_back() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let root = create_test_notes(&temp_dir);

    let garden = create_garden(RepositoryOptions::file(&root)).await.unwrap();
    let output = garden.save().await.unwrap();
    assert_eq!(output, root.join(".garden-graph.json"));

    let reread = Graph::from_json(&std::fs::read_to_string(&output).unwrap()).unwrap();
    let original_ids: BTreeSet<&String> = garden.graph.nodes.keys().collect();
    let reread_ids: BTreeSet<&String> = reread.nodes.keys().collect();
    assert_eq!(original_ids, reread_ids);
    assert_eq!(sorted_links(&reread), sorted_links(&garden.graph));
}

#[tokio::test]
async fn test_reference_only_mode_skips_content() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let root = create_test_notes(&temp_dir);

    let options = RepositoryOptions::file(&root).with_builder(BuilderOptions {
        just_node_names: true,
        no_sections: true,
    });
    let garden = create_garden(options).await.unwrap();
    assert_eq!(
        node_ids(&garden.graph),
        vec!["animals", "cat", "dog", "index", "setup"]
    );
    assert!(garden.graph.nodes.values().all(|node| node.is_empty()));
    assert!(garden.graph.links.is_empty());
}

#[tokio::test]
async fn test_no_sections_keeps_root_nodes_and_links() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let root = create_test_notes(&temp_dir);

    let options = RepositoryOptions::file(&root).with_builder(BuilderOptions {
        just_node_names: false,
        no_sections: true,
    });
    let graph = create_garden(options).await.unwrap().graph;
    assert!(!graph.contains_node("index#getting-started"));
    assert_eq!(graph.nodes["index"].label.as_deref(), Some("Home"));
    assert_eq!(
        sorted_links(&graph),
        vec![
            Link::new("animals", "cat"),
            Link::new("animals", "dog"),
            Link::new("index", "animals"),
            Link::new("index", "setup"),
            Link::new("index", "setup"),
        ]
    );
}

#[tokio::test]
async fn test_just_node_names_keeps_sections_without_links() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let root = create_test_notes(&temp_dir);

    let options = RepositoryOptions::file(&root).with_builder(BuilderOptions {
        just_node_names: true,
        no_sections: false,
    });
    let graph = create_garden(options).await.unwrap().graph;
    assert_eq!(graph.nodes.len(), 6);
    assert!(graph.nodes.values().all(|node| node.is_empty()));
    assert!(graph.links.is_empty());
}

#[tokio::test]
async fn test_undecodable_document_is_skipped() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let root = create_test_notes(&temp_dir);
    std::fs::write(root.join("broken.md"), [0xff, 0xfe, 0x00, 0x41]).unwrap();
    write_doc(&root, "bird.md", "# Bird\n\nA bird watches the dog.\n");

    let garden = create_garden(RepositoryOptions::file(&root)).await.unwrap();
    assert!(!garden.graph.contains_node("broken"));
    assert!(garden.graph.contains_node("bird"));
    assert!(garden.graph.links.contains(&Link::new("bird", "dog")));
    assert_eq!(garden.diagnostics.len(), 1);
    assert!(garden.diagnostics[0].is_skipped());
}
