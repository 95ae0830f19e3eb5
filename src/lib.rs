//! # markdown-graph
//!
//! Indexes a corpus of markdown documents into a `{nodes, links}` graph and keeps that graph
//! current as files are added, edited, or removed.
//!
//! ## Overview
//!
//! Every document becomes one node per section: the document itself (id = lower-cased file
//! stem) plus one node per nested heading (`<document>#<slug>`). Three kinds of links are
//! extracted:
//!
//! - **Explicit**: `[[wiki links]]` and relative links such as `[text](./other.md)`
//! - **Parent**: every nested section links to its document
//! - **Implicit**: nouns mentioned in a section's first paragraph, when a node of that name
//!   exists
//!
//! ## Architecture
//!
//! - **[`paths`]**: slugs, document ids, content hashes
//! - **[`document`]**: references, loaded documents, frontmatter
//! - **[`repository`]**: where documents come from (filesystem or in-memory)
//! - **[`codec`]**: section parsing, natural-language links, graph building
//! - **[`graph`]**: the persisted graph model
//! - **[`manager`]**: incremental maintenance with per-document provenance
//! - **[`garden`]**: one-shot generation and saving
//! - **[`watch`]**: keeping a graph file current with a directory (feature `service`)
//! - **[`config`]**: layered settings for the command line
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use markdown_graph::{garden::create_garden, repository::RepositoryOptions};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), markdown_graph::GraphError> {
//!     let garden = create_garden(RepositoryOptions::file("./notes")).await?;
//!     println!("{} nodes", garden.graph.nodes.len());
//!     garden.save().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `service` (default): the change watcher, built on `notify`
//! - `bin`: the `markdown-graph` command line tool

pub mod codec;
pub mod config;
pub mod document;
pub mod error;
pub mod event;
pub mod garden;
pub mod graph;
pub mod manager;
pub mod paths;
pub mod repository;
#[cfg(feature = "service")]
pub mod watch;

pub use error::*;
