//! Converting markdown documents into graph contributions.
//!
//! ## Key Components
//!
//! - [`SectionParser`](md::SectionParser) - splits a document body into titled sections and
//!   extracts explicit links
//! - [`natural_links`](natural::natural_links) - proposes implicit link targets from prose
//! - [`GraphBuilder`] - reduces documents into a [`Graph`](crate::graph::Graph)
//! - [`BuildDiagnostic`] - records documents the builder had to skip
//!
//! ## Link kinds
//!
//! | Kind     | Source                        | Inserted when              |
//! |----------|-------------------------------|----------------------------|
//! | explicit | `[[wiki link]]`, `./file.md`  | always                     |
//! | parent   | every nested section          | always                     |
//! | implicit | nouns in a section brief      | the target node exists     |
//!
//! ```rust
//! use markdown_graph::{
//!     codec::{BuilderOptions, GraphBuilder},
//!     document::{DocumentReference, MarkdownDocument},
//! };
//!
//! let reference = DocumentReference::new("a".to_string(), "a.md".to_string());
//! let document = MarkdownDocument::from_source(&reference, "a.md", "# A\n\nSee [[b]]\n");
//! let graph = GraphBuilder::new(BuilderOptions::default())
//!     .add_document(&document)
//!     .build();
//! assert_eq!(graph.links.len(), 1);
//! ```

pub mod builder;
pub mod diagnostic;
pub mod md;
pub mod natural;

pub use builder::{BuilderOptions, DocumentContribution, GraphBuilder};
pub use diagnostic::BuildDiagnostic;
pub use md::{Section, SectionParser};
