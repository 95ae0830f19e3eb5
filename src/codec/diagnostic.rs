//! Diagnostics recorded while building a graph.
//!
//! The builder never aborts on a bad document. It records what went wrong here, skips the
//! document, and carries on with the rest of the corpus.

use crate::error::GraphError;

#[derive(Debug, Clone, PartialEq)]
pub enum BuildDiagnostic {
    /// A document could not be loaded or parsed and contributed nothing.
    DocumentSkipped {
        /// Document id, or the repository location when no id could be derived.
        document: String,
        error: GraphError,
    },

    /// Two documents produced the same id; the later one replaced the earlier contribution.
    IdCollision {
        id: String,
        replaced: String,
        kept: String,
    },
}

impl BuildDiagnostic {
    pub fn skipped(document: impl Into<String>, error: GraphError) -> Self {
        Self::DocumentSkipped {
            document: document.into(),
            error,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::DocumentSkipped { .. })
    }
}

impl std::fmt::Display for BuildDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DocumentSkipped { document, error } => {
                write!(f, "Ignoring {document} since error during parsing: {error}")
            }
            Self::IdCollision { id, replaced, kept } => write!(
                f,
                "Document id {id:?} is produced by both {replaced} and {kept}; keeping {kept}"
            ),
        }
    }
}
