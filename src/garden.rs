//! One-shot graph generation.
//!
//! A [`Garden`] is the graph of one corpus together with the repository it was read from and the
//! place it is saved to. Use [`create_garden`] for a single scan; use
//! [`GraphWatcher`](crate::watch::GraphWatcher) to keep a graph current.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    codec::{BuildDiagnostic, GraphBuilder},
    error::GraphError,
    graph::Graph,
    repository::{DocumentRepository, RepositoryOptions},
};

pub struct Garden {
    pub graph: Graph,
    pub repository: Arc<dyn DocumentRepository>,
    pub output_path: PathBuf,
    /// Documents that were skipped while generating `graph`.
    pub diagnostics: Vec<BuildDiagnostic>,
}

impl std::fmt::Debug for Garden {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Garden")
            .field("graph", &self.graph.stats())
            .field("output_path", &self.output_path)
            .field("diagnostics", &self.diagnostics.len())
            .finish()
    }
}

impl Garden {
    /// Write the graph as 2-space indented JSON to [`Self::output_path`], creating parent
    /// directories as needed. Existing files are overwritten in place.
    pub async fn save(&self) -> Result<PathBuf, GraphError> {
        write_graph(&self.graph, &self.output_path).await?;
        Ok(self.output_path.clone())
    }
}

/// Write `graph` to `output_path`, creating parent directories as needed.
pub async fn write_graph(graph: &Graph, output_path: &Path) -> Result<(), GraphError> {
    let json = graph.to_json()?;
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(output_path, json).await?;
    tracing::debug!("Graph written to {:?}", output_path);
    Ok(())
}

/// Build a repository from `options` and generate its graph.
#[tracing::instrument(skip_all)]
pub async fn create_garden(options: RepositoryOptions) -> Result<Garden, GraphError> {
    let repository = options.into_repository()?;
    let mut builder = GraphBuilder::new(options.builder_options());
    builder.add_repository(repository.as_ref()).await?;
    let graph = builder.build();
    let stats = graph.stats();
    tracing::info!(
        "Generated graph with {} nodes and {} links",
        stats.node_count,
        stats.link_count
    );
    Ok(Garden {
        graph,
        repository,
        output_path: options.output_path(),
        diagnostics: builder.take_diagnostics(),
    })
}
