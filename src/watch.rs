//! # Change Watcher
//!
//! [`GraphWatcher`] keeps one graph current with a directory of markdown files and writes it
//! to disk whenever it changes.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle --start()--> Scanning --initialized, first write--> Watching --stop()--> Stopped
//! ```
//!
//! Subscribers ([`GraphWatcher::subscribe`]) receive, in order:
//!
//! 1. [`WatchEvent::Initialized`] after the first full scan
//! 2. [`WatchEvent::GraphWritten`] for the first write
//! 3. [`WatchEvent::Ready`] once the change subscription is open
//! 4. then [`WatchEvent::FileChanged`] per processed file event and [`WatchEvent::GraphWritten`]
//!    per debounced write, until [`WatchEvent::Stopped`]
//!
//! ## Processing model
//!
//! File events, whether they come from the OS notification backend or from
//! [`GraphWatcher::change_feed`], are queued into one channel and handled one at a time by a
//! single task: each event is fully retracted and re-merged before the next is looked at. The
//! in-memory graph therefore always reflects the latest applied edit.
//!
//! Writes are debounced on the trailing edge only. Every mutation pushes the write deadline to
//! `debounce_ms` from now, so a burst of edits produces a single write of the final state.
//!
//! ```rust,no_run
//! use markdown_graph::watch::{GraphWatcher, WatchOptions};
//!
//! # async fn run() -> Result<(), markdown_graph::GraphError> {
//! let mut watcher = GraphWatcher::new(WatchOptions::new("notes"));
//! let mut events = watcher.subscribe();
//! watcher.start().await?;
//! while let Ok(event) = events.recv().await {
//!     println!("{event}");
//! }
//! # Ok(())
//! # }
//! ```

use notify_debouncer_full::{
    new_debouncer,
    notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher},
    DebounceEventResult, Debouncer, FileIdMap,
};
use parking_lot::RwLock;
use std::{
    path::{Component, Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::{
        broadcast,
        mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
        oneshot, Mutex,
    },
    task::JoinHandle,
    time::{sleep_until, Instant},
};

use crate::{
    codec::BuilderOptions,
    config::{DEFAULT_DEBOUNCE_MS, DEFAULT_EXCLUDES, DEFAULT_OUTPUT_FILE},
    error::GraphError,
    event::{ChangeType, FileEvent, WatchEvent, WatchStats},
    garden::write_graph,
    manager::GraphManager,
    paths::is_markdown,
    repository::{FileRepository, FileRepositoryOptions},
};

/// Delay the OS backend waits for a file to stop changing before reporting it.
pub const DEFAULT_SETTLE_MS: u64 = 100;

const EVENT_CAPACITY: usize = 256;

type FileWatcher = Debouncer<RecommendedWatcher, FileIdMap>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchOptions {
    pub target_directory: PathBuf,
    pub output_file: PathBuf,
    /// Path components that are never watched.
    pub excludes: Vec<String>,
    pub include_hidden: bool,
    /// Quiet period after the last mutation before the graph is written.
    pub debounce_ms: u64,
    pub settle_ms: u64,
    /// Subscribe to OS change notifications. When off, only [`GraphWatcher::change_feed`]
    /// drives updates.
    pub filesystem_events: bool,
    pub builder: BuilderOptions,
}

impl WatchOptions {
    /// Options for `target_directory`, writing to `.garden-graph.json` inside it.
    pub fn new(target_directory: impl Into<PathBuf>) -> Self {
        let target_directory = target_directory.into();
        WatchOptions {
            output_file: target_directory.join(DEFAULT_OUTPUT_FILE),
            target_directory,
            ..Default::default()
        }
    }
}

impl Default for WatchOptions {
    fn default() -> Self {
        WatchOptions {
            target_directory: PathBuf::from("."),
            output_file: PathBuf::from(".").join(DEFAULT_OUTPUT_FILE),
            excludes: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            include_hidden: false,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            settle_ms: DEFAULT_SETTLE_MS,
            filesystem_events: true,
            builder: BuilderOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    Scanning,
    Watching,
    Stopped,
}

/// Decides which file events reach the manager.
#[derive(Debug, Clone)]
struct EventFilter {
    root: PathBuf,
    output_file: PathBuf,
    excludes: Vec<String>,
    include_hidden: bool,
}

impl EventFilter {
    fn accepts(&self, path: &Path) -> bool {
        if !is_markdown(path) || path == self.output_file {
            return false;
        }
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative.components().all(|component| match component {
            Component::Normal(name) => {
                let name = name.to_string_lossy();
                !self.excludes.iter().any(|x| *x == name)
                    && (self.include_hidden || !name.starts_with('.'))
            }
            _ => true,
        })
    }
}

fn repository_for(root: &Path, options: &WatchOptions) -> FileRepository {
    FileRepository::new(
        root,
        FileRepositoryOptions {
            excludes: options.excludes.clone(),
            include_hidden: options.include_hidden,
        },
    )
}

fn manager_for(root: &Path, options: &WatchOptions) -> GraphManager {
    GraphManager::new(
        Arc::new(repository_for(root, options)),
        root,
        options.builder,
    )
}

/// State shared between the watcher handle and its processing task.
struct WatchLoop {
    manager: Arc<Mutex<GraphManager>>,
    events: broadcast::Sender<WatchEvent>,
    stats: Arc<RwLock<WatchStats>>,
    filter: EventFilter,
    output_file: PathBuf,
    debounce: Duration,
}

impl WatchLoop {
    fn emit(&self, event: WatchEvent) {
        tracing::debug!("[GraphWatcher] {}", event);
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    async fn refresh_stats(&self) -> WatchStats {
        let stats = {
            let manager = self.manager.lock().await;
            WatchStats::new(manager.document_count(), manager.stats())
        };
        *self.stats.write() = stats;
        stats
    }

    /// Write the current graph. Failures are logged and never end the session.
    async fn persist(&self) {
        let graph = self.manager.lock().await.get_graph();
        let stats = graph.stats();
        match write_graph(&graph, &self.output_file).await {
            Ok(()) => {
                tracing::debug!(
                    "Graph written to {:?} ({} nodes, {} links)",
                    self.output_file,
                    stats.node_count,
                    stats.link_count
                );
                self.emit(WatchEvent::GraphWritten {
                    output_file: self.output_file.clone(),
                    node_count: stats.node_count,
                    link_count: stats.link_count,
                });
            }
            Err(e) => tracing::error!("Failed to write graph file {:?}: {}", self.output_file, e),
        }
    }

    /// Apply one file event. Returns whether the graph may have changed.
    async fn handle(&self, event: FileEvent) -> bool {
        if !self.filter.accepts(&event.path) {
            tracing::trace!("Ignoring event for {:?}", event.path);
            return false;
        }
        let result = {
            let mut manager = self.manager.lock().await;
            match event.change_type {
                ChangeType::Added | ChangeType::Changed => {
                    manager.update_file(&event.path).await.map(|_| ())
                }
                ChangeType::Removed => manager.remove_file(&event.path).map(|_| ()),
            }
        };
        let stats = self.refresh_stats().await;
        match result {
            Ok(()) => {
                let name = event
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                tracing::info!("Graph updated: {} {}", name, event.change_type);
                self.emit(WatchEvent::FileChanged {
                    path: event.path,
                    change_type: event.change_type,
                    stats,
                });
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to handle file {}: {:?}: {}",
                    event.change_type,
                    event.path,
                    e
                );
                // The old contribution is already retracted: the file left the graph.
                self.emit(WatchEvent::FileChanged {
                    path: event.path,
                    change_type: ChangeType::Removed,
                    stats,
                });
            }
        }
        true
    }

    async fn run(
        self,
        mut feed: UnboundedReceiver<FileEvent>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let mut persist_at: Option<Instant> = None;
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                received = feed.recv() => match received {
                    Some(event) => {
                        if self.handle(event).await {
                            persist_at = Some(Instant::now() + self.debounce);
                        }
                    }
                    None => break,
                },
                _ = wait_until(persist_at) => {
                    persist_at = None;
                    self.persist().await;
                }
            }
        }
        tracing::debug!("[GraphWatcher] processing loop finished");
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Map one OS notification to file events. Creations and modifications of paths that no longer
/// exist are reported as removals, which covers renames.
fn file_events(kind: &EventKind, paths: &[PathBuf]) -> Vec<FileEvent> {
    let existing = |path: &PathBuf, change_type: ChangeType| {
        if path.exists() {
            FileEvent::new(path.clone(), change_type)
        } else {
            FileEvent::removed(path.clone())
        }
    };
    match kind {
        EventKind::Create(_) => paths
            .iter()
            .map(|p| existing(p, ChangeType::Added))
            .collect(),
        EventKind::Modify(_) => paths
            .iter()
            .map(|p| existing(p, ChangeType::Changed))
            .collect(),
        EventKind::Remove(_) => paths.iter().cloned().map(FileEvent::removed).collect(),
        _ => Vec::new(),
    }
}

pub struct GraphWatcher {
    options: WatchOptions,
    manager: Arc<Mutex<GraphManager>>,
    state: Arc<RwLock<WatcherState>>,
    stats: Arc<RwLock<WatchStats>>,
    events: broadcast::Sender<WatchEvent>,
    feed_tx: UnboundedSender<FileEvent>,
    feed_rx: Option<UnboundedReceiver<FileEvent>>,
    debouncer: Option<FileWatcher>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl GraphWatcher {
    pub fn new(options: WatchOptions) -> Self {
        let manager = manager_for(&options.target_directory, &options);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (feed_tx, feed_rx) = unbounded_channel();
        GraphWatcher {
            options,
            manager: Arc::new(Mutex::new(manager)),
            state: Arc::new(RwLock::new(WatcherState::Idle)),
            stats: Arc::new(RwLock::new(WatchStats::default())),
            events,
            feed_tx,
            feed_rx: Some(feed_rx),
            debouncer: None,
            shutdown: None,
            task: None,
        }
    }

    pub fn options(&self) -> &WatchOptions {
        &self.options
    }

    pub fn state(&self) -> WatcherState {
        *self.state.read()
    }

    pub fn stats(&self) -> WatchStats {
        *self.stats.read()
    }

    /// Receive lifecycle notifications. Subscribe before [`Self::start`] to see all of them.
    pub fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.events.subscribe()
    }

    /// Queue file events directly, bypassing the OS backend. They are filtered and processed
    /// exactly like OS notifications.
    pub fn change_feed(&self) -> UnboundedSender<FileEvent> {
        self.feed_tx.clone()
    }

    /// A copy of the current in-memory graph.
    pub async fn graph(&self) -> crate::graph::Graph {
        self.manager.lock().await.get_graph()
    }

    fn set_state(&self, state: WatcherState) {
        tracing::debug!("[GraphWatcher] state {:?} -> {:?}", self.state(), state);
        *self.state.write() = state;
    }

    /// Scan the target directory, write the graph and begin watching.
    ///
    /// Fails if the watcher was already started, if the target directory does not exist, or if
    /// the OS change subscription cannot be opened.
    #[tracing::instrument(skip_all)]
    pub async fn start(&mut self) -> Result<WatchStats, GraphError> {
        if self.state() != WatcherState::Idle {
            return Err(GraphError::Configuration(format!(
                "watcher cannot be started from state {:?}",
                self.state()
            )));
        }
        let feed_rx = self.feed_rx.take().ok_or_else(|| {
            GraphError::Unexpected("watcher change feed already consumed".to_string())
        })?;
        self.set_state(WatcherState::Scanning);
        match self.start_inner(feed_rx).await {
            Ok(stats) => Ok(stats),
            Err(e) => {
                self.set_state(WatcherState::Stopped);
                Err(e)
            }
        }
    }

    async fn start_inner(
        &mut self,
        feed_rx: UnboundedReceiver<FileEvent>,
    ) -> Result<WatchStats, GraphError> {
        let root = tokio::fs::canonicalize(&self.options.target_directory)
            .await
            .map_err(|_| {
                GraphError::DirectoryNotFound(
                    self.options.target_directory.to_string_lossy().to_string(),
                )
            })?;
        tracing::info!("Initializing graph from {:?}", root);

        let stats = {
            let mut manager = self.manager.lock().await;
            *manager = manager_for(&root, &self.options);
            manager.initialize().await?;
            WatchStats::new(manager.document_count(), manager.stats())
        };
        *self.stats.write() = stats;

        let mut watch_loop = WatchLoop {
            manager: self.manager.clone(),
            events: self.events.clone(),
            stats: self.stats.clone(),
            filter: EventFilter {
                root: root.clone(),
                output_file: self.options.output_file.clone(),
                excludes: self.options.excludes.clone(),
                include_hidden: self.options.include_hidden,
            },
            output_file: self.options.output_file.clone(),
            debounce: Duration::from_millis(self.options.debounce_ms),
        };
        watch_loop.emit(WatchEvent::Initialized(stats));
        watch_loop.persist().await;
        tracing::info!(
            "Initial graph created with {} nodes and {} links",
            stats.node_count,
            stats.link_count
        );
        if let Ok(output) = tokio::fs::canonicalize(&self.options.output_file).await {
            watch_loop.filter.output_file = output;
        }

        if self.options.filesystem_events {
            self.debouncer = Some(self.subscribe_to_changes(&root)?);
            tracing::info!("Watching for changes in {:?}", root);
        }

        // Ready goes out before the loop can emit anything for queued changes.
        self.set_state(WatcherState::Watching);
        watch_loop.emit(WatchEvent::Ready);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown = Some(shutdown_tx);
        self.task = Some(tokio::spawn(watch_loop.run(feed_rx, shutdown_rx)));
        Ok(stats)
    }

    fn subscribe_to_changes(&self, root: &Path) -> Result<FileWatcher, GraphError> {
        let feed = self.feed_tx.clone();
        let mut debouncer = new_debouncer(
            Duration::from_millis(self.options.settle_ms),
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    for event in events.iter() {
                        for file_event in file_events(&event.event.kind, &event.paths) {
                            tracing::trace!("[Debouncer] {:?}", file_event);
                            if feed.send(file_event).is_err() {
                                tracing::debug!("[Debouncer] watcher loop is gone");
                                return;
                            }
                        }
                    }
                }
                Err(errors) => {
                    tracing::error!("Notify debouncer returned errors: {:?}", errors);
                }
            },
        )?;
        debouncer.watcher().watch(root, RecursiveMode::Recursive)?;
        Ok(debouncer)
    }

    /// Close the change subscription and wait for the event being processed, if any.
    ///
    /// Pending debounced writes are dropped. Stopping twice is a no-op.
    pub async fn stop(&mut self) -> Result<(), GraphError> {
        if self.state() == WatcherState::Stopped {
            return Ok(());
        }
        // Dropping the debouncer ends its notification thread.
        drop(self.debouncer.take());
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            task.await?;
        }
        self.set_state(WatcherState::Stopped);
        let _ = self.events.send(WatchEvent::Stopped);
        tracing::info!("File watcher stopped");
        Ok(())
    }
}

impl Drop for GraphWatcher {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
