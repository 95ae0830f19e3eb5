use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    path::PathBuf,
    time::SystemTime,
};

use crate::graph::GraphStats;

/// What happened to a watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Changed,
    Removed,
}

impl Display for ChangeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ChangeType::Added => "added",
            ChangeType::Changed => "changed",
            ChangeType::Removed => "removed",
        };
        write!(f, "{name}")
    }
}

/// One change to one file, as fed into the watcher loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEvent {
    pub path: PathBuf,
    pub change_type: ChangeType,
}

impl FileEvent {
    pub fn new(path: impl Into<PathBuf>, change_type: ChangeType) -> Self {
        FileEvent {
            path: path.into(),
            change_type,
        }
    }

    pub fn added(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ChangeType::Added)
    }

    pub fn changed(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ChangeType::Changed)
    }

    pub fn removed(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ChangeType::Removed)
    }
}

/// Snapshot of the watcher's graph after its latest mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchStats {
    /// Documents currently contributing to the graph.
    pub total_files: usize,
    pub node_count: usize,
    pub link_count: usize,
    pub last_update: SystemTime,
}

impl WatchStats {
    pub fn new(total_files: usize, graph: GraphStats) -> Self {
        WatchStats {
            total_files,
            node_count: graph.node_count,
            link_count: graph.link_count,
            last_update: SystemTime::now(),
        }
    }
}

impl Default for WatchStats {
    fn default() -> Self {
        WatchStats {
            total_files: 0,
            node_count: 0,
            link_count: 0,
            last_update: SystemTime::UNIX_EPOCH,
        }
    }
}

/// Lifecycle notifications delivered to watcher subscribers, in the order they occur.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatchEvent {
    /// The first full scan finished. Sent before the first write.
    Initialized(WatchStats),
    /// The graph was written to disk.
    GraphWritten {
        output_file: PathBuf,
        node_count: usize,
        link_count: usize,
    },
    /// The in-memory graph was updated for one file.
    FileChanged {
        path: PathBuf,
        change_type: ChangeType,
        stats: WatchStats,
    },
    /// The change subscription is open; later edits will be picked up.
    Ready,
    /// The watcher reached its terminal state.
    Stopped,
}

impl Display for WatchEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchEvent::Initialized(stats) => write!(
                f,
                "initialized ({} nodes, {} links)",
                stats.node_count, stats.link_count
            ),
            WatchEvent::GraphWritten {
                output_file,
                node_count,
                link_count,
            } => write!(
                f,
                "graph written to {} ({node_count} nodes, {link_count} links)",
                output_file.display()
            ),
            WatchEvent::FileChanged {
                path, change_type, ..
            } => write!(f, "{} {change_type}", path.display()),
            WatchEvent::Ready => write!(f, "ready"),
            WatchEvent::Stopped => write!(f, "stopped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_types_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&ChangeType::Removed).unwrap(),
            "\"removed\""
        );
        assert_eq!(FileEvent::added("a.md").change_type, ChangeType::Added);
    }

    #[test]
    fn events_render_for_logs() {
        let event = WatchEvent::FileChanged {
            path: PathBuf::from("notes/a.md"),
            change_type: ChangeType::Changed,
            stats: WatchStats::default(),
        };
        assert_eq!(event.to_string(), "notes/a.md changed");
    }
}
