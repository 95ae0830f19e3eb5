//! The persisted `{nodes, links}` graph.
//!
//! ```json
//! { "nodes": { "<nodeId>": { "label": "...", "meta": { "k": "v" } } },
//!   "links": [ { "source": "<nodeId>", "target": "<nodeId>" } ] }
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::error::GraphError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<BTreeMap<String, String>>,
}

impl Node {
    pub fn empty() -> Self {
        Node::default()
    }

    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.meta.is_none()
    }
}

/// Directed edge between two node ids. The target is not required to exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Link {
    pub source: String,
    pub target: String,
}

impl Link {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Link {
            source: source.into(),
            target: target.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub link_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(deserialize_with = "deserialize_nodes")]
    pub nodes: BTreeMap<String, Node>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Graph {
    pub fn new() -> Self {
        Graph::default()
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            node_count: self.nodes.len(),
            link_count: self.links.len(),
        }
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Links leaving `id`, in insertion order.
    pub fn links_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Link> + 'a {
        self.links.iter().filter(move |link| link.source == id)
    }

    /// Delete `node_ids` and every link that starts or ends at one of them.
    pub fn retract(&mut self, node_ids: &[String]) {
        let retracted: HashSet<&str> = node_ids.iter().map(String::as_str).collect();
        for id in node_ids {
            self.nodes.remove(id);
        }
        self.links.retain(|link| {
            !retracted.contains(link.source.as_str()) && !retracted.contains(link.target.as_str())
        });
    }

    /// Merge `other` into this graph: nodes overwrite by id, links are appended.
    pub fn merge(&mut self, other: Graph) {
        self.nodes.extend(other.nodes);
        self.links.extend(other.links);
    }

    /// Serialize with two space indentation.
    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a persisted graph. The `nodes` collection may be either a map keyed by node id or
    /// an array of `{id, label?, meta?}` objects.
    pub fn from_json(json: &str) -> Result<Graph, GraphError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Deserialize)]
struct IdentifiedNode {
    id: String,
    #[serde(flatten)]
    node: Node,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NodeCollection {
    Map(BTreeMap<String, Node>),
    List(Vec<IdentifiedNode>),
}

fn deserialize_nodes<'de, D>(deserializer: D) -> Result<BTreeMap<String, Node>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match NodeCollection::deserialize(deserializer)? {
        NodeCollection::Map(map) => map,
        NodeCollection::List(list) => list.into_iter().map(|n| (n.id, n.node)).collect(),
    })
}
