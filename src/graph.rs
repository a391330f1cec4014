use petgraph::{
    dot,
    graph::{DiGraph, NodeIndex},
};
use std::collections::BTreeMap;
use std::fmt::{self, Debug};

use super::topology::{Service, Topology};
use super::Result;

/// Styling category for a service node
///
/// Forces lowercase values of this enum to be used
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum NodeCategory {
    /// Unconditionally enabled
    Core,
    /// Enabled through configuration conditions
    Conditional,
    /// Everything else: databases, caches, disabled extras
    Support,
}

impl NodeCategory {
    pub fn classify(svc: &Service) -> NodeCategory {
        if svc.infrastructure.enabled {
            NodeCategory::Core
        } else if svc.infrastructure.is_conditional() {
            NodeCategory::Conditional
        } else {
            NodeCategory::Support
        }
    }
}

/// The node type in `TopologyGraph` representing a service
#[derive(Serialize, Deserialize, Clone)]
pub struct ServiceNode {
    pub name: String,
    pub description: String,
    pub category: NodeCategory,
}
impl ServiceNode {
    fn new(name: &str, svc: &Service) -> Self {
        ServiceNode {
            name: name.to_string(),
            description: svc
                .infrastructure
                .description
                .clone()
                .unwrap_or_else(|| name.to_string()),
            category: NodeCategory::classify(svc),
        }
    }
}
// Debug is used for the `dot` interface - nice to have a minimal output for that
impl Debug for ServiceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Graph of services with `requires` entries as edges
///
/// This is fully serializable because it is created with `petgraph` using the
/// serde featureset. We use that to serialize the graph as yaml, and the
/// `petgraph` helpers to convert it to `graphviz` format.
pub type TopologyGraph = DiGraph<ServiceNode, ()>;

/// Helper to look up a node index by service name
pub fn nodeidx_from_name(name: &str, graph: &TopologyGraph) -> Option<NodeIndex> {
    for id in graph.node_indices() {
        if let Some(n) = graph.node_weight(id) {
            if n.name == name {
                return Some(id);
            }
        }
    }
    None
}

/// Build the full topology graph with edges from dependent to dependency
///
/// Nodes are added in name order so the graph is identical between runs.
pub fn build(tp: &Topology) -> TopologyGraph {
    let mut graph: TopologyGraph = DiGraph::new();
    let mut indices: BTreeMap<&str, NodeIndex> = BTreeMap::new();
    for (name, svc) in tp.services() {
        let idx = graph.add_node(ServiceNode::new(name, svc));
        indices.insert(name.as_str(), idx);
    }
    for (name, svc) in tp.services() {
        let idx = indices[name.as_str()];
        for dep in &svc.infrastructure.requires {
            if let Some(&depidx) = indices.get(dep.as_str()) {
                graph.update_edge(idx, depidx, ());
            }
        }
    }
    graph
}

/// Print the topology graph as yaml, or graphviz dot format
pub fn generate(tp: &Topology, dotfmt: bool) -> Result<TopologyGraph> {
    let graph = build(tp);
    let out = if dotfmt {
        format!("{:?}", dot::Dot::with_config(&graph, &[dot::Config::EdgeNoLabel]))
    } else {
        serde_yaml::to_string(&graph)?
    };
    println!("{}", out);
    Ok(graph)
}
