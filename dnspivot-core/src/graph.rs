// Provenance graph of resolved hostnames

use crate::error::GraphError;
use dnspivot_resolver::normalize_hostname;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::IpAddr;

/// One hostname that resolved to at least one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryNode {
    pub hostname: String,
    pub addresses: BTreeSet<IpAddr>,
    /// Hostname whose address led here; `None` for generator candidates.
    pub parent: Option<String>,
}

impl DiscoveryNode {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// What `DiscoveryGraph::record` did, with the addresses the node did not
/// hold before the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Created(BTreeSet<IpAddr>),
    Merged(BTreeSet<IpAddr>),
}

impl Recorded {
    pub fn fresh(&self) -> &BTreeSet<IpAddr> {
        match self {
            Recorded::Created(fresh) | Recorded::Merged(fresh) => fresh,
        }
    }

    pub fn into_fresh(self) -> BTreeSet<IpAddr> {
        match self {
            Recorded::Created(fresh) | Recorded::Merged(fresh) => fresh,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Recorded::Created(_))
    }
}

/// Hostname -> node map with parent -> child edges.
///
/// Keys are written once and never removed; address sets only grow. Node
/// indices follow insertion order, which is also the order children are
/// listed in.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryGraph {
    graph: DiGraph<DiscoveryNode, ()>,
    index: HashMap<String, NodeIndex>,
}

impl DiscoveryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `hostname` under `parent`, or merge `addresses` into the
    /// existing node without touching its parent.
    pub fn record(
        &mut self,
        hostname: &str,
        addresses: &BTreeSet<IpAddr>,
        parent: Option<&str>,
    ) -> Result<Recorded, GraphError> {
        let hostname = normalize_hostname(hostname);
        if addresses.is_empty() {
            return Err(GraphError::EmptyAddressSet(hostname));
        }

        if let Some(&idx) = self.index.get(&hostname) {
            let node = &mut self.graph[idx];
            let fresh: BTreeSet<IpAddr> = addresses.difference(&node.addresses).copied().collect();
            node.addresses.extend(fresh.iter().copied());
            return Ok(Recorded::Merged(fresh));
        }

        let parent_idx = match parent.map(normalize_hostname) {
            Some(parent) => match self.index.get(&parent) {
                Some(&idx) => Some((idx, parent)),
                None => {
                    return Err(GraphError::UnknownParent { hostname, parent });
                }
            },
            None => None,
        };

        let node = DiscoveryNode {
            hostname: hostname.clone(),
            addresses: addresses.clone(),
            parent: parent_idx.as_ref().map(|(_, name)| name.clone()),
        };
        let idx = self.graph.add_node(node);
        if let Some((parent_idx, _)) = parent_idx {
            self.graph.add_edge(parent_idx, idx, ());
        }
        self.index.insert(hostname, idx);

        Ok(Recorded::Created(addresses.clone()))
    }

    pub fn get(&self, hostname: &str) -> Option<&DiscoveryNode> {
        self.index
            .get(&normalize_hostname(hostname))
            .map(|&idx| &self.graph[idx])
    }

    pub fn contains(&self, hostname: &str) -> bool {
        self.index.contains_key(&normalize_hostname(hostname))
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &DiscoveryNode> {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    pub fn roots(&self) -> impl Iterator<Item = &DiscoveryNode> {
        self.nodes().filter(|node| node.is_root())
    }

    /// Nodes whose parent is `hostname`, in insertion order.
    pub fn children(&self, hostname: &str) -> Vec<&DiscoveryNode> {
        let Some(&idx) = self.index.get(&normalize_hostname(hostname)) else {
            return Vec::new();
        };
        let mut children: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        children.sort();
        children.into_iter().map(|child| &self.graph[child]).collect()
    }

    /// `hostname` followed by its parent chain up to a root.
    ///
    /// Bounded by the node count, so a corrupt chain cannot loop.
    pub fn lineage(&self, hostname: &str) -> Vec<&DiscoveryNode> {
        let mut chain = Vec::new();
        let mut current = self.get(hostname);
        while let Some(node) = current {
            if chain.len() >= self.len() {
                break;
            }
            chain.push(node);
            current = node.parent.as_deref().and_then(|parent| self.get(parent));
        }
        chain
    }

    /// Number of distinct addresses across all nodes.
    pub fn address_count(&self) -> usize {
        self.nodes()
            .flat_map(|node| node.addresses.iter())
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Addresses held by more than one hostname, with those hostnames in
    /// insertion order.
    pub fn shared_addresses(&self) -> BTreeMap<IpAddr, Vec<String>> {
        let mut by_address: BTreeMap<IpAddr, Vec<String>> = BTreeMap::new();
        for node in self.nodes() {
            for address in &node.addresses {
                by_address
                    .entry(*address)
                    .or_default()
                    .push(node.hostname.clone());
            }
        }
        by_address.retain(|_, hostnames| hostnames.len() > 1);
        by_address
    }
}

impl Serialize for DiscoveryGraph {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.nodes())
    }
}
