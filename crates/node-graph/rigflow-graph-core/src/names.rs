use indexmap::IndexMap;

use crate::error::GraphError;
use crate::graph::Graph;
use crate::types::NodeId;

/// Name-to-node table resolved once from a subtree.
///
/// Every requested name is looked up when the map is built, so a missing
/// node fails at that point instead of at first use. Names that occur more
/// than once in the subtree are rejected rather than resolved to whichever
/// comes first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NameMap {
    nodes: IndexMap<String, NodeId>,
}

impl NameMap {
    pub fn build(graph: &Graph, root: NodeId, names: &[&str]) -> Result<Self, GraphError> {
        let mut found: IndexMap<&str, Vec<NodeId>> =
            names.iter().map(|name| (*name, Vec::new())).collect();
        for id in graph.descendants(root)? {
            if let Some(hits) = found.get_mut(graph.node(id)?.name()) {
                hits.push(id);
            }
        }

        let missing: Vec<&str> = found
            .iter()
            .filter(|(_, hits)| hits.is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(GraphError::MissingNode(missing.join(", ")));
        }
        if let Some((name, _)) = found.iter().find(|(_, hits)| hits.len() > 1) {
            return Err(GraphError::DuplicateName((*name).to_string()));
        }

        Ok(Self {
            nodes: found
                .into_iter()
                .map(|(name, hits)| (name.to_string(), hits[0]))
                .collect(),
        })
    }

    pub fn get(&self, name: &str) -> Result<NodeId, GraphError> {
        self.nodes
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::MissingNode(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.nodes.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
