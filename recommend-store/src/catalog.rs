//! In-memory node catalog acting as the host's node store.

use std::collections::HashSet;

use futures::future::BoxFuture;
use tracing::trace;

use crate::errors::RecommendError;
use crate::record::Node;
use crate::retrieve::NodeLookup;

/// Nodes loaded by the host, queryable by type and id.
#[derive(Clone, Debug, Default)]
pub struct NodeCatalog {
    nodes: Vec<Node>,
}

impl NodeCatalog {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_of_type<'a>(&'a self, node_type: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes.iter().filter(move |n| n.node_type == node_type)
    }
}

impl NodeLookup for NodeCatalog {
    /// Nodes of `node_type` whose id is in `ids`, in catalog order.
    fn find_all<'a>(
        &'a self,
        node_type: &'a str,
        ids: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Node>, RecommendError>> {
        Box::pin(async move {
            let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
            let found: Vec<Node> = self
                .nodes_of_type(node_type)
                .filter(|n| wanted.contains(n.id.as_str()))
                .cloned()
                .collect();
            trace!("catalog::find_all type={} wanted={} found={}", node_type, ids.len(), found.len());
            Ok(found)
        })
    }
}
