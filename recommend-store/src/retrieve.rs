//! Recommendation resolver: similarity query, then one batched host lookup.

use std::collections::{HashMap, HashSet};

use futures::future::BoxFuture;
use tracing::{debug, trace, warn};

use crate::config::PluginOptions;
use crate::errors::RecommendError;
use crate::qdrant_facade::VectorIndex;
use crate::record::Node;

/// Host capability: find all nodes of a type whose id is in a set.
///
/// Implementations need not preserve the order of `ids`.
pub trait NodeLookup: Send + Sync {
    fn find_all<'a>(
        &'a self,
        node_type: &'a str,
        ids: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Node>, RecommendError>>;
}

/// Ids of the nodes most similar to `source_id`, best first.
///
/// Never contains `source_id`, never more than `limit` entries. A failed
/// query (typically a node added after the last indexing run) yields an
/// empty list.
pub async fn recommend_ids(
    source_id: &str,
    limit: u64,
    opts: &PluginOptions,
    index: &dyn VectorIndex,
) -> Vec<String> {
    let collection = &opts.qdrant.collection_name;
    let positive = [source_id.to_string()];

    let ids = match index.recommend(collection, &positive, limit).await {
        Ok(ids) => ids,
        Err(e) => {
            warn!(source_id, error = %e, "no recommendations: similarity query failed");
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let ranked: Vec<String> = ids
        .into_iter()
        .filter(|id| id != source_id && seen.insert(id.clone()))
        .take(limit as usize)
        .collect();
    trace!("retrieve::recommend_ids source={} hits={}", source_id, ranked.len());
    ranked
}

/// Resolves the top-`limit` similar nodes of `source_id` into host nodes.
///
/// Nodes come back in similarity order; ids the host no longer knows are dropped.
///
/// # Errors
/// `RecommendError::Lookup` if the host lookup fails.
pub async fn resolve_recommendations(
    source_id: &str,
    limit: u64,
    opts: &PluginOptions,
    index: &dyn VectorIndex,
    lookup: &dyn NodeLookup,
) -> Result<Vec<Node>, RecommendError> {
    let ids = recommend_ids(source_id, limit, opts, index).await;
    if ids.is_empty() {
        debug!(source_id, "no similar nodes");
        return Ok(Vec::new());
    }

    let mut nodes = lookup.find_all(&opts.node_type, &ids).await?;

    let rank: HashMap<&str, usize> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();
    nodes.retain(|n| rank.contains_key(n.id.as_str()));
    nodes.sort_by_key(|n| rank.get(n.id.as_str()).copied().unwrap_or(usize::MAX));

    debug!(source_id, resolved = nodes.len(), "recommendations resolved");
    Ok(nodes)
}
