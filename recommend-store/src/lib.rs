//! Semantic "recommended articles" over Qdrant.
//!
//! This crate provides a small API to:
//! - Index content nodes: embed a payload per node and upsert the vectors
//! - Resolve the top‑K most similar nodes of a given node
//!
//! The design is flat (no deep nesting) and splits responsibilities into focused modules.

mod catalog;
mod config;
mod embed;
mod embed_pool;
mod errors;
mod ingest;
mod io_jsonl;
mod qdrant_facade;
mod record;
mod retrieve;

#[cfg(test)]
mod testing;

pub use catalog::NodeCatalog;
pub use config::{OnEmbeddingFailure, OptimizersOptions, PluginOptions, QdrantOptions};
pub use embed::EmbeddingsProvider;
pub use errors::RecommendError;
pub use ingest::{ensure_collection, run_indexing_pipeline};
pub use io_jsonl::read_nodes;
pub use qdrant_facade::{CollectionSpec, NODE_ID_KEY, QdrantFacade, VectorIndex, point_id_for};
pub use record::{IndexReport, Node, PayloadTransform, Point, excerpt_payload};
pub use retrieve::{NodeLookup, recommend_ids, resolve_recommendations};

use embedding_service::OpenAiService;
use tracing::{debug, trace};

/// High-level facade that wires options, the embedding provider and the vector index.
///
/// This is the single entry point recommended for application code.
pub struct RecommendStore {
    opts: PluginOptions,
    provider: Box<dyn EmbeddingsProvider>,
    index: Box<dyn VectorIndex>,
}

impl RecommendStore {
    /// Constructs a store backed by OpenAI embeddings and Qdrant.
    ///
    /// # Errors
    /// Returns `RecommendError::Config` if the options are invalid or a client
    /// cannot be built, `RecommendError::Qdrant` if the Qdrant client fails.
    pub fn new(opts: PluginOptions) -> Result<Self, RecommendError> {
        trace!("RecommendStore::new collection={}", opts.qdrant.collection_name);
        opts.validate()?;
        let provider = OpenAiService::new(opts.openai.clone())
            .map_err(|e| RecommendError::Config(vec![e.to_string()]))?;
        let index = QdrantFacade::new(&opts.qdrant)?;
        Ok(Self::with_backends(opts, Box::new(provider), Box::new(index)))
    }

    /// Constructs a store over caller-supplied backends.
    pub fn with_backends(
        opts: PluginOptions,
        provider: Box<dyn EmbeddingsProvider>,
        index: Box<dyn VectorIndex>,
    ) -> Self {
        Self {
            opts,
            provider,
            index,
        }
    }

    pub fn options(&self) -> &PluginOptions {
        &self.opts
    }

    /// Runs the indexing pipeline over `nodes`.
    ///
    /// # Errors
    /// Returns configuration errors, or index errors naming the failed stage.
    pub async fn index_nodes(&self, nodes: &[Node]) -> Result<IndexReport, RecommendError> {
        debug!("RecommendStore::index_nodes total={}", nodes.len());
        run_indexing_pipeline(nodes, &self.opts, self.provider.as_ref(), self.index.as_ref()).await
    }

    /// Top `limit` nodes similar to `source_id`, most similar first.
    ///
    /// # Errors
    /// Returns `RecommendError::Lookup` if the host lookup fails.
    pub async fn recommend(
        &self,
        source_id: &str,
        lookup: &dyn NodeLookup,
    ) -> Result<Vec<Node>, RecommendError> {
        trace!("RecommendStore::recommend source={source_id} limit={}", self.opts.limit);
        resolve_recommendations(
            source_id,
            self.opts.limit,
            &self.opts,
            self.index.as_ref(),
            lookup,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BagOfWords, MemoryIndex};

    #[tokio::test]
    async fn store_indexes_and_recommends_through_catalog() {
        let mut opts = PluginOptions::new_default("http://localhost:6334");
        opts.node_type = "Article".into();
        opts.limit = 1;
        opts.openai.dimensions = 32;

        let nodes = vec![
            Node::new("a", "Article").with_field("excerpt", "qdrant vector search cosine"),
            Node::new("b", "Article").with_field("excerpt", "qdrant vector search cosine distance"),
            Node::new("c", "Article").with_field("excerpt", "garden tomatoes summer"),
        ];
        let store = RecommendStore::with_backends(
            opts,
            Box::new(BagOfWords::new(32)),
            Box::new(MemoryIndex::default()),
        );

        let report = store.index_nodes(&nodes).await.unwrap();
        assert_eq!(report.upserted, 3);

        let catalog = NodeCatalog::new(nodes);
        let recs = store.recommend("a", &catalog).await.unwrap();
        let ids: Vec<&str> = recs.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn invalid_options_are_rejected_before_clients_are_built() {
        let mut opts = PluginOptions::new_default("http://localhost:6334");
        opts.limit = 0;
        assert!(matches!(RecommendStore::new(opts), Err(RecommendError::Config(_))));
    }
}
