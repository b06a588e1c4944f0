//! Indexing pipeline: ensure collection → embed every node → one batched upsert.
//!
//! A failed embedding is isolated to its node and handled per
//! [`OnEmbeddingFailure`]; a failed collection check, creation or upsert
//! aborts the run.

use tracing::{debug, info, warn};

use crate::config::{OnEmbeddingFailure, PluginOptions};
use crate::embed::EmbeddingsProvider;
use crate::embed_pool::embed_nodes;
use crate::errors::RecommendError;
use crate::qdrant_facade::VectorIndex;
use crate::record::{IndexReport, Node, Point};

/// Makes sure the configured collection is ready.
///
/// Checks existence exactly once and creates the collection only when it is
/// absent. An existing collection is reused as is, never resized.
pub async fn ensure_collection(
    opts: &PluginOptions,
    index: &dyn VectorIndex,
) -> Result<(), RecommendError> {
    let spec = opts.collection_spec();
    if index.collection_exists(&spec.name).await? {
        debug!("Collection '{}' already exists, reusing", spec.name);
        return Ok(());
    }
    index.create_collection(&spec).await
}

/// Indexes all nodes of `opts.node_type` into the configured collection.
///
/// Returns how many nodes were embedded, which ones failed and how many
/// points the index acknowledged.
///
/// # Errors
/// - `RecommendError::Config` if the provider dimension differs from
///   `embeddingSize` (raised before any network call).
/// - `CollectionCheck` / `CreateCollection` / `Upsert` on index failures.
pub async fn run_indexing_pipeline(
    nodes: &[Node],
    opts: &PluginOptions,
    provider: &dyn EmbeddingsProvider,
    index: &dyn VectorIndex,
) -> Result<IndexReport, RecommendError> {
    let want = opts.openai.dimensions;
    if provider.dimensions() != want {
        return Err(RecommendError::Config(vec![format!(
            "embedding provider returns {} dimensions but embeddingSize is {}",
            provider.dimensions(),
            want
        )]));
    }

    let selected: Vec<&Node> = nodes
        .iter()
        .filter(|n| n.node_type == opts.node_type)
        .collect();
    info!(
        "Indexing {} of {} nodes of type '{}' into '{}'",
        selected.len(),
        nodes.len(),
        opts.node_type,
        opts.qdrant.collection_name
    );

    ensure_collection(opts, index).await?;

    let embedded = embed_nodes(
        &selected,
        &opts.to_payload,
        provider,
        opts.embedding_concurrency,
        opts.embedding_timeout(),
    )
    .await;

    let mut report = IndexReport::default();
    let mut points = Vec::with_capacity(embedded.len());
    for e in embedded {
        match e.vector {
            Ok(vector) => {
                report.embedded += 1;
                points.push(Point { id: e.id, vector });
            }
            Err(_) => {
                if opts.on_embedding_failure == OnEmbeddingFailure::UpsertEmpty {
                    points.push(Point::zeroed(e.id.clone(), want));
                }
                report.failed.push(e.id);
            }
        }
    }

    if !report.failed.is_empty() {
        warn!(
            failed = report.failed.len(),
            policy = ?opts.on_embedding_failure,
            "some nodes could not be embedded"
        );
    }

    if points.is_empty() {
        debug!("Nothing to upsert");
        return Ok(report);
    }

    report.upserted = index
        .upsert(&opts.qdrant.collection_name, points)
        .await?;
    info!(
        "Indexing done: embedded={} failed={} upserted={}",
        report.embedded,
        report.failed.len(),
        report.upserted
    );
    Ok(report)
}
