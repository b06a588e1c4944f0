//! Vector store gateway: the [`VectorIndex`] seam and its Qdrant implementation.
//!
//! The facade concentrates all `qdrant-client` usage behind four operations
//! (exists, create, upsert, recommend), hiding the builder API and keeping the
//! pipeline and resolver decoupled from the client.

use std::time::Duration;

use futures::future::BoxFuture;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::with_payload_selector::SelectorOptions;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, OptimizersConfigDiffBuilder, PayloadIncludeSelector,
    PointId, PointStruct, RecommendPointsBuilder, ScoredPoint, UpdateStatus, UpsertPointsBuilder,
    VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::json;
use services::uuid::stable_uuid;
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::config::QdrantOptions;
use crate::errors::RecommendError;
use crate::record::Point;

/// Payload key holding the node id a point was built from.
pub const NODE_ID_KEY: &str = "node_id";

/// Layout of a collection; distance is always cosine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionSpec {
    pub name: String,
    pub dimension: usize,
    pub on_disk: Option<bool>,
    pub memmap_threshold: Option<u64>,
}

/// Operations the pipeline and resolver need from a vector index.
pub trait VectorIndex: Send + Sync {
    /// Whether the named collection exists.
    fn collection_exists<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<bool, RecommendError>>;

    /// Creates the collection; only called after `collection_exists` said no.
    fn create_collection<'a>(
        &'a self,
        spec: &'a CollectionSpec,
    ) -> BoxFuture<'a, Result<(), RecommendError>>;

    /// Inserts or replaces points by id and waits until they are queryable.
    /// Returns the number of points written.
    fn upsert<'a>(
        &'a self,
        name: &'a str,
        points: Vec<Point>,
    ) -> BoxFuture<'a, Result<usize, RecommendError>>;

    /// Node ids most similar to the `positive` examples, best first.
    fn recommend<'a>(
        &'a self,
        name: &'a str,
        positive: &'a [String],
        limit: u64,
    ) -> BoxFuture<'a, Result<Vec<String>, RecommendError>>;
}

/// Maps a node id to a Qdrant point id.
///
/// Qdrant accepts only UUIDs and unsigned integers, so ids that are not
/// already UUIDs are turned into a deterministic UUIDv5.
pub fn point_id_for(node_id: &str) -> String {
    match Uuid::parse_str(node_id) {
        Ok(u) => u.hyphenated().to_string(),
        Err(_) => stable_uuid(node_id).to_string(),
    }
}

/// A facade over the Qdrant client.
pub struct QdrantFacade {
    client: Qdrant,
}

impl QdrantFacade {
    /// Builds a client from the connection part of the options.
    ///
    /// Honours the API key, the `https` flag, extra headers and timeout.
    pub fn new(opts: &QdrantOptions) -> Result<Self, RecommendError> {
        let url = opts.effective_url();
        let mut builder = Qdrant::from_url(&url);
        if let Some(key) = &opts.api_key {
            builder = builder.api_key(key.clone());
        }
        for (name, value) in &opts.headers {
            builder = builder.header(name.clone(), value.clone());
        }
        if let Some(secs) = opts.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| RecommendError::Qdrant(e.to_string()))?;

        info!(url = %url, collection = %opts.collection_name, "Qdrant client ready");
        Ok(Self { client })
    }
}

impl VectorIndex for QdrantFacade {
    fn collection_exists<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<bool, RecommendError>> {
        Box::pin(async move {
            let exists = self.client.collection_exists(name).await.map_err(|e| {
                RecommendError::CollectionCheck {
                    collection: name.to_string(),
                    reason: e.to_string(),
                }
            })?;
            debug!("Collection '{}' exists={}", name, exists);
            Ok(exists)
        })
    }

    fn create_collection<'a>(
        &'a self,
        spec: &'a CollectionSpec,
    ) -> BoxFuture<'a, Result<(), RecommendError>> {
        Box::pin(async move {
            info!(
                "Creating collection '{}' with size={} distance=Cosine on_disk={:?}",
                spec.name, spec.dimension, spec.on_disk
            );
            let fail = |reason: String| RecommendError::CreateCollection {
                collection: spec.name.clone(),
                reason,
            };

            let mut vectors = VectorParamsBuilder::new(spec.dimension as u64, Distance::Cosine);
            if let Some(on_disk) = spec.on_disk {
                vectors = vectors.on_disk(on_disk);
            }
            let mut builder = CreateCollectionBuilder::new(&spec.name).vectors_config(vectors);
            if let Some(threshold) = spec.memmap_threshold {
                builder = builder.optimizers_config(
                    OptimizersConfigDiffBuilder::default().memmap_threshold(threshold),
                );
            }

            let res = self
                .client
                .create_collection(builder)
                .await
                .map_err(|e| fail(e.to_string()))?;
            if !res.result {
                return Err(fail("not acknowledged by server".into()));
            }

            info!("Collection '{}' created successfully", spec.name);
            Ok(())
        })
    }

    fn upsert<'a>(
        &'a self,
        name: &'a str,
        points: Vec<Point>,
    ) -> BoxFuture<'a, Result<usize, RecommendError>> {
        Box::pin(async move {
            let fail = |reason: String| RecommendError::Upsert {
                collection: name.to_string(),
                reason,
            };

            let count = points.len();
            let structs = points
                .into_iter()
                .map(to_point_struct)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| fail(e.to_string()))?;

            info!("Upserting {} points into collection '{}'", count, name);
            let res = self
                .client
                .upsert_points(UpsertPointsBuilder::new(name, structs).wait(true))
                .await
                .map_err(|e| fail(e.to_string()))?;

            debug!("Upsert operation result={:?}", res.result);
            match res.result {
                Some(r) if r.status == UpdateStatus::Completed as i32 => Ok(count),
                Some(r) => Err(fail(format!("unexpected update status {}", r.status))),
                None => Err(fail("empty response".into())),
            }
        })
    }

    fn recommend<'a>(
        &'a self,
        name: &'a str,
        positive: &'a [String],
        limit: u64,
    ) -> BoxFuture<'a, Result<Vec<String>, RecommendError>> {
        Box::pin(async move {
            trace!("recommend in '{}' positive={:?} limit={}", name, positive, limit);

            let mut builder = RecommendPointsBuilder::new(name, limit)
                .with_payload(node_id_only())
                .with_vectors(false);
            for id in positive {
                builder = builder.add_positive(PointId::from(point_id_for(id)));
            }

            let res = self
                .client
                .recommend(builder)
                .await
                .map_err(|e| RecommendError::Recommend {
                    collection: name.to_string(),
                    reason: e.to_string(),
                })?;

            let ids: Vec<String> = res.result.into_iter().filter_map(node_id_of).collect();
            debug!("Recommend completed: {} hits returned", ids.len());
            Ok(ids)
        })
    }
}

/// Converts a [`Point`] into a Qdrant point carrying the node id as payload.
fn to_point_struct(p: Point) -> Result<PointStruct, qdrant_client::QdrantError> {
    let payload: Payload = json!({ NODE_ID_KEY: p.id }).try_into()?;
    Ok(PointStruct::new(point_id_for(&p.id), p.vector, payload))
}

/// Payload selector returning only the node id field.
fn node_id_only() -> SelectorOptions {
    SelectorOptions::Include(PayloadIncludeSelector {
        fields: vec![NODE_ID_KEY.to_string()],
    })
}

/// Extracts the node id from a hit, falling back to the raw point id.
fn node_id_of(sp: ScoredPoint) -> Option<String> {
    if let Some(s) = sp
        .payload
        .get(NODE_ID_KEY)
        .and_then(|v| v.clone().into_json().as_str().map(str::to_owned))
    {
        return Some(s);
    }
    match sp.id?.point_id_options? {
        PointIdOptions::Uuid(s) => Some(s),
        PointIdOptions::Num(n) => Some(n.to_string()),
    }
}
