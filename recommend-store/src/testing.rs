//! Test doubles: in-memory vector index, deterministic embedders, host lookups.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;

use crate::catalog::NodeCatalog;
use crate::embed::EmbeddingsProvider;
use crate::errors::RecommendError;
use crate::qdrant_facade::{CollectionSpec, VectorIndex};
use crate::record::{Node, Point};
use crate::retrieve::NodeLookup;

/// Embeds text as a hashed bag of lowercase words.
///
/// Texts sharing most words end up close under cosine similarity.
pub struct BagOfWords {
    dims: usize,
}

impl BagOfWords {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0; self.dims];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut h = DefaultHasher::new();
            word.to_lowercase().hash(&mut h);
            v[(h.finish() % self.dims as u64) as usize] += 1.0;
        }
        v
    }
}

impl EmbeddingsProvider for BagOfWords {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, RecommendError>> {
        Box::pin(async move { Ok(self.vector(text)) })
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// Fails every payload containing one of the given markers.
pub struct Flaky<P> {
    inner: P,
    markers: Vec<String>,
    pub calls: AtomicUsize,
}

impl<P> Flaky<P> {
    pub fn new<const N: usize>(inner: P, markers: [&str; N]) -> Self {
        Self {
            inner,
            markers: markers.iter().map(|m| m.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

impl<P: EmbeddingsProvider> EmbeddingsProvider for Flaky<P> {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, RecommendError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.markers.iter().any(|m| text.contains(m.as_str())) {
            return Box::pin(async { Err(RecommendError::Embedding("HTTP 500 from provider".into())) });
        }
        self.inner.embed(text)
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}

/// Delays every call and records the peak number of calls in flight.
pub struct Slow<P> {
    inner: P,
    delay: Duration,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl<P> Slow<P> {
    pub fn new(inner: P, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

impl<P: EmbeddingsProvider> EmbeddingsProvider for Slow<P> {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, RecommendError>> {
        Box::pin(async move {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            let out = self.inner.embed(text).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            out
        })
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}

/// Brute-force cosine index with call counters.
#[derive(Default)]
pub struct MemoryIndex {
    collections: Mutex<HashMap<String, (usize, BTreeMap<String, Vec<f32>>)>>,
    pub exists_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub upsert_calls: AtomicUsize,
    pub fail_create: bool,
    pub fail_upsert: bool,
    /// Echo the positives and repeat every hit in `recommend` results.
    pub noisy_hits: bool,
}

impl MemoryIndex {
    /// Index that already holds an empty collection.
    pub fn with_collection(name: &str, dimension: usize) -> Self {
        let idx = Self::default();
        if let Ok(mut c) = idx.collections.lock() {
            c.insert(name.to_string(), (dimension, BTreeMap::new()));
        }
        idx
    }

    pub fn points(&self, name: &str) -> BTreeMap<String, Vec<f32>> {
        self.collections
            .lock()
            .ok()
            .and_then(|c| c.get(name).map(|(_, p)| p.clone()))
            .unwrap_or_default()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
}

impl VectorIndex for MemoryIndex {
    fn collection_exists<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<bool, RecommendError>> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        let exists = self
            .collections
            .lock()
            .map(|c| c.contains_key(name))
            .unwrap_or(false);
        Box::pin(async move { Ok(exists) })
    }

    fn create_collection<'a>(
        &'a self,
        spec: &'a CollectionSpec,
    ) -> BoxFuture<'a, Result<(), RecommendError>> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let res = if self.fail_create {
            Err(RecommendError::CreateCollection {
                collection: spec.name.clone(),
                reason: "service unavailable".into(),
            })
        } else {
            let mut c = self.collections.lock().expect("index lock");
            c.entry(spec.name.clone())
                .or_insert_with(|| (spec.dimension, BTreeMap::new()));
            Ok(())
        };
        Box::pin(async move { res })
    }

    fn upsert<'a>(
        &'a self,
        name: &'a str,
        points: Vec<Point>,
    ) -> BoxFuture<'a, Result<usize, RecommendError>> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        let fail = |reason: &str| RecommendError::Upsert {
            collection: name.to_string(),
            reason: reason.to_string(),
        };
        let res = if self.fail_upsert {
            Err(fail("timeout"))
        } else {
            let mut c = self.collections.lock().expect("index lock");
            match c.get_mut(name) {
                None => Err(fail("collection not found")),
                Some((dim, stored)) => {
                    let wrong = points.iter().map(|p| p.vector.len()).find(|len| *len != *dim);
                    if let Some(got) = wrong {
                        Err(fail(&format!(
                            "Vector dimension error: expected dim: {dim}, got {got}"
                        )))
                    } else {
                        let n = points.len();
                        for p in points {
                            stored.insert(p.id, p.vector);
                        }
                        Ok(n)
                    }
                }
            }
        };
        Box::pin(async move { res })
    }

    fn recommend<'a>(
        &'a self,
        name: &'a str,
        positive: &'a [String],
        limit: u64,
    ) -> BoxFuture<'a, Result<Vec<String>, RecommendError>> {
        let res = rank(&self.points(name), name, positive, limit).map(|ids| {
            if !self.noisy_hits {
                return ids;
            }
            let mut out = positive.to_vec();
            for id in ids {
                out.push(id.clone());
                out.push(id);
            }
            out
        });
        Box::pin(async move { res })
    }
}

fn rank(
    stored: &BTreeMap<String, Vec<f32>>,
    name: &str,
    positive: &[String],
    limit: u64,
) -> Result<Vec<String>, RecommendError> {
    let seeds: Vec<&Vec<f32>> = positive
        .iter()
        .map(|id| {
            stored.get(id).ok_or_else(|| RecommendError::Recommend {
                collection: name.to_string(),
                reason: format!("No point with id {id} found"),
            })
        })
        .collect::<Result<_, _>>()?;

    let dim = seeds.iter().map(|v| v.len()).max().unwrap_or(0);
    let mut avg = vec![0.0f32; dim];
    for s in seeds.iter().filter(|s| s.len() == dim) {
        for (a, x) in avg.iter_mut().zip(s.iter()) {
            *a += x / seeds.len() as f32;
        }
    }

    let exclude: HashSet<&String> = positive.iter().collect();
    let mut scored: Vec<(f32, &String)> = stored
        .iter()
        .filter(|(id, _)| !exclude.contains(id))
        .map(|(id, v)| (cosine(&avg, v), id))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));

    Ok(scored
        .into_iter()
        .take(limit as usize)
        .map(|(_, id)| id.clone())
        .collect())
}

/// Host lookup that returns matches in reverse catalog order.
pub struct ReversedLookup {
    catalog: NodeCatalog,
    pub calls: AtomicUsize,
}

impl ReversedLookup {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            catalog: NodeCatalog::new(nodes),
            calls: AtomicUsize::new(0),
        }
    }
}

impl NodeLookup for ReversedLookup {
    fn find_all<'a>(
        &'a self,
        node_type: &'a str,
        ids: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Node>, RecommendError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            let mut found = self.catalog.find_all(node_type, ids).await?;
            found.reverse();
            Ok(found)
        })
    }
}

/// Sets environment variables for one test and restores them on drop.
///
/// Every name in `clear` is removed first so ambient settings cannot leak in.
/// Tests using it must run under `#[serial_test::serial]`.
pub struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    pub fn new(clear: &[&str], set: &[(&str, &str)]) -> Self {
        let names = clear.iter().copied().chain(set.iter().map(|(k, _)| *k));
        let saved = names.map(|k| (k.to_string(), std::env::var(k).ok())).collect();
        // SAFETY: callers are serialized, no other thread touches the environment.
        unsafe {
            for k in clear {
                std::env::remove_var(k);
            }
            for (k, v) in set {
                std::env::set_var(k, v);
            }
        }
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        // SAFETY: see `EnvGuard::new`.
        unsafe {
            for (k, v) in self.saved.iter().rev() {
                match v {
                    Some(v) => std::env::set_var(k, v),
                    None => std::env::remove_var(k),
                }
            }
        }
    }
}
