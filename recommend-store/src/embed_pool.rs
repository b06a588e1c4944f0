//! Embedding executor with bounded concurrency, per-call timeout and dimension checks.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info};

use crate::embed::EmbeddingsProvider;
use crate::errors::RecommendError;
use crate::record::{Node, PayloadTransform};

/// Result of embedding one node's payload.
#[derive(Debug)]
pub struct Embedded {
    pub id: String,
    pub vector: Result<Vec<f32>, RecommendError>,
}

/// Embeds the payload of every node, at most `concurrency` calls in flight.
///
/// Failures (provider error, timeout, wrong length) are logged and returned
/// per node; they never abort the batch. Output order matches `nodes`.
pub async fn embed_nodes(
    nodes: &[&Node],
    to_payload: &PayloadTransform,
    provider: &dyn EmbeddingsProvider,
    concurrency: usize,
    timeout: Duration,
) -> Vec<Embedded> {
    info!(
        "embed_pool::embed_nodes: total={} concurrency={} timeout={:?}",
        nodes.len(),
        concurrency,
        timeout
    );

    if nodes.is_empty() {
        debug!("embed_pool::embed_nodes: nothing to embed");
        return Vec::new();
    }

    let want = provider.dimensions();
    let pb = progress_bar(nodes.len());

    let mut results: Vec<(usize, Embedded)> = stream::iter(nodes.iter().enumerate())
        .map(|(i, node)| {
            let payload = to_payload.apply(node);
            let pb = &pb;
            async move {
                let vector = embed_one(provider, &payload, want, timeout).await;
                if let Err(e) = &vector {
                    error!(node_id = %node.id, error = %e, "embedding failed");
                }
                pb.inc(1);
                (
                    i,
                    Embedded {
                        id: node.id.clone(),
                        vector,
                    },
                )
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    pb.finish_and_clear();
    results.sort_by_key(|(i, _)| *i);

    debug!("embed_pool::embed_nodes: all calls settled");
    results.into_iter().map(|(_, e)| e).collect()
}

async fn embed_one(
    provider: &dyn EmbeddingsProvider,
    payload: &str,
    want: usize,
    timeout: Duration,
) -> Result<Vec<f32>, RecommendError> {
    let v = tokio::time::timeout(timeout, provider.embed(payload))
        .await
        .map_err(|_| RecommendError::EmbeddingTimeout(timeout))??;
    if v.len() != want {
        return Err(RecommendError::VectorSizeMismatch { got: v.len(), want });
    }
    Ok(v)
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} embeddings ({eta})",
    )
    .map(|s| s.progress_chars("##-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BagOfWords, Flaky, Slow};
    use std::sync::atomic::Ordering;

    fn nodes() -> Vec<Node> {
        (0..10)
            .map(|i| Node::new(format!("n{i}"), "Article").with_field("excerpt", format!("text {i}")))
            .collect()
    }

    #[tokio::test]
    async fn keeps_input_order_and_bounds_concurrency() {
        let owned = nodes();
        let refs: Vec<&Node> = owned.iter().collect();
        let provider = Slow::new(BagOfWords::new(16), Duration::from_millis(5));

        let out = embed_nodes(
            &refs,
            &PayloadTransform::default(),
            &provider,
            3,
            Duration::from_secs(5),
        )
        .await;

        let ids: Vec<&str> = out.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["n0", "n1", "n2", "n3", "n4", "n5", "n6", "n7", "n8", "n9"]);
        assert!(
            out.iter()
                .all(|e| matches!(e.vector.as_ref().map(Vec::len), Ok(16)))
        );
        assert!(provider.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn failures_and_timeouts_are_isolated() {
        let owned = nodes();
        let refs: Vec<&Node> = owned.iter().collect();

        let flaky = Flaky::new(BagOfWords::new(8), ["text 3"]);
        let out = embed_nodes(
            &refs,
            &PayloadTransform::new(|n| n.excerpt().unwrap_or_default().to_string()),
            &flaky,
            4,
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(out.iter().filter(|e| e.vector.is_err()).count(), 1);
        assert!(out[3].vector.is_err());

        let slow = Slow::new(BagOfWords::new(8), Duration::from_millis(200));
        let out = embed_nodes(
            &refs[..2],
            &PayloadTransform::default(),
            &slow,
            2,
            Duration::from_millis(20),
        )
        .await;
        assert!(
            out.iter()
                .all(|e| matches!(e.vector, Err(RecommendError::EmbeddingTimeout(_))))
        );
    }
}
