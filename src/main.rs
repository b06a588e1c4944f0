use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use recommend_store::{NodeCatalog, PluginOptions, RecommendStore, read_nodes};
use serde_json::json;
use tracing::{info, warn};

mod telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("loading .env");
        }
    }

    telemetry::init().context("installing tracing subscriber")?;

    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("NODES_JSONL").ok())
        .map(PathBuf::from)
        .context("usage: recommend-article <nodes.jsonl> (or set NODES_JSONL)")?;

    let opts = PluginOptions::from_env().context("validation")?;
    let nodes = read_nodes(&path).with_context(|| format!("reading nodes from {}", path.display()))?;
    let node_type = opts.node_type.clone();

    let store = RecommendStore::new(opts).context("connecting clients")?;
    let report = store.index_nodes(&nodes).await.context("indexing")?;
    if !report.failed.is_empty() {
        warn!(failed = ?report.failed, "nodes without embeddings");
    }

    let catalog = NodeCatalog::new(nodes);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut printed = 0usize;
    for node in catalog.nodes_of_type(&node_type) {
        let recs = store
            .recommend(&node.id, &catalog)
            .await
            .with_context(|| format!("resolving recommendations for {}", node.id))?;
        let ids: Vec<&str> = recs.iter().map(|n| n.id.as_str()).collect();
        serde_json::to_writer(&mut out, &json!({ "id": node.id, "recommends": ids }))?;
        out.write_all(b"\n")?;
        printed += 1;
    }
    out.flush()?;

    info!(
        embedded = report.embedded,
        upserted = report.upserted,
        printed,
        "done"
    );
    Ok(())
}
