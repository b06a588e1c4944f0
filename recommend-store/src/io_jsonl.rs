//! JSONL node reader.
//!
//! One node per line: `{"id": ..., "type": ..., ...fields}`. Gatsby-style
//! dumps that keep the type under `internal.type` are accepted as well.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::RecommendError;
use crate::record::Node;

/// Reads nodes from a JSONL file.
///
/// This reader is **tolerant**:
/// - Empty lines are skipped.
/// - Malformed lines and lines without a string `id` are logged (`warn!`) and skipped.
///
/// # Errors
/// - [`RecommendError::Io`] if the file cannot be opened or read.
pub fn read_nodes(jsonl_path: impl AsRef<Path>) -> Result<Vec<Node>, RecommendError> {
    info!("Reading nodes JSONL: {:?}", jsonl_path.as_ref());

    let file = File::open(jsonl_path.as_ref())?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Value>(&line) {
            Ok(v) => match node_from_value(v) {
                Some(n) => out.push(n),
                None => warn!("Skipping line {}: no string 'id'", i + 1),
            },
            Err(e) => warn!("Skipping malformed JSON on line {}: {}", i + 1, e),
        }
    }

    debug!("Loaded {} nodes", out.len());
    Ok(out)
}

fn node_from_value(v: Value) -> Option<Node> {
    let Value::Object(mut fields) = v else {
        return None;
    };
    let id = match fields.remove("id")? {
        Value::String(s) if !s.is_empty() => s,
        _ => return None,
    };
    let node_type = match fields.remove("type") {
        Some(Value::String(t)) => t,
        _ => fields
            .get("internal")
            .and_then(|i| i.get("type"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    };
    Some(Node {
        id,
        node_type,
        fields,
    })
}
