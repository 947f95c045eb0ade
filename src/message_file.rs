use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading the message file.
///
/// All of these are fatal: they abort startup before the dispatch timer is
/// ever created.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read message file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("message file {} is not valid JSON: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("message file {} must contain a top-level JSON array", path.display())]
    NotAnArray { path: PathBuf },
}

/// Read the message file once and return its payloads in order.
///
/// Payloads are opaque: any JSON value is accepted, including `null`, `0`,
/// and `false`.
pub async fn load_messages(path: &Path) -> Result<Vec<Value>, LoadError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let value: Value = serde_json::from_str(&raw).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    match value {
        Value::Array(items) => {
            debug!(count = items.len(), path = %path.display(), "loaded message file");
            Ok(items)
        }
        _ => Err(LoadError::NotAnArray {
            path: path.to_path_buf(),
        }),
    }
}
