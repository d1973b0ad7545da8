//! Model file download from blob storage.
//!
//! A trained model lives in the blob store under a key prefix (for example
//! `model-best/`). Local engines need real files on disk, so the files are
//! copied into a cache directory before loading.

use std::path::{Path, PathBuf};

use nerloop_storage::BlobStore;
use tracing::info;

use crate::Result;

/// ONNX model file name under the model prefix.
pub const MODEL_FILE: &str = "model.onnx";

/// Tokenizer file name under the model prefix.
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Download `<prefix>/model.onnx` and `<prefix>/tokenizer.json` into
/// `cache_dir`, returning `(model_path, tokenizer_path)`.
///
/// Files already present in the cache are reused without a download.
pub fn fetch_model_files(
    store: &dyn BlobStore,
    prefix: &str,
    cache_dir: &Path,
) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(cache_dir)?;
    let prefix = prefix.trim_end_matches('/');

    let model = fetch_one(store, prefix, MODEL_FILE, cache_dir)?;
    let tokenizer = fetch_one(store, prefix, TOKENIZER_FILE, cache_dir)?;
    Ok((model, tokenizer))
}

fn fetch_one(store: &dyn BlobStore, prefix: &str, file: &str, cache_dir: &Path) -> Result<PathBuf> {
    let local = cache_dir.join(file);
    if local.is_file() {
        return Ok(local);
    }

    let key = if prefix.is_empty() {
        file.to_string()
    } else {
        format!("{prefix}/{file}")
    };
    let bytes = store.get(&key)?;
    std::fs::write(&local, &bytes)?;
    info!(key = %key, path = %local.display(), bytes = bytes.len(), "Fetched model file");
    Ok(local)
}
