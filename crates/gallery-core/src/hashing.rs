//! Streaming SHA-256 of LoRA files.
//!
//! The digest is what Civitai indexes model versions by. It is computed on
//! demand and cached in the LoRA's metadata entry.

use crate::error::{GalleryError, Result};
use crate::metadata::{AssetMetadata, JsonStore};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Chunk size for reading files (8MB).
const CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// SHA-256 of the file at `path` as lowercase hex.
pub fn compute_sha256(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let mut file = std::fs::File::open(path).map_err(|e| GalleryError::io_with_path(e, path))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| GalleryError::io_with_path(e, path))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// [`compute_sha256`] on the blocking thread pool.
pub async fn compute_sha256_blocking(path: PathBuf) -> Result<String> {
    tokio::task::spawn_blocking(move || compute_sha256(&path))
        .await
        .map_err(|e| GalleryError::Other(format!("Hash computation task failed: {}", e)))?
}

/// Cached content hash for `lora_name`, computing and storing it if absent.
pub async fn ensure_content_hash(
    store: &JsonStore<AssetMetadata>,
    lora_name: &str,
    lora_path: &Path,
) -> Result<String> {
    if let Some(hash) = store
        .get(lora_name)?
        .and_then(|meta| meta.content_hash)
        .filter(|h| !h.is_empty())
    {
        debug!("Using cached hash for {}", lora_name);
        return Ok(hash);
    }

    info!("Computing SHA-256 for {}", lora_name);
    let hash = compute_sha256_blocking(lora_path.to_path_buf()).await?;
    store.update(lora_name, |meta| meta.content_hash = Some(hash.clone()))?;
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // sha256("hello world")
    const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_compute_sha256() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.safetensors");
        std::fs::write(&path, b"hello world").unwrap();

        assert_eq!(compute_sha256(&path).unwrap(), HELLO_SHA256);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = compute_sha256("/no/such/file.safetensors").unwrap_err();
        assert!(matches!(err, GalleryError::Io { path: Some(_), .. }));
    }

    #[tokio::test]
    async fn test_hash_is_cached_in_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let lora = temp_dir.path().join("a.safetensors");
        std::fs::write(&lora, b"hello world").unwrap();
        let store: JsonStore<AssetMetadata> = JsonStore::open(temp_dir.path().join("meta.json"));

        let hash = ensure_content_hash(&store, "a.safetensors", &lora).await.unwrap();
        assert_eq!(hash, HELLO_SHA256);
        assert_eq!(
            store.get("a.safetensors").unwrap().unwrap().content_hash.as_deref(),
            Some(HELLO_SHA256)
        );

        // The cached value wins even after the file changes
        std::fs::write(&lora, b"changed").unwrap();
        let again = ensure_content_hash(&store, "a.safetensors", &lora).await.unwrap();
        assert_eq!(again, HELLO_SHA256);
    }
}
