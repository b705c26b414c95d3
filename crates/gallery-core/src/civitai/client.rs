//! HTTP client for the Civitai REST API.

use super::types::ModelVersion;
use crate::config::NetworkConfig;
use crate::error::{GalleryError, Result};
use regex::Regex;
use reqwest::{Client, StatusCode};
use std::path::Path;
use std::sync::LazyLock;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// `/width=450/` style resize segment in Civitai CDN URLs.
static WIDTH_SEGMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/width=\d+/").unwrap());

/// Client for Civitai model-version lookups and preview downloads.
#[derive(Debug, Clone)]
pub struct CivitaiClient {
    client: Client,
    api_base: String,
}

impl CivitaiClient {
    /// Client against the public Civitai API.
    pub fn new() -> Result<Self> {
        Self::with_base_url(NetworkConfig::CIVITAI_API_BASE)
    }

    /// Client against another API root (mirrors, tests).
    pub fn with_base_url(api_base: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(NetworkConfig::REQUEST_TIMEOUT)
            .user_agent(NetworkConfig::USER_AGENT)
            .build()
            .map_err(|e| GalleryError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                cause: None,
            })?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Look up a model version by file SHA-256. `None` when Civitai does not
    /// know the hash.
    pub async fn model_version_by_hash(&self, sha256: &str) -> Result<Option<ModelVersion>> {
        let url = format!(
            "{}/model-versions/by-hash/{}",
            self.api_base,
            urlencoding::encode(sha256)
        );
        debug!("Civitai lookup: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GalleryError::Network {
                message: format!("Civitai API request failed: {}", e),
                cause: Some(e.to_string()),
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let version = response.json::<ModelVersion>().await.map_err(|e| GalleryError::Json {
                    message: format!("Failed to parse Civitai response: {}", e),
                    source: None,
                })?;
                Ok(Some(version))
            }
            status => Err(GalleryError::RemoteApi {
                service: "Civitai".to_string(),
                status: status.as_u16(),
            }),
        }
    }

    /// Download `url` to `dest`, writing through a `.part` file.
    ///
    /// Returns the number of bytes written.
    pub async fn download_to(&self, url: &str, dest: &Path) -> Result<u64> {
        let mut response = self
            .client
            .get(url)
            .timeout(NetworkConfig::DOWNLOAD_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GalleryError::RemoteApi {
                service: "Civitai CDN".to_string(),
                status: response.status().as_u16(),
            });
        }

        let part = dest.with_extension(format!(
            "{}.part",
            dest.extension().and_then(|e| e.to_str()).unwrap_or("bin")
        ));
        let written = match stream_to_file(&mut response, &part).await {
            Ok(written) => written,
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                return Err(e);
            }
        };

        if let Err(e) = tokio::fs::rename(&part, dest).await {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(GalleryError::io_with_path(e, dest));
        }

        info!("Downloaded {} bytes to {}", written, dest.display());
        Ok(written)
    }
}

async fn stream_to_file(response: &mut reqwest::Response, part: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(part)
        .await
        .map_err(|e| GalleryError::io_with_path(e, part))?;

    let mut written: u64 = 0;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk)
            .await
            .map_err(|e| GalleryError::io_with_path(e, part))?;
        written += chunk.len() as u64;
    }
    file.flush()
        .await
        .map_err(|e| GalleryError::io_with_path(e, part))?;
    Ok(written)
}

/// Ask the CDN for the full-size asset instead of a resized thumbnail.
pub fn original_media_url(url: &str) -> String {
    WIDTH_SEGMENT.replace(url, "/original=true/").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_original_media_url() {
        assert_eq!(
            original_media_url("https://image.civitai.com/xG1/abc-def/width=450/12345.jpeg"),
            "https://image.civitai.com/xG1/abc-def/original=true/12345.jpeg"
        );
        assert_eq!(
            original_media_url("https://example.com/plain.png"),
            "https://example.com/plain.png"
        );
    }

    #[test]
    fn test_base_url_is_normalized() {
        let client = CivitaiClient::with_base_url("http://127.0.0.1:9/api/v1/").unwrap();
        assert_eq!(client.api_base(), "http://127.0.0.1:9/api/v1");
    }

    #[tokio::test]
    async fn test_unreachable_api_is_network_error() {
        // Port 9 (discard) is not listening in test environments
        let client = CivitaiClient::with_base_url("http://127.0.0.1:9/api/v1").unwrap();
        let err = client.model_version_by_hash("abc").await.unwrap_err();
        assert!(matches!(err, GalleryError::Network { .. }));
    }

    #[tokio::test]
    async fn test_truncated_download_leaves_no_files() {
        use tokio::io::AsyncReadExt;

        // Promises 1000 bytes, sends 7, then hangs up
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: 1000\r\n\r\npartial")
                .await;
            let _ = socket.flush().await;
        });

        let temp_dir = tempfile::TempDir::new().unwrap();
        let dest = temp_dir.path().join("style.preview.png");
        let client = CivitaiClient::with_base_url(format!("http://{}/api/v1", addr)).unwrap();

        let result = client
            .download_to(&format!("http://{}/style.png", addr), &dest)
            .await;

        assert!(result.is_err());
        assert!(!dest.exists());
        let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
        assert!(leftovers.is_empty());
    }
}
