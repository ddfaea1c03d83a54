//! Background resolution: a user-supplied path, URL or blob key → bytes.
//!
//! This is the fetch step that sits in front of the normaliser. It owns the
//! transfer policy, so the normaliser can assume its input is already
//! filtered:
//!
//! * at most `max_background_bytes`, checked against the declared size
//!   first and then while streaming, so an oversized body is abandoned
//!   early rather than buffered
//! * only `allowed_content_types`: the `Content-Type` header for
//!   downloads, the sniffed format for local files
//!
//! A bare key such as `sunset.png` resolves to
//! `{background_base_url}/backgrounds/sunset.png` when a base URL is
//! configured and no local file of that name exists.

use crate::config::BannerConfig;
use crate::error::BannerError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Where a background comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundSource {
    Path(PathBuf),
    Url(String),
    /// A key in the blob store under `background_base_url`.
    Key(String),
}

impl BackgroundSource {
    /// Classify `input`. URLs win, then existing files, then blob keys (only
    /// when a base URL is configured), then plain paths.
    pub fn classify(input: &str, config: &BannerConfig) -> Self {
        if is_url(input) {
            BackgroundSource::Url(input.to_string())
        } else if config.background_base_url.is_some() && !Path::new(input).exists() {
            BackgroundSource::Key(input.to_string())
        } else {
            BackgroundSource::Path(PathBuf::from(input))
        }
    }
}

/// Fetched background bytes with their (declared or sniffed) type.
#[derive(Debug, Clone)]
pub struct Background {
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// Path or URL the bytes came from.
    pub location: String,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// URL of blob `key` under `base`.
pub fn blob_url(base: &str, key: &str) -> Result<String, BannerError> {
    let valid = !key.is_empty()
        && !key.starts_with('/')
        && !key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '/'));
    if !valid {
        return Err(BannerError::BackgroundNotFound {
            location: key.to_string(),
        });
    }
    Ok(format!("{}/backgrounds/{}", base.trim_end_matches('/'), key))
}

/// Fetch the background named by `input`.
pub async fn resolve_background(
    input: &str,
    config: &BannerConfig,
) -> Result<Background, BannerError> {
    match BackgroundSource::classify(input, config) {
        BackgroundSource::Url(url) => download(&url, config).await,
        BackgroundSource::Key(key) => {
            let base = config.background_base_url.as_deref().unwrap_or_default();
            download(&blob_url(base, &key)?, config).await
        }
        BackgroundSource::Path(path) => read_local(&path, config).await,
    }
}

fn check_content_type(content_type: &str, config: &BannerConfig) -> Result<(), BannerError> {
    if config.allows_content_type(content_type) {
        Ok(())
    } else {
        Err(BannerError::UnsupportedContentType {
            content_type: content_type.to_string(),
            allowed: config.allowed_content_types.clone(),
        })
    }
}

fn sniff_content_type(bytes: &[u8]) -> String {
    image::guess_format(bytes)
        .map(|f| f.to_mime_type().to_string())
        .unwrap_or_else(|_| "application/octet-stream".to_string())
}

/// Read a local background, validating existence, size and type.
async fn read_local(path: &Path, config: &BannerConfig) -> Result<Background, BannerError> {
    let not_found = || BannerError::BackgroundNotFound {
        location: path.display().to_string(),
    };

    let meta = match tokio::fs::metadata(path).await {
        Ok(m) if m.is_file() => m,
        Ok(_) => return Err(not_found()),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(BannerError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(_) => return Err(not_found()),
    };

    if meta.len() > config.max_background_bytes {
        return Err(BannerError::BackgroundTooLarge {
            size: meta.len(),
            max: config.max_background_bytes,
        });
    }

    let bytes = tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            BannerError::PermissionDenied {
                path: path.to_path_buf(),
            }
        } else {
            not_found()
        }
    })?;

    let content_type = sniff_content_type(&bytes);
    check_content_type(&content_type, config)?;

    debug!(
        "Resolved local background: {} ({} bytes, {})",
        path.display(),
        bytes.len(),
        content_type
    );
    Ok(Background {
        bytes,
        content_type,
        location: path.display().to_string(),
    })
}

/// Download a background over HTTP(S), enforcing the transfer policy.
async fn download(url: &str, config: &BannerConfig) -> Result<Background, BannerError> {
    info!("Downloading background from: {}", url);

    let secs = config.download_timeout_secs;
    let fetch_err = |e: reqwest::Error| {
        if e.is_timeout() {
            BannerError::DownloadTimeout {
                url: url.to_string(),
                secs,
            }
        } else {
            BannerError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(secs))
        .build()
        .map_err(fetch_err)?;

    let mut response = client.get(url).send().await.map_err(fetch_err)?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(BannerError::BackgroundNotFound {
            location: url.to_string(),
        });
    }
    if !status.is_success() {
        return Err(BannerError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", status),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    check_content_type(&content_type, config)?;

    let max = config.max_background_bytes;
    if let Some(declared) = response.content_length() {
        if declared > max {
            return Err(BannerError::BackgroundTooLarge {
                size: declared,
                max,
            });
        }
    }

    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(fetch_err)? {
        let size = (bytes.len() + chunk.len()) as u64;
        if size > max {
            return Err(BannerError::BackgroundTooLarge { size, max });
        }
        bytes.extend_from_slice(&chunk);
    }

    info!("Downloaded background: {} bytes ({})", bytes.len(), content_type);
    Ok(Background {
        bytes,
        content_type,
        location: url.to_string(),
    })
}
