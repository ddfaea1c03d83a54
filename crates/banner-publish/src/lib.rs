//! # banner-publish
//!
//! Hand a composed banner to a social platform.
//!
//! Every platform shares one contract: both credential fields must be
//! non-empty, the image must be non-empty and below the platform's byte
//! ceiling, and only then is the upload attempted. [`Publisher::publish`]
//! never fails; it logs and returns `false` instead, so callers can decide
//! for themselves whether a failed publish is worth retrying.
//!
//! The upload itself is behind the [`Uploader`] trait:
//!
//! - [`SimulatedUploader`] stands in for a network call with a randomised
//!   outcome and artificial latency. It is what tests and demos use.
//! - [`HttpUploader`] POSTs the PNG to a real endpoint.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use banner_publish::{Credentials, Platform, PlatformPublisher, Publisher, SimulatedUploader};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let publisher = PlatformPublisher::new(
//!     Platform::Bluesky,
//!     SimulatedUploader::for_platform(Platform::Bluesky),
//! );
//! let png: Vec<u8> = std::fs::read("banner.png").unwrap();
//! let ok = publisher
//!     .publish(&png, &Credentials::new("me.bsky.social", "app-password"))
//!     .await;
//! println!("published: {ok}");
//! # }
//! ```

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

// ── Platforms ────────────────────────────────────────────────────────────

/// A social platform a banner can be published to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    X,
    Bluesky,
}

impl Platform {
    /// Largest image the platform accepts, in bytes.
    pub fn max_image_bytes(self) -> usize {
        match self {
            Platform::X => 5 * 1024 * 1024,
            Platform::Bluesky => 4 * 1024 * 1024,
        }
    }

    /// Success rate observed for the platform's stand-in upload.
    pub fn simulated_success_rate(self) -> f64 {
        match self {
            Platform::X => 0.8,
            Platform::Bluesky => 0.75,
        }
    }

    /// Artificial latency of the platform's stand-in upload.
    pub fn simulated_latency(self) -> Duration {
        match self {
            Platform::X => Duration::from_millis(1000),
            Platform::Bluesky => Duration::from_millis(1200),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Platform::X => "x",
            Platform::Bluesky => "bluesky",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Platform {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" | "twitter" => Ok(Platform::X),
            "bluesky" | "bsky" => Ok(Platform::Bluesky),
            other => Err(PublishError::UnknownPlatform(other.to_string())),
        }
    }
}

// ── Credentials ──────────────────────────────────────────────────────────

/// Per-platform account credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub handle: String,
    pub app_password: String,
}

impl Credentials {
    pub fn new(handle: impl Into<String>, app_password: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            app_password: app_password.into(),
        }
    }

    /// Both fields are present and not blank.
    pub fn is_complete(&self) -> bool {
        !self.handle.trim().is_empty() && !self.app_password.trim().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("handle", &self.handle)
            .field("app_password", &"<redacted>")
            .finish()
    }
}

// ── Errors ───────────────────────────────────────────────────────────────

/// Why a publish attempt did not go through.
///
/// Only [`Publisher::try_publish`] surfaces these; [`Publisher::publish`]
/// folds every one of them into `false`.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("{platform} credentials are missing or invalid")]
    MissingCredentials { platform: Platform },

    #[error("image buffer is empty")]
    EmptyImage,

    #[error("image is {size} bytes, {platform} accepts at most {max}")]
    ImageTooLarge {
        platform: Platform,
        size: usize,
        max: usize,
    },

    #[error("{platform} upload failed: {reason}")]
    UploadFailed { platform: Platform, reason: String },

    #[error("unknown platform '{0}' (expected x or bluesky)")]
    UnknownPlatform(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

// ── Uploaders ────────────────────────────────────────────────────────────

/// The network step of a publish, after validation has passed.
///
/// `Ok(true)` means the platform accepted the banner, `Ok(false)` that it
/// answered but declined it. Transport problems are `Err`.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(
        &self,
        platform: Platform,
        credentials: &Credentials,
        image: &[u8],
    ) -> Result<bool, PublishError>;
}

/// Stand-in for a platform API: sleeps, then succeeds with a fixed
/// probability.
pub struct SimulatedUploader {
    success_rate: f64,
    latency: Duration,
    rng: Mutex<StdRng>,
}

impl SimulatedUploader {
    /// `success_rate` is clamped to `0.0..=1.0`; a NaN rate never succeeds.
    pub fn new(success_rate: f64, latency: Duration) -> Self {
        let success_rate = if success_rate.is_nan() {
            0.0
        } else {
            success_rate.clamp(0.0, 1.0)
        };
        Self {
            success_rate,
            latency,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Success rate and latency observed for `platform`.
    pub fn for_platform(platform: Platform) -> Self {
        Self::new(
            platform.simulated_success_rate(),
            platform.simulated_latency(),
        )
    }

    /// An uploader that accepts everything immediately.
    pub fn always_succeed() -> Self {
        Self::new(1.0, Duration::ZERO)
    }

    /// An uploader that declines everything immediately.
    pub fn always_fail() -> Self {
        Self::new(0.0, Duration::ZERO)
    }

    /// Make the outcome sequence reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn roll(&self) -> bool {
        match self.rng.lock() {
            Ok(mut rng) => rng.gen_bool(self.success_rate),
            // A poisoned lock only means another roll panicked mid-way; the
            // generator state is still usable.
            Err(poisoned) => poisoned.into_inner().gen_bool(self.success_rate),
        }
    }
}

#[async_trait]
impl Uploader for SimulatedUploader {
    async fn upload(
        &self,
        platform: Platform,
        credentials: &Credentials,
        image: &[u8],
    ) -> Result<bool, PublishError> {
        info!(
            "Uploading banner for @{} to {} ({} bytes, simulated)",
            credentials.handle,
            platform,
            image.len()
        );
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.roll() {
            Ok(true)
        } else {
            Err(PublishError::UploadFailed {
                platform,
                reason: "simulated API rejection".into(),
            })
        }
    }
}

/// Uploads the PNG body to an HTTP endpoint using basic auth with the
/// account handle and app password.
pub struct HttpUploader {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpUploader {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(
        &self,
        platform: Platform,
        credentials: &Credentials,
        image: &[u8],
    ) -> Result<bool, PublishError> {
        info!(
            "Uploading banner for @{} to {} via {}",
            credentials.handle, platform, self.endpoint
        );
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&credentials.handle, Some(&credentials.app_password))
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .header("X-Banner-Platform", platform.name())
            .body(image.to_vec())
            .send()
            .await?;

        let status = response.status();
        debug!("{} upload answered HTTP {}", platform, status);
        if status.is_success() {
            Ok(true)
        } else if status.is_client_error() {
            Ok(false)
        } else {
            Err(PublishError::UploadFailed {
                platform,
                reason: format!("HTTP {status}"),
            })
        }
    }
}

// ── Publishers ───────────────────────────────────────────────────────────

/// A platform publish capability.
#[async_trait]
pub trait Publisher: Send + Sync {
    fn platform(&self) -> Platform;

    /// Validate and upload, surfacing the reason for any failure.
    async fn try_publish(
        &self,
        image: &[u8],
        credentials: &Credentials,
    ) -> Result<bool, PublishError>;

    /// Validate and upload. Never fails: every error is logged and
    /// reported as `false`.
    async fn publish(&self, image: &[u8], credentials: &Credentials) -> bool {
        match self.try_publish(image, credentials).await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("{} publishing error: {}", self.platform(), e);
                false
            }
        }
    }
}

/// Applies the shared validation contract for one platform, then hands off
/// to an [`Uploader`].
pub struct PlatformPublisher<U> {
    platform: Platform,
    uploader: U,
}

impl<U: Uploader> PlatformPublisher<U> {
    pub fn new(platform: Platform, uploader: U) -> Self {
        Self { platform, uploader }
    }

    fn check(&self, image: &[u8], credentials: &Credentials) -> Result<(), PublishError> {
        if !credentials.is_complete() {
            return Err(PublishError::MissingCredentials {
                platform: self.platform,
            });
        }
        if image.is_empty() {
            return Err(PublishError::EmptyImage);
        }
        let max = self.platform.max_image_bytes();
        if image.len() > max {
            return Err(PublishError::ImageTooLarge {
                platform: self.platform,
                size: image.len(),
                max,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl<U: Uploader> Publisher for PlatformPublisher<U> {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn try_publish(
        &self,
        image: &[u8],
        credentials: &Credentials,
    ) -> Result<bool, PublishError> {
        self.check(image, credentials)?;
        self.uploader
            .upload(self.platform, credentials, image)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::task::JoinHandle;

    /// Answer one request on a loopback port with an empty response of
    /// `status`. Yields the full request (head and body) the client sent.
    async fn endpoint(status: &'static str) -> (String, JoinHandle<Vec<u8>>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/upload", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            let body_start = loop {
                let n = socket.read(&mut buf).await.unwrap();
                assert!(n > 0, "client closed before sending a request");
                received.extend_from_slice(&buf[..n]);
                if let Some(pos) = received.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let head = String::from_utf8_lossy(&received[..body_start]).to_ascii_lowercase();
            let body_len: usize = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .map(|v| v.trim().parse().unwrap())
                .unwrap_or(0);
            while received.len() < body_start + body_len {
                let n = socket.read(&mut buf).await.unwrap();
                assert!(n > 0, "client closed mid-body");
                received.extend_from_slice(&buf[..n]);
            }
            let response =
                format!("HTTP/1.1 {status}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            received
        });
        (url, handle)
    }

    fn http_publisher(url: String) -> PlatformPublisher<HttpUploader> {
        let uploader = HttpUploader::new(url, Duration::from_secs(5)).unwrap();
        PlatformPublisher::new(Platform::Bluesky, uploader)
    }

    /// Counts upload attempts and always accepts.
    struct CountingUploader {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Uploader for CountingUploader {
        async fn upload(
            &self,
            _platform: Platform,
            _credentials: &Credentials,
            _image: &[u8],
        ) -> Result<bool, PublishError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }
    }

    fn counting(platform: Platform) -> (PlatformPublisher<CountingUploader>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let publisher = PlatformPublisher::new(
            platform,
            CountingUploader {
                calls: Arc::clone(&calls),
            },
        );
        (publisher, calls)
    }

    fn creds() -> Credentials {
        Credentials::new("test_handle", "test_password")
    }

    #[tokio::test]
    async fn empty_credentials_return_false() {
        for platform in [Platform::X, Platform::Bluesky] {
            let (publisher, calls) = counting(platform);
            let ok = publisher.publish(b"png", &Credentials::new("", "")).await;
            assert!(!ok);
            assert_eq!(calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn blank_password_is_missing() {
        let (publisher, _) = counting(Platform::X);
        let err = publisher
            .try_publish(b"png", &Credentials::new("me", "   "))
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::MissingCredentials { .. }));
    }

    #[tokio::test]
    async fn empty_image_is_rejected() {
        let (publisher, calls) = counting(Platform::Bluesky);
        assert!(!publisher.publish(&[], &creds()).await);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn oversized_image_skips_upload() {
        let (x, x_calls) = counting(Platform::X);
        let six_mb = vec![0u8; 6 * 1024 * 1024];
        assert!(!x.publish(&six_mb, &creds()).await);
        assert_eq!(x_calls.load(Ordering::SeqCst), 0);

        // Five megabytes is fine for X but over the Bluesky ceiling.
        let five_mb = vec![0u8; 5 * 1024 * 1024];
        assert!(x.publish(&five_mb, &creds()).await);
        let (bsky, bsky_calls) = counting(Platform::Bluesky);
        let err = bsky.try_publish(&five_mb, &creds()).await.unwrap_err();
        assert!(matches!(
            err,
            PublishError::ImageTooLarge { max, .. } if max == 4 * 1024 * 1024
        ));
        assert_eq!(bsky_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn valid_request_reaches_uploader() {
        let (publisher, calls) = counting(Platform::Bluesky);
        assert!(publisher.publish(b"png", &creds()).await);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn simulated_outcomes_are_fixed_at_the_extremes() {
        let yes = PlatformPublisher::new(Platform::X, SimulatedUploader::always_succeed());
        assert!(yes.publish(b"png", &creds()).await);

        let no = PlatformPublisher::new(Platform::X, SimulatedUploader::always_fail());
        assert!(!no.publish(b"png", &creds()).await);
        assert!(matches!(
            no.try_publish(b"png", &creds()).await,
            Err(PublishError::UploadFailed { .. })
        ));
    }

    #[tokio::test]
    async fn seeded_simulation_is_reproducible() {
        let run = |seed| async move {
            let uploader = SimulatedUploader::new(0.5, Duration::ZERO).with_seed(seed);
            let mut outcomes = Vec::new();
            for _ in 0..16 {
                outcomes.push(uploader.upload(Platform::X, &creds(), b"png").await.is_ok());
            }
            outcomes
        };
        assert_eq!(run(7).await, run(7).await);
    }

    #[tokio::test]
    async fn out_of_range_rates_are_clamped() {
        for (rate, expected) in [
            (f64::NAN, false),
            (-3.0, false),
            (f64::NEG_INFINITY, false),
            (7.5, true),
            (f64::INFINITY, true),
        ] {
            let uploader = SimulatedUploader::new(rate, Duration::ZERO).with_seed(1);
            let accepted = uploader.upload(Platform::X, &creds(), b"png").await.is_ok();
            assert_eq!(accepted, expected, "rate {rate}");
        }
    }

    #[tokio::test]
    async fn http_success_posts_png_with_basic_auth() {
        let (url, server) = endpoint("201 Created").await;
        let accepted = http_publisher(url).try_publish(b"png-bytes", &creds()).await;
        assert!(accepted.unwrap());

        let request = server.await.unwrap();
        let text = String::from_utf8_lossy(&request).to_string();
        let lower = text.to_ascii_lowercase();
        assert!(text.starts_with("POST /upload "));
        assert!(lower.contains("content-type: image/png"));
        assert!(lower.contains("x-banner-platform: bluesky"));
        // base64("test_handle:test_password")
        assert!(text.contains("Basic dGVzdF9oYW5kbGU6dGVzdF9wYXNzd29yZA=="));
        assert!(request.ends_with(b"png-bytes"));
    }

    #[tokio::test]
    async fn http_client_error_is_a_declined_upload() {
        let (url, _server) = endpoint("401 Unauthorized").await;
        let publisher = http_publisher(url);
        assert!(!publisher.try_publish(b"png", &creds()).await.unwrap());
    }

    #[tokio::test]
    async fn http_server_error_is_an_upload_failure() {
        let (url, _server) = endpoint("500 Internal Server Error").await;
        let publisher = http_publisher(url);
        match publisher.try_publish(b"png", &creds()).await {
            Err(PublishError::UploadFailed { platform, reason }) => {
                assert_eq!(platform, Platform::Bluesky);
                assert!(reason.contains("500"));
            }
            other => panic!("unexpected: {other:?}"),
        }

        let (url, _server) = endpoint("502 Bad Gateway").await;
        assert!(!http_publisher(url).publish(b"png", &creds()).await);
    }

    #[test]
    fn platform_parsing_and_limits() {
        assert_eq!("X".parse::<Platform>().unwrap(), Platform::X);
        assert_eq!("bsky".parse::<Platform>().unwrap(), Platform::Bluesky);
        assert!("mastodon".parse::<Platform>().is_err());
        assert!(Platform::X.max_image_bytes() > Platform::Bluesky.max_image_bytes());
    }

    #[test]
    fn credentials_debug_hides_password() {
        let s = format!("{:?}", creds());
        assert!(s.contains("test_handle"));
        assert!(!s.contains("test_password"));
    }
}
