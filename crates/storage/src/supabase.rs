use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode, Url};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};
use transcribe_common::{Result, TranscribeError};

use crate::ObjectStorage;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Supabase Storage REST client
///
/// Authenticates with the service role key, which bypasses bucket policies.
#[derive(Debug, Clone)]
pub struct SupabaseStorage {
    base_url: Url,
    key: String,
    client: Client,
    max_attempts: u32,
    base_delay: Duration,
}

impl SupabaseStorage {
    /// Create new storage client for a project URL and service key
    pub fn new(base_url: &str, key: impl Into<String>) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            TranscribeError::config(format!("Invalid Supabase URL '{}': {}", base_url, e))
        })?;

        if base_url.cannot_be_a_base() {
            return Err(TranscribeError::config(format!(
                "Supabase URL cannot be used as a base: {}",
                base_url
            )));
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(600)) // large media objects
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        info!("Supabase storage client initialized: {}", base_url);

        Ok(Self {
            base_url,
            key: key.into(),
            client,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        })
    }

    /// Override retry policy (attempts per request, first backoff delay)
    pub fn with_retry_policy(mut self, max_attempts: u32, base_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.base_delay = base_delay;
        self
    }

    /// `{base}/storage/v1/object/{bucket}/{path}` with each segment escaped
    pub fn object_url(&self, bucket: &str, path: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TranscribeError::config("Supabase URL cannot be used as a base"))?
            .pop_if_empty()
            .extend(["storage", "v1", "object", bucket])
            .extend(path.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(&self.key)
            .header("apikey", &self.key)
    }

    /// Send a request, retrying transport errors, 429 and 5xx with exponential backoff
    async fn send_with_retry<F, Fut>(&self, what: &str, send: F) -> Result<Response>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Response>>,
    {
        let mut attempt = 1;

        loop {
            let failure = match send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    let err = TranscribeError::storage(format!("{} failed ({}): {}", what, status, body.trim()));
                    if !is_retryable(status) {
                        return Err(err);
                    }
                    err
                }
                Err(err) => err,
            };

            if attempt >= self.max_attempts {
                return Err(failure);
            }

            let delay = self.base_delay * 2u32.pow(attempt - 1);
            warn!(
                "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                what, attempt, self.max_attempts, failure, delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn download(&self, bucket: &str, path: &str, dest: &Path) -> Result<u64> {
        let url = self.object_url(bucket, path)?;
        let what = format!("Download of {}/{}", bucket, path);
        debug!("GET {}", url);

        let response = self
            .send_with_retry(&what, || {
                let request = self.authorized(self.client.get(url.clone()));
                async move {
                    request
                        .send()
                        .await
                        .map_err(|e| TranscribeError::storage(format!("Failed to send request: {}", e)))
                }
            })
            .await?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| TranscribeError::storage(format!("{} interrupted: {}", what, e)))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        info!("Downloaded {}/{} ({} bytes) to {}", bucket, path, written, dest.display());

        Ok(written)
    }

    async fn upload(&self, bucket: &str, path: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        let url = self.object_url(bucket, path)?;
        let what = format!("Upload of {}/{}", bucket, path);
        let size = body.len();
        debug!("POST {} ({} bytes, {})", url, size, content_type);

        self.send_with_retry(&what, || {
            let request = self
                .authorized(self.client.post(url.clone()))
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .header("x-upsert", "true")
                .body(body.clone());
            async move {
                request
                    .send()
                    .await
                    .map_err(|e| TranscribeError::storage(format!("Failed to send request: {}", e)))
            }
        })
        .await?;

        info!("Uploaded {}/{} ({} bytes)", bucket, path, size);
        Ok(())
    }

    async fn upload_file(&self, bucket: &str, path: &str, file: &Path, content_type: &str) -> Result<()> {
        let url = self.object_url(bucket, path)?;
        let what = format!("Upload of {}/{}", bucket, path);
        let size = tokio::fs::metadata(file).await?.len();
        debug!("POST {} ({} bytes from {}, {})", url, size, file.display(), content_type);

        self.send_with_retry(&what, || {
            let builder = self
                .authorized(self.client.post(url.clone()))
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .header(reqwest::header::CONTENT_LENGTH, size)
                .header("x-upsert", "true");
            async move {
                // Reopened on every attempt
                let source = tokio::fs::File::open(file).await?;
                builder
                    .body(reqwest::Body::wrap_stream(ReaderStream::new(source)))
                    .send()
                    .await
                    .map_err(|e| TranscribeError::storage(format!("Failed to send request: {}", e)))
            }
        })
        .await?;

        info!("Uploaded {}/{} ({} bytes)", bucket, path, size);
        Ok(())
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}
