use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use migrator_logging::migrator_debug;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::filename::{fallback_media_filename, media_filename};
use crate::persist::{ensure_output_dir, AtomicFileWriter};
use crate::{FailureKind, FetchError, StoreStatus, StoredMedia};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    /// Accepted `Content-Type` values; `type/*` matches a whole family. Empty accepts anything.
    pub allowed_content_types: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 25 * 1024 * 1024,
            allowed_content_types: Vec::new(),
        }
    }
}

/// Downloads a URL into a folder. Implementations must be idempotent: a file
/// already present at the destination is reused without fetching.
pub trait MediaFetcher: Send + Sync {
    fn fetch_and_store(&self, url: &str, destination: &Path) -> Result<StoredMedia, FetchError>;
}

/// Blocking media fetcher backed by an async `reqwest` client on a private runtime.
pub struct ReqwestMediaFetcher {
    settings: FetchSettings,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl ReqwestMediaFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            settings,
            client,
            runtime,
        })
    }

    fn is_content_type_allowed(&self, content_type: &str) -> bool {
        if self.settings.allowed_content_types.is_empty() {
            return true;
        }
        let ct = content_type.split(';').next().unwrap_or(content_type).trim();
        self.settings.allowed_content_types.iter().any(|allowed| {
            match allowed.strip_suffix("/*") {
                Some(family) => ct
                    .split('/')
                    .next()
                    .is_some_and(|t| t.eq_ignore_ascii_case(family)),
                None => allowed.eq_ignore_ascii_case(ct),
            }
        })
    }

    async fn download(&self, url: Url) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        if let Some(ct) = content_type.as_deref() {
            if !self.is_content_type_allowed(ct) {
                return Err(FetchError::new(
                    FailureKind::UnsupportedContentType {
                        content_type: ct.to_string(),
                    },
                    "unsupported content type",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

impl MediaFetcher for ReqwestMediaFetcher {
    fn fetch_and_store(&self, url: &str, destination: &Path) -> Result<StoredMedia, FetchError> {
        let trimmed = url.trim();
        let parsed = Url::parse(trimmed)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::new(
                FailureKind::UnsupportedScheme(parsed.scheme().to_string()),
                trimmed,
            ));
        }

        let filename = media_filename(trimmed).unwrap_or_else(|| fallback_media_filename(trimmed));
        let target = destination.join(&filename);
        if target.exists() {
            migrator_debug!("Reusing existing {:?}", target);
            return Ok(StoredMedia {
                filename,
                path: target,
                status: StoreStatus::AlreadyPresent,
            });
        }

        ensure_output_dir(destination)
            .map_err(|err| FetchError::new(FailureKind::Persist, err.to_string()))?;
        let bytes = self.runtime.block_on(self.download(parsed))?;
        let path = AtomicFileWriter::new(destination.to_path_buf())
            .write_bytes(&filename, &bytes)
            .map_err(|err| FetchError::new(FailureKind::Persist, err.to_string()))?;
        migrator_debug!("Stored {} bytes at {:?}", bytes.len(), path);

        Ok(StoredMedia {
            filename,
            path,
            status: StoreStatus::Downloaded {
                bytes: bytes.len() as u64,
            },
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
