//! Remote catalog sources

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use ureq::Agent;

/// Errors fetching or decoding the remote catalog
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog from {origin} is not a valid index document: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{origin} reported the catalog unchanged but no cached copy exists")]
    MissingCachedCopy { origin: String },
}

/// Result of asking a source for the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Modified { body: String, etag: Option<String> },
    /// The source confirmed the validator we sent is still current
    NotModified,
}

/// Where the remote catalog comes from
pub trait RemoteSource: Send + Sync {
    /// Stable description used to tie a cache document to its origin
    fn describe(&self) -> String;

    /// Fetch the raw catalog document. `etag` is the validator of the cached copy, if any.
    fn fetch(&self, etag: Option<&str>) -> Result<FetchOutcome, FetchError>;
}

/// Catalog served over HTTP(S)
pub struct HttpSource {
    url: String,
    agent: Agent,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self { url: url.into(), agent }
    }
}

impl RemoteSource for HttpSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn fetch(&self, etag: Option<&str>) -> Result<FetchOutcome, FetchError> {
        log::info!("Fetching plugin index from {}", self.url);

        let mut request = self.agent.get(&self.url).header("Accept", "application/json");
        if let Some(etag) = etag {
            request = request.header("If-None-Match", etag);
        }

        let http_error = |source: ureq::Error| FetchError::Http {
            url: self.url.clone(),
            source: Box::new(source),
        };

        let mut response = request.call().map_err(http_error)?;

        let status = response.status().as_u16();
        if status == 304 {
            log::debug!("{} not modified", self.url);
            return Ok(FetchOutcome::NotModified);
        }
        if !(200..300).contains(&status) {
            return Err(FetchError::Status {
                url: self.url.clone(),
                status,
            });
        }

        let etag = response
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.body_mut().read_to_string().map_err(http_error)?;

        Ok(FetchOutcome::Modified { body, etag })
    }
}

/// Catalog stored in a local file (useful for mirrors and tests)
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RemoteSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self, _etag: Option<&str>) -> Result<FetchOutcome, FetchError> {
        log::info!("Reading plugin index from {}", self.path.display());

        let body = fs::read_to_string(&self.path).map_err(|source| FetchError::Io {
            path: self.path.clone(),
            source,
        })?;

        Ok(FetchOutcome::Modified { body, etag: None })
    }
}

/// Pick a source for a configured index location: HTTP(S) URLs or local paths
pub fn source_from_location(location: &str, timeout: Duration) -> Box<dyn RemoteSource> {
    let location = location.trim();
    if lazy_regex::regex_is_match!(r"^https?://"i, location) {
        Box::new(HttpSource::new(location, timeout))
    } else {
        let path = location.strip_prefix("file://").unwrap_or(location);
        Box::new(FileSource::new(path))
    }
}
