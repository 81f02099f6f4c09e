#![forbid(unsafe_code)]

//! Remote payload sources.
//!
//! A remote URL is either a page on a known paste-bin service, in which case
//! the payload is read through that service's API, or a plain JSON document.
//!
//! - GitHub gists: `https://api.github.com/gists/<id>`; the first file's
//!   `content` holds the events. When the API marks the file `truncated`,
//!   the file's `raw_url` is fetched instead.
//! - jsonblob.com: `https://jsonblob.com/api/v1/get/<id>`.

use std::future::Future;
use std::sync::LazyLock;

use regex_lite::Regex;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

static GIST_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"gist\.github(?:usercontent)?\.com/[^/]+/(\w+)").expect("gist url pattern")
});

static JSONBLOB_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://jsonblob\.com/([\w\-]+)").expect("jsonblob url pattern")
});

const GIST_API: &str = "https://api.github.com/gists/";
const JSONBLOB_API: &str = "https://jsonblob.com/api/v1/get/";

/// Transport failure for a single JSON request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("response from {url} is not valid JSON: {message}")]
    Decode { url: String, message: String },
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("unexpected gist API response: {0}")]
    GistShape(#[source] serde_json::Error),

    #[error("gist {id} has no files")]
    EmptyGist { id: String },

    #[error("gist {id} file has neither content nor raw_url")]
    MissingGistContent { id: String },

    #[error("gist {id} file content is not valid JSON: {source}")]
    GistContent {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Issues `GET` requests and decodes JSON bodies.
///
/// Implementations treat non-success HTTP statuses as [`FetchError::Status`].
pub trait JsonFetcher {
    fn fetch_json(&self, url: &str) -> impl Future<Output = Result<Value, FetchError>>;
}

/// How a remote URL is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteSource {
    Gist { id: String },
    JsonBlob { id: String },
    Direct { url: String },
}

impl RemoteSource {
    /// Classify a user-supplied URL. Gist patterns win over jsonblob ones.
    #[must_use]
    pub fn detect(url: &str) -> Self {
        if let Some(id) = capture_id(&GIST_URL, url) {
            return Self::Gist { id };
        }
        if let Some(id) = capture_id(&JSONBLOB_URL, url) {
            return Self::JsonBlob { id };
        }
        Self::Direct {
            url: url.to_string(),
        }
    }

    /// First URL requested for this source.
    #[must_use]
    pub fn request_url(&self) -> String {
        match self {
            Self::Gist { id } => format!("{GIST_API}{id}"),
            Self::JsonBlob { id } => format!("{JSONBLOB_API}{id}"),
            Self::Direct { url } => url.clone(),
        }
    }

    /// Fetch and decode the payload.
    pub async fn load<F: JsonFetcher>(&self, fetcher: &F) -> Result<Value, SourceError> {
        let request_url = self.request_url();
        debug!(source = ?self, %request_url, "fetching remote events");
        let body = fetcher.fetch_json(&request_url).await?;
        match self {
            Self::Gist { id } => gist_payload(fetcher, id, body).await,
            Self::JsonBlob { .. } | Self::Direct { .. } => Ok(body),
        }
    }
}

fn capture_id(pattern: &Regex, url: &str) -> Option<String> {
    pattern
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[derive(Debug, Deserialize)]
struct GistResponse {
    files: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct GistFile {
    #[serde(default)]
    truncated: bool,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    raw_url: Option<String>,
}

async fn gist_payload<F: JsonFetcher>(
    fetcher: &F,
    id: &str,
    body: Value,
) -> Result<Value, SourceError> {
    let response: GistResponse = serde_json::from_value(body).map_err(SourceError::GistShape)?;
    let (name, file) = response
        .files
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::EmptyGist { id: id.to_string() })?;
    let file: GistFile = serde_json::from_value(file).map_err(SourceError::GistShape)?;

    match (file.truncated, file.content, file.raw_url) {
        (false, Some(content), _) => {
            serde_json::from_str(&content).map_err(|source| SourceError::GistContent {
                id: id.to_string(),
                source,
            })
        }
        (_, _, Some(raw_url)) => {
            info!(gist = id, file = %name, %raw_url, "gist file truncated, fetching raw content");
            Ok(fetcher.fetch_json(&raw_url).await?)
        }
        _ => Err(SourceError::MissingGistContent { id: id.to_string() }),
    }
}

/// Resolve `url` and fetch its payload.
pub async fn load_remote<F: JsonFetcher>(fetcher: &F, url: &str) -> Result<Value, SourceError> {
    RemoteSource::detect(url).load(fetcher).await
}
