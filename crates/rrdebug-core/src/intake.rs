#![forbid(unsafe_code)]

//! Intake page: turns one of the input modes into a playback navigation.
//!
//! - `url`: the URL is forwarded in the query string, nothing is stored.
//! - `file` / `paste`: the text must parse as JSON; the payload is written
//!   to the handoff cache and the query carries `source=local`.
//! - `cached`: reuse whatever the cache already holds.
//!
//! Validation failures leave the cache untouched. A failed cache write
//! aborts the submission so the playback page is never opened without data.

use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::cache::{CacheError, PayloadCache, StringTier, StructuredTier};
use crate::config::HandoffConfig;
use crate::query::{PlaybackQuery, ReplayFlags};

/// Display text of every variant is the message shown to the user.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Please enter a URL")]
    MissingUrl,

    #[error("Please select a file")]
    MissingFile,

    #[error("Please paste JSON content")]
    MissingPaste,

    #[error("Invalid JSON file: {0}")]
    InvalidFile(#[source] serde_json::Error),

    #[error("Invalid JSON content: {0}")]
    InvalidPaste(#[source] serde_json::Error),

    #[error("No previously loaded events found. Please select a file or paste JSON content.")]
    NoCachedEvents,

    #[error("Could not store events for playback: {0}")]
    Persist(#[from] CacheError),

    #[error("Unknown input method: {0}")]
    UnknownMethod(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputMethod {
    #[default]
    Url,
    File,
    Paste,
    Cached,
}

impl InputMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::File => "file",
            Self::Paste => "paste",
            Self::Cached => "cached",
        }
    }

    /// Whether this mode hands the payload over through the cache.
    #[must_use]
    pub const fn is_local(self) -> bool {
        !matches!(self, Self::Url)
    }
}

impl FromStr for InputMethod {
    type Err = IntakeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "url" => Ok(Self::Url),
            "file" => Ok(Self::File),
            "paste" => Ok(Self::Paste),
            "cached" => Ok(Self::Cached),
            other => Err(IntakeError::UnknownMethod(other.to_string())),
        }
    }
}

/// Text of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub contents: String,
}

/// Submitted intake form. Empty strings mean the field was left blank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntakeForm {
    pub method: InputMethod,
    pub version: String,
    pub flags: ReplayFlags,
    pub url: String,
    pub file: Option<FileUpload>,
    pub paste: String,
}

/// Parse user-supplied event text.
pub fn parse_payload(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(text)
}

pub struct IntakeController<'a, P, S> {
    cache: &'a PayloadCache<P, S>,
    config: &'a HandoffConfig,
}

impl<'a, P: StructuredTier, S: StringTier> IntakeController<'a, P, S> {
    pub fn new(cache: &'a PayloadCache<P, S>, config: &'a HandoffConfig) -> Self {
        Self { cache, config }
    }

    /// Validate the form, persist local payloads, and return the playback
    /// navigation target.
    pub async fn submit(&self, form: &IntakeForm) -> Result<String, IntakeError> {
        let mut query = PlaybackQuery {
            version: Some(form.version.clone()),
            local: form.method.is_local(),
            url: None,
            flags: form.flags,
        };

        match form.method {
            InputMethod::Url => {
                if form.url.is_empty() {
                    return Err(IntakeError::MissingUrl);
                }
                query.url = Some(form.url.clone());
            }
            InputMethod::File => {
                let file = form
                    .file
                    .as_ref()
                    .filter(|file| !file.contents.is_empty())
                    .ok_or(IntakeError::MissingFile)?;
                let payload = parse_payload(&file.contents).map_err(IntakeError::InvalidFile)?;
                self.cache.store(&payload).await?;
                info!(file = %file.name, bytes = file.contents.len(), "uploaded events stored");
            }
            InputMethod::Paste => {
                if form.paste.trim().is_empty() {
                    return Err(IntakeError::MissingPaste);
                }
                let payload = parse_payload(&form.paste).map_err(IntakeError::InvalidPaste)?;
                self.cache.store(&payload).await?;
                info!(bytes = form.paste.len(), "pasted events stored");
            }
            InputMethod::Cached => {
                if !self.cache.contains().await {
                    return Err(IntakeError::NoCachedEvents);
                }
            }
        }

        Ok(self.config.play_target(&query.to_query_string()))
    }
}
