#![forbid(unsafe_code)]

//! Playback page query-string contract.
//!
//! | param         | values             | meaning                              |
//! |---------------|--------------------|--------------------------------------|
//! | `version`     | any string         | requested engine version             |
//! | `source`      | `local` or absent  | payload comes from the handoff cache |
//! | `url`         | string             | remote payload location              |
//! | `canvas`      | `true` or absent   | replay canvas content                |
//! | `play`        | `true` or absent   | autoplay                             |
//! | `virtual-dom` | `true` or absent   | virtual DOM rendering mode           |
//!
//! Flags are only ever written as `true`. When reading, any non-empty value
//! counts as set, so hand-edited links keep working.

use serde::Serialize;
use thiserror::Error;
use url::Url;
use url::form_urlencoded;

use crate::versions::{ScriptType, VersionTable};

pub const PARAM_VERSION: &str = "version";
pub const PARAM_SOURCE: &str = "source";
pub const PARAM_URL: &str = "url";
pub const PARAM_CANVAS: &str = "canvas";
pub const PARAM_PLAY: &str = "play";
pub const PARAM_VIRTUAL_DOM: &str = "virtual-dom";

/// Value of `source` that selects the handoff cache.
pub const SOURCE_LOCAL: &str = "local";

const FLAG_SET: &str = "true";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("a url parameter is required unless source=local")]
    MissingUrl,
}

/// Independent replay switches; all default to off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayFlags {
    pub canvas: bool,
    pub auto_play: bool,
    pub use_virtual_dom: bool,
}

/// Raw, unvalidated playback parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackQuery {
    pub version: Option<String>,
    /// `source=local` was present.
    pub local: bool,
    pub url: Option<String>,
    pub flags: ReplayFlags,
}

impl PlaybackQuery {
    /// Parse a query string, with or without the leading `?`.
    ///
    /// For repeated keys the first occurrence wins.
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut version = None;
        let mut source = None;
        let mut url = None;
        let mut canvas = None;
        let mut play = None;
        let mut virtual_dom = None;

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                PARAM_VERSION => &mut version,
                PARAM_SOURCE => &mut source,
                PARAM_URL => &mut url,
                PARAM_CANVAS => &mut canvas,
                PARAM_PLAY => &mut play,
                PARAM_VIRTUAL_DOM => &mut virtual_dom,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }

        let is_set = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());
        Self {
            version,
            local: source.as_deref() == Some(SOURCE_LOCAL),
            url,
            flags: ReplayFlags {
                canvas: is_set(&canvas),
                auto_play: is_set(&play),
                use_virtual_dom: is_set(&virtual_dom),
            },
        }
    }

    /// Parse the query part of an absolute page URL.
    pub fn from_page_url(page_url: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(page_url)?;
        Ok(Self::parse(url.query().unwrap_or_default()))
    }

    /// Encode in the canonical order: `version`, flags, then `url` or
    /// `source`. Unset flags are omitted.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut out = form_urlencoded::Serializer::new(String::new());
        if let Some(version) = &self.version {
            out.append_pair(PARAM_VERSION, version);
        }
        if self.flags.canvas {
            out.append_pair(PARAM_CANVAS, FLAG_SET);
        }
        if self.flags.use_virtual_dom {
            out.append_pair(PARAM_VIRTUAL_DOM, FLAG_SET);
        }
        if self.flags.auto_play {
            out.append_pair(PARAM_PLAY, FLAG_SET);
        }
        if let Some(url) = &self.url {
            out.append_pair(PARAM_URL, url);
        }
        if self.local {
            out.append_pair(PARAM_SOURCE, SOURCE_LOCAL);
        }
        out.finish()
    }
}

/// Rewrite `page_url` so its `version` parameter is `version`, keeping every
/// other parameter and their order.
pub fn with_version(page_url: &str, version: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(page_url)?;
    let mut replaced = false;
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter_map(|(key, value)| {
            if key != PARAM_VERSION {
                return Some((key.into_owned(), value.into_owned()));
            }
            if replaced {
                return None;
            }
            replaced = true;
            Some((key.into_owned(), version.to_string()))
        })
        .collect();
    if !replaced {
        pairs.push((PARAM_VERSION.to_string(), version.to_string()));
    }
    url.query_pairs_mut().clear().extend_pairs(&pairs);
    Ok(url.into())
}

/// Where the playback payload comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "url", rename_all = "lowercase")]
pub enum PayloadSource {
    /// Handoff cache written by the intake page.
    Local,
    /// Remote location, possibly a paste-bin page.
    Remote(String),
}

/// Validated playback request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaySelection {
    /// Always a key of the version table.
    pub version: String,
    pub script_type: ScriptType,
    pub flags: ReplayFlags,
    pub source: PayloadSource,
}

impl ReplaySelection {
    /// Resolve the requested version and pick the payload source.
    pub fn from_query(query: &PlaybackQuery, table: &VersionTable) -> Result<Self, QueryError> {
        let (version, entry) = table.resolve_entry(query.version.as_deref());
        let source = if query.local {
            PayloadSource::Local
        } else {
            match query.url.as_deref() {
                Some(url) if !url.is_empty() => PayloadSource::Remote(url.to_string()),
                _ => return Err(QueryError::MissingUrl),
            }
        };
        Ok(Self {
            version: version.to_string(),
            script_type: entry.script_type.clone(),
            flags: query.flags,
            source,
        })
    }
}
