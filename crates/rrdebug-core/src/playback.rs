#![forbid(unsafe_code)]

//! Playback page: rebuild the replay context from the query string.
//!
//! The flow is strictly ordered:
//!
//! 1. resolve the version against the table;
//! 2. obtain the payload (handoff cache or remote source);
//! 3. attach the player stylesheet and script;
//! 4. once the script has loaded, construct the player and show the JSON.
//!
//! Any failure ends the attempt. Nothing is retried and no partially built
//! player is left behind; the caller shows [`PlaybackError::user_message`].

use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

use crate::cache::{CacheError, PayloadCache, StringTier, StructuredTier};
use crate::player::{LoadError, ModuleLoader, PlaybackSurface, PlayerAdapter, PlayerConfig};
use crate::query::{self, PayloadSource, PlaybackQuery, QueryError, ReplaySelection};
use crate::source::{JsonFetcher, SourceError, load_remote};
use crate::versions::{VersionTable, script_url, style_url};

/// Status text shown when the payload came from the intake page.
pub const LOCAL_SOURCE_LABEL: &str = "Local data (file upload or paste)";

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("no events found in the handoff cache")]
    NoLocalEvents,

    #[error("failed to load local events: {0}")]
    LocalCache(#[from] CacheError),

    #[error("failed to load remote events: {0}")]
    Remote(#[from] SourceError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("local events are no longer available")]
    LocalDataLost,

    #[error("invalid page url: {0}")]
    PageUrl(#[from] url::ParseError),
}

impl PlaybackError {
    /// Text for the blocking alert. Details stay in the log.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Query(QueryError::MissingUrl) => {
                "No events source given. Please go back and select your events.".to_string()
            }
            Self::NoLocalEvents => {
                "No events data found. Please go back and select your events.".to_string()
            }
            Self::LocalCache(err) => format!("Error loading local events data: {err}"),
            Self::Remote(_) => "something went wrong, please check the console".to_string(),
            Self::Load(err) => format!("Failed to start the replay player: {err}"),
            Self::LocalDataLost => {
                "Local data was lost. Please go back and reload your events.".to_string()
            }
            Self::PageUrl(err) => format!("Invalid page address: {err}"),
        }
    }
}

/// Result of a successful start.
#[derive(Debug)]
pub struct PlaybackSession<H> {
    pub selection: ReplaySelection,
    pub events: Value,
    /// `None` when the version's script type has no URL template; the page
    /// then stays without a player.
    pub player: Option<H>,
}

/// Drives one playback page load.
pub struct PlaybackController<'a, P, S, F, L, U> {
    table: &'a VersionTable,
    cache: &'a PayloadCache<P, S>,
    fetcher: &'a F,
    loader: &'a L,
    surface: &'a U,
}

impl<'a, P, S, F, L, U> PlaybackController<'a, P, S, F, L, U>
where
    P: StructuredTier,
    S: StringTier,
    F: JsonFetcher,
    L: ModuleLoader,
    U: PlaybackSurface,
{
    pub fn new(
        table: &'a VersionTable,
        cache: &'a PayloadCache<P, S>,
        fetcher: &'a F,
        loader: &'a L,
        surface: &'a U,
    ) -> Self {
        Self {
            table,
            cache,
            fetcher,
            loader,
            surface,
        }
    }

    /// Resolve the payload for `selection` and label its origin.
    pub async fn load_events(&self, selection: &ReplaySelection) -> Result<Value, PlaybackError> {
        match &selection.source {
            PayloadSource::Local => {
                let events = self
                    .cache
                    .retrieve()
                    .await?
                    .ok_or(PlaybackError::NoLocalEvents)?;
                info!(events = event_count(&events), "loaded local events");
                self.surface.set_source_label(LOCAL_SOURCE_LABEL);
                Ok(events)
            }
            PayloadSource::Remote(url) => {
                let events = load_remote(self.fetcher, url).await?;
                info!(%url, events = event_count(&events), "loaded remote events");
                self.surface.set_source_label(url);
                Ok(events)
            }
        }
    }

    /// Run the whole page flow for `query`.
    pub async fn start(
        &self,
        query: &PlaybackQuery,
    ) -> Result<PlaybackSession<U::Player>, PlaybackError> {
        let selection = ReplaySelection::from_query(query, self.table)?;
        info!(
            requested = query.version.as_deref().unwrap_or_default(),
            version = %selection.version,
            script_type = %selection.script_type,
            "starting playback"
        );

        let events = self.load_events(&selection).await?;

        self.loader.attach_style(&style_url(&selection.version))?;
        let src = match script_url(&selection.version, &selection.script_type) {
            Ok(src) => src,
            Err(err) => {
                error!(error = %err, "no player script for this version");
                return Ok(PlaybackSession {
                    selection,
                    events,
                    player: None,
                });
            }
        };
        self.loader.load_script(&src).await?;

        let adapter = PlayerAdapter::for_script(&selection.script_type);
        let config = PlayerConfig::new(&events, selection.flags);
        let player = self.surface.construct_player(adapter, &config)?;
        self.surface.hide_loading();
        self.surface.show_json(&events)?;

        Ok(PlaybackSession {
            selection,
            events,
            player: Some(player),
        })
    }
}

/// Navigation target for switching the playback page to `version`.
///
/// When the page plays local events, the cache must still hold them;
/// otherwise reloading would land on an empty page.
pub async fn version_switch_target<P: StructuredTier, S: StringTier>(
    cache: &PayloadCache<P, S>,
    page_url: &str,
    version: &str,
) -> Result<String, PlaybackError> {
    let current = PlaybackQuery::from_page_url(page_url)?;
    if current.local && !cache.contains().await {
        return Err(PlaybackError::LocalDataLost);
    }
    Ok(query::with_version(page_url, version)?)
}

/// Number of events, or 1 for a non-array payload.
#[must_use]
pub fn event_count(events: &Value) -> usize {
    events.as_array().map_or(1, Vec::len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryStringTier, MemoryStructuredTier, TierError};
    use crate::source::FetchError;
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::RefCell;

    const TABLE: &str = r#"{
        "2.0.0": { "rrwebVersion": "2.0.0", "group": "g", "type": "cjs", "default": true },
        "0.7.14": { "rrwebVersion": "0.9.14", "group": "g", "type": "legacy" },
        "9.9.9": { "rrwebVersion": "9.9.9", "group": "g", "type": "esm" }
    }"#;

    struct NoNetwork;

    impl JsonFetcher for NoNetwork {
        async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
            Err(FetchError::Network {
                url: url.to_string(),
                message: "offline".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct Recorder {
        log: RefCell<Vec<String>>,
        fail_script: bool,
    }

    impl ModuleLoader for Recorder {
        fn attach_style(&self, href: &str) -> Result<(), LoadError> {
            self.log.borrow_mut().push(format!("style {href}"));
            Ok(())
        }

        async fn load_script(&self, src: &str) -> Result<(), LoadError> {
            self.log.borrow_mut().push(format!("script {src}"));
            if self.fail_script {
                return Err(LoadError::Script {
                    src: src.to_string(),
                    message: "404".to_string(),
                });
            }
            Ok(())
        }
    }

    impl PlaybackSurface for Recorder {
        type Player = (PlayerAdapter, Value);

        fn set_source_label(&self, label: &str) {
            self.log.borrow_mut().push(format!("label {label}"));
        }

        fn construct_player(
            &self,
            adapter: PlayerAdapter,
            config: &PlayerConfig<'_>,
        ) -> Result<Self::Player, LoadError> {
            self.log.borrow_mut().push(format!("player {adapter:?}"));
            Ok((adapter, serde_json::to_value(config).expect("config")))
        }

        fn show_json(&self, _payload: &Value) -> Result<(), LoadError> {
            self.log.borrow_mut().push("json".to_string());
            Ok(())
        }

        fn hide_loading(&self) {
            self.log.borrow_mut().push("loaded".to_string());
        }
    }

    fn run(
        cache: &PayloadCache<MemoryStructuredTier, MemoryStringTier>,
        recorder: &Recorder,
        query: &str,
    ) -> Result<PlaybackSession<(PlayerAdapter, Value)>, PlaybackError> {
        let table = VersionTable::from_json(TABLE).expect("table");
        let controller = PlaybackController::new(&table, cache, &NoNetwork, recorder, recorder);
        block_on(controller.start(&PlaybackQuery::parse(query)))
    }

    fn memory_cache() -> PayloadCache<MemoryStructuredTier, MemoryStringTier> {
        PayloadCache::new(MemoryStructuredTier::new(), MemoryStringTier::new())
    }

    #[test]
    fn local_flow_runs_in_order() {
        let cache = memory_cache();
        block_on(cache.store(&json!([{"type": 0}]))).expect("store");
        let recorder = Recorder::default();
        let session = run(&cache, &recorder, "version=0.7.14&source=local&play=true")
            .expect("playback starts");

        assert_eq!(
            *recorder.log.borrow(),
            vec![
                "label Local data (file upload or paste)".to_string(),
                "style https://cdn.jsdelivr.net/npm/rrweb-player@0.7.14/dist/style.css"
                    .to_string(),
                "script https://cdn.jsdelivr.net/npm/rrweb-player@0.7.14/dist/index.js"
                    .to_string(),
                "player Legacy".to_string(),
                "loaded".to_string(),
                "json".to_string(),
            ]
        );
        let (adapter, config) = session.player.expect("player constructed");
        assert_eq!(adapter, PlayerAdapter::Legacy);
        assert_eq!(config["autoPlay"], json!(true));
        assert_eq!(config["events"], json!([{"type": 0}]));
    }

    #[test]
    fn missing_local_events_abort_before_assets() {
        let recorder = Recorder::default();
        let err = run(&memory_cache(), &recorder, "source=local").expect_err("empty cache");
        assert!(matches!(err, PlaybackError::NoLocalEvents));
        assert_eq!(
            err.user_message(),
            "No events data found. Please go back and select your events."
        );
        assert!(recorder.log.borrow().is_empty());
    }

    #[test]
    fn remote_failure_aborts_with_generic_message() {
        let recorder = Recorder::default();
        let err = run(&memory_cache(), &recorder, "url=https%3A%2F%2Fx.test%2Fe.json")
            .expect_err("offline");
        assert!(matches!(err, PlaybackError::Remote(_)));
        assert_eq!(
            err.user_message(),
            "something went wrong, please check the console"
        );
        assert!(recorder.log.borrow().is_empty());
    }

    #[test]
    fn unknown_script_type_skips_player() {
        let cache = memory_cache();
        block_on(cache.store(&json!([]))).expect("store");
        let recorder = Recorder::default();
        let session = run(&cache, &recorder, "version=9.9.9&source=local").expect("not fatal");
        assert!(session.player.is_none());
        assert_eq!(recorder.log.borrow().len(), 2, "label and style only");
    }

    #[test]
    fn script_failure_prevents_construction() {
        let cache = memory_cache();
        block_on(cache.store(&json!([]))).expect("store");
        let recorder = Recorder {
            fail_script: true,
            ..Recorder::default()
        };
        let err = run(&cache, &recorder, "source=local").expect_err("script 404");
        assert!(matches!(err, PlaybackError::Load(LoadError::Script { .. })));
        assert!(
            !recorder
                .log
                .borrow()
                .iter()
                .any(|entry| entry.starts_with("player"))
        );
    }

    #[test]
    fn version_switch_keeps_other_params() {
        let cache = memory_cache();
        let target = block_on(version_switch_target(
            &cache,
            "https://host.test/play/index.html?version=2.0.0&url=https%3A%2F%2Fx.test&canvas=true",
            "0.7.14",
        ))
        .expect("remote pages always switch");
        assert_eq!(
            target,
            "https://host.test/play/index.html?version=0.7.14&url=https%3A%2F%2Fx.test&canvas=true"
        );
    }

    #[test]
    fn version_switch_guards_lost_local_data() {
        let cache = memory_cache();
        let page = "https://host.test/play/index.html?version=2.0.0&source=local";
        let err = block_on(version_switch_target(&cache, page, "0.7.14")).expect_err("no data");
        assert_eq!(
            err.user_message(),
            "Local data was lost. Please go back and reload your events."
        );

        block_on(cache.store(&json!([]))).expect("store");
        let target = block_on(version_switch_target(&cache, page, "0.7.14")).expect("data kept");
        assert_eq!(
            target,
            "https://host.test/play/index.html?version=0.7.14&source=local"
        );
    }

    #[test]
    fn version_switch_accepts_payload_held_only_by_primary_tier() {
        /// sessionStorage over quota: every write is rejected.
        struct FullString;

        impl StringTier for FullString {
            fn set_item(&self, _key: &str, _value: &str) -> Result<(), TierError> {
                Err(TierError::Rejected("quota exceeded".to_string()))
            }

            fn get_item(&self, _key: &str) -> Result<Option<String>, TierError> {
                Ok(None)
            }

            fn remove_item(&self, _key: &str) -> Result<(), TierError> {
                Ok(())
            }
        }

        let cache = PayloadCache::new(MemoryStructuredTier::new(), FullString);
        block_on(cache.store(&json!([{"type": 2}]))).expect("primary accepts the payload");

        let page = "https://host.test/play/index.html?version=2.0.0&source=local";
        let target = block_on(version_switch_target(&cache, page, "0.7.14"))
            .expect("primary still holds data");
        assert_eq!(
            target,
            "https://host.test/play/index.html?version=0.7.14&source=local"
        );
    }

    #[test]
    fn event_count_handles_non_arrays() {
        assert_eq!(event_count(&json!([1, 2, 3])), 3);
        assert_eq!(event_count(&json!({"events": []})), 1);
    }
}
