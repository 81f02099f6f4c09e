#![forbid(unsafe_code)]

//! Boundary to the externally hosted replay engine.
//!
//! The engine is a third-party script attached to the page at runtime. The
//! core never touches it directly: a [`ModuleLoader`] attaches the assets
//! and a [`PlaybackSurface`] constructs the widget with a [`PlayerConfig`].

use std::future::Future;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::query::ReplayFlags;
use crate::versions::ScriptType;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("failed to attach stylesheet {href}: {message}")]
    Style { href: String, message: String },

    #[error("failed to load script {src}: {message}")]
    Script { src: String, message: String },

    #[error("replay player is not available: {0}")]
    Player(String),

    #[error("failed to render events viewer: {0}")]
    Viewer(String),
}

/// How the loaded script exposes its player constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerAdapter {
    /// `window.rrwebPlayer.Player`.
    Modern,
    /// `window.rrwebPlayer` is itself the constructor.
    Legacy,
}

impl PlayerAdapter {
    #[must_use]
    pub fn for_script(script_type: &ScriptType) -> Self {
        match script_type {
            ScriptType::Legacy => Self::Legacy,
            _ => Self::Modern,
        }
    }
}

/// Cursor trail styling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MouseTail {
    pub stroke_style: String,
}

impl Default for MouseTail {
    fn default() -> Self {
        Self {
            stroke_style: "yellow".to_string(),
        }
    }
}

/// Player `data` options, serialized with the names the engine expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerConfig<'a> {
    pub events: &'a Value,
    pub skip_inactive: bool,
    pub show_debug: bool,
    pub show_warning: bool,
    pub auto_play: bool,
    pub use_virtual_dom: bool,
    #[serde(rename = "UNSAFE_replayCanvas")]
    pub replay_canvas: bool,
    pub mouse_tail: MouseTail,
}

impl<'a> PlayerConfig<'a> {
    #[must_use]
    pub fn new(events: &'a Value, flags: ReplayFlags) -> Self {
        Self {
            events,
            skip_inactive: true,
            show_debug: true,
            show_warning: true,
            auto_play: flags.auto_play,
            use_virtual_dom: flags.use_virtual_dom,
            replay_canvas: flags.canvas,
            mouse_tail: MouseTail::default(),
        }
    }
}

/// Attaches external assets to the page.
pub trait ModuleLoader {
    /// Add a stylesheet. Completion is not awaited.
    fn attach_style(&self, href: &str) -> Result<(), LoadError>;

    /// Add a script and resolve once it has loaded.
    fn load_script(&self, src: &str) -> impl Future<Output = Result<(), LoadError>>;
}

/// Page elements the playback flow writes to.
pub trait PlaybackSurface {
    /// Live player returned by [`construct_player`](Self::construct_player).
    type Player;

    /// Describe where the events came from.
    fn set_source_label(&self, label: &str);

    /// Instantiate the replay widget. Only called after the player script
    /// has loaded.
    fn construct_player(
        &self,
        adapter: PlayerAdapter,
        config: &PlayerConfig<'_>,
    ) -> Result<Self::Player, LoadError>;

    /// Show the raw payload in the read-only viewer.
    fn show_json(&self, payload: &Value) -> Result<(), LoadError>;

    fn hide_loading(&self);
}
