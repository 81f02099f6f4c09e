#![forbid(unsafe_code)]

//! Names shared by the intake and playback pages.

/// Storage and navigation names used for the cross-page handoff.
///
/// Both pages must agree on every field; the defaults are what the
/// published pages use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffConfig {
    /// IndexedDB database name.
    pub database: String,
    /// IndexedDB schema version.
    pub database_version: u32,
    /// Object store holding the payload.
    pub object_store: String,
    /// Key of the single slot, in both storage tiers.
    pub key: String,
    /// Playback page, relative to the intake page.
    pub play_page: String,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            database: "rrweb-storage".to_string(),
            database_version: 1,
            object_store: "events".to_string(),
            key: "rrweb-events".to_string(),
            play_page: "play/index.html".to_string(),
        }
    }
}

impl HandoffConfig {
    /// Navigation target for an encoded playback query.
    #[must_use]
    pub fn play_target(&self, query: &str) -> String {
        if query.is_empty() {
            self.play_page.clone()
        } else {
            format!("{}?{query}", self.play_page)
        }
    }
}
