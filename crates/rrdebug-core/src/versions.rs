#![forbid(unsafe_code)]

//! Replay engine version table and resolution.
//!
//! The table is the single source of truth for which rrweb-player builds can
//! be loaded. Every version string that reaches a CDN URL template goes
//! through [`VersionTable::resolve`] first, so an unknown or hostile value
//! always collapses to the configured default.
//!
//! # Table format
//!
//! ```json
//! {
//!   "2.0.0-alpha.18": {
//!     "rrwebVersion": "2.0.0-alpha.18",
//!     "group": "rrweb-player 2.x",
//!     "type": "cjs",
//!     "default": true
//!   }
//! }
//! ```
//!
//! Entries keep their document order. The first entry with `"default": true`
//! is the default; a table without one is rejected when it is loaded.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Version table shipped with the crate.
pub const BUILTIN_VERSIONS_JSON: &str = include_str!("../assets/versions.json");

const JSDELIVR_PLAYER: &str = "https://cdn.jsdelivr.net/npm/rrweb-player@";
const UNPKG_PLAYER: &str = "https://unpkg.dev/rrweb-player@";
const UNPKG_POSTHOG: &str = "https://unpkg.dev/@posthog/rrweb@";

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("failed to parse version table: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("invalid version table entry `{key}`: {source}")]
    InvalidEntry {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("version table has no default entry")]
    NoDefaultVersion,

    #[error("unknown script type `{script_type}` for version {version}")]
    UnknownScriptType {
        version: String,
        script_type: String,
    },
}

pub type Result<T> = std::result::Result<T, VersionError>;

/// Which external script variant a version is published as.
///
/// Values outside the known set are kept verbatim so the failure can name
/// them when a script URL is requested.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScriptType {
    /// `rrweb-player@x/dist/index.js` on jsDelivr, exporting the player as
    /// the global itself.
    Legacy,
    /// `rrweb-player@x/dist/rrweb.js` on unpkg.
    Js,
    /// `rrweb-player@x/dist/rrweb-player.umd.cjs` on unpkg.
    #[default]
    Cjs,
    /// `@posthog/rrweb@x/dist/rrweb-player.umd.cjs` on unpkg.
    Posthog,
    Unknown(String),
}

impl ScriptType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Legacy => "legacy",
            Self::Js => "js",
            Self::Cjs => "cjs",
            Self::Posthog => "posthog",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<String> for ScriptType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "legacy" => Self::Legacy,
            "js" => Self::Js,
            "cjs" => Self::Cjs,
            "posthog" => Self::Posthog,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<ScriptType> for String {
    fn from(script_type: ScriptType) -> Self {
        script_type.as_str().to_string()
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static metadata for one selectable player build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    /// rrweb library version bundled in this player build.
    #[serde(rename = "rrwebVersion")]
    pub rrweb_version: String,
    /// Selector grouping label. No functional role.
    pub group: String,
    #[serde(rename = "type", default)]
    pub script_type: ScriptType,
    #[serde(rename = "default", default, skip_serializing_if = "is_false")]
    pub is_default: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Ordered, validated version table.
#[derive(Debug, Clone)]
pub struct VersionTable {
    entries: Vec<(String, VersionEntry)>,
    default_index: usize,
}

impl VersionTable {
    /// Load the table embedded in the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_VERSIONS_JSON)
    }

    /// Parse and validate a table document.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(json).map_err(VersionError::Parse)?;
        let entries = raw
            .into_iter()
            .map(|(key, value)| {
                serde_json::from_value::<VersionEntry>(value)
                    .map(|entry| (key.clone(), entry))
                    .map_err(|source| VersionError::InvalidEntry { key, source })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_entries(entries)
    }

    /// Build a table from already-ordered entries.
    pub fn from_entries(entries: Vec<(String, VersionEntry)>) -> Result<Self> {
        let mut defaults = entries
            .iter()
            .enumerate()
            .filter(|(_, (_, entry))| entry.is_default)
            .map(|(idx, _)| idx);
        let default_index = defaults.next().ok_or(VersionError::NoDefaultVersion)?;
        let extra = defaults.count();
        if extra > 0 {
            warn!(
                default = %entries[default_index].0,
                ignored = extra,
                "version table marks several defaults; using the first"
            );
        }
        Ok(Self {
            entries,
            default_index,
        })
    }

    /// True iff `version` is exactly a key of the table.
    #[must_use]
    pub fn is_allowed(&self, version: &str) -> bool {
        self.get(version).is_some()
    }

    #[must_use]
    pub fn get(&self, version: &str) -> Option<&VersionEntry> {
        self.entries
            .iter()
            .find(|(key, _)| key == version)
            .map(|(_, entry)| entry)
    }

    /// Key of the first entry flagged as default.
    #[must_use]
    pub fn default_version(&self) -> &str {
        &self.entries[self.default_index].0
    }

    /// Map an untrusted version string onto a table key.
    ///
    /// Returns `requested` when it is a key, the default otherwise. Never
    /// fails.
    #[must_use]
    pub fn resolve(&self, requested: Option<&str>) -> &str {
        self.resolve_entry(requested).0
    }

    /// Same as [`resolve`](Self::resolve), also returning the entry.
    #[must_use]
    pub fn resolve_entry(&self, requested: Option<&str>) -> (&str, &VersionEntry) {
        let (key, entry) = requested
            .and_then(|version| self.entries.iter().find(|(key, _)| key == version))
            .unwrap_or(&self.entries[self.default_index]);
        (key.as_str(), entry)
    }

    /// Entries in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &VersionEntry)> + '_ {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Selector layout: groups ordered by first appearance, options in table
    /// order inside each group.
    ///
    /// `selected` marks the option to preselect; when it is absent or not a
    /// key, the default entry is marked instead.
    #[must_use]
    pub fn option_groups(&self, selected: Option<&str>) -> Vec<OptionGroup> {
        let selected = self.resolve(selected);
        let mut groups: Vec<OptionGroup> = Vec::new();
        for (key, entry) in self.iter() {
            let option = VersionOption {
                value: key.to_string(),
                label: format!("{key} (rrweb v{})", entry.rrweb_version),
                selected: key == selected,
            };
            match groups.iter_mut().find(|group| group.label == entry.group) {
                Some(group) => group.options.push(option),
                None => groups.push(OptionGroup {
                    label: entry.group.clone(),
                    options: vec![option],
                }),
            }
        }
        groups
    }
}

/// One `<optgroup>` of the version selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionGroup {
    pub label: String,
    pub options: Vec<VersionOption>,
}

/// One `<option>` of the version selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Player script URL for a resolved version.
pub fn script_url(version: &str, script_type: &ScriptType) -> Result<String> {
    match script_type {
        ScriptType::Legacy => Ok(format!("{JSDELIVR_PLAYER}{version}/dist/index.js")),
        ScriptType::Js => Ok(format!("{UNPKG_PLAYER}{version}/dist/rrweb.js")),
        // jsDelivr serves `.cjs` with the wrong content type, so cjs builds
        // come from unpkg.
        ScriptType::Cjs => Ok(format!("{UNPKG_PLAYER}{version}/dist/rrweb-player.umd.cjs")),
        ScriptType::Posthog => Ok(format!("{UNPKG_POSTHOG}{version}/dist/rrweb-player.umd.cjs")),
        ScriptType::Unknown(raw) => Err(VersionError::UnknownScriptType {
            version: version.to_string(),
            script_type: raw.clone(),
        }),
    }
}

/// Player stylesheet URL for a resolved version.
#[must_use]
pub fn style_url(version: &str) -> String {
    format!("{JSDELIVR_PLAYER}{version}/dist/style.css")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SMALL_TABLE: &str = r#"{
        "b": { "rrwebVersion": "2.0.0", "group": "two", "type": "js" },
        "a": { "rrwebVersion": "1.0.0", "group": "one", "type": "legacy", "default": true },
        "c": { "rrwebVersion": "2.1.0", "group": "two" },
        "d": { "rrwebVersion": "3.0.0", "group": "one", "type": "posthog", "default": true }
    }"#;

    fn small() -> VersionTable {
        VersionTable::from_json(SMALL_TABLE).expect("small table should load")
    }

    #[test]
    fn builtin_table_loads_with_default() {
        let table = VersionTable::builtin().expect("builtin table should load");
        assert!(!table.is_empty());
        assert!(table.is_allowed(table.default_version()));
        assert!(table.is_allowed("v2.0.0-alpha.4"));
    }

    #[test]
    fn table_order_is_document_order() {
        let table = small();
        let keys: Vec<&str> = table.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn first_default_wins() {
        assert_eq!(small().default_version(), "a");
    }

    #[test]
    fn missing_type_means_cjs() {
        assert_eq!(small().get("c").map(|e| &e.script_type), Some(&ScriptType::Cjs));
    }

    #[test]
    fn table_without_default_is_rejected() {
        let err = VersionTable::from_json(r#"{ "a": { "rrwebVersion": "1", "group": "g" } }"#)
            .expect_err("no default must fail");
        assert!(matches!(err, VersionError::NoDefaultVersion));

        let err = VersionTable::from_json("{}").expect_err("empty table must fail");
        assert!(matches!(err, VersionError::NoDefaultVersion));
    }

    #[test]
    fn malformed_entry_names_its_key() {
        let err = VersionTable::from_json(r#"{ "broken": { "group": "g" } }"#)
            .expect_err("missing rrwebVersion must fail");
        match err {
            VersionError::InvalidEntry { key, .. } => assert_eq!(key, "broken"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn resolve_passes_known_versions_through() {
        let table = small();
        assert_eq!(table.resolve(Some("c")), "c");
        assert_eq!(table.resolve(Some("d")), "d");
    }

    #[test]
    fn resolve_falls_back_for_unknown_input() {
        let table = small();
        assert_eq!(table.resolve(None), "a");
        assert_eq!(table.resolve(Some("")), "a");
        assert_eq!(table.resolve(Some("C")), "a");
        assert_eq!(table.resolve(Some("a/../../evil.js")), "a");
    }

    #[test]
    fn unknown_script_type_is_kept_and_reported() {
        let table = VersionTable::from_json(
            r#"{ "x": { "rrwebVersion": "1", "group": "g", "type": "esm", "default": true } }"#,
        )
        .expect("unknown types still load");
        let (version, entry) = table.resolve_entry(Some("x"));
        assert_eq!(entry.script_type, ScriptType::Unknown("esm".to_string()));
        let err = script_url(version, &entry.script_type).expect_err("esm has no template");
        assert_eq!(err.to_string(), "unknown script type `esm` for version x");
    }

    #[test]
    fn script_urls_follow_templates() {
        assert_eq!(
            script_url("0.7.14", &ScriptType::Legacy).unwrap(),
            "https://cdn.jsdelivr.net/npm/rrweb-player@0.7.14/dist/index.js"
        );
        assert_eq!(
            script_url("2.0.0-alpha.11", &ScriptType::Js).unwrap(),
            "https://unpkg.dev/rrweb-player@2.0.0-alpha.11/dist/rrweb.js"
        );
        assert_eq!(
            script_url("2.0.0-alpha.18", &ScriptType::Cjs).unwrap(),
            "https://unpkg.dev/rrweb-player@2.0.0-alpha.18/dist/rrweb-player.umd.cjs"
        );
        assert_eq!(
            script_url("0.0.15", &ScriptType::Posthog).unwrap(),
            "https://unpkg.dev/@posthog/rrweb@0.0.15/dist/rrweb-player.umd.cjs"
        );
        assert_eq!(
            style_url("2.0.0-alpha.18"),
            "https://cdn.jsdelivr.net/npm/rrweb-player@2.0.0-alpha.18/dist/style.css"
        );
    }

    #[test]
    fn option_groups_follow_first_encounter() {
        let groups = small().option_groups(None);
        let layout: Vec<(&str, Vec<&str>)> = groups
            .iter()
            .map(|g| {
                (
                    g.label.as_str(),
                    g.options.iter().map(|o| o.value.as_str()).collect(),
                )
            })
            .collect();
        assert_eq!(layout, vec![("two", vec!["b", "c"]), ("one", vec!["a", "d"])]);
    }

    #[test]
    fn option_groups_mark_exactly_one_selection() {
        let table = small();
        let selected = |groups: Vec<OptionGroup>| -> Vec<String> {
            groups
                .into_iter()
                .flat_map(|g| g.options)
                .filter(|o| o.selected)
                .map(|o| o.value)
                .collect()
        };
        assert_eq!(selected(table.option_groups(None)), vec!["a"]);
        assert_eq!(selected(table.option_groups(Some("c"))), vec!["c"]);
        assert_eq!(selected(table.option_groups(Some("nope"))), vec!["a"]);
    }

    #[test]
    fn option_label_shows_rrweb_version() {
        let groups = small().option_groups(None);
        assert_eq!(groups[0].options[0].label, "b (rrweb v2.0.0)");
    }
}
