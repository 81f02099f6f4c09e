//! `check`: validate a local recording with the intake page's rules.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;
use rrdebug_core::intake::parse_payload;
use serde_json::Value;
use tracing::warn;

use crate::error::{CliError, Result};

/// rrweb `EventType` discriminants.
const EVENT_TYPES: [&str; 7] = [
    "DomContentLoaded",
    "Load",
    "FullSnapshot",
    "IncrementalSnapshot",
    "Meta",
    "Custom",
    "Plugin",
];
const FULL_SNAPSHOT: u64 = 2;

#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    /// Recording file, as it would be uploaded on the intake page.
    pub file: PathBuf,
}

/// Shape of a parsed recording.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecordingSummary {
    /// `None` when the payload is not an array.
    pub events: Option<usize>,
    /// Count per `type` value; `None` collects entries without a numeric type.
    pub by_type: BTreeMap<Option<u64>, usize>,
}

impl RecordingSummary {
    #[must_use]
    pub fn of(payload: &Value) -> Self {
        let Some(events) = payload.as_array() else {
            return Self::default();
        };
        let mut by_type = BTreeMap::new();
        for event in events {
            *by_type
                .entry(event.get("type").and_then(Value::as_u64))
                .or_insert(0) += 1;
        }
        Self {
            events: Some(events.len()),
            by_type,
        }
    }

    /// A replay needs at least one full snapshot to show anything.
    #[must_use]
    pub fn has_full_snapshot(&self) -> bool {
        self.by_type.contains_key(&Some(FULL_SNAPSHOT))
    }
}

fn type_name(kind: Option<u64>) -> String {
    match kind {
        Some(kind) => usize::try_from(kind)
            .ok()
            .and_then(|idx| EVENT_TYPES.get(idx))
            .map_or_else(|| format!("type {kind}"), |name| (*name).to_string()),
        None => "untyped".to_string(),
    }
}

pub fn load_recording(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)?;
    if text.is_empty() {
        return Err(CliError::invalid(format!("{} is empty", path.display())));
    }
    parse_payload(&text).map_err(|source| CliError::InvalidRecording {
        path: path.to_path_buf(),
        source,
    })
}

pub fn run_check(args: &CheckArgs, out: &mut impl Write) -> Result<()> {
    let payload = load_recording(&args.file)?;
    let summary = RecordingSummary::of(&payload);
    let Some(events) = summary.events else {
        warn!(path = %args.file.display(), "payload is not an event array");
        writeln!(out, "{}: valid JSON, not an event array", args.file.display())?;
        return Ok(());
    };

    writeln!(out, "{}: {events} events", args.file.display())?;
    for (kind, count) in &summary.by_type {
        writeln!(out, "  {:<20} {count}", type_name(*kind))?;
    }
    if !summary.has_full_snapshot() {
        warn!(path = %args.file.display(), "no full snapshot");
        writeln!(out, "warning: no FullSnapshot event; the player will show a blank page")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn recording(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write");
        file
    }

    #[test]
    fn summary_counts_event_types() {
        let summary = RecordingSummary::of(&json!([
            {"type": 4}, {"type": 2}, {"type": 3}, {"type": 3}, {"data": {}}
        ]));
        assert_eq!(summary.events, Some(5));
        assert_eq!(summary.by_type.get(&Some(3)), Some(&2));
        assert_eq!(summary.by_type.get(&None), Some(&1));
        assert!(summary.has_full_snapshot());
    }

    #[test]
    fn type_names_follow_rrweb() {
        assert_eq!(type_name(Some(2)), "FullSnapshot");
        assert_eq!(type_name(Some(42)), "type 42");
        assert_eq!(type_name(None), "untyped");
    }

    #[test]
    fn check_prints_breakdown() {
        let file = recording(r#"[{"type":4},{"type":2},{"type":3}]"#);
        let mut out = Vec::new();
        run_check(
            &CheckArgs {
                file: file.path().to_path_buf(),
            },
            &mut out,
        )
        .expect("valid recording");
        let text = String::from_utf8(out).expect("utf-8");
        assert!(text.contains(": 3 events\n"), "{text}");
        assert!(text.contains("FullSnapshot"), "{text}");
        assert!(!text.contains("warning"), "{text}");
    }

    #[test]
    fn missing_full_snapshot_is_flagged() {
        let file = recording(r#"[{"type":3}]"#);
        let mut out = Vec::new();
        run_check(
            &CheckArgs {
                file: file.path().to_path_buf(),
            },
            &mut out,
        )
        .expect("still valid");
        assert!(
            String::from_utf8(out)
                .expect("utf-8")
                .contains("warning: no FullSnapshot")
        );
    }

    #[test]
    fn broken_json_is_an_input_error() {
        let file = recording("{bad");
        let err = load_recording(file.path()).expect_err("broken");
        assert!(matches!(err, CliError::InvalidRecording { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn empty_file_is_rejected() {
        let file = recording("");
        let err = load_recording(file.path()).expect_err("empty");
        assert_eq!(err.exit_code(), 2);
    }
}
