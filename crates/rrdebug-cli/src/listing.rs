//! `versions` and `resolve`: inspect the built-in version table.

use std::io::Write;

use clap::Args;
use rrdebug_core::versions::{VersionEntry, VersionTable, script_url, style_url};
use serde::Serialize;

use crate::error::Result;

#[derive(Debug, Clone, Args)]
pub struct VersionsArgs {
    /// Print the table as JSON instead of a grouped listing.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ResolveArgs {
    /// Version as it would appear in a `version=` query parameter.
    pub version: String,
}

#[derive(Serialize)]
struct VersionRow<'a> {
    version: &'a str,
    #[serde(flatten)]
    entry: &'a VersionEntry,
}

pub fn run_versions(table: &VersionTable, args: &VersionsArgs, out: &mut impl Write) -> Result<()> {
    if args.json {
        let rows: Vec<VersionRow<'_>> = table
            .iter()
            .map(|(version, entry)| VersionRow { version, entry })
            .collect();
        serde_json::to_writer_pretty(&mut *out, &rows)?;
        writeln!(out)?;
        return Ok(());
    }

    for group in table.option_groups(None) {
        writeln!(out, "{}", group.label)?;
        for option in &group.options {
            let marker = if option.selected { '*' } else { ' ' };
            let script_type = table
                .get(&option.value)
                .map(|entry| entry.script_type.as_str())
                .unwrap_or_default();
            writeln!(out, "  {marker} {} [{script_type}]", option.label)?;
        }
    }
    Ok(())
}

pub fn run_resolve(table: &VersionTable, args: &ResolveArgs, out: &mut impl Write) -> Result<()> {
    let (version, entry) = table.resolve_entry(Some(&args.version));
    let note = if version == args.version {
        ""
    } else {
        " (not in table, using default)"
    };
    writeln!(out, "requested: {}", args.version)?;
    writeln!(out, "version:   {version}{note}")?;
    writeln!(out, "rrweb:     {}", entry.rrweb_version)?;
    writeln!(out, "type:      {}", entry.script_type)?;
    match script_url(version, &entry.script_type) {
        Ok(src) => writeln!(out, "script:    {src}")?,
        Err(err) => writeln!(out, "script:    unavailable ({err})")?,
    }
    writeln!(out, "style:     {}", style_url(version))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table() -> VersionTable {
        VersionTable::from_json(
            r#"{
                "2.0.0": { "rrwebVersion": "2.0.0", "group": "player 2.x", "type": "cjs", "default": true },
                "1.0.0": { "rrwebVersion": "1.0.0", "group": "player 1.x", "type": "legacy" },
                "2.1.0": { "rrwebVersion": "2.1.0", "group": "player 2.x", "type": "esm" }
            }"#,
        )
        .expect("test table")
    }

    fn render(run: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut out = Vec::new();
        run(&mut out).expect("command succeeds");
        String::from_utf8(out).expect("utf-8 output")
    }

    #[test]
    fn listing_groups_by_first_appearance() {
        let text = render(|out| run_versions(&table(), &VersionsArgs { json: false }, out));
        assert_eq!(
            text,
            "player 2.x\n\
             \x20 * 2.0.0 (rrweb v2.0.0) [cjs]\n\
             \x20   2.1.0 (rrweb v2.1.0) [esm]\n\
             player 1.x\n\
             \x20   1.0.0 (rrweb v1.0.0) [legacy]\n"
        );
    }

    #[test]
    fn json_listing_keeps_table_order() {
        let text = render(|out| run_versions(&table(), &VersionsArgs { json: true }, out));
        let rows: serde_json::Value = serde_json::from_str(&text).expect("json output");
        let versions: Vec<&str> = rows
            .as_array()
            .expect("array")
            .iter()
            .filter_map(|row| row["version"].as_str())
            .collect();
        assert_eq!(versions, ["2.0.0", "1.0.0", "2.1.0"]);
        assert_eq!(rows[0]["default"], serde_json::json!(true));
        assert_eq!(rows[1]["type"], serde_json::json!("legacy"));
    }

    #[test]
    fn resolve_reports_fallback() {
        let text = render(|out| {
            run_resolve(
                &table(),
                &ResolveArgs {
                    version: "<script>".to_string(),
                },
                out,
            )
        });
        assert!(text.contains("version:   2.0.0 (not in table, using default)"), "{text}");
        assert!(text.contains("rrweb-player.umd.cjs"), "{text}");
    }

    #[test]
    fn resolve_reports_unknown_script_type() {
        let text = render(|out| {
            run_resolve(
                &table(),
                &ResolveArgs {
                    version: "2.1.0".to_string(),
                },
                out,
            )
        });
        assert!(text.contains("script:    unavailable (unknown script type `esm`"), "{text}");
        assert!(text.ends_with("@2.1.0/dist/style.css\n"), "{text}");
    }
}
