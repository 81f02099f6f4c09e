//! Offline end-to-end runs of the `rrdebug` subcommands.

use std::io::Write;

use clap::Parser;
use pretty_assertions::assert_eq;
use rrdebug_cli::{Cli, CliError, run};
use rrdebug_core::query::PlaybackQuery;

fn run_args(args: &[&str]) -> Result<String, CliError> {
    let cli = Cli::try_parse_from(std::iter::once("rrdebug").chain(args.iter().copied()))
        .expect("valid arguments");
    let mut out = Vec::new();
    run(cli, &mut out)?;
    Ok(String::from_utf8(out).expect("utf-8 output"))
}

#[test]
fn link_round_trips_through_the_playback_parser() {
    let link = run_args(&[
        "link",
        "--url",
        "https://gist.github.com/someone/f00d",
        "--version",
        "v2.0.0-alpha.4",
        "--canvas",
        "--base",
        "https://debug.test/play/index.html",
    ])
    .expect("link");

    let query = PlaybackQuery::from_page_url(link.trim_end()).expect("absolute link");
    assert_eq!(query.version.as_deref(), Some("v2.0.0-alpha.4"));
    assert_eq!(
        query.url.as_deref(),
        Some("https://gist.github.com/someone/f00d")
    );
    assert!(query.flags.canvas);
    assert!(!query.flags.auto_play);
    assert!(!query.local);
}

#[test]
fn resolve_names_legacy_assets() {
    let text = run_args(&["resolve", "0.7.14"]).expect("resolve");
    assert_eq!(
        text,
        "requested: 0.7.14\n\
         version:   0.7.14\n\
         rrweb:     0.9.14\n\
         type:      legacy\n\
         script:    https://cdn.jsdelivr.net/npm/rrweb-player@0.7.14/dist/index.js\n\
         style:     https://cdn.jsdelivr.net/npm/rrweb-player@0.7.14/dist/style.css\n"
    );
}

#[test]
fn json_listing_contains_every_builtin_version() {
    let text = run_args(&["versions", "--json"]).expect("versions");
    let rows: serde_json::Value = serde_json::from_str(&text).expect("json");
    let rows = rows.as_array().expect("array");
    assert_eq!(rows.len(), 12);
    assert_eq!(
        rows.iter().filter(|row| row["default"] == true).count(),
        1
    );
}

#[test]
fn check_rejects_unparseable_upload() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(b"{bad").expect("write");
    let path = file.path().to_str().expect("utf-8 path").to_string();

    let err = run_args(&["check", &path]).expect_err("broken recording");
    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("invalid JSON"), "{err}");
}
