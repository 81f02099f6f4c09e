//! `link`: build a playback link for a remote recording.

use std::io::Write;

use clap::Args;
use rrdebug_core::config::HandoffConfig;
use rrdebug_core::query::{PlaybackQuery, ReplayFlags};
use rrdebug_core::versions::VersionTable;
use url::Url;

use crate::error::{CliError, Result};

#[derive(Debug, Clone, Args)]
pub struct LinkArgs {
    /// Recording location: a gist, a jsonblob page or a plain JSON URL.
    #[arg(long)]
    pub url: String,

    /// Player version; defaults to the table default.
    #[arg(long)]
    pub version: Option<String>,

    /// Replay canvas content.
    #[arg(long)]
    pub canvas: bool,

    /// Start playing immediately.
    #[arg(long)]
    pub play: bool,

    /// Use the virtual DOM renderer.
    #[arg(long = "virtual-dom")]
    pub virtual_dom: bool,

    /// Absolute URL of the deployed playback page. Without it the link is
    /// relative to the intake page.
    #[arg(long)]
    pub base: Option<String>,
}

/// Build the link without printing it.
pub fn playback_link(table: &VersionTable, args: &LinkArgs) -> Result<String> {
    if args.url.trim().is_empty() {
        return Err(CliError::invalid("--url must not be empty"));
    }
    let version = match args.version.as_deref() {
        Some(version) if table.is_allowed(version) => version,
        Some(version) => {
            return Err(CliError::invalid(format!(
                "unknown version `{version}`; see `rrdebug versions`"
            )));
        }
        None => table.default_version(),
    };

    let query = PlaybackQuery {
        version: Some(version.to_string()),
        local: false,
        url: Some(args.url.clone()),
        flags: ReplayFlags {
            canvas: args.canvas,
            auto_play: args.play,
            use_virtual_dom: args.virtual_dom,
        },
    }
    .to_query_string();

    match &args.base {
        Some(base) => {
            let mut page = Url::parse(base)?;
            page.set_query(Some(&query));
            Ok(page.into())
        }
        None => Ok(HandoffConfig::default().play_target(&query)),
    }
}

pub fn run_link(table: &VersionTable, args: &LinkArgs, out: &mut impl Write) -> Result<()> {
    let link = playback_link(table, args)?;
    writeln!(out, "{link}")?;
    Ok(())
}
