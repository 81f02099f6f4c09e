use std::io::Write;
use std::time::Duration;

use clap::{Parser, Subcommand};
use rrdebug_core::versions::VersionTable;

use crate::check::{CheckArgs, run_check};
use crate::error::Result;
use crate::fetch::{FetchArgs, HttpFetcher, run_fetch};
use crate::link::{LinkArgs, run_link};
use crate::listing::{ResolveArgs, VersionsArgs, run_resolve, run_versions};
use crate::logging;

#[derive(Debug, Parser)]
#[command(
    name = "rrdebug",
    about = "Inspect rrweb player versions, build playback links and check recordings",
    version
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the supported player versions, grouped; `*` marks the default.
    Versions(VersionsArgs),

    /// Show what a `version=` value resolves to and which assets it loads.
    Resolve(ResolveArgs),

    /// Build a playback link for a remote recording.
    Link(LinkArgs),

    /// Fetch a remote recording through the gist/jsonblob/direct loaders.
    Fetch(FetchArgs),

    /// Validate a local recording file.
    Check(CheckArgs),
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let stdout = std::io::stdout();
    run(cli, &mut stdout.lock())
}

pub fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    match cli.command {
        Commands::Versions(args) => run_versions(&VersionTable::builtin()?, &args, out),
        Commands::Resolve(args) => run_resolve(&VersionTable::builtin()?, &args, out),
        Commands::Link(args) => run_link(&VersionTable::builtin()?, &args, out),
        Commands::Fetch(args) => {
            let fetcher = HttpFetcher::new(Duration::from_secs(args.timeout_seconds))?;
            run_fetch(&fetcher, &args, out)
        }
        Commands::Check(args) => run_check(&args, out),
    }
}
