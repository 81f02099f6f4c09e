#![forbid(unsafe_code)]

//! Host-agnostic core of the rrweb replay debugger.
//!
//! The debugger is two pages. The intake page collects a recording (remote
//! URL, uploaded file or pasted JSON) and navigates to the playback page,
//! which loads the chosen rrweb player build and replays the events.
//!
//! This crate holds everything that does not need a browser:
//!
//! - [`versions`]: the table of supported player builds and asset URLs.
//! - [`query`]: the playback query-string contract.
//! - [`cache`]: the two-tier handoff cache between the pages.
//! - [`source`]: remote payload loading (gists, jsonblob, plain JSON).
//! - [`intake`] and [`playback`]: the page controllers.
//!
//! Browser bindings live in `rrdebug-web`; `rrdebug-cli` drives the same
//! code from a terminal.

pub mod cache;
pub mod config;
pub mod intake;
pub mod playback;
pub mod player;
pub mod query;
pub mod source;
pub mod versions;

pub use cache::{CacheError, PayloadCache, StringTier, StructuredTier, TierError};
pub use config::HandoffConfig;
pub use intake::{InputMethod, IntakeController, IntakeError, IntakeForm};
pub use playback::{PlaybackController, PlaybackError, PlaybackSession, version_switch_target};
pub use player::{LoadError, ModuleLoader, PlaybackSurface, PlayerAdapter, PlayerConfig};
pub use query::{PayloadSource, PlaybackQuery, ReplayFlags, ReplaySelection};
pub use source::{FetchError, JsonFetcher, RemoteSource, SourceError, load_remote};
pub use versions::{ScriptType, VersionEntry, VersionError, VersionTable};
