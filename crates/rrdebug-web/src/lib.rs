#![forbid(unsafe_code)]

//! Browser front end of the rrweb replay debugger.
//!
//! The two HTML pages load this module and call one entry point each:
//!
//! - `startIntake()` on the intake page wires the form and the version
//!   selector.
//! - `startPlayback()` on the playback page runs the replay flow from the
//!   current query string.
//!
//! After playback has started, `debugEvents()` and `debugSelection()` return
//! the loaded payload and the resolved selection for console inspection.
//!
//! Everything that does not touch the DOM lives in `rrdebug-core` or in the
//! host-agnostic modules here, and is tested natively.

pub mod console;
pub mod page;

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::{
    BrowserFetcher, DomModuleLoader, DomPlaybackSurface, IndexedDbTier, PlayerHandle,
    SessionStorageTier,
};
