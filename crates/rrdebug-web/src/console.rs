#![forbid(unsafe_code)]

//! `tracing` output for a host console.
//!
//! The fmt layer asks for a fresh writer per event. [`ConsoleLine`] buffers
//! the formatted event and hands it to the sink as one string when the
//! event is complete, so multi-part writes never show up as separate
//! console entries. The sink receives the event level, which lets the
//! browser binding pick `console.error` / `warn` / `info` / `debug`.

use std::io;

use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;

/// Receives one formatted event, trailing newline removed.
pub type ConsoleSink = fn(Level, &str);

/// [`MakeWriter`] that routes each event to a [`ConsoleSink`].
#[derive(Debug, Clone, Copy)]
pub struct ConsoleMakeWriter {
    sink: ConsoleSink,
}

impl ConsoleMakeWriter {
    #[must_use]
    pub const fn new(sink: ConsoleSink) -> Self {
        Self { sink }
    }
}

impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
    type Writer = ConsoleLine;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleLine::new(Level::INFO, self.sink)
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleLine::new(*meta.level(), self.sink)
    }
}

/// Buffer for a single event. Emits on drop.
pub struct ConsoleLine {
    level: Level,
    buf: Vec<u8>,
    sink: ConsoleSink,
}

impl ConsoleLine {
    fn new(level: Level, sink: ConsoleSink) -> Self {
        Self {
            level,
            buf: Vec::new(),
            sink,
        }
    }
}

impl io::Write for ConsoleLine {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleLine {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(&self.buf);
        (self.sink)(self.level, text.trim_end_matches(['\r', '\n']));
    }
}

/// Install a global fmt subscriber writing to `sink`.
///
/// Returns `false` when a global subscriber was already set, which happens
/// when both pages' entry points run in one document.
pub fn init(sink: ConsoleSink, max_level: Level) -> bool {
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .with_max_level(max_level)
        .with_writer(ConsoleMakeWriter::new(sink))
        .finish();
    tracing::subscriber::set_global_default(subscriber).is_ok()
}
