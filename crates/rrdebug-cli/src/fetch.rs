//! `fetch`: load a remote recording the way the playback page does.

use std::fs::File;
use std::future::{Future, ready};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use futures::executor::block_on;
use reqwest::blocking::Client;
use rrdebug_core::playback::event_count;
use rrdebug_core::source::{FetchError, JsonFetcher, RemoteSource};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::Result;

#[derive(Debug, Clone, Args)]
pub struct FetchArgs {
    /// Recording location: a gist, a jsonblob page or a plain JSON URL.
    pub url: String,

    /// Write the payload to this file as indented JSON.
    #[arg(long, short)]
    pub out: Option<PathBuf>,

    /// Per-request timeout in seconds.
    #[arg(long = "timeout", default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_seconds: u64,
}

/// Blocking HTTP transport for the core loaders.
///
/// The returned futures are already complete; the request runs when
/// `fetch_json` is called.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .user_agent(concat!("rrdebug/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    fn get(&self, url: &str) -> std::result::Result<Value, FetchError> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| FetchError::Network {
                url: url.to_string(),
                message: err.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.json::<Value>().map_err(|err| FetchError::Decode {
            url: url.to_string(),
            message: err.to_string(),
        })
    }
}

impl JsonFetcher for HttpFetcher {
    fn fetch_json(
        &self,
        url: &str,
    ) -> impl Future<Output = std::result::Result<Value, FetchError>> {
        ready(self.get(url))
    }
}

/// Human-readable name of a source.
#[must_use]
pub fn describe(source: &RemoteSource) -> String {
    match source {
        RemoteSource::Gist { id } => format!("GitHub gist {id}"),
        RemoteSource::JsonBlob { id } => format!("jsonblob {id}"),
        RemoteSource::Direct { url } => format!("direct {url}"),
    }
}

pub fn run_fetch<F: JsonFetcher>(fetcher: &F, args: &FetchArgs, out: &mut impl Write) -> Result<()> {
    let source = RemoteSource::detect(&args.url);
    writeln!(out, "source:  {}", describe(&source))?;
    writeln!(out, "request: {}", source.request_url())?;

    let events = block_on(source.load(fetcher))?;
    writeln!(out, "events:  {}", event_count(&events))?;

    if let Some(path) = &args.out {
        let mut file = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut file, &events)?;
        writeln!(file)?;
        file.flush()?;
        info!(path = %path.display(), "payload written");
        writeln!(out, "written: {}", path.display())?;
    }
    Ok(())
}
