#![forbid(unsafe_code)]

use rrdebug_core::source::{FetchError, JsonFetcher};
use serde_json::Value;
use tracing::debug;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::Response;

use super::dom::{js_message, window};

/// `GET` through `window.fetch`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserFetcher;

impl JsonFetcher for BrowserFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        let network = |message: String| FetchError::Network {
            url: url.to_string(),
            message,
        };
        let decode = |message: String| FetchError::Decode {
            url: url.to_string(),
            message,
        };

        let window = window().map_err(network)?;
        let response: Response = JsFuture::from(window.fetch_with_str(url))
            .await
            .map_err(|err| network(js_message(&err)))?
            .dyn_into()
            .map_err(|_| network("fetch did not return a Response".to_string()))?;
        debug!(%url, status = response.status(), "fetched");
        if !response.ok() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }

        let body = JsFuture::from(response.json().map_err(|err| decode(js_message(&err)))?)
            .await
            .map_err(|err| decode(js_message(&err)))?;
        serde_wasm_bindgen::from_value(body).map_err(|err| decode(err.to_string()))
    }
}
