#![forbid(unsafe_code)]

//! `wasm-bindgen` exports for the two pages.
//!
//! Only compiled on `wasm32` targets. Event handlers are kept alive in
//! thread-local slots for the lifetime of the page; the started playback
//! session lives in [`SESSION`] so the debug accessors can read it.

mod dom;
mod fetch;
mod loader;
mod settle;
mod storage;

use std::cell::RefCell;

use rrdebug_core::cache::PayloadCache;
use rrdebug_core::config::HandoffConfig;
use rrdebug_core::intake::IntakeController;
use rrdebug_core::playback::{PlaybackController, PlaybackSession, version_switch_target};
use rrdebug_core::query::PlaybackQuery;
use rrdebug_core::versions::VersionTable;
use serde::Serialize;
use tracing::{Level, error, info, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlFormElement, HtmlSelectElement};

pub use fetch::BrowserFetcher;
pub use loader::{DomModuleLoader, DomPlaybackSurface, PlayerHandle};
pub use storage::{IndexedDbTier, SessionStorageTier};

use crate::{console, page};

type BrowserCache = PayloadCache<IndexedDbTier, SessionStorageTier>;
type Handler = Closure<dyn FnMut(web_sys::Event)>;

thread_local! {
    static SESSION: RefCell<Option<PlaybackSession<PlayerHandle>>> = const { RefCell::new(None) };
    static SUBMIT_HANDLER: RefCell<Option<Handler>> = const { RefCell::new(None) };
    static METHOD_HANDLER: RefCell<Option<Handler>> = const { RefCell::new(None) };
    static PAGESHOW_HANDLER: RefCell<Option<Handler>> = const { RefCell::new(None) };
    static VERSION_HANDLER: RefCell<Option<Handler>> = const { RefCell::new(None) };
}

fn console_sink(level: Level, line: &str) {
    let line = JsValue::from_str(line);
    match level {
        Level::ERROR => web_sys::console::error_1(&line),
        Level::WARN => web_sys::console::warn_1(&line),
        Level::INFO => web_sys::console::info_1(&line),
        _ => web_sys::console::debug_1(&line),
    }
}

fn install_panic_hook() {
    use std::sync::Once;

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            let msg = match info.location() {
                Some(loc) => format!(
                    "panic at {}:{}:{}: {info}",
                    loc.file(),
                    loc.line(),
                    loc.column()
                ),
                None => format!("panic: {info}"),
            };
            web_sys::console::error_1(&JsValue::from_str(&msg));
        }));
    });
}

fn init_page() {
    install_panic_hook();
    console::init(console_sink, Level::DEBUG);
}

fn browser_cache(config: &HandoffConfig) -> BrowserCache {
    PayloadCache::with_config(IndexedDbTier::new(config), SessionStorageTier::new(), config)
}

fn version_table() -> Result<VersionTable, JsValue> {
    VersionTable::builtin().map_err(|err| JsValue::from_str(&err.to_string()))
}

fn to_js<T: Serialize>(value: &T) -> JsValue {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .unwrap_or(JsValue::UNDEFINED)
}

/// Store a handler in `slot` and register it, once per page.
fn install_handler(
    slot: &'static std::thread::LocalKey<RefCell<Option<Handler>>>,
    targets: &[web_sys::EventTarget],
    event: &str,
    handler: impl FnMut(web_sys::Event) + 'static,
) {
    slot.with(|slot| {
        if slot.borrow().is_some() {
            return;
        }
        let callback = Handler::new(handler);
        for target in targets {
            if let Err(err) =
                target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
            {
                warn!(%event, error = %dom::js_message(&err), "could not register handler");
            }
        }
        *slot.borrow_mut() = Some(callback);
    });
}

// ── Intake page ──────────────────────────────────────────────────────

/// Wire the intake page: version selector, input sections and the form.
#[wasm_bindgen(js_name = startIntake)]
pub fn start_intake() -> Result<(), JsValue> {
    init_page();
    let document = dom::document().map_err(|err| JsValue::from_str(&err))?;
    let table = version_table()?;

    let select: HtmlSelectElement = dom::element_by_id(&document, page::VERSIONS_SELECT)
        .map_err(|err| JsValue::from_str(&err))?;
    dom::populate_versions(&document, &select, &table.option_groups(None))
        .map_err(|err| JsValue::from_str(&err))?;

    let radios = document.query_selector_all(&format!(
        "input[name=\"{}\"]",
        page::FIELD_INPUT_METHOD
    ))?;
    let radios: Vec<web_sys::EventTarget> = (0..radios.length())
        .filter_map(|idx| radios.item(idx))
        .map(|node| node.unchecked_into())
        .collect();
    let method_document = document.clone();
    install_handler(&METHOD_HANDLER, &radios, "change", move |_event| {
        dom::show_input_section(&method_document);
    });

    // Back navigation restores form state after load; re-sync the sections.
    let window = dom::window().map_err(|err| JsValue::from_str(&err))?;
    let pageshow_document = document.clone();
    install_handler(&PAGESHOW_HANDLER, &[window.into()], "pageshow", move |_event| {
        dom::show_input_section(&pageshow_document);
    });

    let form: HtmlFormElement =
        dom::element_by_id(&document, page::INTAKE_FORM).map_err(|err| JsValue::from_str(&err))?;
    let submitted_form = form.clone();
    install_handler(&SUBMIT_HANDLER, &[form.into()], "submit", move |event| {
        event.prevent_default();
        let form = submitted_form.clone();
        spawn_local(async move { submit_intake(&form).await });
    });

    dom::show_input_section(&document);
    info!("Welcome to rrwebdebug.com!");
    Ok(())
}

async fn submit_intake(form: &HtmlFormElement) {
    let intake = match dom::read_intake_form(form).await {
        Ok(intake) => intake,
        Err(err) => {
            error!(error = %err, "could not read the intake form");
            dom::alert(&err);
            return;
        }
    };

    let config = HandoffConfig::default();
    let cache = browser_cache(&config);
    match IntakeController::new(&cache, &config).submit(&intake).await {
        Ok(target) => {
            info!(method = intake.method.as_str(), %target, "opening playback");
            if let Err(err) = dom::navigate(&target) {
                error!(error = %err, "navigation failed");
            }
        }
        Err(err) => {
            warn!(method = intake.method.as_str(), error = %err, "submission rejected");
            dom::alert(&err.to_string());
        }
    }
}

// ── Playback page ────────────────────────────────────────────────────

/// Run the playback flow for the current page URL.
#[wasm_bindgen(js_name = startPlayback)]
pub fn start_playback() -> Result<(), JsValue> {
    init_page();
    let document = dom::document().map_err(|err| JsValue::from_str(&err))?;
    let table = version_table()?;
    let href = dom::current_href().map_err(|err| JsValue::from_str(&err))?;
    let query = PlaybackQuery::from_page_url(&href)
        .map_err(|err| JsValue::from_str(&err.to_string()))?;

    let select: HtmlSelectElement = dom::element_by_id(&document, page::VERSIONS_SELECT)
        .map_err(|err| JsValue::from_str(&err))?;
    dom::populate_versions(
        &document,
        &select,
        &table.option_groups(query.version.as_deref()),
    )
    .map_err(|err| JsValue::from_str(&err))?;
    let changed_select = select.clone();
    install_handler(&VERSION_HANDLER, &[select.into()], "change", move |_event| {
        let version = changed_select.value();
        spawn_local(async move { switch_version(&version).await });
    });

    spawn_local(async move { run_playback(document, table, query).await });
    Ok(())
}

async fn run_playback(document: web_sys::Document, table: VersionTable, query: PlaybackQuery) {
    let config = HandoffConfig::default();
    let cache = browser_cache(&config);
    let fetcher = BrowserFetcher;
    let loader = DomModuleLoader::new(document.clone());
    let surface = DomPlaybackSurface::new(document);
    let controller = PlaybackController::new(&table, &cache, &fetcher, &loader, &surface);

    match controller.start(&query).await {
        Ok(session) => {
            SESSION.with(|slot| *slot.borrow_mut() = Some(session));
        }
        Err(err) => {
            error!(error = %err, "playback aborted");
            dom::alert(&err.user_message());
        }
    }
}

async fn switch_version(version: &str) {
    let href = match dom::current_href() {
        Ok(href) => href,
        Err(err) => {
            error!(error = %err, "cannot read the page address");
            return;
        }
    };
    let cache = browser_cache(&HandoffConfig::default());
    match version_switch_target(&cache, &href, version).await {
        Ok(target) => {
            info!(%version, "switching player version");
            if let Err(err) = dom::navigate(&target) {
                error!(error = %err, "navigation failed");
            }
        }
        Err(err) => {
            warn!(%version, error = %err, "version switch refused");
            dom::alert(&err.user_message());
        }
    }
}

// ── Debug inspection ─────────────────────────────────────────────────

/// Events of the started playback, or `undefined` before it started.
#[wasm_bindgen(js_name = debugEvents)]
pub fn debug_events() -> JsValue {
    SESSION.with(|slot| {
        slot.borrow()
            .as_ref()
            .map_or(JsValue::UNDEFINED, |session| to_js(&session.events))
    })
}

/// Resolved version, script type, flags and source of the started playback.
#[wasm_bindgen(js_name = debugSelection)]
pub fn debug_selection() -> JsValue {
    SESSION.with(|slot| {
        slot.borrow()
            .as_ref()
            .map_or(JsValue::UNDEFINED, |session| to_js(&session.selection))
    })
}

/// The live player instance, or `undefined`.
#[wasm_bindgen(js_name = debugPlayer)]
pub fn debug_player() -> JsValue {
    SESSION.with(|slot| {
        slot.borrow()
            .as_ref()
            .and_then(|session| session.player.as_ref())
            .map_or(JsValue::UNDEFINED, |player| player.instance().clone())
    })
}
