#![forbid(unsafe_code)]

//! Script loading and the player/viewer widgets.
//!
//! The player build publishes `window.rrwebPlayer`; modern builds expose
//! the constructor as `rrwebPlayer.Player`, legacy builds are the
//! constructor themselves. The JSON viewer is `createJSONEditor` from
//! vanilla-jsoneditor, which the page publishes on `window`. Without it the
//! payload is shown as indented text.

use js_sys::{Array, Function, Object, Reflect};
use rrdebug_core::player::{LoadError, ModuleLoader, PlaybackSurface, PlayerAdapter, PlayerConfig};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, HtmlElement, HtmlHeadElement, HtmlLinkElement, HtmlScriptElement};

use super::dom::{self, js_message};
use super::settle::Settle;
use crate::page;

const PLAYER_GLOBAL: &str = "rrwebPlayer";
const VIEWER_FACTORY: &str = "createJSONEditor";

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, String> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|err| err.to_string())
}

fn set(target: &Object, key: &str, value: &JsValue) -> Result<(), String> {
    Reflect::set(target, &JsValue::from_str(key), value)
        .map(|_| ())
        .map_err(|err| js_message(&err))
}

/// Appends `<link>` and `<script>` elements to the document head.
#[derive(Debug, Clone)]
pub struct DomModuleLoader {
    document: Document,
}

impl DomModuleLoader {
    #[must_use]
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    fn head(&self) -> Result<HtmlHeadElement, String> {
        self.document
            .head()
            .ok_or_else(|| "document has no <head>".to_string())
    }
}

impl ModuleLoader for DomModuleLoader {
    fn attach_style(&self, href: &str) -> Result<(), LoadError> {
        let failed = |message: String| LoadError::Style {
            href: href.to_string(),
            message,
        };
        let link: HtmlLinkElement = dom::create(&self.document, "link").map_err(failed)?;
        link.set_rel("stylesheet");
        link.set_href(href);
        dom::append(&self.head().map_err(failed)?, &link).map_err(failed)?;
        debug!(%href, "stylesheet attached");
        Ok(())
    }

    async fn load_script(&self, src: &str) -> Result<(), LoadError> {
        let failed = |message: String| LoadError::Script {
            src: src.to_string(),
            message,
        };
        let script: HtmlScriptElement = dom::create(&self.document, "script").map_err(failed)?;
        script.set_type("application/javascript");
        script.set_src(src);

        let mut done = Settle::new();
        script
            .add_event_listener_with_callback("load", done.ok())
            .map_err(|err| failed(js_message(&err)))?;
        script
            .add_event_listener_with_callback("error", done.err())
            .map_err(|err| failed(js_message(&err)))?;
        dom::append(&self.head().map_err(failed)?, &script).map_err(failed)?;

        let loaded = done.wait().await;
        let _ = script.remove_event_listener_with_callback("load", done.ok());
        let _ = script.remove_event_listener_with_callback("error", done.err());
        if !loaded {
            return Err(failed("script failed to load".to_string()));
        }
        info!(%src, "player script loaded");
        Ok(())
    }
}

/// A constructed player widget. Keeps the `finish` listener alive.
pub struct PlayerHandle {
    instance: JsValue,
    _on_finish: Option<Closure<dyn FnMut(JsValue)>>,
}

impl PlayerHandle {
    #[must_use]
    pub fn instance(&self) -> &JsValue {
        &self.instance
    }
}

/// Playback page elements.
#[derive(Debug, Clone)]
pub struct DomPlaybackSurface {
    document: Document,
}

impl DomPlaybackSurface {
    #[must_use]
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    fn constructor(adapter: PlayerAdapter) -> Result<Function, LoadError> {
        let global = js_sys::global();
        let module = Reflect::get(&global, &JsValue::from_str(PLAYER_GLOBAL))
            .map_err(|err| LoadError::Player(js_message(&err)))?;
        if module.is_undefined() {
            return Err(LoadError::Player(format!("window.{PLAYER_GLOBAL} is not defined")));
        }
        let ctor = match adapter {
            PlayerAdapter::Modern => Reflect::get(&module, &JsValue::from_str("Player"))
                .map_err(|err| LoadError::Player(js_message(&err)))?,
            PlayerAdapter::Legacy => module,
        };
        ctor.dyn_into::<Function>()
            .map_err(|_| LoadError::Player(format!("{adapter:?} player constructor not found")))
    }

    fn on_finish(instance: &JsValue) -> Option<Closure<dyn FnMut(JsValue)>> {
        let add = Reflect::get(instance, &JsValue::from_str("addEventListener"))
            .ok()?
            .dyn_into::<Function>()
            .ok()?;
        let callback = Closure::<dyn FnMut(JsValue)>::new(|_event: JsValue| {
            info!("replay finished");
        });
        add.call2(instance, &JsValue::from_str("finish"), callback.as_ref())
            .ok()?;
        Some(callback)
    }
}

impl PlaybackSurface for DomPlaybackSurface {
    type Player = PlayerHandle;

    fn set_source_label(&self, label: &str) {
        if let Some(element) = self.document.get_element_by_id(page::SOURCE_LABEL) {
            element.set_text_content(Some(label));
        }
    }

    fn construct_player(
        &self,
        adapter: PlayerAdapter,
        config: &PlayerConfig<'_>,
    ) -> Result<PlayerHandle, LoadError> {
        let ctor = Self::constructor(adapter)?;
        let target: HtmlElement =
            dom::element_by_id(&self.document, page::PLAYER_TARGET).map_err(LoadError::Player)?;

        let options = Object::new();
        set(&options, "target", &target).map_err(LoadError::Player)?;
        set(&options, "data", &to_js(config).map_err(LoadError::Player)?)
            .map_err(LoadError::Player)?;
        let instance = Reflect::construct(&ctor, &Array::of1(&options))
            .map_err(|err| LoadError::Player(js_message(&err)))?;
        let on_finish = Self::on_finish(&instance);
        info!(?adapter, "player constructed");
        Ok(PlayerHandle {
            instance,
            _on_finish: on_finish,
        })
    }

    fn show_json(&self, payload: &Value) -> Result<(), LoadError> {
        let target: HtmlElement =
            dom::element_by_id(&self.document, page::JSON_VIEWER).map_err(LoadError::Viewer)?;
        let factory = Reflect::get(&js_sys::global(), &JsValue::from_str(VIEWER_FACTORY))
            .ok()
            .and_then(|factory| factory.dyn_into::<Function>().ok());
        let Some(factory) = factory else {
            debug!("{VIEWER_FACTORY} not available, rendering plain text");
            let text = serde_json::to_string_pretty(payload)
                .map_err(|err| LoadError::Viewer(err.to_string()))?;
            let pre: HtmlElement = dom::create(&self.document, "pre").map_err(LoadError::Viewer)?;
            pre.set_text_content(Some(&text));
            target.set_inner_html("");
            return dom::append(&target, &pre).map_err(LoadError::Viewer);
        };

        let content = Object::new();
        let props = Object::new();
        let options = Object::new();
        let viewer = |result: Result<(), String>| result.map_err(LoadError::Viewer);
        viewer(set(&content, "json", &to_js(payload).map_err(LoadError::Viewer)?))?;
        viewer(set(&props, "content", &content))?;
        viewer(set(&props, "mode", &JsValue::from_str("view")))?;
        viewer(set(&props, "mainMenuBar", &JsValue::FALSE))?;
        viewer(set(&props, "navigationBar", &JsValue::FALSE))?;
        viewer(set(&options, "target", &target))?;
        viewer(set(&options, "props", &props))?;
        factory
            .call1(&JsValue::NULL, &options)
            .map(|_| ())
            .map_err(|err| LoadError::Viewer(js_message(&err)))
    }

    fn hide_loading(&self) {
        dom::hide(&self.document, page::LOADING_SELECTOR);
    }
}
