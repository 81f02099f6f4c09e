#![forbid(unsafe_code)]

//! Small DOM helpers shared by both pages.

use rrdebug_core::intake::{FileUpload, InputMethod, IntakeForm};
use rrdebug_core::query::ReplayFlags;
use rrdebug_core::versions::OptionGroup;
use tracing::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Document, Element, FormData, HtmlElement, HtmlFormElement, HtmlInputElement,
    HtmlOptGroupElement, HtmlOptionElement, HtmlSelectElement, Window,
};

use crate::page;

pub(crate) fn window() -> Result<Window, String> {
    web_sys::window().ok_or_else(|| "window is unavailable".to_string())
}

pub(crate) fn document() -> Result<Document, String> {
    window()?
        .document()
        .ok_or_else(|| "document is unavailable".to_string())
}

pub(crate) fn element_by_id<T: JsCast>(document: &Document, id: &str) -> Result<T, String> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| format!("missing #{id}"))?
        .dyn_into::<T>()
        .map_err(|_| format!("#{id} has an unexpected element type"))
}

/// Best-effort text for a thrown JS value.
pub(crate) fn js_message(value: &JsValue) -> String {
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

/// Blocking alert; falls back to the log when alerts are unavailable.
pub(crate) fn alert(message: &str) {
    let shown = window().and_then(|window| {
        window
            .alert_with_message(message)
            .map_err(|err| js_message(&err))
    });
    if let Err(err) = shown {
        warn!(%message, error = %err, "could not show alert");
    }
}

pub(crate) fn navigate(target: &str) -> Result<(), String> {
    window()?
        .location()
        .set_href(target)
        .map_err(|err| js_message(&err))
}

pub(crate) fn current_href() -> Result<String, String> {
    window()?.location().href().map_err(|err| js_message(&err))
}

/// Replace the selector's options with the grouped version table.
pub(crate) fn populate_versions(
    document: &Document,
    select: &HtmlSelectElement,
    groups: &[OptionGroup],
) -> Result<(), String> {
    select.set_inner_html("");
    for group in groups {
        let optgroup: HtmlOptGroupElement = create(document, "optgroup")?;
        optgroup.set_label(&group.label);
        for version in &group.options {
            let option: HtmlOptionElement = create(document, "option")?;
            option.set_value(&version.value);
            option.set_text(&version.label);
            option.set_selected(version.selected);
            option.set_default_selected(version.selected);
            append(&optgroup, &option)?;
        }
        append(select, &optgroup)?;
    }
    Ok(())
}

/// Show the section for the checked input method and hide the others.
pub(crate) fn show_input_section(document: &Document) {
    let selected = checked_input_method(document);
    for (id, shown) in page::section_visibility(selected) {
        let Some(section) = document.get_element_by_id(&id) else {
            continue;
        };
        let classes = section.class_list();
        let toggled = if shown {
            classes.remove_1(page::HIDDEN_CLASS)
        } else {
            classes.add_1(page::HIDDEN_CLASS)
        };
        if let Err(err) = toggled {
            warn!(section = %id, error = %js_message(&err), "could not toggle input section");
        }
    }
}

fn checked_input_method(document: &Document) -> Option<InputMethod> {
    let selector = format!("input[name=\"{}\"]:checked", page::FIELD_INPUT_METHOD);
    let radio = document
        .query_selector(&selector)
        .ok()
        .flatten()?
        .dyn_into::<HtmlInputElement>()
        .ok()?;
    radio.value().parse().ok()
}

/// Read the intake form, including the selected file's text.
pub(crate) async fn read_intake_form(form: &HtmlFormElement) -> Result<IntakeForm, String> {
    let data = FormData::new_with_form(form).map_err(|err| js_message(&err))?;
    let text = |name: &str| data.get(name).as_string().unwrap_or_default();

    let method = text(page::FIELD_INPUT_METHOD)
        .parse::<InputMethod>()
        .map_err(|err| err.to_string())?;
    let file = match data.get(page::FIELD_FILE).dyn_into::<web_sys::File>() {
        Ok(file) if method == InputMethod::File && file.size() > 0.0 => {
            let contents = JsFuture::from(file.text())
                .await
                .map_err(|err| js_message(&err))?
                .as_string()
                .unwrap_or_default();
            Some(FileUpload {
                name: file.name(),
                contents,
            })
        }
        _ => None,
    };

    Ok(IntakeForm {
        method,
        version: text(page::FIELD_VERSION),
        flags: ReplayFlags {
            canvas: data.has(page::FIELD_CANVAS),
            auto_play: data.has(page::FIELD_PLAY),
            use_virtual_dom: data.has(page::FIELD_VIRTUAL_DOM),
        },
        url: text(page::FIELD_URL),
        file,
        paste: text(page::FIELD_PASTE),
    })
}

pub(crate) fn hide(document: &Document, selector: &str) {
    let Some(element) = document
        .query_selector(selector)
        .ok()
        .flatten()
        .and_then(|element| element.dyn_into::<HtmlElement>().ok())
    else {
        return;
    };
    if let Err(err) = element.style().set_property("display", "none") {
        warn!(%selector, error = %js_message(&err), "could not hide element");
    }
}

pub(crate) fn create<T: JsCast>(document: &Document, tag: &str) -> Result<T, String> {
    document
        .create_element(tag)
        .map_err(|err| js_message(&err))?
        .dyn_into::<T>()
        .map_err(|_| format!("<{tag}> has an unexpected element type"))
}

pub(crate) fn append(parent: &Element, child: &Element) -> Result<(), String> {
    parent
        .append_child(child)
        .map(|_| ())
        .map_err(|err| js_message(&err))
}
