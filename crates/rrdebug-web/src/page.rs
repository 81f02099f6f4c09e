#![forbid(unsafe_code)]

//! Element ids and form field names shared with the HTML pages.

use rrdebug_core::intake::InputMethod;

/// `<select>` holding the version table on both pages.
pub const VERSIONS_SELECT: &str = "versions";

pub const INTAKE_FORM: &str = "eventsForm";
pub const FIELD_INPUT_METHOD: &str = "inputMethod";
pub const FIELD_VERSION: &str = "version";
pub const FIELD_URL: &str = "url";
pub const FIELD_FILE: &str = "file";
pub const FIELD_PASTE: &str = "jsonContent";
pub const FIELD_CANVAS: &str = "canvas";
pub const FIELD_PLAY: &str = "play";
pub const FIELD_VIRTUAL_DOM: &str = "virtual-dom";

/// Class carried by every per-method input section.
pub const INPUT_SECTION_CLASS: &str = "input-section";
/// Bootstrap utility class that hides an element.
pub const HIDDEN_CLASS: &str = "d-none";

pub const PLAYER_TARGET: &str = "player";
pub const SOURCE_LABEL: &str = "json-source";
pub const JSON_VIEWER: &str = "jsoneditor";
pub const LOADING_SELECTOR: &str = ".loading";

/// Id of the section shown for `method`.
#[must_use]
pub fn input_section_id(method: InputMethod) -> String {
    format!("{}Input", method.as_str())
}

/// Every input section with its visibility for `selected`.
///
/// An unknown radio value hides all sections.
#[must_use]
pub fn section_visibility(selected: Option<InputMethod>) -> Vec<(String, bool)> {
    [
        InputMethod::Url,
        InputMethod::File,
        InputMethod::Paste,
        InputMethod::Cached,
    ]
    .into_iter()
    .map(|method| (input_section_id(method), Some(method) == selected))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn exactly_one_section_is_visible() {
        let visible: Vec<_> = section_visibility(Some(InputMethod::Paste))
            .into_iter()
            .filter(|(_, shown)| *shown)
            .map(|(id, _)| id)
            .collect();
        assert_eq!(visible, vec!["pasteInput".to_string()]);
    }

    #[test]
    fn no_selection_hides_everything() {
        assert!(section_visibility(None).iter().all(|(_, shown)| !shown));
    }
}
