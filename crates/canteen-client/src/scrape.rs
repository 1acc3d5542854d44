//! Minimal markup helpers for the handful of elements the portal emits.
//!
//! Not an HTML parser. Each helper locates one fixed element shape with a
//! regular expression and reads attributes or text from it.

use std::sync::OnceLock;

use regex::Regex;

fn input_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<input\b[^>]*>").expect("static regex"))
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("static regex"))
}

fn cell_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<td\b[^>]*>(.*?)</td>").expect("static regex"))
}

fn option_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<option\b([^>]*)>(.*?)</option>").expect("static regex"))
}

fn attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\s([A-Za-z_:][-\w:.]*)\s*=\s*"([^"]*)""#).expect("static regex"))
}

fn open_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<([A-Za-z][A-Za-z0-9]*)\b([^>]*)>").expect("static regex"))
}

fn close_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"</([A-Za-z][A-Za-z0-9]*)\s*>").expect("static regex"))
}

fn checked_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)\schecked(\s|=|/|>|$)"#).expect("static regex"))
}

/// Every `<input ...>` tag in the page, in document order.
pub(crate) fn input_tags(page: &str) -> impl Iterator<Item = &str> {
    input_tag_re().find_iter(page).map(|m| m.as_str())
}

/// The value of attribute `name` within a single tag.
pub(crate) fn attr<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    attr_re()
        .captures_iter(tag)
        .find(|c| c[1].eq_ignore_ascii_case(name))
        .and_then(|c| c.get(2))
        .map(|m| m.as_str())
}

/// Whether a tag carries a `checked` attribute (bare or valued).
pub(crate) fn is_checked(tag: &str) -> bool {
    checked_re().is_match(tag)
}

/// The `value` of the input whose `id` is `id`.
pub(crate) fn input_value<'a>(page: &'a str, id: &str) -> Option<&'a str> {
    input_tags(page)
        .find(|tag| attr(tag, "id") == Some(id))
        .and_then(|tag| attr(tag, "value"))
}

/// Inner markup of the element `<{element} ... {key}="{value}" ...>` up to its closing tag.
pub(crate) fn element_inner<'a>(page: &'a str, element: &str, key: &str, value: &str) -> Option<&'a str> {
    let open = open_tag_re().captures_iter(page).find(|c| {
        c[1].eq_ignore_ascii_case(element) && c.get(2).and_then(|a| attr(a.as_str(), key)) == Some(value)
    })?;
    let start = open.get(0)?.end();
    let close = close_tag_re()
        .captures_iter(&page[start..])
        .find(|c| c[1].eq_ignore_ascii_case(element))?;
    Some(&page[start..start + close.get(0)?.start()])
}

/// One `<option>` of a `<select>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectOption {
    pub value: String,
    pub selected: bool,
}

/// Options of the `<select name="{name}">` element, in document order.
pub(crate) fn select_options(page: &str, name: &str) -> Option<Vec<SelectOption>> {
    let inner = element_inner(page, "select", "name", name)?;
    Some(
        option_re()
            .captures_iter(inner)
            .map(|c| {
                let attrs = c.get(1).map_or("", |m| m.as_str());
                let value = match attr(attrs, "value") {
                    Some(v) => v.to_string(),
                    None => text_content(c.get(2).map_or("", |m| m.as_str())),
                };
                SelectOption {
                    value,
                    selected: attrs.to_ascii_lowercase().contains("selected"),
                }
            })
            .collect(),
    )
}

/// Value of the selected option of `<select name="{name}">`.
pub(crate) fn selected_value(page: &str, name: &str) -> Option<String> {
    select_options(page, name)?
        .into_iter()
        .find(|o| o.selected)
        .map(|o| o.value)
}

/// Text of every `<td>` in `fragment`, flattened in row order.
///
/// A cell's text is its text nodes joined and trimmed. An empty cell that
/// holds an `<input>` yields the input's `value` instead.
pub(crate) fn cell_texts(fragment: &str) -> Vec<String> {
    cell_re()
        .captures_iter(fragment)
        .map(|c| {
            let inner = c.get(1).map_or("", |m| m.as_str());
            let text = text_content(inner);
            if text.is_empty() {
                if let Some(value) = input_tags(inner).next().and_then(|tag| attr(tag, "value")) {
                    return decode_entities(value);
                }
            }
            text
        })
        .collect()
}

/// Strip tags, decode the common entities, and trim.
pub(crate) fn text_content(fragment: &str) -> String {
    decode_entities(&tag_re().replace_all(fragment, "")).trim().to_string()
}

pub(crate) fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
