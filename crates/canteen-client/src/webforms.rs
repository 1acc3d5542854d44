//! ASP.NET Web Forms state fields and postback bodies.
//!
//! Every page served with a form embeds `__VIEWSTATE`,
//! `__VIEWSTATEGENERATOR` and `__EVENTVALIDATION`. The next postback must
//! carry the values from the most recent response; the server rejects
//! anything stale. [`WebFormsFields`] is replaced after every response and
//! [`Postback`] builds a fresh form body from it, so no form skeleton is
//! shared between calls.

use crate::error::CanteenError;
use crate::scrape;

pub const VIEWSTATE: &str = "__VIEWSTATE";
pub const VIEWSTATE_GENERATOR: &str = "__VIEWSTATEGENERATOR";
pub const EVENT_VALIDATION: &str = "__EVENTVALIDATION";
pub const EVENT_TARGET: &str = "__EVENTTARGET";
pub const EVENT_ARGUMENT: &str = "__EVENTARGUMENT";
pub const LAST_FOCUS: &str = "__LASTFOCUS";

/// The three validation tokens of one served page.
#[derive(Clone, PartialEq, Eq)]
pub struct WebFormsFields {
    pub view_state: String,
    pub view_state_generator: String,
    pub event_validation: String,
}

// View-state blobs are large and opaque; keep them out of logs.
impl std::fmt::Debug for WebFormsFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebFormsFields")
            .field("view_state", &format_args!("<{} bytes>", self.view_state.len()))
            .field("view_state_generator", &self.view_state_generator)
            .field(
                "event_validation",
                &format_args!("<{} bytes>", self.event_validation.len()),
            )
            .finish()
    }
}

impl WebFormsFields {
    /// Extract the tokens from a page.
    ///
    /// Fails with [`CanteenError::Parse`] when any of the three is missing,
    /// which means the page shape changed or the session silently fell
    /// back to a page without a form.
    pub fn extract(endpoint: &str, page: &str) -> Result<Self, CanteenError> {
        let field = |id: &str| {
            scrape::input_value(page, id)
                .map(str::to_string)
                .ok_or_else(|| CanteenError::parse(endpoint, id))
        };
        Ok(Self {
            view_state: field(VIEWSTATE)?,
            view_state_generator: field(VIEWSTATE_GENERATOR)?,
            event_validation: field(EVENT_VALIDATION)?,
        })
    }
}

/// Form body of one postback.
///
/// Always carries `__EVENTTARGET`, empty `__EVENTARGUMENT` and
/// `__LASTFOCUS`, and the given tokens; callers add control values with
/// [`Postback::field`].
#[derive(Debug, Clone)]
pub struct Postback<'a> {
    fields: &'a WebFormsFields,
    event_target: String,
    extra: Vec<(String, String)>,
}

impl<'a> Postback<'a> {
    pub fn new(fields: &'a WebFormsFields, event_target: impl Into<String>) -> Self {
        Self {
            fields,
            event_target: event_target.into(),
            extra: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((name.into(), value.into()));
        self
    }

    pub fn into_form(self) -> Vec<(String, String)> {
        let mut form = vec![
            (EVENT_TARGET.to_string(), self.event_target),
            (EVENT_ARGUMENT.to_string(), String::new()),
            (LAST_FOCUS.to_string(), String::new()),
            (VIEWSTATE.to_string(), self.fields.view_state.clone()),
            (
                VIEWSTATE_GENERATOR.to_string(),
                self.fields.view_state_generator.clone(),
            ),
            (
                EVENT_VALIDATION.to_string(),
                self.fields.event_validation.clone(),
            ),
        ];
        form.extend(self.extra);
        form
    }
}
