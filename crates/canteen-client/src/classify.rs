//! Response classification.
//!
//! The portal reports outcomes only through markup: there are no status
//! codes or structured error bodies. Every substring heuristic the client
//! relies on lives here so a markup change touches one place.

/// Inline script emitted by CAS on the "redirect to application" page.
pub const CAS_SUCCESS_MARKER: &str = r#"<SCRIPT LANGUAGE="JavaScript">"#;

/// Alert text of an accepted order submission.
pub const ORDER_SUCCESS_MARKER: &str = "订餐成功！";

/// Script call present when the menu accepts submissions.
pub const MENU_EDITABLE_MARKER: &str = "ShowOrderButton();";

/// Script call present when the menu is informational only.
pub const MENU_READONLY_MARKER: &str = "ShowOrderInfo();";

/// Whether a menu page accepts edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuMode {
    Editable,
    ReadOnly,
}

/// Marker set used to classify portal responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseClassifier {
    pub cas_success: String,
    pub order_success: String,
    pub menu_editable: String,
    pub menu_readonly: String,
}

impl Default for ResponseClassifier {
    fn default() -> Self {
        Self {
            cas_success: CAS_SUCCESS_MARKER.to_string(),
            order_success: ORDER_SUCCESS_MARKER.to_string(),
            menu_editable: MENU_EDITABLE_MARKER.to_string(),
            menu_readonly: MENU_READONLY_MARKER.to_string(),
        }
    }
}

impl ResponseClassifier {
    /// CAS accepted the credentials. A re-rendered login form lacks the marker.
    pub fn cas_login_succeeded(&self, page: &str) -> bool {
        page.contains(&self.cas_success)
    }

    /// The final callback was accepted.
    pub fn order_accepted(&self, page: &str) -> bool {
        page.contains(&self.order_success)
    }

    /// `None` when neither menu marker is present (page shape changed).
    pub fn menu_mode(&self, page: &str) -> Option<MenuMode> {
        if page.contains(&self.menu_editable) {
            Some(MenuMode::Editable)
        } else if page.contains(&self.menu_readonly) {
            Some(MenuMode::ReadOnly)
        } else {
            None
        }
    }
}
