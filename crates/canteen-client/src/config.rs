//! Canteen portal client configuration.
//!
//! Configures the endpoint URLs of the CAS login server and the card
//! system. Defaults point to the production portal. Override via
//! environment variables or explicit construction for testing.

use url::Url;
use zeroize::Zeroizing;

/// Default restaurant selection sent with every order submission.
pub const DEFAULT_RESTAURANT_ID: &str = "4d05282b-b96f-4a3f-ba54-fc218266a524";

/// Browser identification sent with every request (IE 11 in compatibility view).
pub const DEFAULT_USER_AGENT: &str = "Mozilla/4.0 (compatible; MSIE 7.0; Windows NT 6.1; Trident/7.0)";

/// Endpoints and request settings for one portal deployment.
#[derive(Debug, Clone)]
pub struct CanteenConfig {
    /// CAS login page. The credential post goes to `{cas_login_url};jsessionid={id}`.
    /// Default: <http://gzb.szsy.cn:3000/cas/login>
    pub cas_login_url: Url,
    /// Referer presented to the card system after CAS login.
    pub sso_message_url: Url,
    /// Card-system entry; redirects to the welcome page once authenticated.
    pub card_entry_url: Url,
    /// Portal default page, used as the calendar Referer.
    pub card_default_url: Url,
    /// Date-selection (calendar) page.
    pub select_date_url: Url,
    /// Menu page; the date is passed as the `Date` query parameter.
    pub menu_url: Url,
    /// Fallback value for the restaurant dropdown.
    pub restaurant_id: String,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl CanteenConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `CANTEEN_CAS_LOGIN_URL` (default: `http://gzb.szsy.cn:3000/cas/login`)
    /// - `CANTEEN_SSO_MESSAGE_URL` (default: `http://gzb.szsy.cn:4000/lcconsole/login!getSSOMessage.action`)
    /// - `CANTEEN_CARD_URL` (default: `http://gzb.szsy.cn/card/`)
    /// - `CANTEEN_CARD_DEFAULT_URL` (default: `http://gzb.szsy.cn/card/Default.aspx`)
    /// - `CANTEEN_SELECT_DATE_URL` (default: `.../RestaurantUserSelect.aspx`)
    /// - `CANTEEN_MENU_URL` (default: `.../RestaurantUserMenu.aspx`)
    /// - `CANTEEN_RESTAURANT_ID` (default: [`DEFAULT_RESTAURANT_ID`])
    /// - `CANTEEN_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            cas_login_url: env_url("CANTEEN_CAS_LOGIN_URL", "http://gzb.szsy.cn:3000/cas/login")?,
            sso_message_url: env_url(
                "CANTEEN_SSO_MESSAGE_URL",
                "http://gzb.szsy.cn:4000/lcconsole/login!getSSOMessage.action",
            )?,
            card_entry_url: env_url("CANTEEN_CARD_URL", "http://gzb.szsy.cn/card/")?,
            card_default_url: env_url(
                "CANTEEN_CARD_DEFAULT_URL",
                "http://gzb.szsy.cn/card/Default.aspx",
            )?,
            select_date_url: env_url(
                "CANTEEN_SELECT_DATE_URL",
                "http://gzb.szsy.cn/card/Restaurant/RestaurantUserMenu/RestaurantUserSelect.aspx",
            )?,
            menu_url: env_url(
                "CANTEEN_MENU_URL",
                "http://gzb.szsy.cn/card/Restaurant/RestaurantUserMenu/RestaurantUserMenu.aspx",
            )?,
            restaurant_id: std::env::var("CANTEEN_RESTAURANT_ID")
                .unwrap_or_else(|_| DEFAULT_RESTAURANT_ID.to_string()),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: std::env::var("CANTEEN_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        })
    }

    /// Create a configuration with every endpoint on one mock server (for testing).
    ///
    /// Paths mirror the production layout so fixtures can be mounted on
    /// `/cas/login`, `/card/`, and so on.
    pub fn local_mock(base: &str) -> Result<Self, ConfigError> {
        let base = base.trim_end_matches('/');
        let make_url = |path: &str| -> Result<Url, ConfigError> {
            Url::parse(&format!("{base}{path}"))
                .map_err(|e| ConfigError::InvalidUrl(base.to_string(), e.to_string()))
        };
        Ok(Self {
            cas_login_url: make_url("/cas/login")?,
            sso_message_url: make_url("/lcconsole/login!getSSOMessage.action")?,
            card_entry_url: make_url("/card/")?,
            card_default_url: make_url("/card/Default.aspx")?,
            select_date_url: make_url(
                "/card/Restaurant/RestaurantUserMenu/RestaurantUserSelect.aspx",
            )?,
            menu_url: make_url("/card/Restaurant/RestaurantUserMenu/RestaurantUserMenu.aspx")?,
            restaurant_id: DEFAULT_RESTAURANT_ID.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 5,
        })
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Student login credentials.
///
/// Custom `Debug` implementation redacts the password to prevent
/// credential leakage in log output.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: Zeroizing<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Student IDs are exactly seven ASCII digits.
    pub const USERNAME_LEN: usize = 7;

    /// Validate and wrap a student ID and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self, ConfigError> {
        let username = username.into();
        if username.len() != Self::USERNAME_LEN || !username.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::InvalidUsername(username));
        }
        let password = password.into();
        if password.is_empty() {
            return Err(ConfigError::MissingPassword);
        }
        Ok(Self {
            username,
            password: Zeroizing::new(password),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("student ID must be {len} digits, got {0:?}", len = Credentials::USERNAME_LEN)]
    InvalidUsername(String),
    #[error("password is required")]
    MissingPassword,
}
