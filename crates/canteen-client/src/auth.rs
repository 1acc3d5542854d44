//! Two-stage login: CAS single sign-on, then the card system.
//!
//! ## Flow
//!
//! | Step | Request | Outcome |
//! |------|---------|---------|
//! | 1 | `GET {cas_login}` | `jsessionid` + login ticket `lt` |
//! | 2 | `POST {cas_login};jsessionid={id}` | redirect script on success, re-rendered form with fresh `lt` on failure |
//! | 3 | `GET {card_entry}` | 302 to the welcome page with name and balance |
//!
//! A failed step 2 hands back a [`CasRetry`] so the next attempt goes
//! straight to step 2 with the refreshed ticket.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::config::{ConfigError, Credentials};
use crate::error::CanteenError;
use crate::scrape;
use crate::session::Session;
use crate::transport::PageRequest;

/// Session token and login ticket needed to resume a rejected CAS attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasRetry {
    pub jsessionid: String,
    pub lt: String,
}

/// The logged-in student as shown on the card-system welcome page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub display_name: String,
    /// Stored card balance, as the decimal text the portal shows.
    pub balance: String,
}

fn jsessionid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"jsessionid=(.*?)""#).expect("static regex"))
}

fn lt_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"name="lt" value="(.*?)""#).expect("static regex"))
}

fn user_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"<span id="LblUserName">当前用户：(.*?)</span>"#).expect("static regex")
    })
}

fn balance_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)<span id="LblBalance">.*?(-?\d+(?:\.\d+)?).*?</span>"#)
            .expect("static regex")
    })
}

fn capture(re: &Regex, page: &str) -> Option<String> {
    re.captures(page)
        .and_then(|c| c.get(1))
        .map(|m| scrape::decode_entities(m.as_str().trim()))
}

/// Run the CAS handshake.
///
/// Returns `Ok(None)` once CAS accepts the credentials, or
/// `Ok(Some(retry))` when it re-renders the login form. Pass the retry
/// back as `prior` to try again without re-fetching the login page.
pub async fn login_cas(
    session: &Session,
    credentials: &Credentials,
    prior: Option<&CasRetry>,
) -> Result<Option<CasRetry>, CanteenError> {
    let config = session.config();

    let (jsessionid, lt) = match prior {
        Some(retry) => (retry.jsessionid.clone(), retry.lt.clone()),
        None => {
            let endpoint = "GET cas/login";
            let page = session
                .send(PageRequest::get(endpoint, config.cas_login_url.clone()).anonymous())
                .await?;
            let jsessionid = capture(jsessionid_re(), &page.body)
                .ok_or_else(|| CanteenError::parse(endpoint, "jsessionid"))?;
            let lt = capture(lt_re(), &page.body)
                .ok_or_else(|| CanteenError::parse(endpoint, "login ticket (lt)"))?;
            (jsessionid, lt)
        }
    };

    let endpoint = "POST cas/login";
    let post_url = Url::parse(&format!("{};jsessionid={jsessionid}", config.cas_login_url))
        .map_err(|e| ConfigError::InvalidUrl("cas_login_url".into(), e.to_string()))?;
    let form = vec![
        ("username".to_string(), credentials.username().to_string()),
        ("password".to_string(), credentials.password().to_string()),
        ("lt".to_string(), lt),
        ("_eventId".to_string(), "submit".to_string()),
        ("submit".to_string(), "登陆".to_string()),
    ];

    let page = session
        .send(
            PageRequest::post(endpoint, post_url, form)
                .referer(config.cas_login_url.as_str())
                .anonymous(),
        )
        .await?;

    if session.classifier().cas_login_succeeded(&page.body) {
        tracing::info!(username = credentials.username(), "CAS login accepted");
        return Ok(None);
    }

    let lt = capture(lt_re(), &page.body)
        .ok_or_else(|| CanteenError::parse(endpoint, "refreshed login ticket (lt)"))?;
    let jsessionid = capture(jsessionid_re(), &page.body).unwrap_or(jsessionid);
    tracing::info!(username = credentials.username(), "CAS login rejected");
    Ok(Some(CasRetry { jsessionid, lt }))
}

/// Enter the card system and read the welcome page.
///
/// Must follow a successful [`login_cas`]; without a CAS ticket the
/// portal bounces back to the login page and this returns
/// [`CanteenError::SessionExpired`].
pub async fn login_card_system(session: &Session) -> Result<UserProfile, CanteenError> {
    let config = session.config();
    let endpoint = "GET card";
    let page = session
        .send(
            PageRequest::get(endpoint, config.card_entry_url.clone())
                .referer(config.sso_message_url.as_str()),
        )
        .await?;

    let display_name = capture(user_name_re(), &page.body)
        .ok_or_else(|| CanteenError::parse(endpoint, "user name"))?;
    let balance = capture(balance_re(), &page.body)
        .ok_or_else(|| CanteenError::parse(endpoint, "balance"))?;

    tracing::info!(user = %display_name, "card system login complete");
    Ok(UserProfile {
        display_name,
        balance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_page_tokens_are_found() {
        let page = r#"<form id="fm1" action="/cas/login;jsessionid=ABC123" method="post">
            <input type="hidden" name="lt" value="LT1" /></form>"#;
        assert_eq!(capture(jsessionid_re(), page).as_deref(), Some("ABC123"));
        assert_eq!(capture(lt_re(), page).as_deref(), Some("LT1"));
    }

    #[test]
    fn welcome_page_profile_fields() {
        let page = r#"<span id="LblUserName">当前用户：张三</span>
            <span id="LblBalance">账户余额：123.45元</span>"#;
        assert_eq!(capture(user_name_re(), page).as_deref(), Some("张三"));
        assert_eq!(capture(balance_re(), page).as_deref(), Some("123.45"));
    }

    #[test]
    fn negative_balance_keeps_sign() {
        let page = r#"<span id="LblBalance">账户余额：-3.5元</span>"#;
        assert_eq!(capture(balance_re(), page).as_deref(), Some("-3.5"));
    }
}
