//! HTTP transport for the portal.
//!
//! Wraps a cookie-keeping `reqwest::Client` with fixed browser
//! identification headers. Each call is described by an immutable
//! [`PageRequest`] carrying its own query, form body, and Referer, so no
//! request state leaks between calls. The cookie jar is the only shared
//! state.
//!
//! ## Session expiry
//!
//! The portal never answers an expired session with a distinct status. It
//! redirects to the CAS login page instead. Guarded requests (the default)
//! treat a final URL on the login page as [`CanteenError::SessionExpired`].
//! The CAS handshake itself opts out with [`PageRequest::anonymous`].
//!
//! Requests are never retried here; a postback replayed against changed
//! server state would act twice.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use url::Url;

use crate::config::CanteenConfig;
use crate::error::CanteenError;

/// A fetched HTML page and the URL it finally resolved to.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: Url,
    pub body: String,
}

/// One request to the portal.
#[derive(Debug, Clone)]
pub struct PageRequest {
    endpoint: &'static str,
    url: Url,
    query: Vec<(String, String)>,
    form: Option<Vec<(String, String)>>,
    referer: Option<String>,
    guarded: bool,
}

impl PageRequest {
    /// A GET request. `endpoint` names the step in errors and logs.
    pub fn get(endpoint: &'static str, url: Url) -> Self {
        Self {
            endpoint,
            url,
            query: Vec::new(),
            form: None,
            referer: None,
            guarded: true,
        }
    }

    /// A POST request with a URL-encoded form body.
    pub fn post(endpoint: &'static str, url: Url, form: Vec<(String, String)>) -> Self {
        Self {
            form: Some(form),
            ..Self::get(endpoint, url)
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    /// Skip the login-page redirect check (for the CAS handshake).
    pub fn anonymous(mut self) -> Self {
        self.guarded = false;
        self
    }

    pub fn endpoint(&self) -> &'static str {
        self.endpoint
    }

    /// The absolute URL this request targets, including its query.
    pub fn full_url(&self) -> Url {
        let mut url = self.url.clone();
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        url
    }
}

/// Cookie-keeping HTTP transport shared by every portal operation.
#[derive(Debug, Clone)]
pub struct Transport {
    http: reqwest::Client,
    login_url: Url,
}

impl Transport {
    pub fn new(config: &CanteenConfig) -> Result<Self, CanteenError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .cookie_store(true)
            .default_headers({
                let mut headers = HeaderMap::new();
                headers.insert(
                    USER_AGENT,
                    HeaderValue::from_str(&config.user_agent).map_err(|_| CanteenError::Parse {
                        endpoint: "client_init".into(),
                        what: "user agent header value".into(),
                    })?,
                );
                headers.insert(
                    ACCEPT,
                    HeaderValue::from_static("text/html, application/xhtml+xml, */*"),
                );
                headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("zh-CN"));
                headers
            })
            .build()
            .map_err(|e| CanteenError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self {
            http,
            login_url: config.cas_login_url.clone(),
        })
    }

    /// Send a request and return the page it resolved to.
    pub async fn send(&self, request: PageRequest) -> Result<Page, CanteenError> {
        let endpoint = request.endpoint;
        let url = request.full_url();

        let mut builder = match &request.form {
            Some(form) => self.http.post(url.clone()).form(form),
            None => self.http.get(url.clone()),
        };
        if let Some(referer) = &request.referer {
            builder = builder.header(REFERER, referer.as_str());
        }

        let resp = builder.send().await.map_err(|e| CanteenError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;

        let final_url = resp.url().clone();
        tracing::debug!(
            endpoint,
            method = if request.form.is_some() { "POST" } else { "GET" },
            status = resp.status().as_u16(),
            final_url = %final_url,
            "portal request"
        );

        if request.guarded && self.is_login_page(&final_url) {
            return Err(CanteenError::SessionExpired {
                endpoint: endpoint.into(),
            });
        }

        if !resp.status().is_success() {
            return Err(CanteenError::Status {
                endpoint: endpoint.into(),
                status: resp.status().as_u16(),
            });
        }

        let body = resp.text().await.map_err(|e| CanteenError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;

        Ok(Page {
            url: final_url,
            body,
        })
    }

    /// Whether `url` is the CAS login page (with or without a `;jsessionid=` segment).
    pub fn is_login_page(&self, url: &Url) -> bool {
        url.host_str() == self.login_url.host_str()
            && url.port_or_known_default() == self.login_url.port_or_known_default()
            && url.path().starts_with(self.login_url.path())
    }
}
