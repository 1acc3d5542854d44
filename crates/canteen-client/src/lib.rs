//! # canteen-client -- Session client for the SZSY canteen ordering portal
//!
//! The portal is an ASP.NET Web Forms application behind a CAS single
//! sign-on server. It has no API: every read is an HTML page and every
//! write is a postback that must carry the view-state tokens of the page
//! served immediately before it. This crate reproduces that navigation:
//!
//! - **Login** via CAS, then the card system ([`auth`])
//! - **Calendar** of orderable dates, cached per month ([`calendar`])
//! - **Menus** parsed into [`Meal`]/[`Course`] ([`menu`])
//! - **Orders** validated locally, then submitted as toggle postbacks
//!   plus one quantity callback ([`order`])
//!
//! ## Session lifecycle
//!
//! One [`CanteenClient`] is one portal session. The portal expires sessions
//! silently by redirecting to the login page; any call may therefore fail
//! with [`CanteenError::SessionExpired`], after which the caller must log in
//! again. Mutating calls take `&mut self`, so no two requests of a session
//! are ever in flight together.

pub mod auth;
pub mod calendar;
pub mod classify;
pub mod config;
pub mod error;
pub mod menu;
pub mod order;
pub(crate) mod scrape;
pub mod session;
pub mod transport;
pub mod webforms;

pub use auth::{CasRetry, UserProfile};
pub use calendar::{CalendarCache, YearMonth};
pub use classify::ResponseClassifier;
pub use config::{CanteenConfig, ConfigError, Credentials};
pub use error::{CanteenError, SubmissionStage};
pub use menu::{Course, Meal, MealKind, Menu};
pub use order::{OrderDelta, OrderError, OrderPlan, OrderReceipt};
pub use session::Session;

use chrono::NaiveDate;

/// Top-level portal client: one session, its calendar cache, and the
/// logged-in profile.
#[derive(Debug, Clone)]
pub struct CanteenClient {
    session: Session,
    calendar: CalendarCache,
    profile: Option<UserProfile>,
}

impl CanteenClient {
    /// Create a client from configuration with the default markers.
    pub fn new(config: CanteenConfig) -> Result<Self, CanteenError> {
        Self::with_classifier(config, ResponseClassifier::default())
    }

    /// Create a client with a custom response classifier.
    pub fn with_classifier(
        config: CanteenConfig,
        classifier: ResponseClassifier,
    ) -> Result<Self, CanteenError> {
        Ok(Self {
            session: Session::new(config, classifier)?,
            calendar: CalendarCache::new(),
            profile: None,
        })
    }

    /// Access the underlying session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Access the calendar cache.
    pub fn calendar(&self) -> &CalendarCache {
        &self.calendar
    }

    /// Profile read at card-system login, if logged in.
    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    /// CAS stage only. See [`auth::login_cas`].
    pub async fn login_cas(
        &mut self,
        credentials: &Credentials,
        prior: Option<&CasRetry>,
    ) -> Result<Option<CasRetry>, CanteenError> {
        auth::login_cas(&self.session, credentials, prior).await
    }

    /// Card-system stage only. See [`auth::login_card_system`].
    pub async fn login_card_system(&mut self) -> Result<&UserProfile, CanteenError> {
        let profile = auth::login_card_system(&self.session).await?;
        Ok(self.profile.insert(profile))
    }

    /// Both login stages.
    ///
    /// A rejected CAS attempt becomes [`CanteenError::AuthenticationFailed`]
    /// carrying the token to retry with via [`CanteenClient::login_cas`].
    pub async fn login(&mut self, credentials: &Credentials) -> Result<&UserProfile, CanteenError> {
        if let Some(retry) = self.login_cas(credentials, None).await? {
            return Err(CanteenError::AuthenticationFailed { retry });
        }
        self.login_card_system().await
    }

    /// Orderable dates of one month.
    ///
    /// A month outside `1..=12` or a year the portal does not offer has no
    /// dates; neither sends a postback.
    pub async fn list_orderable_dates(
        &mut self,
        year: i32,
        month: u32,
    ) -> Result<Vec<NaiveDate>, CanteenError> {
        let month = YearMonth::new(year, month);
        if !month.is_valid() {
            return Ok(Vec::new());
        }
        self.calendar.load(&self.session).await?;
        if !self.calendar.selectable_years().contains(&month.year) {
            return Ok(Vec::new());
        }
        Ok(self.calendar.dates(&self.session, month).await?.to_vec())
    }

    /// Whether `date` can be ordered. See [`CalendarCache::test`].
    pub async fn is_orderable(&mut self, date: NaiveDate) -> Result<bool, CanteenError> {
        self.calendar.test(&self.session, date).await
    }

    /// Fetch and parse the menu of `date`.
    pub async fn fetch_menu(&mut self, date: NaiveDate) -> Result<Menu, CanteenError> {
        menu::fetch_menu(&self.session, date).await
    }

    /// Submit a validated plan. See [`order::submit`].
    pub async fn submit(&mut self, plan: &OrderPlan) -> Result<OrderReceipt, CanteenError> {
        order::submit(&self.session, plan).await
    }
}
