//! Cache of orderable dates per calendar month.
//!
//! The date-selection page shows one month at a time. Switching month is a
//! postback on the month dropdown; switching year is a postback on the year
//! dropdown, after which the month dropdown is stale and needs its own
//! postback before the listed dates can be trusted.
//!
//! ## Month state machine
//!
//! ```text
//! unfetched --ensure_month--> fetched
//! ```
//!
//! Fetched months are never invalidated: the portal does not publish new
//! dates mid-session.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use chrono::{Datelike, Days, NaiveDate};
use regex::Regex;

use crate::error::CanteenError;
use crate::scrape;
use crate::session::Session;
use crate::transport::{Page, PageRequest};
use crate::webforms::{Postback, WebFormsFields};

/// Year dropdown on the date-selection page.
pub const YEAR_CONTROL: &str = "DrplstYear1$DrplstControl";
/// Month dropdown on the date-selection page.
pub const MONTH_CONTROL: &str = "DrplstMonth1$DrplstControl";

/// Frame the date links open in.
const DATE_LINK_TARGET: &str = "RestaurantContent";
const DATE_LINK_PREFIX: &str = "RestaurantUserMenu.aspx?Date=";

/// Orders close 72 hours ahead, and the current day never counts.
const ORDER_LEAD_DAYS: u64 = 4;

/// A calendar month key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month())
    }

    /// Whether `month` is in `1..=12`.
    pub fn is_valid(&self) -> bool {
        (1..=12).contains(&self.month)
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Earliest date the portal still accepts orders for, given today.
pub fn earliest_orderable(today: NaiveDate) -> NaiveDate {
    today + Days::new(ORDER_LEAD_DAYS)
}

/// What one date-selection page says.
#[derive(Debug, Clone)]
struct CalendarPage {
    fields: WebFormsFields,
    years: BTreeSet<i32>,
    selected: YearMonth,
    dates: Vec<NaiveDate>,
}

fn anchor_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<a\b[^>]*>").expect("static regex"))
}

fn parse_calendar(endpoint: &str, body: &str) -> Result<CalendarPage, CanteenError> {
    let fields = WebFormsFields::extract(endpoint, body)?;

    let years: BTreeSet<i32> = scrape::select_options(body, YEAR_CONTROL)
        .ok_or_else(|| CanteenError::parse(endpoint, "year dropdown"))?
        .iter()
        .filter_map(|o| o.value.trim().parse().ok())
        .collect();
    if years.is_empty() {
        return Err(CanteenError::parse(endpoint, "selectable years"));
    }

    let year = scrape::selected_value(body, YEAR_CONTROL)
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| CanteenError::parse(endpoint, "selected year"))?;
    let month = scrape::selected_value(body, MONTH_CONTROL)
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| CanteenError::parse(endpoint, "selected month"))?;

    let mut dates = Vec::new();
    for tag in anchor_re().find_iter(body).map(|m| m.as_str()) {
        if scrape::attr(tag, "target") != Some(DATE_LINK_TARGET) {
            continue;
        }
        let Some(raw) = scrape::attr(tag, "href").and_then(|h| h.strip_prefix(DATE_LINK_PREFIX))
        else {
            continue;
        };
        let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| CanteenError::parse(endpoint, format!("menu date {raw:?}")))?;
        dates.push(date);
    }

    Ok(CalendarPage {
        fields,
        years,
        selected: YearMonth::new(year, month),
        dates,
    })
}

/// Orderable dates per month, plus the server-side dropdown state.
#[derive(Debug, Clone, Default)]
pub struct CalendarCache {
    months: BTreeMap<YearMonth, Vec<NaiveDate>>,
    years: BTreeSet<i32>,
    selected: Option<YearMonth>,
    fields: Option<WebFormsFields>,
}

impl CalendarCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the date-selection page has been loaded this session.
    pub fn is_loaded(&self) -> bool {
        self.fields.is_some()
    }

    /// Years the year dropdown offers. Empty until loaded.
    pub fn selectable_years(&self) -> &BTreeSet<i32> {
        &self.years
    }

    /// Month currently selected on the server.
    pub fn selected(&self) -> Option<YearMonth> {
        self.selected
    }

    /// Whether `month` has already been fetched.
    pub fn is_cached(&self, month: YearMonth) -> bool {
        self.months.contains_key(&month)
    }

    /// Fetch the date-selection page once per session.
    pub async fn load(&mut self, session: &Session) -> Result<(), CanteenError> {
        if self.is_loaded() {
            return Ok(());
        }
        let config = session.config();
        let endpoint = "GET RestaurantUserSelect";
        let page = session
            .send(
                PageRequest::get(endpoint, config.select_date_url.clone())
                    .referer(config.card_default_url.as_str()),
            )
            .await?;
        let parsed = parse_calendar(endpoint, &page.body)?;

        tracing::debug!(
            years = ?parsed.years,
            selected = %parsed.selected,
            dates = parsed.dates.len(),
            "calendar loaded"
        );
        self.years = parsed.years;
        self.selected = Some(parsed.selected);
        self.months.insert(parsed.selected, parsed.dates);
        self.fields = Some(parsed.fields);
        Ok(())
    }

    /// Make sure the dates of `month` are cached.
    ///
    /// A cached month costs nothing, and neither does a month outside
    /// `1..=12`, which has no dates. Otherwise one month postback is sent,
    /// preceded by a year postback when `month.year` is not the year
    /// currently selected on the server.
    pub async fn ensure_month(
        &mut self,
        session: &Session,
        month: YearMonth,
    ) -> Result<(), CanteenError> {
        if !month.is_valid() {
            return Ok(());
        }
        self.load(session).await?;
        if self.is_cached(month) {
            return Ok(());
        }

        if self.selected.map(|s| s.year) != Some(month.year) {
            let page = self
                .postback(session, "POST RestaurantUserSelect (year)", YEAR_CONTROL, month)
                .await?;
            // The month dropdown is stale here: keep the tokens, not the dates.
            let parsed = parse_calendar("POST RestaurantUserSelect (year)", &page.body)?;
            self.fields = Some(parsed.fields);
            self.selected = Some(parsed.selected);
        }

        let endpoint = "POST RestaurantUserSelect (month)";
        let page = self.postback(session, endpoint, MONTH_CONTROL, month).await?;
        let parsed = parse_calendar(endpoint, &page.body)?;
        self.fields = Some(parsed.fields);
        self.selected = Some(parsed.selected);
        if parsed.selected != month {
            return Err(CanteenError::parse(
                endpoint,
                format!("dates for {month} (portal shows {})", parsed.selected),
            ));
        }

        tracing::info!(%month, dates = parsed.dates.len(), "calendar month cached");
        self.months.insert(month, parsed.dates);
        Ok(())
    }

    /// Orderable dates of `month`, fetching it if needed.
    pub async fn dates(
        &mut self,
        session: &Session,
        month: YearMonth,
    ) -> Result<&[NaiveDate], CanteenError> {
        self.ensure_month(session, month).await?;
        Ok(self.months.get(&month).map(Vec::as_slice).unwrap_or_default())
    }

    /// Whether `date` can be ordered.
    ///
    /// A year the dropdown does not offer is answered `false` without
    /// touching the month cache.
    pub async fn test(&mut self, session: &Session, date: NaiveDate) -> Result<bool, CanteenError> {
        self.load(session).await?;
        if !self.years.contains(&date.year()) {
            return Ok(false);
        }
        let month = YearMonth::of(date);
        self.ensure_month(session, month).await?;
        Ok(self.months.get(&month).is_some_and(|d| d.contains(&date)))
    }

    async fn postback(
        &self,
        session: &Session,
        endpoint: &'static str,
        target: &str,
        month: YearMonth,
    ) -> Result<Page, CanteenError> {
        let fields = self
            .fields
            .as_ref()
            .ok_or_else(|| CanteenError::parse(endpoint, "calendar form state"))?;
        let config = session.config();
        let form = Postback::new(fields, target)
            .field(YEAR_CONTROL, month.year.to_string())
            .field(MONTH_CONTROL, month.month.to_string())
            .into_form();
        session
            .send(
                PageRequest::post(endpoint, config.select_date_url.clone(), form)
                    .referer(config.select_date_url.as_str()),
            )
            .await
    }
}
