//! Menu page model and parser.
//!
//! A menu page lists up to three meals for one date, each as a grid
//! table `Repeater1_GvReport_{n}` of nine-column course rows. Editable
//! pages end each table with an unlabeled totals row and render the
//! ordered quantity as a text box; read-only pages label every row,
//! including the trailing one.
//!
//! ## Column layout
//!
//! | # | Column | Field |
//! |---|--------|-------|
//! | 0 | 编号 | [`Course::number`] |
//! | 1 | 类别 | [`Course::category`] |
//! | 2 | 菜名 | [`Course::name`] |
//! | 3 | 套餐 | [`Course::combo`] |
//! | 4 | 必选 | [`Course::required`] |
//! | 5 | 单价 | [`Course::price`] |
//! | 6 | 最大份数 | [`Course::max_quantity`] |
//! | 7 | 订购份数 | [`Course::quantity`] |
//! | 8 | 订餐状态 | [`Course::status`] |

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

use crate::classify::{MenuMode, ResponseClassifier};
use crate::error::CanteenError;
use crate::scrape;
use crate::session::Session;
use crate::transport::PageRequest;
use crate::webforms::WebFormsFields;

/// Prefix of the per-meal grid ids and of the quantity callback tokens.
pub const TABLE_PREFIX: &str = "Repeater1_GvReport";
/// Restaurant dropdown posted with every order.
pub const RESTAURANT_CONTROL: &str = "DrplstRestaurantBasis1$DrplstControl";

const COLUMNS: usize = 9;
const REQUIRED_MARKER: &str = "必选";
const COMBO_MARKER: &str = "套餐";

/// One of the three daily meals. The discriminant is the page's meal index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MealKind {
    Breakfast = 0,
    Lunch = 1,
    Dinner = 2,
}

impl MealKind {
    pub const ALL: [MealKind; 3] = [MealKind::Breakfast, MealKind::Lunch, MealKind::Dinner];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Heading the portal uses for this meal's menu.
    pub fn label(self) -> &'static str {
        match self {
            Self::Breakfast => "早餐菜单",
            Self::Lunch => "午餐菜单",
            Self::Dinner => "晚餐菜单",
        }
    }

    /// Checkbox field name used when the page does not carry one.
    fn default_checkbox_field(self) -> String {
        format!("Repeater1$ctl{:02}$CbkMealtimes", self.index())
    }
}

impl std::fmt::Display for MealKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
        })
    }
}

impl std::str::FromStr for MealKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "0" | "breakfast" => Ok(Self::Breakfast),
            "1" | "lunch" => Ok(Self::Lunch),
            "2" | "dinner" => Ok(Self::Dinner),
            other => Err(format!("unknown meal {other:?} (expected breakfast, lunch, or dinner)")),
        }
    }
}

/// One orderable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Course {
    pub number: String,
    pub category: String,
    pub name: String,
    /// Set meal covering the required courses.
    pub combo: bool,
    pub required: bool,
    /// Unit price as shown, e.g. `"5.00"`.
    pub price: String,
    pub max_quantity: u32,
    /// Quantity currently on order.
    pub quantity: u32,
    pub status: String,
}

/// One meal of the day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Meal {
    pub kind: MealKind,
    pub mutable: bool,
    /// "Do not order" checkbox state as loaded.
    pub do_not_order: bool,
    /// Form field of the do-not-order checkbox.
    pub checkbox_field: String,
    pub courses: Vec<Course>,
    /// Indices into `courses` marked required.
    pub required: BTreeSet<usize>,
}

impl Meal {
    pub fn index(&self) -> usize {
        self.kind.index()
    }
}

/// A parsed menu page.
#[derive(Debug, Clone, Serialize)]
pub struct Menu {
    pub date: NaiveDate,
    pub mutable: bool,
    pub meals: Vec<Meal>,
    /// Restaurant selection to post back.
    pub restaurant_id: String,
    #[serde(skip)]
    fields: WebFormsFields,
}

impl Menu {
    pub fn meal(&self, kind: MealKind) -> Option<&Meal> {
        self.meals.iter().find(|m| m.kind == kind)
    }

    pub fn course_count(&self, kind: MealKind) -> usize {
        self.meal(kind).map_or(0, |m| m.courses.len())
    }

    /// Tokens of the page this menu was parsed from.
    pub fn fields(&self) -> &WebFormsFields {
        &self.fields
    }
}

fn continuation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\r\n {24}( {4})?").expect("static regex"))
}

fn checkbox_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Repeater1_CbkMealtimes_(\d+)$").expect("static regex"))
}

/// Strip the server's line-continuation padding and turn `&nbsp;` into spaces.
///
/// U+00A0 has no mapping in the portal's legacy code page, and left in
/// place it breaks text comparisons against the markers.
pub fn normalize(raw: &str) -> String {
    continuation_re().replace_all(raw, "").replace("&nbsp;", " ")
}

/// Do-not-order checkboxes by meal index: `(field name, checked)`.
pub(crate) fn do_not_order_flags(page: &str) -> BTreeMap<usize, (String, bool)> {
    let mut flags = BTreeMap::new();
    for tag in scrape::input_tags(page) {
        let Some(index) = scrape::attr(tag, "id")
            .and_then(|id| checkbox_id_re().captures(id))
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<usize>().ok())
        else {
            continue;
        };
        let name = scrape::attr(tag, "name").map(str::to_string).unwrap_or_else(|| {
            MealKind::from_index(index)
                .map(MealKind::default_checkbox_field)
                .unwrap_or_default()
        });
        flags.insert(index, (name, scrape::is_checked(tag)));
    }
    flags
}

fn row_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"id="Repeater1_GvReport_(\d+)_LblNum_(\d+)""#).expect("static regex")
    })
}

fn parse_quantity(endpoint: &str, meal: MealKind, what: &str, raw: &str) -> Result<u32, CanteenError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse()
        .map_err(|_| CanteenError::parse(endpoint, format!("{meal} {what} {raw:?}")))
}

fn parse_meal(
    endpoint: &str,
    page: &str,
    kind: MealKind,
    mode: MenuMode,
    flags: &BTreeMap<usize, (String, bool)>,
) -> Result<Option<Meal>, CanteenError> {
    let table_id = format!("{TABLE_PREFIX}_{}", kind.index());
    let Some(table) = scrape::element_inner(page, "table", "id", &table_id) else {
        return Ok(None);
    };

    let meal_index = kind.index().to_string();
    let labeled_rows: BTreeSet<&str> = row_label_re()
        .captures_iter(table)
        .filter(|c| c.get(1).is_some_and(|m| m.as_str() == meal_index))
        .filter_map(|c| c.get(2).map(|m| m.as_str()))
        .collect();
    // Read-only grids label the trailing row too.
    let rows = match mode {
        MenuMode::Editable => labeled_rows.len(),
        MenuMode::ReadOnly => labeled_rows.len().saturating_sub(1),
    };

    let cells = scrape::cell_texts(table);
    if cells.len() < rows * COLUMNS {
        return Err(CanteenError::parse(
            endpoint,
            format!("{kind} grid ({} cells for {rows} rows)", cells.len()),
        ));
    }

    let mut courses = Vec::with_capacity(rows);
    let mut required = BTreeSet::new();
    for (row, c) in cells.chunks_exact(COLUMNS).take(rows).enumerate() {
        let course = Course {
            number: c[0].clone(),
            category: c[1].clone(),
            name: c[2].clone(),
            combo: c[3] == COMBO_MARKER,
            required: c[4] == REQUIRED_MARKER,
            price: c[5].clone(),
            max_quantity: parse_quantity(endpoint, kind, "max quantity", &c[6])?,
            quantity: parse_quantity(endpoint, kind, "quantity", &c[7])?,
            status: c[8].clone(),
        };
        if course.required {
            required.insert(row);
        }
        courses.push(course);
    }

    let (checkbox_field, do_not_order) = flags
        .get(&kind.index())
        .cloned()
        .unwrap_or_else(|| (kind.default_checkbox_field(), false));

    Ok(Some(Meal {
        kind,
        mutable: mode == MenuMode::Editable,
        do_not_order,
        checkbox_field,
        courses,
        required,
    }))
}

/// Parse a normalized menu page.
pub fn parse_menu(
    endpoint: &str,
    date: NaiveDate,
    page: &str,
    classifier: &ResponseClassifier,
    default_restaurant: &str,
) -> Result<Menu, CanteenError> {
    let fields = WebFormsFields::extract(endpoint, page)?;
    let mode = classifier
        .menu_mode(page)
        .ok_or_else(|| CanteenError::parse(endpoint, "menu submission marker"))?;
    let flags = do_not_order_flags(page);

    let mut meals = Vec::new();
    for kind in MealKind::ALL {
        if let Some(meal) = parse_meal(endpoint, page, kind, mode, &flags)? {
            meals.push(meal);
        }
    }

    let restaurant_id = scrape::selected_value(page, RESTAURANT_CONTROL)
        .unwrap_or_else(|| default_restaurant.to_string());

    Ok(Menu {
        date,
        mutable: mode == MenuMode::Editable,
        meals,
        restaurant_id,
        fields,
    })
}

/// Fetch and parse the menu for `date`.
pub async fn fetch_menu(session: &Session, date: NaiveDate) -> Result<Menu, CanteenError> {
    let config = session.config();
    let endpoint = "GET RestaurantUserMenu";
    let page = session
        .send(
            PageRequest::get(endpoint, config.menu_url.clone())
                .query("Date", date.format("%Y-%m-%d").to_string())
                .referer(config.select_date_url.as_str()),
        )
        .await?;
    let body = normalize(&page.body);
    let menu = parse_menu(
        endpoint,
        date,
        &body,
        session.classifier(),
        &config.restaurant_id,
    )?;
    tracing::info!(
        %date,
        mutable = menu.mutable,
        meals = menu.meals.len(),
        "menu fetched"
    );
    Ok(menu)
}
