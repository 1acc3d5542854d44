//! Order planning and the submission postback sequence.
//!
//! ## Planning
//!
//! [`Menu::apply`] turns the user's [`OrderDelta`] into an [`OrderPlan`]
//! entirely locally. Out-of-range quantities and edits to read-only meals
//! are rejected here and never reach the portal.
//!
//! ## Submission
//!
//! | Step | Postback | `__EVENTTARGET` |
//! |------|----------|-----------------|
//! | 1..n | one per changed do-not-order checkbox | the checkbox field |
//! | n+1 | quantity callback (`__CALLBACKID=__Page`) | empty |
//!
//! Each toggle answers with a new page whose tokens feed the next step, so
//! the steps are strictly sequential. There is no rollback: if a later
//! step fails, the toggles already applied stay applied on the portal.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{CanteenError, SubmissionStage};
use crate::menu::{self, MealKind, Menu, RESTAURANT_CONTROL, TABLE_PREFIX};
use crate::session::Session;
use crate::transport::{Page, PageRequest};
use crate::webforms::{Postback, WebFormsFields};

const VIEWSTATE_ENCRYPTED: &str = "__VIEWSTATEENCRYPTED";
const CALLBACK_ID: &str = "__CALLBACKID";
const CALLBACK_PARAM: &str = "__CALLBACKPARAM";
/// Callback target of the quantity submission.
const PAGE_CALLBACK_ID: &str = "__Page";
/// Value a checked checkbox posts.
const CHECKBOX_ON: &str = "on";

/// Local order validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("the menu has no {meal}")]
    UnknownMeal { meal: MealKind },
    #[error("{meal} has no course at index {course}")]
    UnknownCourse { meal: MealKind, course: usize },
    #[error("{meal} can no longer be changed")]
    MealImmutable { meal: MealKind },
    #[error("quantity {quantity} for {meal} course {course} is outside 0..={max}")]
    QuantityOutOfRange {
        meal: MealKind,
        course: usize,
        quantity: i32,
        max: u32,
    },
    #[error("{meal} is both flagged and unflagged as do-not-order")]
    ConflictingToggle { meal: MealKind },
    #[error("the menu has no editable meal")]
    NothingToSubmit,
}

/// The user's edits for one date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderDelta {
    /// Desired quantity per (meal, course index).
    pub quantities: BTreeMap<(MealKind, usize), i32>,
    /// Meals to flag do-not-order.
    pub skip: BTreeSet<MealKind>,
    /// Meals to clear the do-not-order flag on.
    pub unskip: BTreeSet<MealKind>,
}

impl OrderDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quantity(mut self, meal: MealKind, course: usize, quantity: i32) -> Self {
        self.quantities.insert((meal, course), quantity);
        self
    }

    pub fn skip(mut self, meal: MealKind) -> Self {
        self.skip.insert(meal);
        self
    }

    pub fn unskip(mut self, meal: MealKind) -> Self {
        self.unskip.insert(meal);
        self
    }
}

/// One do-not-order checkbox change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleStep {
    pub meal: MealKind,
    pub checkbox_field: String,
    /// State after the toggle.
    pub do_not_order: bool,
}

/// Final quantities of one editable meal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedMeal {
    pub kind: MealKind,
    pub do_not_order: bool,
    pub quantities: Vec<u32>,
}

/// A validated order, ready to submit.
#[derive(Debug, Clone, Serialize)]
pub struct OrderPlan {
    pub date: NaiveDate,
    pub toggles: Vec<ToggleStep>,
    pub meals: Vec<PlannedMeal>,
    pub restaurant_id: String,
    /// Checkbox field and loaded state of every meal on the page.
    #[serde(skip)]
    checkboxes: BTreeMap<MealKind, (String, bool)>,
    #[serde(skip)]
    fields: WebFormsFields,
}

impl OrderPlan {
    pub fn meal(&self, kind: MealKind) -> Option<&PlannedMeal> {
        self.meals.iter().find(|m| m.kind == kind)
    }

    /// The `__CALLBACKPARAM` value: `{prefix}_{meal}_TxtNum_{course}@{qty}|` per course.
    pub fn callback_param(&self) -> String {
        self.meals
            .iter()
            .flat_map(|meal| {
                meal.quantities.iter().enumerate().map(move |(course, qty)| {
                    format!("{TABLE_PREFIX}_{}_TxtNum_{course}@{qty}|", meal.kind.index())
                })
            })
            .collect()
    }
}

impl Menu {
    /// Validate `delta` against this menu and resolve the final order.
    ///
    /// Courses the delta does not mention keep their current quantity.
    /// Required courses are set to 1, or to 0 when a combo course is
    /// ordered; every course of a do-not-order meal is set to 0.
    pub fn apply(&self, delta: &OrderDelta) -> Result<OrderPlan, OrderError> {
        if let Some(&meal) = delta.skip.intersection(&delta.unskip).next() {
            return Err(OrderError::ConflictingToggle { meal });
        }
        for &meal in delta.skip.iter().chain(&delta.unskip) {
            let m = self.meal(meal).ok_or(OrderError::UnknownMeal { meal })?;
            if !m.mutable {
                return Err(OrderError::MealImmutable { meal });
            }
        }
        for (&(meal, course), &quantity) in &delta.quantities {
            let m = self.meal(meal).ok_or(OrderError::UnknownMeal { meal })?;
            if !m.mutable {
                return Err(OrderError::MealImmutable { meal });
            }
            let c = m
                .courses
                .get(course)
                .ok_or(OrderError::UnknownCourse { meal, course })?;
            if quantity < 0 || quantity as u32 > c.max_quantity {
                return Err(OrderError::QuantityOutOfRange {
                    meal,
                    course,
                    quantity,
                    max: c.max_quantity,
                });
            }
        }

        let mut toggles = Vec::new();
        let mut meals = Vec::new();
        for meal in self.meals.iter().filter(|m| m.mutable) {
            let do_not_order = if delta.skip.contains(&meal.kind) {
                true
            } else if delta.unskip.contains(&meal.kind) {
                false
            } else {
                meal.do_not_order
            };
            if do_not_order != meal.do_not_order {
                toggles.push(ToggleStep {
                    meal: meal.kind,
                    checkbox_field: meal.checkbox_field.clone(),
                    do_not_order,
                });
            }

            let quantities = if do_not_order {
                vec![0; meal.courses.len()]
            } else {
                let mut q: Vec<u32> = meal
                    .courses
                    .iter()
                    .enumerate()
                    .map(|(i, c)| match delta.quantities.get(&(meal.kind, i)) {
                        // Range-checked above.
                        Some(&v) => v as u32,
                        None => c.quantity,
                    })
                    .collect();
                let combo_ordered = meal
                    .courses
                    .iter()
                    .zip(&q)
                    .any(|(c, &n)| c.combo && !c.required && n > 0);
                for &i in &meal.required {
                    q[i] = u32::from(!combo_ordered);
                }
                q
            };
            meals.push(PlannedMeal {
                kind: meal.kind,
                do_not_order,
                quantities,
            });
        }

        if meals.is_empty() {
            return Err(OrderError::NothingToSubmit);
        }

        Ok(OrderPlan {
            date: self.date,
            toggles,
            meals,
            restaurant_id: self.restaurant_id.clone(),
            checkboxes: self
                .meals
                .iter()
                .map(|m| (m.kind, (m.checkbox_field.clone(), m.do_not_order)))
                .collect(),
            fields: self.fields().clone(),
        })
    }
}

/// What an accepted submission changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderReceipt {
    pub date: NaiveDate,
    /// Meals whose do-not-order flag was toggled, in order.
    pub toggled: Vec<MealKind>,
    pub callback_param: String,
}

/// Checked checkbox fields for the given do-not-order states.
fn checked_fields(
    checkboxes: &BTreeMap<MealKind, (String, bool)>,
) -> impl Iterator<Item = (String, String)> + '_ {
    checkboxes
        .values()
        .filter(|(_, checked)| *checked)
        .map(|(field, _)| (field.clone(), CHECKBOX_ON.to_string()))
}

async fn post_menu(
    session: &Session,
    endpoint: &'static str,
    date: NaiveDate,
    form: Vec<(String, String)>,
) -> Result<Page, CanteenError> {
    let config = session.config();
    let date = date.format("%Y-%m-%d").to_string();
    let mut referer = config.menu_url.clone();
    referer.query_pairs_mut().append_pair("Date", &date);
    session
        .send(
            PageRequest::post(endpoint, config.menu_url.clone(), form)
                .query("Date", date)
                .referer(referer.as_str()),
        )
        .await
}

fn warn_partial(plan: &OrderPlan, applied: &[MealKind], stage: SubmissionStage) {
    if !applied.is_empty() {
        tracing::warn!(
            date = %plan.date,
            toggled = ?applied,
            %stage,
            "order failed after do-not-order toggles were applied; portal flags now differ from the loaded menu"
        );
    }
}

/// Run the toggle postbacks, then the quantity callback.
pub async fn submit(session: &Session, plan: &OrderPlan) -> Result<OrderReceipt, CanteenError> {
    let mut checkboxes = plan.checkboxes.clone();
    let mut fields = plan.fields.clone();
    let mut applied = Vec::with_capacity(plan.toggles.len());

    for step in &plan.toggles {
        let stage = SubmissionStage::Toggle { meal: step.meal };
        if let Some(state) = checkboxes.get_mut(&step.meal) {
            state.1 = step.do_not_order;
        }
        let form = Postback::new(&fields, step.checkbox_field.as_str())
            .field(RESTAURANT_CONTROL, plan.restaurant_id.as_str());
        let form = checked_fields(&checkboxes)
            .fold(form, |form, (name, value)| form.field(name, value))
            .into_form();

        let page = match post_menu(session, "POST RestaurantUserMenu (toggle)", plan.date, form).await {
            Ok(page) => page,
            Err(e) => {
                warn_partial(plan, &applied, stage);
                return Err(e);
            }
        };
        let body = menu::normalize(&page.body);
        let confirmed = menu::do_not_order_flags(&body)
            .get(&step.meal.index())
            .is_some_and(|(_, checked)| *checked == step.do_not_order);
        let next = WebFormsFields::extract("POST RestaurantUserMenu (toggle)", &body);
        match next {
            Ok(next) if confirmed => fields = next,
            _ => {
                warn_partial(plan, &applied, stage);
                return Err(CanteenError::SubmissionFailed { stage });
            }
        }
        tracing::debug!(meal = %step.meal, do_not_order = step.do_not_order, "toggle applied");
        applied.push(step.meal);
    }

    let callback_param = plan.callback_param();
    let form = Postback::new(&fields, "")
        .field(VIEWSTATE_ENCRYPTED, "")
        .field(RESTAURANT_CONTROL, plan.restaurant_id.as_str());
    let form = checked_fields(&checkboxes)
        .fold(form, |form, (name, value)| form.field(name, value))
        .field(CALLBACK_ID, PAGE_CALLBACK_ID)
        .field(CALLBACK_PARAM, callback_param.as_str())
        .into_form();

    let page = match post_menu(session, "POST RestaurantUserMenu (callback)", plan.date, form).await {
        Ok(page) => page,
        Err(e) => {
            warn_partial(plan, &applied, SubmissionStage::Final);
            return Err(e);
        }
    };
    if !session.classifier().order_accepted(&page.body) {
        warn_partial(plan, &applied, SubmissionStage::Final);
        return Err(CanteenError::SubmissionFailed {
            stage: SubmissionStage::Final,
        });
    }

    tracing::info!(date = %plan.date, toggles = applied.len(), "order accepted");
    Ok(OrderReceipt {
        date: plan.date,
        toggled: applied,
        callback_param,
    })
}
