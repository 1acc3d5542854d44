//! # Order Subcommand
//!
//! Fetches the menu of one date, applies the requested edits locally, and
//! submits the result. Validation errors are reported before anything is
//! sent.
//!
//! ```text
//! canteen order 2015-09-30 --set lunch:3=2 --skip dinner
//! ```

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Args;

use canteen_client::{CanteenClient, MealKind, OrderDelta};

/// One `--set` edit: quantity of a course in a meal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourseQuantity {
    pub meal: MealKind,
    pub course: usize,
    pub quantity: i32,
}

impl std::str::FromStr for CourseQuantity {
    type Err = String;

    /// Parse `MEAL:COURSE=QTY`, e.g. `lunch:3=2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (target, quantity) = s
            .split_once('=')
            .ok_or_else(|| format!("expected MEAL:COURSE=QTY, got {s:?}"))?;
        let (meal, course) = target
            .split_once(':')
            .ok_or_else(|| format!("expected MEAL:COURSE=QTY, got {s:?}"))?;
        Ok(Self {
            meal: meal.trim().parse()?,
            course: course
                .trim()
                .parse()
                .map_err(|_| format!("course index {course:?} is not a number"))?,
            quantity: quantity
                .trim()
                .parse()
                .map_err(|_| format!("quantity {quantity:?} is not a number"))?,
        })
    }
}

/// Arguments for the `canteen order` subcommand.
#[derive(Args, Debug)]
pub struct OrderArgs {
    /// Menu date (YYYY-MM-DD).
    pub date: NaiveDate,

    /// Set a course quantity, as MEAL:COURSE=QTY (repeatable).
    #[arg(long = "set", value_name = "MEAL:COURSE=QTY")]
    pub set: Vec<CourseQuantity>,

    /// Flag a meal do-not-order (repeatable).
    #[arg(long, value_name = "MEAL")]
    pub skip: Vec<MealKind>,

    /// Clear a meal's do-not-order flag (repeatable).
    #[arg(long, value_name = "MEAL")]
    pub unskip: Vec<MealKind>,

    /// Validate and print the plan without submitting.
    #[arg(long)]
    pub dry_run: bool,
}

impl OrderArgs {
    /// The requested edits as an order delta.
    pub fn delta(&self) -> OrderDelta {
        let delta = self
            .set
            .iter()
            .fold(OrderDelta::new(), |d, s| d.quantity(s.meal, s.course, s.quantity));
        let delta = self.skip.iter().fold(delta, |d, &m| d.skip(m));
        self.unskip.iter().fold(delta, |d, &m| d.unskip(m))
    }
}

/// Execute the order subcommand.
pub async fn run_order(args: &OrderArgs, client: &mut CanteenClient) -> Result<u8> {
    if !client
        .is_orderable(args.date)
        .await
        .with_context(|| format!("failed to check {}", args.date))?
    {
        bail!("{} is not an orderable date", args.date);
    }

    let menu = client
        .fetch_menu(args.date)
        .await
        .with_context(|| format!("failed to fetch the menu for {}", args.date))?;
    let plan = menu
        .apply(&args.delta())
        .with_context(|| format!("order for {} rejected", args.date))?;

    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(0);
    }

    let receipt = client
        .submit(&plan)
        .await
        .with_context(|| format!("order for {} was not accepted", args.date))?;
    tracing::info!(date = %receipt.date, toggled = ?receipt.toggled, "order submitted");
    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(0)
}
