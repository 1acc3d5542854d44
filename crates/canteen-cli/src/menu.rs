//! # Menu Subcommand
//!
//! Shows the menu of one date. Course indices in the table are the ones
//! `canteen order --set` expects.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;

use canteen_client::{CanteenClient, Meal, Menu};

/// Arguments for the `canteen menu` subcommand.
#[derive(Args, Debug)]
pub struct MenuArgs {
    /// Menu date (YYYY-MM-DD).
    pub date: NaiveDate,

    /// Print the parsed menu as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the menu subcommand.
pub async fn run_menu(args: &MenuArgs, client: &mut CanteenClient) -> Result<u8> {
    let menu = client
        .fetch_menu(args.date)
        .await
        .with_context(|| format!("failed to fetch the menu for {}", args.date))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&menu)?);
    } else {
        print!("{}", render(&menu));
    }
    Ok(0)
}

/// Plain-text rendering of a menu.
pub fn render(menu: &Menu) -> String {
    let mut out = format!(
        "{} ({})\n",
        menu.date,
        if menu.mutable { "editable" } else { "read-only" }
    );
    for meal in &menu.meals {
        out.push_str(&render_meal(meal));
    }
    out
}

fn render_meal(meal: &Meal) -> String {
    let mut out = format!("\n{} [{}]", meal.kind.label(), meal.kind);
    if meal.do_not_order {
        out.push_str(" do-not-order");
    }
    out.push('\n');
    for (i, c) in meal.courses.iter().enumerate() {
        let mut flags = String::new();
        if c.combo {
            flags.push_str(" combo");
        }
        if c.required {
            flags.push_str(" required");
        }
        out.push_str(&format!(
            "  {i:>2}  {:<6} {:<16} {:>7}  {}/{}{flags}\n",
            c.category, c.name, c.price, c.quantity, c.max_quantity
        ));
    }
    out
}
