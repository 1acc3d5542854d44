//! # Dates Subcommand
//!
//! Lists the orderable dates of one month, or checks a single date.

use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use clap::Args;

use canteen_client::calendar::earliest_orderable;
use canteen_client::CanteenClient;

/// Arguments for the `canteen dates` subcommand.
#[derive(Args, Debug)]
pub struct DatesArgs {
    /// Year to list (default: current year).
    #[arg(long)]
    pub year: Option<i32>,

    /// Month to list, 1-12 (default: current month).
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    pub month: Option<u32>,

    /// Only check whether this date (YYYY-MM-DD) can be ordered.
    #[arg(long, conflicts_with_all = ["year", "month"])]
    pub check: Option<NaiveDate>,

    /// Print JSON instead of one date per line.
    #[arg(long)]
    pub json: bool,
}

/// Execute the dates subcommand.
pub async fn run_dates(args: &DatesArgs, client: &mut CanteenClient) -> Result<u8> {
    if let Some(date) = args.check {
        let orderable = client
            .is_orderable(date)
            .await
            .with_context(|| format!("failed to check {date}"))?;
        if args.json {
            println!("{}", serde_json::json!({ "date": date, "orderable": orderable }));
        } else {
            println!("{date}: {}", if orderable { "orderable" } else { "not orderable" });
        }
        return Ok(if orderable { 0 } else { 1 });
    }

    let today = Local::now().date_naive();
    let year = args.year.unwrap_or_else(|| today.year());
    let month = args.month.unwrap_or_else(|| today.month());
    let dates = client
        .list_orderable_dates(year, month)
        .await
        .with_context(|| format!("failed to list dates for {year}-{month:02}"))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&dates)?);
        return Ok(0);
    }
    if dates.is_empty() {
        println!("no orderable dates in {year}-{month:02}");
        return Ok(0);
    }
    let cutoff = earliest_orderable(today);
    for date in dates {
        // The portal keeps listing dates whose ordering window has closed.
        if date < cutoff {
            println!("{date}  (closed)");
        } else {
            println!("{date}");
        }
    }
    Ok(0)
}
