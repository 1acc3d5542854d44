//! # canteen CLI entry point
//!
//! Parses command-line arguments, logs in, and dispatches to the
//! subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use canteen_cli::dates::{run_dates, DatesArgs};
use canteen_cli::login::{connect, LoginArgs};
use canteen_cli::menu::{run_menu, MenuArgs};
use canteen_cli::order::{run_order, OrderArgs};

/// Canteen portal CLI.
///
/// Lists orderable dates, shows menus, and places orders on the school
/// canteen portal. Endpoints are read from `CANTEEN_*` environment
/// variables; the password from `CANTEEN_PASSWORD`.
#[derive(Parser, Debug)]
#[command(name = "canteen", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    login: LoginArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List orderable dates of a month, or check one date.
    Dates(DatesArgs),

    /// Show the menu of a date.
    Menu(MenuArgs),

    /// Change quantities or do-not-order flags for a date and submit.
    Order(OrderArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match connect(&cli.login).await {
        Ok(mut client) => match &cli.command {
            Commands::Dates(args) => run_dates(args, &mut client).await,
            Commands::Menu(args) => run_menu(args, &mut client).await,
            Commands::Order(args) => run_order(args, &mut client).await,
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
