//! # canteen-cli -- Command-line front end for the canteen portal
//!
//! Drives [`canteen_client::CanteenClient`] from flags and environment
//! variables instead of interactive prompts.
//!
//! ## Subcommands
//!
//! - `dates` -- Orderable dates of one month
//! - `menu` -- Menu of one date, as a table or JSON
//! - `order` -- Edit quantities and do-not-order flags, then submit
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from the handlers.
//! - Handlers only call the client facade; all portal knowledge stays in
//!   `canteen-client`.

pub mod dates;
pub mod login;
pub mod menu;
pub mod order;
