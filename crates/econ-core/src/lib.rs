//! Shared types for the economic model dashboard.
//!
//! Cell and table models, the column naming conventions, period definitions,
//! number formatting, errors and command-line settings.

pub mod columns;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;

pub use error::{EconError, Result};
