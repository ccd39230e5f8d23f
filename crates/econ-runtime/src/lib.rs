//! Runtime layer for the economic model dashboard.
//!
//! Owns the workbook cache shared by every request.

pub mod workbook_loader;

pub use econ_core as core;
pub use econ_data as data;
