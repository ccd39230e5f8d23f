//! Reading, normalizing and aggregating the economic model workbooks.
//!
//! - [`reader`] finds workbook files and reads raw sheets with `calamine`.
//! - [`normalizer`] turns raw sheets into clean tables, one rule set per
//!   sheet kind.
//! - [`aggregator`] rolls monthly rows up into quarters and years.
//! - [`analysis`] builds point-in-time views (cumulative totals,
//!   distribution, Overview figures).

pub mod aggregator;
pub mod analysis;
pub mod dates;
pub mod normalizer;
pub mod reader;

pub use econ_core as core;
