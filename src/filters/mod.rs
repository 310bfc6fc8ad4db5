//! Filters
//!
//! The filter panel's state: what is selected, which options each filter
//! offers, and how a change to one filter invalidates the ones below it.
//!
//! ## Components
//!
//! - [`types`]: keys, values, date range and the derived `GroupBy`
//! - [`hierarchy`]: dependency table and cascade traversal
//! - [`options`]: option records and per-key server field names
//! - [`store`]: the single entry point for changing the selection

mod error;
pub mod hierarchy;
pub mod options;
mod store;
mod types;

pub use error::{FilterError, FilterResult};
pub use options::{mapping, parse_options, FieldMapping, FilterOption};
pub use store::{
    EmptyReason, FilterStore, Invalidation, OptionState, OptionTicket, NO_LINE_GROUPS_NOTICE,
};
pub use types::{parse_date, DateRange, FilterKey, FilterSelection, FilterValue, GroupBy};
