//! Chart Preference Store
//!
//! User-chosen chart order and visibility, persisted across sessions and
//! independent of any single data load.

mod backend;
mod error;
mod store;

pub use backend::{FileBackend, MemoryBackend, PreferenceBackend};
pub use error::{PreferenceError, PreferenceResult};
pub use store::{
    move_title, order_from_titles, ChartOrder, PreferenceStore, Titled, HIDDEN_KEY, ORDER_KEY,
};
