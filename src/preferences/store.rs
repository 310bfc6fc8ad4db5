//! Chart preference store
//!
//! Keeps the user's chart order (title -> rank) and hidden set, loaded once at
//! construction and written back on every change. Unreadable persisted state
//! falls back to empty preferences.

use super::backend::{FileBackend, MemoryBackend, PreferenceBackend};
use super::error::PreferenceResult;
use crate::charts::ChartSeries;
use serde::de::DeserializeOwned;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

/// Persisted chart order: JSON object of title -> zero-based rank
pub const ORDER_KEY: &str = "chartsOrder";

/// Persisted hidden charts: JSON array of titles
pub const HIDDEN_KEY: &str = "hiddenCharts";

/// Chart order, keyed by title
pub type ChartOrder = HashMap<String, usize>;

/// Anything identified by a chart title
pub trait Titled {
    fn title(&self) -> &str;
}

impl Titled for ChartSeries {
    fn title(&self) -> &str {
        &self.title
    }
}

impl Titled for String {
    fn title(&self) -> &str {
        self
    }
}

impl Titled for str {
    fn title(&self) -> &str {
        self
    }
}

impl<T: Titled + ?Sized> Titled for &T {
    fn title(&self) -> &str {
        (**self).title()
    }
}

/// Saved chart order and visibility
pub struct PreferenceStore {
    backend: Box<dyn PreferenceBackend>,
    order: ChartOrder,
    hidden: BTreeSet<String>,
}

impl PreferenceStore {
    /// Create a store and load whatever the backend holds
    pub fn new(backend: Box<dyn PreferenceBackend>) -> Self {
        let order = load_or_default(backend.as_ref(), ORDER_KEY);
        let hidden = load_or_default(backend.as_ref(), HIDDEN_KEY);
        Self {
            backend,
            order,
            hidden,
        }
    }

    /// Store persisted as JSON files under `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self::new(Box::new(FileBackend::new(dir)))
    }

    /// Store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()))
    }

    pub fn order(&self) -> &ChartOrder {
        &self.order
    }

    pub fn hidden(&self) -> &BTreeSet<String> {
        &self.hidden
    }

    pub fn rank(&self, title: &str) -> Option<usize> {
        self.order.get(title).copied()
    }

    pub fn is_hidden(&self, title: &str) -> bool {
        self.hidden.contains(title)
    }

    /// Replace the order mapping wholesale and persist it
    ///
    /// Memory is left untouched when the write fails.
    pub fn set_order(&mut self, order: ChartOrder) -> PreferenceResult<()> {
        let content = serde_json::to_string(&order)?;
        self.backend.write(ORDER_KEY, &content)?;
        tracing::debug!(charts = order.len(), "Saved chart order");
        self.order = order;
        Ok(())
    }

    /// Replace the hidden set wholesale and persist it
    pub fn set_hidden(&mut self, hidden: BTreeSet<String>) -> PreferenceResult<()> {
        let content = serde_json::to_string(&hidden)?;
        self.backend.write(HIDDEN_KEY, &content)?;
        tracing::debug!(charts = hidden.len(), "Saved hidden charts");
        self.hidden = hidden;
        Ok(())
    }

    /// Flip one chart's visibility; returns whether it is now hidden
    pub fn toggle_hidden(&mut self, title: &str) -> PreferenceResult<bool> {
        let mut hidden = self.hidden.clone();
        let now_hidden = if hidden.remove(title) {
            false
        } else {
            hidden.insert(title.to_string());
            true
        };
        self.set_hidden(hidden)?;
        Ok(now_hidden)
    }

    /// Forget saved order and visibility
    pub fn clear(&mut self) -> PreferenceResult<()> {
        self.set_order(ChartOrder::new())?;
        self.set_hidden(BTreeSet::new())
    }

    /// Charts that are not hidden, by ascending rank
    ///
    /// Unranked charts follow every ranked one and keep their relative order.
    pub fn visible_ordered<'a, T: Titled>(&self, charts: &'a [T]) -> Vec<&'a T> {
        let mut visible: Vec<&T> = charts
            .iter()
            .filter(|chart| !self.is_hidden(chart.title()))
            .collect();
        visible.sort_by_key(|chart| self.rank(chart.title()).unwrap_or(usize::MAX));
        visible
    }

    /// Every chart, hidden included, by saved rank; unranked charts use their
    /// position in `charts`
    pub fn arrange<'a, T: Titled>(&self, charts: &'a [T]) -> Vec<&'a T> {
        let mut arranged: Vec<(usize, &T)> = charts.iter().enumerate().collect();
        arranged.sort_by_key(|(index, chart)| self.rank(chart.title()).unwrap_or(*index));
        arranged.into_iter().map(|(_, chart)| chart).collect()
    }
}

fn load_or_default<T: DeserializeOwned + Default>(backend: &dyn PreferenceBackend, key: &str) -> T {
    let content = match backend.read(key) {
        Ok(Some(content)) => content,
        Ok(None) => return T::default(),
        Err(e) => {
            tracing::warn!(key, error = %e, "Failed to read chart preferences");
            return T::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, error = %e, "Ignoring corrupt chart preferences");
            T::default()
        }
    }
}

/// Move the element at `from` to `to`, shifting the ones in between
pub fn move_title<T>(list: &mut Vec<T>, from: usize, to: usize) {
    if from >= list.len() {
        return;
    }
    let item = list.remove(from);
    let to = to.min(list.len());
    list.insert(to, item);
}

/// Order mapping where each title's rank is its position
pub fn order_from_titles<I, S>(titles: I) -> ChartOrder
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    titles
        .into_iter()
        .enumerate()
        .map(|(rank, title)| (title.into(), rank))
        .collect()
}
