//! Filter state manager: the current section, search text and filter panel
//! selections, mutated by UI events.

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::filter::{filter_documents, filter_documents_at, CategoryChoice, FilterOptions, TypeChoice};
use crate::models::{Document, Section};
use crate::temporal::Timeframe;

/// View selections for one browsing session. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub section: Section,
    pub query: String,
    pub options: FilterOptions,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_section(&mut self, section: Section) {
        self.section = section;
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn clear_search(&mut self) {
        self.query.clear();
    }

    /// Flip a type selection. Returns whether it is selected afterwards.
    pub fn toggle_type(&mut self, choice: TypeChoice) -> bool {
        toggle(&mut self.options.types, choice)
    }

    /// Flip a category selection. Returns whether it is selected afterwards.
    pub fn toggle_category(&mut self, choice: CategoryChoice) -> bool {
        toggle(&mut self.options.categories, choice)
    }

    /// Flip a tag selection. Returns whether it is selected afterwards.
    pub fn toggle_tag(&mut self, tag: &str) -> bool {
        toggle(&mut self.options.tags, tag.to_string())
    }

    pub fn set_timeframe(&mut self, timeframe: Timeframe) {
        self.options.timeframe = timeframe;
    }

    /// Restore the filter panel to its defaults. Section and search are kept.
    pub fn reset_filters(&mut self) {
        self.options = FilterOptions::default();
    }

    pub fn has_active_filters(&self) -> bool {
        !self.options.is_default()
    }

    /// Number of active filter-panel selections, for the badge on the
    /// filter button. The timeframe counts as one when not `All`.
    pub fn active_filter_count(&self) -> usize {
        self.options.types.len()
            + self.options.categories.len()
            + self.options.tags.len()
            + usize::from(self.options.timeframe != Timeframe::All)
    }

    /// Run the filter engine with the current selections.
    pub fn apply<'a>(&self, documents: &'a [Document]) -> Vec<&'a Document> {
        filter_documents(documents, self.section, &self.query, &self.options)
    }

    /// Run the filter engine with the timeframe evaluated at `now`.
    pub fn apply_at<'a, Tz: TimeZone>(
        &self,
        documents: &'a [Document],
        now: &DateTime<Tz>,
    ) -> Vec<&'a Document> {
        filter_documents_at(documents, self.section, &self.query, &self.options, now)
    }
}

fn toggle<T: Ord>(set: &mut std::collections::BTreeSet<T>, value: T) -> bool {
    if set.remove(&value) {
        false
    } else {
        set.insert(value);
        true
    }
}
