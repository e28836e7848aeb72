//! Collections derived from the full document set for the filter panel.

use std::collections::HashSet;

use crate::filter::CategoryChoice;
use crate::models::Document;

/// Category choices offered in the filter panel.
///
/// `All` first, then each distinct non-empty category in first-seen order,
/// then `Uncategorized`.
pub fn available_categories(documents: &[Document]) -> Vec<CategoryChoice> {
    let mut seen = HashSet::new();
    let mut out = vec![CategoryChoice::All];
    for name in documents.iter().filter_map(Document::category_name) {
        if seen.insert(name) {
            out.push(CategoryChoice::Named(name.to_string()));
        }
    }
    out.push(CategoryChoice::Uncategorized);
    out
}

/// Every distinct tag across all documents, in first-seen order.
pub fn available_tags(documents: &[Document]) -> Vec<String> {
    let mut seen = HashSet::new();
    documents
        .iter()
        .flat_map(|d| d.tags.iter().map(String::as_str))
        .filter(|t| seen.insert(*t))
        .map(str::to_string)
        .collect()
}
