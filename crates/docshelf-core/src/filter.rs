//! Document filter engine.
//!
//! [`filter_documents`] maps the full document set plus the current view
//! selections to the visible, ordered list. Stages run in a fixed order:
//!
//! 1. Section (favorites / articles / recent sort-and-truncate / files)
//! 2. Text search over title, tags and category
//! 3. Type selection
//! 4. Category selection
//! 5. Tag selection (any selected tag matches)
//! 6. Timeframe window
//!
//! Stages are intersected. Selections inside the type, category and tag
//! stages are unions. The function is pure; the same inputs always give the
//! same output.

use std::collections::BTreeSet;

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

use crate::defaults::RECENT_LIMIT;
use crate::models::{Document, DocumentType, Section};
use crate::temporal::Timeframe;

/// One entry of the type selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeChoice {
    /// Matches every document
    All,
    Type(DocumentType),
}

/// One entry of the category selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryChoice {
    /// Matches every document
    All,
    /// Matches documents with an empty or absent category
    Uncategorized,
    Named(String),
}

impl CategoryChoice {
    pub fn label(&self) -> &str {
        match self {
            Self::All => "all",
            Self::Uncategorized => "uncategorized",
            Self::Named(name) => name,
        }
    }
}

/// Filter panel selections. Empty sets impose no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    #[serde(default)]
    pub types: BTreeSet<TypeChoice>,
    #[serde(default)]
    pub categories: BTreeSet<CategoryChoice>,
    #[serde(default)]
    pub timeframe: Timeframe,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl FilterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, doc_type: DocumentType) -> Self {
        self.types.insert(TypeChoice::Type(doc_type));
        self
    }

    pub fn with_category(mut self, choice: CategoryChoice) -> Self {
        self.categories.insert(choice);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = timeframe;
        self
    }

    /// True when no selection restricts the result.
    pub fn is_default(&self) -> bool {
        self.types.is_empty()
            && self.categories.is_empty()
            && self.tags.is_empty()
            && self.timeframe == Timeframe::All
    }

    fn type_matches(&self, doc: &Document) -> bool {
        self.types.is_empty()
            || self.types.contains(&TypeChoice::All)
            || self.types.contains(&TypeChoice::Type(doc.doc_type))
    }

    fn category_matches(&self, doc: &Document) -> bool {
        if self.categories.is_empty() || self.categories.contains(&CategoryChoice::All) {
            return true;
        }
        match doc.category_name() {
            Some(name) => self
                .categories
                .contains(&CategoryChoice::Named(name.to_string())),
            None => self.categories.contains(&CategoryChoice::Uncategorized),
        }
    }

    fn tag_matches(&self, doc: &Document) -> bool {
        self.tags.is_empty() || doc.tags.iter().any(|t| self.tags.contains(t))
    }
}

/// Filter documents against the local clock.
pub fn filter_documents<'a>(
    documents: &'a [Document],
    section: Section,
    query: &str,
    options: &FilterOptions,
) -> Vec<&'a Document> {
    filter_documents_at(documents, section, query, options, &Local::now())
}

/// Filter documents with the timeframe stage evaluated at `now`.
pub fn filter_documents_at<'a, Tz: TimeZone>(
    documents: &'a [Document],
    section: Section,
    query: &str,
    options: &FilterOptions,
    now: &DateTime<Tz>,
) -> Vec<&'a Document> {
    let mut result: Vec<&Document> = match section {
        Section::Files => documents.iter().collect(),
        Section::Favorites => documents.iter().filter(|d| d.favorite).collect(),
        Section::Articles => documents.iter().filter(|d| d.is_article()).collect(),
        Section::Recent => {
            let mut recent: Vec<&Document> = documents.iter().collect();
            // sort_by is stable: equal timestamps keep their input order
            recent.sort_by(|a, b| b.date_added.cmp(&a.date_added));
            recent.truncate(RECENT_LIMIT);
            recent
        }
    };

    let needle = query.to_lowercase();
    if !needle.is_empty() {
        result.retain(|d| d.matches_query(&needle));
    }

    result.retain(|d| options.type_matches(d));
    result.retain(|d| options.category_matches(d));
    result.retain(|d| options.tag_matches(d));

    if let Some(start) = options.timeframe.window_start(now) {
        result.retain(|d| d.date_added >= start);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset, Utc};
    use uuid::Uuid;

    fn doc(title: &str, doc_type: DocumentType, date: &str) -> Document {
        Document {
            id: Uuid::new_v4(),
            title: title.to_string(),
            doc_type,
            tags: Vec::new(),
            date_added: DateTime::parse_from_rfc3339(date)
                .unwrap()
                .with_timezone(&Utc),
            favorite: false,
            category: None,
            background_color: doc_type.default_color().to_string(),
            content: None,
            storage_path: None,
        }
    }

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-06-10T01:00:00+00:00").unwrap()
    }

    fn run<'a>(
        docs: &'a [Document],
        section: Section,
        query: &str,
        options: &FilterOptions,
    ) -> Vec<&'a Document> {
        filter_documents_at(docs, section, query, options, &now())
    }

    fn titles(docs: &[&Document]) -> Vec<String> {
        docs.iter().map(|d| d.title.clone()).collect()
    }

    fn scenario() -> Vec<Document> {
        let mut article = doc("Notes", DocumentType::Article, "2024-01-01T00:00:00Z");
        article.favorite = true;
        article.content = Some("hello".to_string());
        let pdf = doc("Manual.pdf", DocumentType::Pdf, "2024-06-01T00:00:00Z");
        vec![article, pdf]
    }

    #[test]
    fn test_files_with_defaults_is_identity() {
        let docs = vec![
            doc("b", DocumentType::Pdf, "2024-01-02T00:00:00Z"),
            doc("a", DocumentType::Image, "2024-05-02T00:00:00Z"),
            doc("c", DocumentType::Text, "2023-01-02T00:00:00Z"),
        ];
        let result = run(&docs, Section::Files, "", &FilterOptions::default());
        assert_eq!(titles(&result), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_favorites_section() {
        let docs = scenario();
        let result = run(&docs, Section::Favorites, "", &FilterOptions::default());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, docs[0].id);
    }

    #[test]
    fn test_articles_section() {
        let docs = scenario();
        let result = run(&docs, Section::Articles, "", &FilterOptions::default());
        assert_eq!(titles(&result), vec!["Notes"]);
    }

    #[test]
    fn test_search_matches_title_case_insensitively() {
        let docs = scenario();
        let result = run(&docs, Section::Files, "PDF", &FilterOptions::default());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, docs[1].id);
    }

    #[test]
    fn test_search_matches_tags_and_category() {
        let mut docs = scenario();
        docs[0].tags = vec!["Design".to_string()];
        docs[1].category = Some("Designs".to_string());
        let result = run(&docs, Section::Files, "design", &FilterOptions::default());
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_empty_query_keeps_everything() {
        let docs = scenario();
        let result = run(&docs, Section::Files, "", &FilterOptions::default());
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_query_whitespace_is_matched_literally() {
        let docs = vec![
            doc("two words", DocumentType::Text, "2024-01-01T00:00:00Z"),
            doc("single", DocumentType::Text, "2024-01-02T00:00:00Z"),
        ];
        let opts = FilterOptions::default();
        assert!(run(&docs, Section::Files, "   ", &opts).is_empty());
        assert!(run(&docs, Section::Files, "two words ", &opts).is_empty());
        assert_eq!(
            titles(&run(&docs, Section::Files, "o w", &opts)),
            vec!["two words"]
        );
    }

    #[test]
    fn test_recent_sizes() {
        for size in [0usize, 1, 6, 20] {
            let base = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc);
            let docs: Vec<Document> = (0..size)
                .map(|i| {
                    let mut d = doc(&i.to_string(), DocumentType::Text, "2024-01-01T00:00:00Z");
                    // 7 is coprime with every size used here, so days stay distinct
                    d.date_added = base + Duration::days(((i * 7) % size) as i64);
                    d
                })
                .collect();
            let result = run(&docs, Section::Recent, "", &FilterOptions::default());
            assert_eq!(result.len(), size.min(6));
            assert!(result
                .windows(2)
                .all(|w| w[0].date_added >= w[1].date_added));
            if let Some(first) = result.first() {
                let newest = docs.iter().map(|d| d.date_added).max().unwrap();
                assert_eq!(first.date_added, newest);
            }
        }
    }

    #[test]
    fn test_recent_sort_is_stable_for_ties() {
        let docs = vec![
            doc("first", DocumentType::Text, "2024-01-01T00:00:00Z"),
            doc("second", DocumentType::Text, "2024-01-01T00:00:00Z"),
            doc("newest", DocumentType::Text, "2024-02-01T00:00:00Z"),
        ];
        let result = run(&docs, Section::Recent, "", &FilterOptions::default());
        assert_eq!(titles(&result), vec!["newest", "first", "second"]);
    }

    #[test]
    fn test_type_filter() {
        let docs = scenario();
        let opts = FilterOptions::new().with_type(DocumentType::Pdf);
        assert_eq!(titles(&run(&docs, Section::Files, "", &opts)), vec!["Manual.pdf"]);

        let mut all = opts.clone();
        all.types.insert(TypeChoice::All);
        assert_eq!(run(&docs, Section::Files, "", &all).len(), 2);
    }

    #[test]
    fn test_uncategorized_matches_only_empty_or_absent() {
        let mut docs = vec![
            doc("none", DocumentType::Text, "2024-01-01T00:00:00Z"),
            doc("empty", DocumentType::Text, "2024-01-01T00:00:00Z"),
            doc("work", DocumentType::Text, "2024-01-01T00:00:00Z"),
        ];
        docs[1].category = Some(String::new());
        docs[2].category = Some("Work".to_string());
        let opts = FilterOptions::new().with_category(CategoryChoice::Uncategorized);
        assert_eq!(titles(&run(&docs, Section::Files, "", &opts)), vec!["none", "empty"]);
    }

    #[test]
    fn test_named_category_and_all_sentinel() {
        let mut docs = scenario();
        docs[0].category = Some("Work".to_string());
        let named = FilterOptions::new().with_category(CategoryChoice::Named("Work".to_string()));
        assert_eq!(titles(&run(&docs, Section::Files, "", &named)), vec!["Notes"]);

        let all = named.with_category(CategoryChoice::All);
        assert_eq!(run(&docs, Section::Files, "", &all).len(), 2);
    }

    #[test]
    fn test_named_and_uncategorized_union() {
        let mut docs = scenario();
        docs[0].category = Some("Work".to_string());
        let opts = FilterOptions::new()
            .with_category(CategoryChoice::Named("Work".to_string()))
            .with_category(CategoryChoice::Uncategorized);
        assert_eq!(run(&docs, Section::Files, "", &opts).len(), 2);
    }

    #[test]
    fn test_category_named_like_sentinel_is_not_a_sentinel() {
        let mut docs = scenario();
        docs[0].category = Some("all".to_string());
        let opts = FilterOptions::new().with_category(CategoryChoice::Named("all".to_string()));
        assert_eq!(titles(&run(&docs, Section::Files, "", &opts)), vec!["Notes"]);
    }

    #[test]
    fn test_tag_filter_is_or() {
        let mut docs = scenario();
        docs[0].tags = vec!["a".to_string(), "b".to_string()];
        docs[1].tags = vec!["d".to_string()];
        let opts = FilterOptions::new().with_tag("b").with_tag("c");
        assert_eq!(titles(&run(&docs, Section::Files, "", &opts)), vec!["Notes"]);
    }

    #[test]
    fn test_timeframe_today_excludes_yesterday() {
        let docs = vec![
            doc("yesterday", DocumentType::Text, "2024-06-09T00:00:00Z"),
            doc("today", DocumentType::Text, "2024-06-10T00:30:00Z"),
        ];
        let opts = FilterOptions::new().with_timeframe(Timeframe::Today);
        assert_eq!(titles(&run(&docs, Section::Files, "", &opts)), vec!["today"]);
    }

    #[test]
    fn test_stages_intersect() {
        let mut docs = scenario();
        docs[1].favorite = true;
        docs[1].tags = vec!["manual".to_string()];
        let opts = FilterOptions::new()
            .with_type(DocumentType::Pdf)
            .with_tag("manual");
        let result = run(&docs, Section::Favorites, "man", &opts);
        assert_eq!(titles(&result), vec!["Manual.pdf"]);
        let result = run(&docs, Section::Articles, "man", &opts);
        assert!(result.is_empty());
    }

    #[test]
    fn test_filter_is_idempotent() {
        let mut docs: Vec<Document> = (0..10)
            .map(|i| {
                let mut d = doc(
                    &format!("doc {}", i),
                    DocumentType::ALL[i % 7],
                    "2024-06-01T00:00:00Z",
                );
                d.date_added += Duration::days(i as i64);
                d.tags = vec![format!("t{}", i % 3)];
                d
            })
            .collect();
        docs[3].favorite = true;
        let opts = FilterOptions::new().with_tag("t0").with_tag("t1");
        for section in Section::ALL {
            let once: Vec<Document> = run(&docs, section, "doc", &opts)
                .into_iter()
                .cloned()
                .collect();
            let twice: Vec<Document> = run(&once, section, "doc", &opts)
                .into_iter()
                .cloned()
                .collect();
            assert_eq!(once, twice, "section {}", section);
        }
    }

    #[test]
    fn test_options_serde_shape() {
        let opts = FilterOptions::new()
            .with_type(DocumentType::Pdf)
            .with_category(CategoryChoice::Uncategorized);
        let value = serde_json::to_value(&opts).unwrap();
        assert_eq!(value["types"][0]["type"], "pdf");
        assert_eq!(value["categories"][0], "uncategorized");
        assert_eq!(value["timeframe"], "all");
    }
}
