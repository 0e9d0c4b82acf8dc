//! Pagination, ordering and text-search helpers shared by the adapter and
//! the browse engine.

use crate::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default number of records per page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// How a freshly read collection is ordered before slicing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecencyPolicy {
    /// Reverse store key order so the newest record comes first
    #[default]
    MostRecentFirst,
    /// Keep the store's enumeration order
    StoreOrder,
}

impl RecencyPolicy {
    /// Put records read in store key order into this policy's order.
    pub fn apply(self, records: &mut [Record]) {
        if self == RecencyPolicy::MostRecentFirst {
            records.reverse();
        }
    }
}

/// Equality filter on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: String,
    pub value: String,
}

impl FieldFilter {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        record.field_text(&self.field).as_deref() == Some(self.value.as_str())
    }

    /// Stored values whose JSON text equals the filter value: the string
    /// itself, plus the number or boolean it spells when it parses as one.
    pub fn query_values(&self) -> Vec<Value> {
        let mut values = vec![Value::String(self.value.clone())];
        if let Ok(parsed @ (Value::Number(_) | Value::Bool(_))) = serde_json::from_str::<Value>(&self.value) {
            values.push(parsed);
        }
        values
    }
}

/// Window and filters for one page fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    /// 1-based page number
    pub page: usize,
    pub page_size: usize,
    pub filter: Option<FieldFilter>,
    pub search: Option<String>,
    pub order: RecencyPolicy,
}

impl PageQuery {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            page,
            page_size,
            filter: None,
            search: None,
            order: RecencyPolicy::default(),
        }
    }

    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter = Some(FieldFilter::new(field, value));
        self
    }

    /// Blank search text is treated as no search.
    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.search = if text.trim().is_empty() {
            None
        } else {
            Some(text)
        };
        self
    }

    pub fn with_order(mut self, order: RecencyPolicy) -> Self {
        self.order = order;
        self
    }
}

impl Default for PageQuery {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

/// One page of records plus the filtered, unpaginated total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub records: Vec<Record>,
    pub total_count: usize,
}

/// Bounds of the 1-based `page` in a list of `len` items.
///
/// Page 0 is treated as page 1. Pages past the end are empty.
pub fn page_bounds(len: usize, page: usize, page_size: usize) -> std::ops::Range<usize> {
    let page = page.max(1);
    let start = (page - 1).saturating_mul(page_size).min(len);
    let end = page.saturating_mul(page_size).min(len);
    start..end
}

/// Number of pages needed for `total` items.
pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

/// Slice one page out of an owned list.
pub fn paginate<T>(mut items: Vec<T>, page: usize, page_size: usize) -> Vec<T> {
    let range = page_bounds(items.len(), page, page_size);
    items.truncate(range.end);
    items.split_off(range.start)
}

/// Case-insensitive substring match of `needle` against any of `fields`.
pub fn matches_search(record: &Record, fields: &[String], needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    fields.iter().any(|field| {
        record
            .field_text(field)
            .is_some_and(|text| text.to_lowercase().contains(&needle))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_values_follow_json_text() {
        assert_eq!(FieldFilter::new("type", "story").query_values(), vec![json!("story")]);
        assert_eq!(FieldFilter::new("level", "2").query_values(), vec![json!("2"), json!(2)]);
        assert_eq!(
            FieldFilter::new("draft", "true").query_values(),
            vec![json!("true"), json!(true)]
        );
        assert_eq!(FieldFilter::new("tags", "[1]").query_values(), vec![json!("[1]")]);
    }

    #[test]
    fn bounds_within_and_past_end() {
        assert_eq!(page_bounds(25, 1, 10), 0..10);
        assert_eq!(page_bounds(25, 3, 10), 20..25);
        assert_eq!(page_bounds(25, 4, 10), 25..25);
        assert_eq!(page_bounds(25, 0, 10), 0..10);
        assert_eq!(page_bounds(25, 2, 0), 0..0);
    }

    #[test]
    fn paginate_owned() {
        let items: Vec<u32> = (1..=7).collect();
        assert_eq!(paginate(items.clone(), 2, 3), vec![4, 5, 6]);
        assert_eq!(paginate(items.clone(), 3, 3), vec![7]);
        assert!(paginate(items, 9, 3).is_empty());
    }

    #[test]
    fn counts_pages() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(5, 0), 0);
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let record = Record::new(
            "p1",
            json!({"title": "The Raven", "author": "Poe"})
                .as_object()
                .cloned()
                .unwrap(),
        );
        let fields = vec!["title".to_string(), "author".to_string()];

        assert!(matches_search(&record, &fields, "raven"));
        assert!(matches_search(&record, &fields, "POE"));
        assert!(matches_search(&record, &fields, "  "));
        assert!(!matches_search(&record, &fields, "lenore"));
        assert!(!matches_search(&record, &["body".to_string()], "raven"));
    }

    #[test]
    fn blank_search_is_dropped() {
        let query = PageQuery::new(1, 5).with_search("   ");
        assert_eq!(query.search, None);
    }
}
