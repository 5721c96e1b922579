//! Collection queries understood by the document store

use serde::{Deserialize, Serialize};

/// Sort direction for [`OrderBy`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

/// Ordering clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Equality filter on a top-level field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FieldFilter {
    Equals {
        field: String,
        value: serde_json::Value,
    },
}

impl FieldFilter {
    /// Whether a document's fields satisfy this filter
    pub fn matches(&self, data: &serde_json::Value) -> bool {
        match self {
            FieldFilter::Equals { field, value } => data.get(field) == Some(value),
        }
    }
}

/// A subscription or read query over one collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionQuery {
    pub collection: String,
    pub filter: Option<FieldFilter>,
    pub order_by: Option<OrderBy>,
}

impl CollectionQuery {
    /// Query every document of a collection, unordered
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filter: None,
            order_by: None,
        }
    }

    pub fn where_eq(
        mut self,
        field: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.filter = Some(FieldFilter::Equals {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn order_by_desc(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction: Direction::Desc,
        });
        self
    }

    pub fn order_by_asc(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction: Direction::Asc,
        });
        self
    }

    /// Whether a document in `collection` with `data` belongs to this query
    pub fn matches(&self, collection: &str, data: &serde_json::Value) -> bool {
        self.collection == collection
            && self.filter.as_ref().is_none_or(|filter| filter.matches(data))
    }
}
