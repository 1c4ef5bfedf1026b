//! Query options handed to a table's query builder.
//!
//! The engine attaches no meaning to these beyond their shape; each record
//! type's query builder decides which combinations it supports.

use crate::Value;
use serde::{Deserialize, Serialize};

/// How the filter value is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterType {
    ExactUrl,
    Url,
    Guid,
    Id,
    #[default]
    None,
}

/// Result ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuerySort {
    #[default]
    None,
    LastVisit,
    Frecency,
}

/// Filter and sort for a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Opaque filter value
    pub filter: Option<Value>,
    /// How the filter is applied
    pub filter_type: FilterType,
    /// Result ordering
    pub sort: QuerySort,
}

impl QueryOptions {
    pub fn new(filter: Option<Value>, filter_type: FilterType, sort: QuerySort) -> Self {
        Self {
            filter,
            filter_type,
            sort,
        }
    }

    /// Options matching a single filter value.
    pub fn filtered(filter: impl Into<Value>, filter_type: FilterType) -> Self {
        Self {
            filter: Some(filter.into()),
            filter_type,
            sort: QuerySort::None,
        }
    }

    /// Builder method to set the sort order.
    pub fn with_sort(mut self, sort: QuerySort) -> Self {
        self.sort = sort;
        self
    }

    /// Human-readable filter, used in failure messages.
    pub fn describe_filter(&self) -> String {
        match &self.filter {
            Some(value) => value.to_string(),
            None => "none".to_string(),
        }
    }
}
