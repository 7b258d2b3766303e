//! Query-parameter encoding for list filters.
//!
//! Parameters are emitted in declaration order and absent values are left
//! out entirely, so the transport never sees a null.

use std::fmt::Display;

use crate::model::{ModelId, Timestamp};
use crate::types::ResultStatus;

/// Ordered query parameters.
pub type QueryParams = Vec<(String, String)>;

/// Comma-join ids in their original order. Absent and empty lists both give
/// an empty string.
pub fn join_ids<T: Display>(ids: Option<&[T]>) -> String {
    ids.unwrap_or_default()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// A filter that encodes itself as query parameters.
pub trait QueryFilter {
    fn to_query(&self) -> QueryParams;
}

/// Pagination plus a status filter (`get_results`, `get_results_for_case`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusFilter {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub status_ids: Option<Vec<ResultStatus>>,
}

impl QueryFilter for StatusFilter {
    fn to_query(&self) -> QueryParams {
        let mut params = QueryParams::new();
        push(&mut params, "limit", self.limit);
        push(&mut params, "offset", self.offset);
        push_ids(&mut params, "status_id", self.status_ids.as_deref());
        params
    }
}

/// `StatusFilter` plus creation-time bounds and creators
/// (`get_results_for_run`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatedFilter {
    pub created_after: Option<Timestamp>,
    pub created_before: Option<Timestamp>,
    pub created_by: Option<Vec<ModelId>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub status_ids: Option<Vec<ResultStatus>>,
}

impl QueryFilter for CreatedFilter {
    fn to_query(&self) -> QueryParams {
        let mut params = QueryParams::new();
        push(&mut params, "created_after", self.created_after);
        push(&mut params, "created_before", self.created_before);
        push_ids(&mut params, "created_by", self.created_by.as_deref());
        push(&mut params, "limit", self.limit);
        push(&mut params, "offset", self.offset);
        push_ids(&mut params, "status_id", self.status_ids.as_deref());
        params
    }
}

pub(crate) fn push<T: Display>(params: &mut QueryParams, key: &str, value: Option<T>) {
    if let Some(value) = value {
        params.push((key.to_string(), value.to_string()));
    }
}

fn push_ids<T: Display>(params: &mut QueryParams, key: &str, ids: Option<&[T]>) {
    let joined = join_ids(ids);
    if !joined.is_empty() {
        params.push((key.to_string(), joined));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(params: &QueryParams) -> Vec<(&str, &str)> {
        params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }

    #[test]
    fn join_ids_absent_is_empty() {
        assert_eq!(join_ids::<ModelId>(None), "");
    }

    #[test]
    fn join_ids_empty_is_empty() {
        assert_eq!(join_ids::<ModelId>(Some(&[][..])), "");
    }

    #[test]
    fn join_ids_keeps_order_and_duplicates() {
        assert_eq!(join_ids(Some(&[1u64, 2, 3][..])), "1,2,3");
        assert_eq!(join_ids(Some(&[3u64, 1, 3][..])), "3,1,3");
    }

    #[test]
    fn join_ids_accepts_statuses() {
        let statuses = [ResultStatus::Passed, ResultStatus::Failed];
        assert_eq!(join_ids(Some(&statuses[..])), "1,5");
    }

    #[test]
    fn empty_filter_has_no_params() {
        assert!(StatusFilter::default().to_query().is_empty());
        assert!(CreatedFilter::default().to_query().is_empty());
    }

    #[test]
    fn status_filter_omits_absent_values() {
        let filter = StatusFilter {
            limit: Some(10),
            offset: None,
            status_ids: Some(vec![ResultStatus::Retest, ResultStatus::Failed]),
        };
        assert_eq!(pairs(&filter.to_query()), [("limit", "10"), ("status_id", "4,5")]);
    }

    #[test]
    fn empty_status_list_is_omitted() {
        let filter = StatusFilter {
            status_ids: Some(Vec::new()),
            ..StatusFilter::default()
        };
        assert!(filter.to_query().is_empty());
    }

    #[test]
    fn created_filter_is_deterministic() {
        let filter = CreatedFilter {
            created_after: Some(1_393_596_000),
            created_before: Some(1_393_682_400),
            created_by: Some(vec![2, 1]),
            limit: Some(250),
            offset: Some(0),
            status_ids: Some(vec![ResultStatus::Passed]),
        };
        let expected = [
            ("created_after", "1393596000"),
            ("created_before", "1393682400"),
            ("created_by", "2,1"),
            ("limit", "250"),
            ("offset", "0"),
            ("status_id", "1"),
        ];
        assert_eq!(pairs(&filter.to_query()), expected);
        assert_eq!(filter.to_query(), filter.to_query());
    }
}
