//! Cursor-paginated list envelopes.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Page size used when the caller does not send `limit`.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Largest `limit` accepted by the organization admin lists.
pub const ADMIN_MAX_PAGE_LIMIT: u32 = 100;

/// Largest `limit` accepted by the message batch list.
pub const BATCH_MAX_PAGE_LIMIT: u32 = 1000;

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub has_more: bool,
    pub first_id: Option<String>,
    pub last_id: Option<String>,
}

impl<T> Page<T> {
    /// Wrap `data`, deriving `first_id`/`last_id` with `id_of`.
    pub fn new(data: Vec<T>, has_more: bool, id_of: impl Fn(&T) -> &str) -> Self {
        let first_id = data.first().map(|item| id_of(item).to_string());
        let last_id = data.last().map(|item| id_of(item).to_string());
        Self {
            data,
            has_more,
            first_id,
            last_id,
        }
    }
}

/// Pagination query parameters shared by every list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl PageRequest {
    /// First page with the given limit.
    #[must_use]
    pub fn first(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Page following `id`.
    #[must_use]
    pub fn after(id: impl Into<String>, limit: u32) -> Self {
        Self {
            after_id: Some(id.into()),
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Page preceding `id`.
    #[must_use]
    pub fn before(id: impl Into<String>, limit: u32) -> Self {
        Self {
            before_id: Some(id.into()),
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Effective limit, validated against `max`.
    pub fn limit(&self, max: u32) -> Result<usize> {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if limit == 0 || limit > max {
            return Err(Error::invalid(format!(
                "limit: must be between 1 and {}",
                max
            )));
        }
        Ok(limit as usize)
    }
}

/// Cut one page out of `items`, which must already be in list order.
///
/// - `after_id`: the items directly after the cursor; `has_more` reports
///   whether anything follows the page.
/// - `before_id`: the items directly before the cursor; `has_more` reports
///   whether anything precedes the page.
/// - neither: the head of the list.
///
/// Sending both cursors, or a cursor that is not in the list, is an
/// invalid request.
pub fn paginate<T>(
    items: Vec<T>,
    request: &PageRequest,
    max_limit: u32,
    id_of: impl Fn(&T) -> &str,
) -> Result<Page<T>> {
    let limit = request.limit(max_limit)?;
    let position = |cursor: &str, name: &str| {
        items
            .iter()
            .position(|item| id_of(item) == cursor)
            .ok_or_else(|| Error::invalid(format!("{}: no item with id '{}'", name, cursor)))
    };

    match (&request.after_id, &request.before_id) {
        (Some(_), Some(_)) => Err(Error::invalid(
            "before_id and after_id cannot be combined",
        )),
        (Some(after), None) => {
            let start = position(after, "after_id")?.saturating_add(1);
            let remaining = items.len().saturating_sub(start);
            let has_more = remaining > limit;
            let data: Vec<T> = items.into_iter().skip(start).take(limit).collect();
            Ok(Page::new(data, has_more, &id_of))
        }
        (None, Some(before)) => {
            let end = position(before, "before_id")?;
            let start = end.saturating_sub(limit);
            let data: Vec<T> = items.into_iter().skip(start).take(end - start).collect();
            Ok(Page::new(data, start > 0, &id_of))
        }
        (None, None) => {
            let has_more = items.len() > limit;
            let data: Vec<T> = items.into_iter().take(limit).collect();
            Ok(Page::new(data, has_more, &id_of))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("item_{i}")).collect()
    }

    fn page(items: Vec<String>, req: &PageRequest) -> Page<String> {
        paginate(items, req, ADMIN_MAX_PAGE_LIMIT, |s| s.as_str()).unwrap()
    }

    #[test]
    fn head_of_list() {
        let p = page(ids(5), &PageRequest::first(2));
        assert_eq!(p.data, vec!["item_0", "item_1"]);
        assert!(p.has_more);
        assert_eq!(p.first_id.as_deref(), Some("item_0"));
        assert_eq!(p.last_id.as_deref(), Some("item_1"));
    }

    #[test]
    fn default_limit_is_twenty() {
        let p = page(ids(25), &PageRequest::default());
        assert_eq!(p.data.len(), 20);
        assert!(p.has_more);
    }

    #[test]
    fn after_cursor_walks_forward() {
        let p = page(ids(5), &PageRequest::after("item_1", 2));
        assert_eq!(p.data, vec!["item_2", "item_3"]);
        assert!(p.has_more);

        let p = page(ids(5), &PageRequest::after("item_3", 2));
        assert_eq!(p.data, vec!["item_4"]);
        assert!(!p.has_more);
    }

    #[test]
    fn before_cursor_walks_backward() {
        let p = page(ids(5), &PageRequest::before("item_4", 2));
        assert_eq!(p.data, vec!["item_2", "item_3"]);
        assert!(p.has_more);

        let p = page(ids(5), &PageRequest::before("item_1", 2));
        assert_eq!(p.data, vec!["item_0"]);
        assert!(!p.has_more);
    }

    #[test]
    fn empty_list_has_null_cursors() {
        let p = page(Vec::new(), &PageRequest::default());
        assert!(p.data.is_empty());
        assert!(!p.has_more);
        assert!(p.first_id.is_none());
        assert!(p.last_id.is_none());
    }

    #[test]
    fn rejects_bad_limits_and_cursors() {
        let err = paginate(ids(3), &PageRequest::first(0), 100, |s| s.as_str()).unwrap_err();
        assert!(err.to_string().contains("between 1 and 100"));
        assert!(paginate(ids(3), &PageRequest::first(101), 100, |s| s.as_str()).is_err());
        assert!(paginate(ids(3), &PageRequest::after("nope", 1), 100, |s| s.as_str()).is_err());

        let both = PageRequest {
            before_id: Some("item_1".into()),
            after_id: Some("item_0".into()),
            limit: None,
        };
        assert!(paginate(ids(3), &both, 100, |s| s.as_str()).is_err());
    }

    #[test]
    fn serializes_envelope() {
        let p = page(ids(1), &PageRequest::default());
        assert_eq!(
            serde_json::to_value(&p).unwrap(),
            serde_json::json!({
                "data": ["item_0"],
                "has_more": false,
                "first_id": "item_0",
                "last_id": "item_0"
            })
        );
    }
}
