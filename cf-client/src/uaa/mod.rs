//! UAA API
//!
//! Every UAA request goes through the [`UaaThrottle`](crate::UaaThrottle) of
//! the connection context, so client-side limits mirror the server's
//! rate limiter configuration.

pub mod groups;
pub mod ratelimit;
pub mod tokens;

use crate::operations::Params;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use groups::Groups;
pub use ratelimit::RateLimit;
pub use tokens::Tokens;

/// SCIM resource metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub created: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
    pub version: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Ascending => f.write_str("ascending"),
            SortOrder::Descending => f.write_str("descending"),
        }
    }
}

/// SCIM filtering, sorting and paging
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScimQuery {
    /// SCIM filter expression, e.g. `displayName eq "admins"`
    pub filter: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    /// 1-based index of the first result
    pub start_index: Option<u32>,
    pub count: Option<u32>,
}

impl ScimQuery {
    fn apply(&self, params: Params) -> Params {
        params
            .query_opt("filter", self.filter.as_deref())
            .query_opt("sortBy", self.sort_by.as_deref())
            .query_opt("sortOrder", self.sort_order)
            .query_opt("startIndex", self.start_index)
            .query_opt("count", self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scim_query() {
        let query = ScimQuery {
            filter: Some("displayName eq \"admins\"".into()),
            sort_order: Some(SortOrder::Descending),
            start_index: Some(1),
            count: Some(50),
            ..Default::default()
        };
        assert_eq!(
            query.apply(Params::new()).query_pairs(),
            [
                ("filter".to_string(), "displayName eq \"admins\"".to_string()),
                ("sortOrder".to_string(), "descending".to_string()),
                ("startIndex".to_string(), "1".to_string()),
                ("count".to_string(), "50".to_string())
            ]
        );
    }

    #[test]
    fn test_meta() {
        let meta: Meta = serde_json::from_str(
            r#"{"version":1,"created":"2016-06-03T17:59:30.527Z","lastModified":"2016-06-03T17:59:30.561Z"}"#,
        )
        .unwrap();
        assert_eq!(meta.version, Some(1));
        assert!(meta.last_modified.is_some());
    }
}
