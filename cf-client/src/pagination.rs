//! Paginated list responses and helpers that collect every page

use crate::error::Result;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Metadata of a v2 resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub guid: String,
    pub url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A v2 resource: metadata plus entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource<E> {
    pub metadata: Metadata,
    pub entity: E,
}

impl<E> Resource<E> {
    pub fn guid(&self) -> &str {
        &self.metadata.guid
    }
}

/// A page of a v2 list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResponse<R> {
    pub total_results: u32,
    pub total_pages: u32,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
    pub resources: Vec<R>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// Pagination block of a v3 list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total_results: u32,
    pub total_pages: u32,
    pub first: Option<Link>,
    pub last: Option<Link>,
    pub next: Option<Link>,
    pub previous: Option<Link>,
}

/// A page of a v3 list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse<R> {
    pub pagination: Pagination,
    pub resources: Vec<R>,
}

/// A page of a UAA SCIM list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimPage<R> {
    pub resources: Vec<R>,
    pub start_index: u32,
    pub items_per_page: u32,
    pub total_results: u32,
    #[serde(default)]
    pub schemas: Vec<String>,
}

/// Requests the first v2 page, then the remaining pages concurrently
pub async fn request_all_v2<R, F, Fut>(fetch: F) -> Result<Vec<R>>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<PaginatedResponse<R>>>,
{
    let first = fetch(1).await?;
    let mut resources = first.resources;
    let rest = try_join_all((2..=first.total_pages).map(&fetch)).await?;
    for page in rest {
        resources.extend(page.resources);
    }
    Ok(resources)
}

/// Requests the first v3 page, then the remaining pages concurrently
pub async fn request_all_v3<R, F, Fut>(fetch: F) -> Result<Vec<R>>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<ListResponse<R>>>,
{
    let first = fetch(1).await?;
    let mut resources = first.resources;
    let rest = try_join_all((2..=first.pagination.total_pages).map(&fetch)).await?;
    for page in rest {
        resources.extend(page.resources);
    }
    Ok(resources)
}
