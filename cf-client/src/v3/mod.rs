//! Cloud Controller v3 API

pub mod jobs;
pub mod packages;
pub mod processes;
pub mod service_offerings;

use crate::operations::Params;
use crate::pagination::Link;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use jobs::Jobs;
pub use packages::Packages;
pub use processes::Processes;
pub use service_offerings::ServiceOfferings;

const V3: &str = "v3";

pub type Links = BTreeMap<String, Link>;

/// Labels and annotations; a `None` value removes the key on update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, Option<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipData {
    pub guid: String,
}

/// A to-one relationship, `{"data": {"guid": ...}}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToOneRelationship {
    pub data: Option<RelationshipData>,
}

impl ToOneRelationship {
    pub fn new(guid: impl Into<String>) -> Self {
        Self {
            data: Some(RelationshipData { guid: guid.into() }),
        }
    }

    pub fn guid(&self) -> Option<&str> {
        self.data.as_ref().map(|data| data.guid.as_str())
    }
}

/// Paging and ordering common to every v3 list request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Field to order by, prefixed with `-` for descending order
    pub order_by: Option<String>,
    pub label_selector: Option<String>,
}

impl PageRequest {
    fn apply(&self, params: Params, page: Option<u32>) -> Params {
        params
            .query_opt("page", page.or(self.page))
            .query_opt("per_page", self.per_page)
            .query_opt("order_by", self.order_by.as_deref())
            .query_opt("label_selector", self.label_selector.as_deref())
    }
}
