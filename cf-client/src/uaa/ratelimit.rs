use crate::error::Result;
use crate::operations::{Operations, Params};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStatus {
    /// `DISABLED`, `ACTIVE` or `PENDING`
    pub status: String,
    pub as_of: Option<String>,
    pub credential_id: Option<String>,
    pub error: Option<String>,
    /// Number of configured limiter mappings
    pub limiter_mappings: Option<u32>,
    pub logging_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatus {
    pub status: Option<String>,
    pub as_of: Option<String>,
    pub error: Option<String>,
    pub check_count_attempts: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub current: CurrentStatus,
    pub update: Option<UpdateStatus>,
    pub from_source: Option<String>,
}

/// Response of `GET /RateLimitingStatus`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub status: Status,
}

impl RateLimitStatus {
    pub fn is_active(&self) -> bool {
        self.status.current.status.eq_ignore_ascii_case("active")
    }
}

#[derive(Debug, Clone)]
pub struct RateLimit {
    ops: Operations,
}

impl RateLimit {
    pub(crate) fn new(ops: Operations) -> Self {
        Self { ops }
    }

    /// State of the UAA server side rate limiter
    pub async fn get_status(&self) -> Result<RateLimitStatus> {
        self.ops.get(&["RateLimitingStatus"], Params::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_deserialization() {
        let status: RateLimitStatus = serde_json::from_str(
            r#"{"status": {
                "current": {"status": "ACTIVE", "asOf": "2022-01-06T12:00:00Z",
                            "limiterMappings": 10, "loggingLevel": "OnlyLimited"},
                "fromSource": "/etc/uaa/ratelimit.yml"
            }}"#,
        )
        .unwrap();
        assert!(status.is_active());
        assert_eq!(status.status.current.limiter_mappings, Some(10));
        assert!(status.status.update.is_none());
    }
}
