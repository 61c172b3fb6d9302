use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A single entry of a Cloud Controller v3 error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct V3Error {
    pub code: i64,
    pub title: String,
    pub detail: String,
}

impl fmt::Display for V3Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}): {}", self.title, self.code, self.detail)
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{0}")]
    Validation(String),

    #[error("{error_code}({code}): {description}")]
    ClientV2 {
        status: u16,
        code: i64,
        error_code: String,
        description: String,
        warnings: Vec<String>,
    },

    #[error("{}", join_errors(errors))]
    ClientV3 {
        status: u16,
        errors: Vec<V3Error>,
        warnings: Vec<String>,
    },

    #[error("{error}: {error_description}")]
    Uaa {
        status: u16,
        error: String,
        error_description: String,
        warnings: Vec<String>,
    },

    #[error("Unknown Cloud Foundry Exception ({status}): {payload}")]
    UnknownCloudFoundry {
        status: u16,
        payload: String,
        warnings: Vec<String>,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Envelope decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("Multipart error: {0}")]
    Multipart(String),

    #[error("Throttle error: {0}")]
    Throttle(#[from] cf_throttle::ThrottleError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Job {job_id} failed: {}", join_errors(errors))]
    JobFailed { job_id: String, errors: Vec<V3Error> },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, ClientError>;

fn join_errors(errors: &[V3Error]) -> String {
    errors
        .iter()
        .map(V3Error::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ClientError {
    /// HTTP status of an error response, `None` for local errors
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::ClientV2 { status, .. }
            | ClientError::ClientV3 { status, .. }
            | ClientError::Uaa { status, .. }
            | ClientError::UnknownCloudFoundry { status, .. } => Some(*status),
            ClientError::Transport(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    /// Decoded `X-Cf-Warnings` of an error response
    pub fn warnings(&self) -> &[String] {
        match self {
            ClientError::ClientV2 { warnings, .. }
            | ClientError::ClientV3 { warnings, .. }
            | ClientError::Uaa { warnings, .. }
            | ClientError::UnknownCloudFoundry { warnings, .. } => warnings,
            _ => &[],
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Maps a non-2xx response body onto the matching error shape
    ///
    /// v3 bodies carry an `errors` array, v2 bodies a `code`/`error_code`
    /// pair and UAA bodies an `error` string. Anything else is kept verbatim.
    pub fn from_payload(status: u16, warnings: Vec<String>, body: &[u8]) -> Self {
        let unknown = |warnings| ClientError::UnknownCloudFoundry {
            status,
            payload: String::from_utf8_lossy(body).into_owned(),
            warnings,
        };

        let Ok(serde_json::Value::Object(payload)) = serde_json::from_slice(body) else {
            return unknown(warnings);
        };

        if let Some(errors) = payload.get("errors") {
            if let Ok(errors) = serde_json::from_value::<Vec<V3Error>>(errors.clone()) {
                return ClientError::ClientV3 {
                    status,
                    errors,
                    warnings,
                };
            }
        }

        if let Some(error_code) = payload.get("error_code").and_then(|v| v.as_str()) {
            return ClientError::ClientV2 {
                status,
                code: payload.get("code").and_then(|v| v.as_i64()).unwrap_or(0),
                error_code: error_code.to_string(),
                description: payload
                    .get("description")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                warnings,
            };
        }

        if let Some(error) = payload.get("error").and_then(|v| v.as_str()) {
            return ClientError::Uaa {
                status,
                error: error.to_string(),
                error_description: payload
                    .get("error_description")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                warnings,
            };
        }

        unknown(warnings)
    }
}

/// Error for a required request field that was not set
pub(crate) fn missing(field: &str) -> ClientError {
    ClientError::Validation(format!("{field} must be specified"))
}

pub(crate) fn require<T>(value: &Option<T>, field: &str) -> Result<()> {
    match value {
        Some(_) => Ok(()),
        None => Err(missing(field)),
    }
}

pub(crate) fn require_non_empty(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(missing(field))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v2_payload() {
        let body = br#"{"code":30003,"description":"The organization could not be found: x","error_code":"CF-OrganizationNotFound"}"#;
        let err = ClientError::from_payload(404, vec!["slow".into()], body);
        match &err {
            ClientError::ClientV2 {
                code, error_code, ..
            } => {
                assert_eq!(*code, 30003);
                assert_eq!(error_code, "CF-OrganizationNotFound");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.warnings(), ["slow".to_string()]);
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "CF-OrganizationNotFound(30003): The organization could not be found: x"
        );
    }

    #[test]
    fn test_v3_payload() {
        let body = br#"{"errors":[{"code":10008,"title":"CF-UnprocessableEntity","detail":"bad"}]}"#;
        let err = ClientError::from_payload(422, Vec::new(), body);
        assert!(matches!(&err, ClientError::ClientV3 { errors, .. } if errors.len() == 1));
        assert_eq!(err.to_string(), "CF-UnprocessableEntity(10008): bad");
    }

    #[test]
    fn test_uaa_payload() {
        let body = br#"{"error":"invalid_token","error_description":"expired"}"#;
        let err = ClientError::from_payload(401, Vec::new(), body);
        assert!(matches!(&err, ClientError::Uaa { error, .. } if error == "invalid_token"));
        assert_eq!(err.to_string(), "invalid_token: expired");
    }

    #[test]
    fn test_unknown_payload() {
        let err = ClientError::from_payload(502, Vec::new(), b"Bad Gateway");
        assert!(matches!(
            &err,
            ClientError::UnknownCloudFoundry { payload, .. } if payload == "Bad Gateway"
        ));

        let err = ClientError::from_payload(500, Vec::new(), br#"{"message":"boom"}"#);
        assert!(matches!(err, ClientError::UnknownCloudFoundry { .. }));
    }

    #[test]
    fn test_required_fields() {
        let err = require::<String>(&None, "name").unwrap_err();
        assert_eq!(err.to_string(), "name must be specified");
        assert!(require(&Some(1), "name").is_ok());
        assert!(require_non_empty("  ", "guid").is_err());
    }
}
