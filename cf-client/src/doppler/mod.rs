//! Doppler HTTP API
//!
//! Recent logs and container metrics of an application, served as
//! `multipart/x-protobuf` streams of dropsonde envelopes. Websocket
//! streaming is not supported.

pub mod envelope;
pub mod multipart;

use crate::error::{ClientError, Result, require_non_empty};
use crate::operations::{Operations, Params};
use reqwest::header::CONTENT_TYPE;

pub use envelope::{ContainerMetric, Envelope, Event, EventType, LogMessage};

const APPS: &str = "apps";

#[derive(Debug, Clone)]
pub struct Doppler {
    ops: Operations,
}

impl Doppler {
    pub(crate) fn new(ops: Operations) -> Self {
        Self { ops }
    }

    /// Buffered log messages of an application
    pub async fn recent_logs(&self, application_id: &str) -> Result<Vec<Envelope>> {
        require_non_empty(application_id, "application id")?;
        self.envelopes(&[APPS, application_id, "recentlogs"]).await
    }

    /// Latest container metric of every instance of an application
    pub async fn container_metrics(&self, application_id: &str) -> Result<Vec<Envelope>> {
        require_non_empty(application_id, "application id")?;
        self.envelopes(&[APPS, application_id, "containermetrics"])
            .await
    }

    async fn envelopes(&self, segments: &[&str]) -> Result<Vec<Envelope>> {
        let response = self.ops.get_raw(segments, Params::new()).await?;
        let content_type = response
            .header(CONTENT_TYPE.as_str())
            .ok_or_else(|| ClientError::Multipart("response has no Content-Type".into()))?;

        let envelopes: Vec<Envelope> = multipart::decode(content_type, &response.body)?;
        tracing::debug!("Decoded {} envelopes from {}", envelopes.len(), segments.join("/"));
        Ok(envelopes)
    }
}

/// Log messages of `envelopes`, ordered by timestamp
pub fn log_messages(envelopes: &[Envelope]) -> Vec<LogMessage> {
    let mut messages: Vec<_> = envelopes
        .iter()
        .filter_map(|envelope| match envelope.event() {
            Some(Event::LogMessage(message)) => Some(message),
            _ => None,
        })
        .collect();
    messages.sort_by_key(|message| message.timestamp);
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use envelope::MessageType;

    fn log(timestamp: i64, text: &str) -> Envelope {
        Envelope {
            origin: "rep".into(),
            event_type: EventType::LogMessage as i32,
            log_message: Some(LogMessage {
                message: text.as_bytes().to_vec(),
                message_type: MessageType::Out as i32,
                timestamp,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_log_messages_sorted() {
        let metric = Envelope {
            origin: "rep".into(),
            event_type: EventType::ContainerMetric as i32,
            container_metric: Some(ContainerMetric::default()),
            ..Default::default()
        };
        let messages = log_messages(&[log(3, "c"), metric, log(1, "a"), log(2, "b")]);
        let texts: Vec<_> = messages.iter().map(LogMessage::message_text).collect();
        assert_eq!(texts, ["a", "b", "c"]);
    }
}
