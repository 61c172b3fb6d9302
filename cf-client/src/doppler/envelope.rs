//! Dropsonde event envelopes
//!
//! Hand-written `prost` messages for the subset of the dropsonde protocol
//! served by Doppler's HTTP endpoints. Field tags match the upstream
//! `envelope.proto`, `log.proto`, `metric.proto`, `error.proto` and
//! `http.proto` definitions.

use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum EventType {
    HttpStartStop = 4,
    LogMessage = 5,
    ValueMetric = 6,
    CounterEvent = 7,
    Error = 8,
    ContainerMetric = 9,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Envelope {
    /// Unique description of the emitting process
    #[prost(string, required, tag = "1")]
    pub origin: String,
    #[prost(enumeration = "EventType", required, tag = "2")]
    pub event_type: i32,
    /// Nanoseconds since the unix epoch
    #[prost(int64, optional, tag = "6")]
    pub timestamp: Option<i64>,
    #[prost(string, optional, tag = "13")]
    pub deployment: Option<String>,
    #[prost(string, optional, tag = "14")]
    pub job: Option<String>,
    #[prost(string, optional, tag = "15")]
    pub index: Option<String>,
    #[prost(string, optional, tag = "16")]
    pub ip: Option<String>,
    #[prost(map = "string, string", tag = "17")]
    pub tags: HashMap<String, String>,
    #[prost(message, optional, tag = "7")]
    pub http_start_stop: Option<HttpStartStop>,
    #[prost(message, optional, tag = "8")]
    pub log_message: Option<LogMessage>,
    #[prost(message, optional, tag = "9")]
    pub value_metric: Option<ValueMetric>,
    #[prost(message, optional, tag = "10")]
    pub counter_event: Option<CounterEvent>,
    #[prost(message, optional, tag = "11")]
    pub error: Option<Error>,
    #[prost(message, optional, tag = "12")]
    pub container_metric: Option<ContainerMetric>,
}

/// The payload of an [`Envelope`], selected by its event type
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    HttpStartStop(HttpStartStop),
    LogMessage(LogMessage),
    ValueMetric(ValueMetric),
    CounterEvent(CounterEvent),
    Error(Error),
    ContainerMetric(ContainerMetric),
}

impl Envelope {
    /// The event matching `event_type`, if the envelope carries it
    pub fn event(&self) -> Option<Event> {
        match EventType::try_from(self.event_type).ok()? {
            EventType::HttpStartStop => self.http_start_stop.clone().map(Event::HttpStartStop),
            EventType::LogMessage => self.log_message.clone().map(Event::LogMessage),
            EventType::ValueMetric => self.value_metric.clone().map(Event::ValueMetric),
            EventType::CounterEvent => self.counter_event.clone().map(Event::CounterEvent),
            EventType::Error => self.error.clone().map(Event::Error),
            EventType::ContainerMetric => self.container_metric.clone().map(Event::ContainerMetric),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum MessageType {
    Out = 1,
    Err = 2,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct LogMessage {
    #[prost(bytes = "vec", required, tag = "1")]
    pub message: Vec<u8>,
    #[prost(enumeration = "MessageType", required, tag = "2")]
    pub message_type: i32,
    #[prost(int64, required, tag = "3")]
    pub timestamp: i64,
    #[prost(string, optional, tag = "4")]
    pub app_id: Option<String>,
    /// e.g. `APP`, `RTR`, `STG`
    #[prost(string, optional, tag = "5")]
    pub source_type: Option<String>,
    #[prost(string, optional, tag = "6")]
    pub source_instance: Option<String>,
}

impl LogMessage {
    pub fn message_text(&self) -> String {
        String::from_utf8_lossy(&self.message).into_owned()
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ContainerMetric {
    #[prost(string, required, tag = "1")]
    pub application_id: String,
    #[prost(int32, required, tag = "2")]
    pub instance_index: i32,
    #[prost(double, required, tag = "3")]
    pub cpu_percentage: f64,
    #[prost(uint64, required, tag = "4")]
    pub memory_bytes: u64,
    #[prost(uint64, required, tag = "5")]
    pub disk_bytes: u64,
    #[prost(uint64, optional, tag = "6")]
    pub memory_bytes_quota: Option<u64>,
    #[prost(uint64, optional, tag = "7")]
    pub disk_bytes_quota: Option<u64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ValueMetric {
    #[prost(string, required, tag = "1")]
    pub name: String,
    #[prost(double, required, tag = "2")]
    pub value: f64,
    #[prost(string, required, tag = "3")]
    pub unit: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CounterEvent {
    #[prost(string, required, tag = "1")]
    pub name: String,
    #[prost(uint64, required, tag = "2")]
    pub delta: u64,
    #[prost(uint64, optional, tag = "3")]
    pub total: Option<u64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Error {
    #[prost(string, required, tag = "1")]
    pub source: String,
    #[prost(int32, required, tag = "2")]
    pub code: i32,
    #[prost(string, required, tag = "3")]
    pub message: String,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, prost::Message)]
pub struct Uuid {
    #[prost(uint64, required, tag = "1")]
    pub low: u64,
    #[prost(uint64, required, tag = "2")]
    pub high: u64,
}

impl std::fmt::Display for Uuid {
    /// Formats as the canonical 8-4-4-4-12 form; both halves are little-endian
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&self.low.to_le_bytes());
        bytes[8..].copy_from_slice(&self.high.to_le_bytes());
        for (i, byte) in bytes.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                f.write_str("-")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum PeerType {
    Client = 1,
    Server = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Method {
    Get = 1,
    Post = 2,
    Put = 3,
    Delete = 4,
    Head = 5,
    Acl = 6,
    BaselineControl = 7,
    Bind = 8,
    Checkin = 9,
    Checkout = 10,
    Connect = 11,
    Copy = 12,
    Debug = 13,
    Label = 14,
    Link = 15,
    Lock = 16,
    Merge = 17,
    Mkactivity = 18,
    Mkcalendar = 19,
    Mkcol = 20,
    Mkredirectref = 21,
    Mkworkspace = 22,
    Move = 23,
    Options = 24,
    Orderpatch = 25,
    Patch = 26,
    Pri = 27,
    Propfind = 28,
    Proppatch = 29,
    Rebind = 30,
    Report = 31,
    Search = 32,
    Showmethod = 33,
    Spacejump = 34,
    Textsearch = 35,
    Trace = 36,
    Track = 37,
    Unbind = 38,
    Uncheckout = 39,
    Unlink = 40,
    Unlock = 41,
    Update = 42,
    Updateredirectref = 43,
    VersionControl = 44,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct HttpStartStop {
    #[prost(int64, required, tag = "1")]
    pub start_timestamp: i64,
    #[prost(int64, required, tag = "2")]
    pub stop_timestamp: i64,
    #[prost(message, required, tag = "3")]
    pub request_id: Uuid,
    #[prost(enumeration = "PeerType", required, tag = "4")]
    pub peer_type: i32,
    #[prost(enumeration = "Method", required, tag = "5")]
    pub method: i32,
    #[prost(string, required, tag = "6")]
    pub uri: String,
    #[prost(string, required, tag = "7")]
    pub remote_address: String,
    #[prost(string, required, tag = "8")]
    pub user_agent: String,
    #[prost(int32, required, tag = "9")]
    pub status_code: i32,
    #[prost(int64, required, tag = "10")]
    pub content_length: i64,
    #[prost(message, optional, tag = "12")]
    pub application_id: Option<Uuid>,
    #[prost(int32, optional, tag = "13")]
    pub instance_index: Option<i32>,
    #[prost(string, optional, tag = "14")]
    pub instance_id: Option<String>,
    #[prost(string, repeated, tag = "15")]
    pub forwarded: Vec<String>,
}
