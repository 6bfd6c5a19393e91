use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One historical probe of the monitored target.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub(crate) struct CheckRecord {
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) is_up: bool,
    pub(crate) status_code: Option<u16>,
    pub(crate) response_time_ms: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub(crate) struct CurrentStatus {
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) is_up: bool,
    pub(crate) status_code: u16,
    pub(crate) response_time_ms: f64,
}

/// Pre-formatted uptime percentages as served by the backend. Every key must
/// be present; a `null` value means the backend has no figure for that span.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub(crate) struct UptimeSummary {
    #[serde(rename = "uptime24h", deserialize_with = "Option::deserialize")]
    pub(crate) uptime_24h: Option<String>,
    #[serde(rename = "uptime7d", deserialize_with = "Option::deserialize")]
    pub(crate) uptime_7d: Option<String>,
    #[serde(rename = "uptime30d", deserialize_with = "Option::deserialize")]
    pub(crate) uptime_30d: Option<String>,
}

/// State of one dashboard widget, replaced wholesale on every refresh.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Widget<T> {
    Loading,
    Ready(T),
    Unavailable,
}
