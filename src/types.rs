use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Alert severity levels understood by Slack Manager
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Panic,
    Error,
    Warning,
    Resolved,
    Info,
}

impl Display for AlertSeverity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Panic => write!(f, "panic"),
            AlertSeverity::Error => write!(f, "error"),
            AlertSeverity::Warning => write!(f, "warning"),
            AlertSeverity::Resolved => write!(f, "resolved"),
            AlertSeverity::Info => write!(f, "info"),
        }
    }
}

/// A title/value pair rendered as a field of the Slack message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertField {
    pub title: String,
    pub value: String,
}

/// Slack Manager alert payload
///
/// The client does not interpret alerts; they are serialized as-is into the
/// `alerts` array of the request body and validated by the server.
///
/// # Example
///
/// ```rust
/// use slack_manager_client::{Alert, AlertSeverity};
///
/// let alert = Alert::new("Disk almost full")
///     .with_text("/var is at 93%")
///     .with_severity(AlertSeverity::Warning)
///     .with_slack_channel_id("C0123456789")
///     .with_correlation_id("disk-var-prod-1")
///     .with_field("Host", "prod-1");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Headline of the Slack message
    pub header: String,

    /// Message body (Slack mrkdwn)
    #[serde(default)]
    pub text: String,

    /// Plain text used for notifications
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_text: Option<String>,

    /// Alerts sharing a correlation ID update the same Slack message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    /// Target channel, mutually exclusive with `route_key` on the server side
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slack_channel_id: Option<String>,

    /// Routing key resolved to a channel by the server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<AlertSeverity>,

    /// When the alert was raised
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<AlertField>,
}

impl Alert {
    /// Create a new alert with the given header, timestamped now
    pub fn new(header: &str) -> Self {
        Self {
            header: header.to_string(),
            timestamp: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_fallback_text(mut self, text: &str) -> Self {
        self.fallback_text = Some(text.to_string());
        self
    }

    pub fn with_correlation_id(mut self, id: &str) -> Self {
        self.correlation_id = Some(id.to_string());
        self
    }

    pub fn with_slack_channel_id(mut self, channel_id: &str) -> Self {
        self.slack_channel_id = Some(channel_id.to_string());
        self
    }

    pub fn with_route_key(mut self, route_key: &str) -> Self {
        self.route_key = Some(route_key.to_string());
        self
    }

    pub fn with_severity(mut self, severity: AlertSeverity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Set custom timestamp
    ///
    /// By default, the timestamp is the time the alert was created.
    pub fn with_timestamp(mut self, time: DateTime<Utc>) -> Self {
        self.timestamp = Some(time);
        self
    }

    /// Append a field
    pub fn with_field(mut self, title: &str, value: &str) -> Self {
        self.fields.push(AlertField {
            title: title.to_string(),
            value: value.to_string(),
        });
        self
    }

    /// Mark the alert as resolved
    pub fn resolve(self) -> Self {
        self.with_severity(AlertSeverity::Resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_creation() {
        let alert = Alert::new("TestAlert")
            .with_text("body")
            .with_severity(AlertSeverity::Warning)
            .with_route_key("backend");

        assert_eq!(alert.header, "TestAlert");
        assert_eq!(alert.text, "body");
        assert_eq!(alert.severity, Some(AlertSeverity::Warning));
        assert_eq!(alert.route_key.as_deref(), Some("backend"));
        assert!(alert.timestamp.is_some());
        assert!(alert.slack_channel_id.is_none());
    }

    #[test]
    fn test_alert_serialization() {
        let alert = Alert::new("TestAlert")
            .with_severity(AlertSeverity::Error)
            .with_slack_channel_id("C123")
            .with_correlation_id("abc");

        let json = serde_json::to_string(&alert).unwrap();
        assert!(json.contains("\"header\":\"TestAlert\""));
        assert!(json.contains("\"severity\":\"error\""));
        assert!(json.contains("\"slackChannelId\":\"C123\""));
        assert!(json.contains("\"correlationId\":\"abc\""));
        assert!(!json.contains("routeKey"));
        assert!(!json.contains("fields"));
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(AlertSeverity::Panic.to_string(), "panic");
        assert_eq!(AlertSeverity::Error.to_string(), "error");
        assert_eq!(AlertSeverity::Warning.to_string(), "warning");
        assert_eq!(AlertSeverity::Resolved.to_string(), "resolved");
        assert_eq!(AlertSeverity::Info.to_string(), "info");
    }

    #[test]
    fn test_alert_resolve() {
        let alert = Alert::new("TestAlert")
            .with_severity(AlertSeverity::Error)
            .resolve();
        assert_eq!(alert.severity, Some(AlertSeverity::Resolved));
    }

    #[test]
    fn test_alert_fields_keep_order() {
        let alert = Alert::new("FullAlert")
            .with_field("Env", "production")
            .with_field("Team", "backend");

        assert_eq!(alert.fields.len(), 2);
        assert_eq!(alert.fields[0].title, "Env");
        assert_eq!(alert.fields[1].value, "backend");

        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["fields"][0]["title"], "Env");
    }
}
