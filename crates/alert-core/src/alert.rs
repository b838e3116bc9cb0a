//! Alert model and severity policy

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Which collection an alert came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSource {
    Incident,
    Sos,
}

/// Urgency buckets, ordered from least to most urgent
///
/// The buckets and spellings come from the severity labels the mobile client
/// writes; anything unrecognized lands in `Unknown` rather than being
/// guessed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Unknown,
    Low,
    Moderate,
    High,
    Immediate,
}

impl Severity {
    /// Parse a stored severity label
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("immediate") => Severity::Immediate,
            Some("high") => Severity::High,
            Some("moderate") | Some("medium") => Severity::Moderate,
            Some("low") => Severity::Low,
            _ => Severity::Unknown,
        }
    }

    /// Uppercase label for display
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Immediate => "IMMEDIATE",
            Severity::High => "HIGH",
            Severity::Moderate => "MODERATE",
            Severity::Low => "LOW",
            Severity::Unknown => "UNKNOWN",
        }
    }
}

/// One labelled line of an alert
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDetail {
    pub label: String,
    pub value: String,
    /// Render larger than the other rows
    pub emphasize: bool,
}

impl AlertDetail {
    /// A plain detail row
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            emphasize: false,
        }
    }

    /// An emphasized detail row
    pub fn emphasized(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            emphasize: true,
        }
    }
}

/// The alert surfaced to the dispatcher on duty
///
/// At most one alert is visible at a time; a newer alert replaces the
/// visible one unconditionally (see [`crate::AlertDispatcher`]).
#[derive(Debug, Clone)]
pub struct Alert {
    /// Key of the record that raised the alert
    pub id: String,
    pub title: String,
    pub severity: Severity,
    pub source: AlertSource,
    pub details: Vec<AlertDetail>,
    pub created_at: DateTime<Utc>,
    /// `None` means the alert stays up until manually dismissed
    pub auto_close_after: Option<Duration>,
}

impl Alert {
    /// Notification body: one `label: value` line per detail
    pub fn body(&self) -> String {
        self.details
            .iter()
            .map(|detail| format!("{}: {}", detail.label, detail.value))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_parses_every_stored_spelling() {
        assert_eq!(Severity::parse(Some("immediate")), Severity::Immediate);
        assert_eq!(Severity::parse(Some("HIGH")), Severity::High);
        assert_eq!(Severity::parse(Some("moderate")), Severity::Moderate);
        assert_eq!(Severity::parse(Some("medium")), Severity::Moderate);
        assert_eq!(Severity::parse(Some("low")), Severity::Low);
        assert_eq!(Severity::parse(Some("critical?")), Severity::Unknown);
        assert_eq!(Severity::parse(None), Severity::Unknown);
    }

    #[test]
    fn severity_orders_by_urgency() {
        assert!(Severity::Immediate > Severity::High);
        assert!(Severity::High > Severity::Moderate);
        assert!(Severity::Moderate > Severity::Low);
        assert!(Severity::Low > Severity::Unknown);
    }
}
