//! Wire-compatible record types
//!
//! Serialized field names are shared with the deployed mobile client and the
//! existing database contents; every rename below is load-bearing. Records
//! written by the mobile side accumulate extra fields over app versions, so
//! each type tolerates unknown fields and keeps everything optional that the
//! data has ever left out.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Current time as the ISO-8601 string the store uses (`…Z`, millisecond
/// precision, matching the mobile client's timestamps)
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// A civilian incident report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IncidentRecord {
    #[serde(rename = "crimeType", skip_serializing_if = "Option::is_none")]
    pub crime_type: Option<String>,
    /// Legacy field name still written by old app builds
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(rename = "reporterUid", skip_serializing_if = "Option::is_none")]
    pub reporter_uid: Option<String>,
}

impl IncidentRecord {
    /// The incident kind, whichever spelling the writer used
    pub fn incident_type(&self) -> Option<&str> {
        non_blank(&self.crime_type).or_else(|| non_blank(&self.kind))
    }
}

/// An SOS record, raised from the app or a paired smart watch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SosRecord {
    #[serde(rename = "alertType", skip_serializing_if = "Option::is_none")]
    pub alert_type: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "userName", skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(rename = "reporterName", skip_serializing_if = "Option::is_none")]
    pub reporter_name: Option<String>,
    #[serde(rename = "fullName", skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Snake-case twin written by one early watch firmware
    #[serde(rename = "user_id", skip_serializing_if = "Option::is_none")]
    pub user_id_legacy: Option<String>,
    #[serde(rename = "deviceType", skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl SosRecord {
    /// The SOS kind, whichever spelling the writer used
    pub fn sos_type(&self) -> Option<&str> {
        non_blank(&self.alert_type).or_else(|| non_blank(&self.kind))
    }

    /// A reporter display name carried inside the record itself
    pub fn embedded_reporter_name(&self) -> Option<&str> {
        non_blank(&self.user_name)
            .or_else(|| non_blank(&self.reporter_name))
            .or_else(|| non_blank(&self.full_name))
    }

    /// The reporter id, whichever spelling the writer used
    pub fn reporter_id(&self) -> Option<&str> {
        non_blank(&self.user_id).or_else(|| non_blank(&self.user_id_legacy))
    }

    /// Whether the record came from a paired smart watch
    pub fn is_smart_watch(&self) -> bool {
        self.device_type
            .as_deref()
            .map(|d| d.to_ascii_lowercase().contains("watch"))
            .unwrap_or(false)
    }
}

/// A civilian account record, used for reporter-name enrichment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CivilianAccount {
    #[serde(rename = "firstName", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(rename = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl CivilianAccount {
    /// Human-readable label: "first last", then displayName, then nothing
    pub fn display_label(&self) -> Option<String> {
        let full = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        );
        let full = full.trim();
        if !full.is_empty() {
            return Some(full.to_string());
        }
        self.display_name
            .as_ref()
            .filter(|name| !name.trim().is_empty())
            .cloned()
    }
}

/// One side of a call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "userType")]
    pub user_type: String,
    pub name: String,
}

/// Call record status, as stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Ringing,
    Answered,
    Rejected,
    Ended,
    /// Written by the mobile side when a ringing call times out unanswered
    Missed,
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CallStatus::Ringing => "ringing",
            CallStatus::Answered => "answered",
            CallStatus::Rejected => "rejected",
            CallStatus::Ended => "ended",
            CallStatus::Missed => "missed",
        };
        write!(f, "{label}")
    }
}

/// A call record under `voip_calls/{callId}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    pub caller: Participant,
    pub callee: Participant,
    pub status: CallStatus,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(
        rename = "answeredAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub answered_at: Option<String>,
    #[serde(rename = "endedAt", default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<String>,
    /// Incident the call was placed about, when dialed from a report view
    #[serde(rename = "reportId", default, skip_serializing_if = "Option::is_none")]
    pub report_id: Option<String>,
}

/// An offer or answer session description, in the standard wire shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// `"offer"` or `"answer"`
    #[serde(rename = "type")]
    pub kind: String,
    pub sdp: String,
}

impl SessionDescription {
    /// Build an offer description
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: "offer".to_string(),
            sdp: sdp.into(),
        }
    }

    /// Build an answer description
    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: "answer".to_string(),
            sdp: sdp.into(),
        }
    }
}

/// An ICE candidate as exchanged with the remote mobile client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceCandidateInit {
    pub candidate: String,
    #[serde(rename = "sdpMLineIndex")]
    pub sdp_mline_index: Option<u32>,
    #[serde(rename = "sdpMid")]
    pub sdp_mid: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_record_field_names_stay_wire_compatible() {
        let record = CallRecord {
            caller: Participant {
                user_id: "dispatcher-1".into(),
                user_type: "dispatcher".into(),
                name: "Operations Desk".into(),
            },
            callee: Participant {
                user_id: "civ-9".into(),
                user_type: "civilian".into(),
                name: "Juan Cruz".into(),
            },
            status: CallStatus::Ringing,
            created_at: "2026-01-01T00:00:00.000Z".into(),
            answered_at: None,
            ended_at: None,
            report_id: None,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["caller"]["userId"], "dispatcher-1");
        assert_eq!(value["caller"]["userType"], "dispatcher");
        assert_eq!(value["status"], "ringing");
        assert_eq!(value["createdAt"], "2026-01-01T00:00:00.000Z");
        assert!(value.get("answeredAt").is_none());
    }

    #[test]
    fn call_status_round_trips_every_stored_value() {
        for raw in ["ringing", "answered", "rejected", "ended", "missed"] {
            let status: CallStatus = serde_json::from_value(json!(raw)).unwrap();
            assert_eq!(serde_json::to_value(status).unwrap(), json!(raw));
        }
    }

    #[test]
    fn ice_candidate_uses_standard_member_names() {
        let candidate = IceCandidateInit {
            candidate: "candidate:1 1 udp 2122260223 192.0.2.1 49152 typ host".into(),
            sdp_mline_index: Some(0),
            sdp_mid: Some("0".into()),
        };
        let value = serde_json::to_value(&candidate).unwrap();
        assert_eq!(value["sdpMLineIndex"], 0);
        assert_eq!(value["sdpMid"], "0");
        assert!(value["candidate"].as_str().unwrap().starts_with("candidate:"));
    }

    #[test]
    fn incident_record_reads_mobile_payload() {
        let record: IncidentRecord = serde_json::from_value(json!({
            "crimeType": "Robbery",
            "severity": "high",
            "dateTime": "2026-02-03T04:05:06.000Z",
            "reporterUid": "civ-1",
            "geo": {"lat": 14.6, "lng": 121.0}
        }))
        .unwrap();
        assert_eq!(record.crime_type.as_deref(), Some("Robbery"));
        assert_eq!(record.reporter_uid.as_deref(), Some("civ-1"));
        assert_eq!(record.severity.as_deref(), Some("high"));
    }

    #[test]
    fn record_type_fallbacks_prefer_the_modern_spelling() {
        let incident: IncidentRecord =
            serde_json::from_value(json!({"crimeType": "Theft", "type": "Robbery"})).unwrap();
        assert_eq!(incident.incident_type(), Some("Theft"));

        let legacy: IncidentRecord = serde_json::from_value(json!({"type": "Robbery"})).unwrap();
        assert_eq!(legacy.incident_type(), Some("Robbery"));

        let blank: IncidentRecord = serde_json::from_value(json!({"crimeType": "  "})).unwrap();
        assert_eq!(blank.incident_type(), None);

        let sos: SosRecord = serde_json::from_value(json!({"type": "Panic Button"})).unwrap();
        assert_eq!(sos.sos_type(), Some("Panic Button"));
    }

    #[test]
    fn sos_embedded_reporter_name_falls_back_in_order() {
        let named: SosRecord = serde_json::from_value(json!({
            "reporterName": "Juan Cruz",
            "fullName": "ignored"
        }))
        .unwrap();
        assert_eq!(named.embedded_reporter_name(), Some("Juan Cruz"));

        let blank: SosRecord =
            serde_json::from_value(json!({"userName": " ", "fullName": "Mia Santos"})).unwrap();
        assert_eq!(blank.embedded_reporter_name(), Some("Mia Santos"));

        assert!(SosRecord::default().embedded_reporter_name().is_none());
    }

    #[test]
    fn sos_record_reporter_id_prefers_camel_case() {
        let record: SosRecord = serde_json::from_value(json!({
            "userId": "a",
            "user_id": "b",
            "deviceType": "SmartWatch v2"
        }))
        .unwrap();
        assert_eq!(record.reporter_id(), Some("a"));
        assert!(record.is_smart_watch());

        let legacy: SosRecord = serde_json::from_value(json!({"user_id": "b"})).unwrap();
        assert_eq!(legacy.reporter_id(), Some("b"));
        assert!(!legacy.is_smart_watch());
    }

    #[test]
    fn display_label_falls_back_in_order() {
        let both = CivilianAccount {
            first_name: Some("Ana".into()),
            last_name: Some("Reyes".into()),
            display_name: Some("ignored".into()),
        };
        assert_eq!(both.display_label().as_deref(), Some("Ana Reyes"));

        let display_only = CivilianAccount {
            display_name: Some("anar".into()),
            ..Default::default()
        };
        assert_eq!(display_only.display_label().as_deref(), Some("anar"));

        assert!(CivilianAccount::default().display_label().is_none());
    }
}
