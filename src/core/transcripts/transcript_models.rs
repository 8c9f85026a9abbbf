use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Call recording exports can carry participant ids as JSON numbers or strings,
/// so both are accepted and compared as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(untagged)]
pub enum PersonId {
    Number(i64),
    Text(String),
}

/// Call start time: an RFC 3339 string, or epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CallTime {
    EpochMillis(f64),
    Text(String),
}

impl CallTime {
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            CallTime::EpochMillis(ms) if ms.is_finite() => {
                DateTime::<Utc>::from_timestamp_millis(*ms as i64)
            }
            CallTime::EpochMillis(_) => None,
            CallTime::Text(raw) => DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|ts| ts.with_timezone(&Utc)),
        }
    }
}

/// Top-level shape of a call export file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallFile {
    #[serde(default)]
    pub call: Option<CallRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "account_name")]
    pub account_name: Option<String>,
    #[serde(default)]
    pub time: Option<CallTime>,
    #[serde(default)]
    pub transcript: Option<Vec<TranscriptTurn>>,
    #[serde(default)]
    pub users: Vec<InternalUser>,
    #[serde(default)]
    pub external_participants: Vec<ExternalParticipant>,
}

/// One utterance in the transcript.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptTurn {
    #[serde(default)]
    pub person_id: Option<PersonId>,
    #[serde(default)]
    pub text: Option<String>,
}

impl TranscriptTurn {
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalUser {
    #[serde(default)]
    pub person_id: Option<PersonId>,
    #[serde(default)]
    pub user_email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalParticipant {
    #[serde(default)]
    pub person_id: Option<PersonId>,
    #[serde(default)]
    pub email: Option<String>,
}

impl CallRecord {
    /// Title with empty strings treated as missing.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.is_empty())
    }

    pub fn customer_name(&self) -> &str {
        self.account_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or("Unknown Customer")
    }
}
