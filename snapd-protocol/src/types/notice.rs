use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use time::OffsetDateTime;

use crate::timestamp::{NoticeTimestamp, deserialize_optional, deserialize_optional_duration};

#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum NoticeType {
    #[display("change-update")]
    ChangeUpdate,
    #[display("refresh-inhibit")]
    RefreshInhibit,
    #[display("snap-run-inhibit")]
    SnapRunInhibit,
    #[display("interfaces-requests-prompt")]
    InterfacesRequestsPrompt,
    #[display("warning")]
    Warning,
    #[display("{_0}")]
    Other(String),
}

impl NoticeType {
    pub fn parse(value: &str) -> Self {
        match value {
            "change-update" => Self::ChangeUpdate,
            "refresh-inhibit" => Self::RefreshInhibit,
            "snap-run-inhibit" => Self::SnapRunInhibit,
            "interfaces-requests-prompt" => Self::InterfacesRequestsPrompt,
            "warning" => Self::Warning,
            other => Self::Other(other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for NoticeType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::parse(&value))
    }
}

/// An event record from `/v2/notices`.
///
/// Timestamps keep the daemon's full nanosecond precision.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Notice {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<u32>,
    #[serde(rename = "type")]
    pub notice_type: NoticeType,
    pub key: String,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub first_occurred: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub last_occurred: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub last_repeated: Option<OffsetDateTime>,
    #[serde(default)]
    pub occurrences: u64,
    #[serde(default)]
    pub last_data: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "deserialize_optional_duration")]
    pub repeat_after: Option<Duration>,
    #[serde(default, deserialize_with = "deserialize_optional_duration")]
    pub expire_after: Option<Duration>,
}

impl Notice {
    /// Sub-second part of `last_occurred`.
    pub fn last_occurred_nanoseconds(&self) -> u32 {
        self.last_occurred.map(|t| t.nanosecond()).unwrap_or(0)
    }

    /// A filter value that selects notices newer than this one.
    pub fn after_timestamp(&self) -> Option<NoticeTimestamp> {
        self.last_occurred
            .map(|t| NoticeTimestamp::with_nanoseconds(t, t.nanosecond()))
    }

    /// Order by last occurrence; notices without one sort first.
    pub fn cmp_last_occurred(&self, other: &Self) -> Ordering {
        self.last_occurred.cmp(&other.last_occurred)
    }
}
