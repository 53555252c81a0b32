use std::collections::BTreeMap;

use bytes::Bytes;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::timestamp::deserialize_optional;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub snap: String,
    pub name: String,
    pub command: String,
    pub status: String,
    pub auto: Option<String>,
    pub manual: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CategoryDetails {
    pub name: String,
}

/// Raw icon data from `/v2/icons`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pub mime_type: String,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogEntry {
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub timestamp: Option<OffsetDateTime>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub sid: String,
    #[serde(default)]
    pub pid: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, derive_more::Display)]
#[serde(rename_all = "lowercase")]
pub enum ThemeAvailability {
    #[display("installed")]
    Installed,
    #[display("available")]
    Available,
    #[display("unavailable")]
    Unavailable,
    #[serde(other)]
    #[display("unknown")]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ThemeStatus {
    #[serde(default)]
    pub gtk_themes: BTreeMap<String, ThemeAvailability>,
    #[serde(default)]
    pub icon_themes: BTreeMap<String, ThemeAvailability>,
    #[serde(default)]
    pub sound_themes: BTreeMap<String, ThemeAvailability>,
}

/// Result of a command relayed through the snapctl socket.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SnapctlOutput {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub exit_code: i32,
}
