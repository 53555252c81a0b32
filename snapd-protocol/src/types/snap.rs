use std::collections::BTreeMap;

use serde::Deserialize;
use time::OffsetDateTime;

use crate::timestamp::deserialize_optional;

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Publisher {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub validation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct App {
    #[serde(default)]
    pub snap: String,
    pub name: String,
    #[serde(default)]
    pub desktop_file: Option<String>,
    #[serde(default)]
    pub daemon: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub common_id: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Media {
    #[serde(rename = "type")]
    pub media_type: String,
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChannelInfo {
    #[serde(default)]
    pub revision: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub confinement: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub released_at: Option<OffsetDateTime>,
}

/// An installed or store snap.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Snap {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub revision: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub tracking_channel: Option<String>,
    #[serde(default)]
    pub confinement: String,
    #[serde(rename = "type", default)]
    pub snap_type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub store_url: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub mounted_from: Option<String>,
    #[serde(default)]
    pub publisher: Option<Publisher>,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub install_date: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub hold: Option<OffsetDateTime>,
    #[serde(default)]
    pub installed_size: u64,
    #[serde(default)]
    pub download_size: u64,
    #[serde(default)]
    pub devmode: bool,
    #[serde(default)]
    pub jailmode: bool,
    #[serde(default)]
    pub trymode: bool,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub common_ids: Vec<String>,
    #[serde(default)]
    pub apps: Vec<App>,
    #[serde(default)]
    pub media: Vec<Media>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub tracks: Vec<String>,
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelInfo>,
    #[serde(default)]
    pub prices: BTreeMap<String, f64>,
}

impl Snap {
    pub fn is_installed(&self) -> bool {
        matches!(self.status.as_str(), "installed" | "active")
    }

    /// Price in `currency`, if the snap is sold in it.
    pub fn price(&self, currency: &str) -> Option<f64> {
        self.prices.get(currency).copied()
    }
}

/// Search results plus the currency the store suggests for display.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FindResult {
    pub snaps: Vec<Snap>,
    pub suggested_currency: Option<String>,
}
