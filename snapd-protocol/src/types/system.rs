use std::collections::BTreeMap;

use serde::Deserialize;
use time::OffsetDateTime;

use crate::timestamp::deserialize_optional;

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OsRelease {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub version_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct RefreshInfo {
    #[serde(default)]
    pub timer: Option<String>,
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub hold: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub last: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub next: Option<OffsetDateTime>,
}

/// `/v2/system-info`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SystemInformation {
    #[serde(default)]
    pub series: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub build_id: String,
    #[serde(default)]
    pub os_release: OsRelease,
    #[serde(default)]
    pub on_classic: bool,
    #[serde(default)]
    pub managed: bool,
    #[serde(default)]
    pub kernel_version: String,
    #[serde(default)]
    pub confinement: String,
    #[serde(default)]
    pub store: Option<String>,
    #[serde(default)]
    pub refresh: RefreshInfo,
    #[serde(default)]
    pub locations: BTreeMap<String, String>,
    #[serde(default)]
    pub sandbox_features: BTreeMap<String, Vec<String>>,
}

impl SystemInformation {
    pub fn mount_directory(&self) -> Option<&str> {
        self.locations.get("snap-mount-dir").map(String::as_str)
    }

    pub fn binaries_directory(&self) -> Option<&str> {
        self.locations.get("snap-bin-dir").map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_system_info() {
        let info: SystemInformation = serde_json::from_str(
            r#"{
                "series": "16",
                "version": "2.61.2",
                "os-release": {"id": "ubuntu", "version-id": "22.04"},
                "on-classic": true,
                "managed": false,
                "kernel-version": "6.5.0-generic",
                "locations": {"snap-mount-dir": "/snap", "snap-bin-dir": "/snap/bin"},
                "refresh": {"timer": "00:00~24:00/4", "next": "2024-03-01T18:00:00Z"},
                "confinement": "strict",
                "sandbox-features": {"apparmor": ["kernel:caps", "parser:unsafe"]}
            }"#,
        )
        .unwrap();
        assert_eq!(info.os_release.version_id, "22.04");
        assert!(info.on_classic);
        assert_eq!(info.mount_directory(), Some("/snap"));
        assert_eq!(info.binaries_directory(), Some("/snap/bin"));
        assert!(info.refresh.next.is_some());
        assert_eq!(info.sandbox_features["apparmor"].len(), 2);
    }
}
