use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A plug named by its snap, as used in connect/disconnect requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlugRef {
    pub snap: String,
    pub plug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRef {
    pub snap: String,
    pub slot: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Plug {
    pub snap: String,
    pub plug: String,
    #[serde(default)]
    pub interface: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, Value>,
    #[serde(default)]
    pub connections: Vec<SlotRef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Slot {
    pub snap: String,
    pub slot: String,
    #[serde(default)]
    pub interface: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, Value>,
    #[serde(default)]
    pub connections: Vec<PlugRef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Connection {
    pub slot: SlotRef,
    pub plug: PlugRef,
    #[serde(default)]
    pub interface: String,
    #[serde(default)]
    pub manual: bool,
    #[serde(default)]
    pub gadget: bool,
    #[serde(default)]
    pub slot_attrs: BTreeMap<String, Value>,
    #[serde(default)]
    pub plug_attrs: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Connections {
    #[serde(default)]
    pub established: Vec<Connection>,
    #[serde(default)]
    pub undesired: Vec<Connection>,
    #[serde(default)]
    pub plugs: Vec<Plug>,
    #[serde(default)]
    pub slots: Vec<Slot>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Interface {
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub doc_url: Option<String>,
    #[serde(default)]
    pub plugs: Vec<Plug>,
    #[serde(default)]
    pub slots: Vec<Slot>,
}
