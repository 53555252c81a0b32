//! Interface connections and command aliases.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use snapd_protocol::types::{Alias, Change, Connections, Interface, PlugRef, SlotRef};
use snapd_protocol::{HttpRequest, Result};

use crate::request::{Reply, Request, Response, async_change, sync_list};

/// `GET /v2/connections`
#[derive(Debug, Clone, Default)]
pub struct GetConnections {
    pub snap: Option<String>,
    pub interface: Option<String>,
    /// Include disconnected plugs and slots.
    pub all: bool,
}

impl Request for GetConnections {
    type Output = Connections;
    const NAME: &'static str = "get-connections";

    fn generate(&self) -> Result<HttpRequest> {
        Ok(HttpRequest::get("/v2/connections")
            .query_opt("select", self.all.then_some("all"))
            .query_opt("snap", self.snap.clone())
            .query_opt("interface", self.interface.clone()))
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        let sync = response.into_sync()?;
        if sync.result.is_null() {
            return Ok(Reply::Done(Connections::default()));
        }
        sync.into_result().map(Reply::Done)
    }
}

/// `GET /v2/interfaces`
#[derive(Debug, Clone, Default)]
pub struct GetInterfaces {
    pub names: Vec<String>,
    pub include_docs: bool,
    pub include_plugs: bool,
    pub include_slots: bool,
    /// Only interfaces with at least one connection.
    pub only_connected: bool,
}

impl Request for GetInterfaces {
    type Output = Vec<Interface>;
    const NAME: &'static str = "get-interfaces";

    fn generate(&self) -> Result<HttpRequest> {
        let select = if self.only_connected { "connected" } else { "all" };
        Ok(HttpRequest::get("/v2/interfaces")
            .query("select", select)
            .query_opt("doc", self.include_docs.then_some("true"))
            .query_opt("plugs", self.include_plugs.then_some("true"))
            .query_opt("slots", self.include_slots.then_some("true"))
            .query_list("names", &self.names))
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        sync_list(response)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceAction {
    Connect,
    Disconnect,
}

#[derive(Serialize)]
struct InterfacesBody<'a> {
    action: InterfaceAction,
    plugs: [&'a PlugRef; 1],
    slots: [&'a SlotRef; 1],
}

/// `POST /v2/interfaces`: connect or disconnect one plug and slot.
#[derive(Debug, Clone)]
pub struct ChangeInterfaces {
    pub action: InterfaceAction,
    pub plug: PlugRef,
    pub slot: SlotRef,
}

impl Request for ChangeInterfaces {
    type Output = ();
    const NAME: &'static str = "change-interfaces";

    fn generate(&self) -> Result<HttpRequest> {
        HttpRequest::post("/v2/interfaces").json(&InterfacesBody {
            action: self.action,
            plugs: [&self.plug],
            slots: [&self.slot],
        })
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        async_change(response)
    }

    fn complete(&self, _change: &Change) -> Result<Self::Output> {
        Ok(())
    }
}

#[derive(Deserialize)]
struct AliasEntry {
    #[serde(default)]
    command: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    auto: Option<String>,
    #[serde(default)]
    manual: Option<String>,
}

/// `GET /v2/aliases`, flattened into one list ordered by snap then alias.
#[derive(Debug, Clone, Default)]
pub struct GetAliases;

impl Request for GetAliases {
    type Output = Vec<Alias>;
    const NAME: &'static str = "get-aliases";

    fn generate(&self) -> Result<HttpRequest> {
        Ok(HttpRequest::get("/v2/aliases"))
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        let sync = response.into_sync()?;
        if sync.result.is_null() {
            return Ok(Reply::Done(Vec::new()));
        }
        let by_snap: BTreeMap<String, BTreeMap<String, AliasEntry>> = sync.into_result()?;
        let aliases = by_snap
            .into_iter()
            .flat_map(|(snap, aliases)| {
                aliases.into_iter().map(move |(name, entry)| Alias {
                    snap: snap.clone(),
                    name,
                    command: entry.command,
                    status: entry.status,
                    auto: entry.auto,
                    manual: entry.manual,
                })
            })
            .collect();
        Ok(Reply::Done(aliases))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasAction {
    Alias {
        snap: String,
        app: String,
        alias: String,
    },
    /// Remove a manual alias, or all aliases of `snap` when `alias` is `None`.
    Unalias {
        snap: Option<String>,
        alias: Option<String>,
    },
    /// Make `snap`'s automatic aliases win over conflicting ones.
    Prefer { snap: String },
}

/// `POST /v2/aliases`
#[derive(Debug, Clone)]
pub struct ChangeAliases {
    pub action: AliasAction,
}

impl Request for ChangeAliases {
    type Output = ();
    const NAME: &'static str = "change-aliases";

    fn generate(&self) -> Result<HttpRequest> {
        let body = match &self.action {
            AliasAction::Alias { snap, app, alias } => serde_json::json!({
                "action": "alias", "snap": snap, "app": app, "alias": alias
            }),
            AliasAction::Unalias { snap, alias } => {
                let mut body = serde_json::json!({ "action": "unalias" });
                if let Some(snap) = snap {
                    body["snap"] = snap.as_str().into();
                }
                if let Some(alias) = alias {
                    body["alias"] = alias.as_str().into();
                }
                body
            }
            AliasAction::Prefer { snap } => serde_json::json!({
                "action": "prefer", "snap": snap
            }),
        };
        HttpRequest::post("/v2/aliases").json(&body)
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        async_change(response)
    }

    fn complete(&self, _change: &Change) -> Result<Self::Output> {
        Ok(())
    }
}
