//! Requests that change installed snaps. All of them run as changes.

use bytes::Bytes;
use serde::Serialize;
use snapd_protocol::http::path_segment;
use snapd_protocol::multipart::Multipart;
use snapd_protocol::types::Change;
use snapd_protocol::{Body, HttpRequest, Result};

use crate::request::{Reply, Request, Response, async_change};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapActionKind {
    Install,
    Refresh,
    Remove,
    Enable,
    Disable,
    Switch,
    Revert,
}

/// Flags understood by `POST /v2/snaps/{name}`. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SnapActionOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub classic: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub dangerous: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub devmode: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub jailmode: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub ignore_validation: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub purge: bool,
}

#[derive(Serialize)]
struct SnapActionBody<'a> {
    action: SnapActionKind,
    #[serde(flatten)]
    options: &'a SnapActionOptions,
}

/// `POST /v2/snaps/{name}`
#[derive(Debug, Clone)]
pub struct SnapAction {
    pub name: String,
    pub action: SnapActionKind,
    pub options: SnapActionOptions,
}

impl SnapAction {
    pub fn new(action: SnapActionKind, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action,
            options: SnapActionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SnapActionOptions) -> Self {
        self.options = options;
        self
    }
}

impl Request for SnapAction {
    type Output = ();
    const NAME: &'static str = "snap-action";

    fn generate(&self) -> Result<HttpRequest> {
        HttpRequest::post(format!("/v2/snaps/{}", path_segment(&self.name))).json(
            &SnapActionBody {
                action: self.action,
                options: &self.options,
            },
        )
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        async_change(response)
    }

    fn complete(&self, _change: &Change) -> Result<Self::Output> {
        Ok(())
    }
}

/// `POST /v2/snaps` with `action: refresh`. Yields the names of the refreshed snaps.
#[derive(Debug, Clone, Default)]
pub struct RefreshAll;

impl Request for RefreshAll {
    type Output = Vec<String>;
    const NAME: &'static str = "refresh-all";

    fn generate(&self) -> Result<HttpRequest> {
        HttpRequest::post("/v2/snaps").json(&serde_json::json!({ "action": "refresh" }))
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        async_change(response)
    }

    fn complete(&self, change: &Change) -> Result<Self::Output> {
        Ok(change.snap_names())
    }
}

/// Sideload a snap file: a multipart `POST /v2/snaps`.
#[derive(Debug, Clone)]
pub struct InstallStream {
    pub filename: String,
    pub data: Bytes,
    pub options: SnapActionOptions,
}

impl Request for InstallStream {
    type Output = ();
    const NAME: &'static str = "install-stream";

    fn generate(&self) -> Result<HttpRequest> {
        let mut form = Multipart::new().field("action", "install");
        for (flag, set) in [
            ("classic", self.options.classic),
            ("dangerous", self.options.dangerous),
            ("devmode", self.options.devmode),
            ("jailmode", self.options.jailmode),
        ] {
            if set {
                form = form.field(flag, "true");
            }
        }
        form = form.file(
            "snap",
            &self.filename,
            "application/octet-stream",
            self.data.clone(),
        );
        Ok(HttpRequest::post("/v2/snaps").body(Body::Multipart(form)))
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        async_change(response)
    }

    fn complete(&self, _change: &Change) -> Result<Self::Output> {
        Ok(())
    }
}

/// Install an unpacked snap directory in try mode.
#[derive(Debug, Clone)]
pub struct TrySnap {
    pub path: String,
}

impl Request for TrySnap {
    type Output = ();
    const NAME: &'static str = "try-snap";

    fn generate(&self) -> Result<HttpRequest> {
        let form = Multipart::new()
            .field("action", "try")
            .field("snap-path", self.path.clone());
        Ok(HttpRequest::post("/v2/snaps").body(Body::Multipart(form)))
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        async_change(response)
    }

    fn complete(&self, _change: &Change) -> Result<Self::Output> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    /// Start, optionally enabling the services at boot.
    Start { enable: bool },
    /// Stop, optionally disabling the services at boot.
    Stop { disable: bool },
    /// Restart, or reload where the service supports it.
    Restart { reload: bool },
}

/// `POST /v2/apps`
#[derive(Debug, Clone)]
pub struct ControlApps {
    pub names: Vec<String>,
    pub action: AppAction,
}

impl Request for ControlApps {
    type Output = ();
    const NAME: &'static str = "control-apps";

    fn generate(&self) -> Result<HttpRequest> {
        let mut body = serde_json::Map::new();
        let (action, flag) = match self.action {
            AppAction::Start { enable } => ("start", enable.then_some("enable")),
            AppAction::Stop { disable } => ("stop", disable.then_some("disable")),
            AppAction::Restart { reload } => ("restart", reload.then_some("reload")),
        };
        body.insert("action".into(), action.into());
        body.insert("names".into(), self.names.clone().into());
        if let Some(flag) = flag {
            body.insert(flag.into(), true.into());
        }
        HttpRequest::post("/v2/apps").json(&body)
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        async_change(response)
    }

    fn complete(&self, _change: &Change) -> Result<Self::Output> {
        Ok(())
    }
}
