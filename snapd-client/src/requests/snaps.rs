//! Read-only snap queries plus snap configuration.

use serde_json::{Map, Value};
use snapd_protocol::http::path_segment;
use snapd_protocol::types::{App, CategoryDetails, FindResult, Icon, Snap};
use snapd_protocol::{Error, HttpRequest, Result};

use crate::request::{Reply, Request, Response, async_change, sync_list, sync_result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapSelect {
    /// Active revisions only.
    #[default]
    Active,
    /// Every installed revision, enabled or not.
    All,
    Enabled,
    RefreshInhibited,
}

impl SnapSelect {
    fn as_query(self) -> Option<&'static str> {
        match self {
            Self::Active => None,
            Self::All => Some("all"),
            Self::Enabled => Some("enabled"),
            Self::RefreshInhibited => Some("refresh-inhibited"),
        }
    }
}

/// `GET /v2/snaps`
#[derive(Debug, Clone, Default)]
pub struct GetSnaps {
    pub select: SnapSelect,
    pub names: Vec<String>,
}

impl GetSnaps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, select: SnapSelect) -> Self {
        self.select = select;
        self
    }

    pub fn names<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.names = names.into_iter().map(Into::into).collect();
        self
    }
}

impl Request for GetSnaps {
    type Output = Vec<Snap>;
    const NAME: &'static str = "get-snaps";

    fn generate(&self) -> Result<HttpRequest> {
        Ok(HttpRequest::get("/v2/snaps")
            .query_opt("select", self.select.as_query())
            .query_list("snaps", &self.names))
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        sync_list(response)
    }
}

/// `GET /v2/snaps/{name}`
#[derive(Debug, Clone)]
pub struct GetSnap {
    pub name: String,
}

impl GetSnap {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Request for GetSnap {
    type Output = Snap;
    const NAME: &'static str = "get-snap";

    fn generate(&self) -> Result<HttpRequest> {
        Ok(HttpRequest::get(format!("/v2/snaps/{}", path_segment(&self.name))))
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        sync_result(response)
    }
}

/// `GET /v2/apps`
#[derive(Debug, Clone, Default)]
pub struct GetApps {
    pub names: Vec<String>,
    pub services_only: bool,
}

impl Request for GetApps {
    type Output = Vec<App>;
    const NAME: &'static str = "get-apps";

    fn generate(&self) -> Result<HttpRequest> {
        Ok(HttpRequest::get("/v2/apps")
            .query_opt("select", self.services_only.then_some("service"))
            .query_list("names", &self.names))
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        sync_list(response)
    }
}

/// `GET /v2/icons/{name}/icon`, answered with the image itself.
#[derive(Debug, Clone)]
pub struct GetIcon {
    pub name: String,
}

impl Request for GetIcon {
    type Output = Icon;
    const NAME: &'static str = "get-icon";

    fn generate(&self) -> Result<HttpRequest> {
        Ok(HttpRequest::get(format!(
            "/v2/icons/{}/icon",
            path_segment(&self.name)
        )))
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        let raw = response.into_raw()?;
        if raw.status_code != 200 {
            return Err(Error::bad_response(format!(
                "icon request answered with status {}",
                raw.status_code
            )));
        }
        Ok(Reply::Done(Icon {
            mime_type: raw
                .content_type()
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            data: raw.body,
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FindScope {
    #[default]
    Default,
    /// Include snaps not published for this device's store.
    Wide,
}

/// `GET /v2/find`
#[derive(Debug, Clone, Default)]
pub struct Find {
    /// Free text search.
    pub query: Option<String>,
    /// Exact name match; takes precedence over `query`.
    pub name: Option<String>,
    pub section: Option<String>,
    pub category: Option<String>,
    /// Only snaps with a pending refresh.
    pub refreshable: bool,
    /// Only private snaps of the logged in user.
    pub private: bool,
    pub scope: FindScope,
}

impl Find {
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

impl Request for Find {
    type Output = FindResult;
    const NAME: &'static str = "find";

    fn generate(&self) -> Result<HttpRequest> {
        let mut request = HttpRequest::get("/v2/find");
        request = match (&self.name, &self.query) {
            (Some(name), _) => request.query("name", name.clone()),
            (None, query) => request.query_opt("q", query.clone()),
        };
        let select = if self.refreshable {
            Some("refresh")
        } else if self.private {
            Some("private")
        } else {
            None
        };
        Ok(request
            .query_opt("section", self.section.clone())
            .query_opt("category", self.category.clone())
            .query_opt("select", select)
            .query_opt("scope", (self.scope == FindScope::Wide).then_some("wide")))
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        let sync = response.into_sync()?;
        let suggested_currency = sync.suggested_currency.clone();
        let snaps = sync.into_list()?;
        Ok(Reply::Done(FindResult {
            snaps,
            suggested_currency,
        }))
    }
}

/// `GET /v2/categories`
#[derive(Debug, Clone, Default)]
pub struct GetCategories;

impl Request for GetCategories {
    type Output = Vec<CategoryDetails>;
    const NAME: &'static str = "get-categories";

    fn generate(&self) -> Result<HttpRequest> {
        Ok(HttpRequest::get("/v2/categories"))
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        sync_list(response)
    }
}

/// `GET /v2/snaps/{name}/conf`
#[derive(Debug, Clone)]
pub struct GetSnapConf {
    pub name: String,
    /// Empty means the whole configuration.
    pub keys: Vec<String>,
}

impl Request for GetSnapConf {
    type Output = Map<String, Value>;
    const NAME: &'static str = "get-snap-conf";

    fn generate(&self) -> Result<HttpRequest> {
        Ok(
            HttpRequest::get(format!("/v2/snaps/{}/conf", path_segment(&self.name)))
                .query_list("keys", &self.keys),
        )
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        let sync = response.into_sync()?;
        if sync.result.is_null() {
            return Ok(Reply::Done(Map::new()));
        }
        sync.into_result().map(Reply::Done)
    }
}

/// `PUT /v2/snaps/{name}/conf`; runs the snap's configure hook as a change.
#[derive(Debug, Clone)]
pub struct SetSnapConf {
    pub name: String,
    pub values: Map<String, Value>,
}

impl Request for SetSnapConf {
    type Output = ();
    const NAME: &'static str = "set-snap-conf";

    fn generate(&self) -> Result<HttpRequest> {
        HttpRequest::put(format!("/v2/snaps/{}/conf", path_segment(&self.name))).json(&self.values)
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        async_change(response)
    }

    fn complete(&self, _change: &snapd_protocol::types::Change) -> Result<Self::Output> {
        Ok(())
    }
}
