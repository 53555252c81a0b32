use snapd_protocol::http::path_segment;
use snapd_protocol::types::Change;
use snapd_protocol::{HttpRequest, Result};

use crate::request::{Reply, Request, Response, sync_list, sync_result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangeFilter {
    /// In-progress changes only, the daemon default.
    #[default]
    InProgress,
    All,
    Ready,
}

/// `GET /v2/changes`
#[derive(Debug, Clone, Default)]
pub struct GetChanges {
    pub filter: ChangeFilter,
    /// Only changes touching this snap.
    pub snap: Option<String>,
}

impl Request for GetChanges {
    type Output = Vec<Change>;
    const NAME: &'static str = "get-changes";

    fn generate(&self) -> Result<HttpRequest> {
        let select = match self.filter {
            ChangeFilter::InProgress => None,
            ChangeFilter::All => Some("all"),
            ChangeFilter::Ready => Some("ready"),
        };
        Ok(HttpRequest::get("/v2/changes")
            .query_opt("select", select)
            .query_opt("for", self.snap.clone()))
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        sync_list(response)
    }
}

/// `GET /v2/changes/{id}`, also what the poller issues.
#[derive(Debug, Clone)]
pub struct GetChange {
    pub id: String,
}

impl GetChange {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Request for GetChange {
    type Output = Change;
    const NAME: &'static str = "get-change";

    fn generate(&self) -> Result<HttpRequest> {
        Ok(HttpRequest::get(format!("/v2/changes/{}", path_segment(&self.id))))
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        sync_result(response)
    }
}

/// Ask the daemon to abort a change. Returns the change as it stands afterwards.
#[derive(Debug, Clone)]
pub struct AbortChange {
    pub id: String,
}

impl Request for AbortChange {
    type Output = Change;
    const NAME: &'static str = "abort-change";

    fn generate(&self) -> Result<HttpRequest> {
        HttpRequest::post(format!("/v2/changes/{}", path_segment(&self.id)))
            .json(&serde_json::json!({ "action": "abort" }))
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        sync_result(response)
    }
}
