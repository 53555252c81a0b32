use std::time::Duration;

use snapd_protocol::timestamp::{NoticeTimestamp, format_go_duration};
use snapd_protocol::types::{Notice, NoticeType};
use snapd_protocol::{HttpRequest, Result};

use crate::request::{Reply, Request, Response, sync_list};

/// `GET /v2/notices`
///
/// With `timeout` set the daemon holds the request until a matching notice
/// occurs or the timeout expires, whichever comes first.
#[derive(Debug, Clone, Default)]
pub struct GetNotices {
    pub types: Vec<NoticeType>,
    pub keys: Vec<String>,
    pub after: Option<NoticeTimestamp>,
    pub timeout: Option<Duration>,
    pub user_id: Option<u32>,
    /// Notices of every user; needs root.
    pub all_users: bool,
}

impl GetNotices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn types(mut self, types: impl IntoIterator<Item = NoticeType>) -> Self {
        self.types = types.into_iter().collect();
        self
    }

    pub fn keys<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn after(mut self, after: NoticeTimestamp) -> Self {
        self.after = Some(after);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Request for GetNotices {
    type Output = Vec<Notice>;
    const NAME: &'static str = "get-notices";

    fn generate(&self) -> Result<HttpRequest> {
        let types: Vec<String> = self.types.iter().map(ToString::to_string).collect();
        Ok(HttpRequest::get("/v2/notices")
            .query_opt("user-id", self.user_id.map(|id| id.to_string()))
            .query_opt("users", self.all_users.then_some("all"))
            .query_list("types", &types)
            .query_list("keys", &self.keys)
            .query_opt("after", self.after.map(|after| after.format()))
            .query_opt("timeout", self.timeout.map(format_go_duration)))
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        sync_list(response)
    }
}
