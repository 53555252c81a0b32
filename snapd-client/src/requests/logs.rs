use snapd_protocol::json_seq::parse_records;
use snapd_protocol::types::LogEntry;
use snapd_protocol::{Error, HttpRequest, Result};

use crate::request::{Reply, Request, Response};

/// `GET /v2/logs`: recent journal entries of snap services.
#[derive(Debug, Clone, Default)]
pub struct GetLogs {
    /// Services or snaps; empty means all.
    pub names: Vec<String>,
    /// Number of lines; the daemon default when `None`.
    pub lines: Option<usize>,
}

impl Request for GetLogs {
    type Output = Vec<LogEntry>;
    const NAME: &'static str = "get-logs";

    fn generate(&self) -> Result<HttpRequest> {
        Ok(HttpRequest::get("/v2/logs")
            .query_list("names", &self.names)
            .query_opt("n", self.lines.map(|n| n.to_string())))
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        let raw = response.into_raw()?;
        match raw.content_type().as_deref() {
            Some("application/json-seq") => parse_records(&raw.body).map(Reply::Done),
            other => Err(Error::bad_response(format!(
                "expected application/json-seq, got {}",
                other.unwrap_or("no content type")
            ))),
        }
    }
}
