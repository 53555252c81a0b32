use serde::Serialize;
use snapd_protocol::types::SnapctlOutput;
use snapd_protocol::{Error, HttpRequest, Result};

use crate::request::{Endpoint, Reply, Request, Response, sync_result};

/// Environment variable snapd sets inside snap sandboxes.
pub const SNAP_COOKIE: &str = "SNAP_COOKIE";

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct SnapctlBody<'a> {
    context_id: &'a str,
    args: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    stdin: Option<&'a str>,
}

/// `POST /v2/snapctl` on the snapctl socket.
///
/// A command that ran but exited non-zero is still a successful relay: the
/// output carries its exit code.
#[derive(Debug, Clone, Default)]
pub struct RunSnapctl {
    pub args: Vec<String>,
    pub stdin: Option<String>,
    /// Overrides `$SNAP_COOKIE`, which is otherwise read when the request is sent.
    pub context_id: Option<String>,
}

impl RunSnapctl {
    pub fn new<S: Into<String>>(args: impl IntoIterator<Item = S>) -> Self {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_context_id(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = Some(context_id.into());
        self
    }
}

impl Request for RunSnapctl {
    type Output = SnapctlOutput;
    const NAME: &'static str = "run-snapctl";

    fn endpoint(&self) -> Endpoint {
        Endpoint::Snapctl
    }

    fn generate(&self) -> Result<HttpRequest> {
        let context_id = match &self.context_id {
            Some(context_id) => context_id.clone(),
            None => std::env::var(SNAP_COOKIE).unwrap_or_default(),
        };
        HttpRequest::post("/v2/snapctl").json(&SnapctlBody {
            context_id: &context_id,
            args: &self.args,
            stdin: self.stdin.as_deref(),
        })
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        sync_result(response)
    }

    fn recover(&self, error: Error) -> Result<Self::Output> {
        match error {
            Error::Daemon {
                daemon_kind: Some(kind),
                value: Some(value),
                ..
            } if kind == "unsuccessful" => serde_json::from_value(value)
                .map_err(|e| Error::bad_response(format!("invalid snapctl result: {e}"))),
            other => Err(other),
        }
    }
}
