use snapd_protocol::types::SystemInformation;
use snapd_protocol::{HttpRequest, Result};

use crate::request::{Reply, Request, Response, sync_result};

#[derive(Debug, Clone, Default)]
pub struct GetSystemInfo;

impl Request for GetSystemInfo {
    type Output = SystemInformation;
    const NAME: &'static str = "get-system-info";

    fn generate(&self) -> Result<HttpRequest> {
        Ok(HttpRequest::get("/v2/system-info"))
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        sync_result(response)
    }
}
