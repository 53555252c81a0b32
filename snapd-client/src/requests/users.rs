use serde::Serialize;
use serde_json::Value;
use snapd_protocol::types::UserInformation;
use snapd_protocol::{HttpRequest, Result};

use crate::request::{Reply, Request, Response, sync_list, sync_result, sync_unit};

/// `POST /v2/login`. The returned user carries the credentials to use next.
#[derive(Debug, Clone, Serialize)]
pub struct Login {
    pub email: String,
    pub password: String,
    /// One-time password, for accounts with two-factor authentication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

impl Request for Login {
    type Output = UserInformation;
    const NAME: &'static str = "login";

    fn generate(&self) -> Result<HttpRequest> {
        HttpRequest::post("/v2/login").json(self)
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        sync_result(response)
    }
}

/// `POST /v2/logout`
#[derive(Debug, Clone, Serialize)]
pub struct Logout {
    pub id: i64,
}

impl Request for Logout {
    type Output = ();
    const NAME: &'static str = "logout";

    fn generate(&self) -> Result<HttpRequest> {
        HttpRequest::post("/v2/logout").json(self)
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        sync_unit(response)
    }
}

/// `GET /v2/users`
#[derive(Debug, Clone, Default)]
pub struct GetUsers;

impl Request for GetUsers {
    type Output = Vec<UserInformation>;
    const NAME: &'static str = "get-users";

    fn generate(&self) -> Result<HttpRequest> {
        Ok(HttpRequest::get("/v2/users"))
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        sync_list(response)
    }
}

/// `POST /v2/create-user`
///
/// With `known` set and no email the daemon creates every user listed in
/// the device's system-user assertions, so the output is always a list.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CreateUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub sudoer: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub known: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub force_managed: bool,
}

impl Request for CreateUser {
    type Output = Vec<UserInformation>;
    const NAME: &'static str = "create-user";

    fn generate(&self) -> Result<HttpRequest> {
        HttpRequest::post("/v2/create-user").json(self)
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        let sync = response.into_sync()?;
        match sync.result {
            Value::Array(_) | Value::Null => sync.into_list().map(Reply::Done),
            _ => sync.into_result().map(|user| Reply::Done(vec![user])),
        }
    }
}
