use std::future::Future;
use std::io;

use snapd_protocol::Result;
use snapd_protocol::types::{AuthData, Maintenance};
use tokio::runtime::{Builder, Runtime};

use crate::client::Client;
use crate::config::ClientConfig;
use crate::request::Request;

/// Synchronous wrapper around [`Client`].
///
/// Each call occupies the calling thread until the request, including any
/// change it starts, is finished. Must not be used from within an async
/// runtime.
pub struct BlockingClient {
    client: Client,
    runtime: Runtime,
}

impl BlockingClient {
    pub fn new(config: ClientConfig) -> io::Result<Self> {
        Self::from_client(Client::new(config))
    }

    pub fn from_client(client: Client) -> io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { client, runtime })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn set_auth_data(&self, auth: Option<AuthData>) {
        self.client.set_auth_data(auth);
    }

    pub fn auth_data(&self) -> Option<AuthData> {
        self.client.auth_data()
    }

    pub fn maintenance(&self) -> Option<Maintenance> {
        self.client.maintenance()
    }

    pub fn call<R: Request>(&self, request: R) -> Result<R::Output> {
        self.block_on(self.client.call(request))
    }

    pub(crate) fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}
