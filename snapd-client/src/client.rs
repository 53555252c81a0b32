use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use snapd_protocol::timestamp::NoticeTimestamp;
use snapd_protocol::types::{AuthData, Change, Maintenance, Notice, NoticeType};
use snapd_protocol::{Error, RequestContext, Result};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::ClientConfig;
use crate::metrics::ClientMetrics;
use crate::poller::{ChangePoller, ChangeProgress, ChangeSource};
use crate::request::{Endpoint, Reply, Request, Response};
use crate::requests::{GetChange, GetNotices};
use crate::transport::{Connection, SocketAddress};

/// Handle to snapd.
///
/// Cloning is cheap and clones share credentials and maintenance state.
/// Every request opens its own connection, so concurrent calls run in
/// parallel.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    config: ClientConfig,
    snapd: SocketAddress,
    snapctl: SocketAddress,
    auth: RwLock<Option<AuthData>>,
    maintenance: Mutex<Option<Maintenance>>,
    metrics: Option<Arc<ClientMetrics>>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Self::build(config, None)
    }

    pub fn with_metrics(config: ClientConfig, metrics: Arc<ClientMetrics>) -> Self {
        Self::build(config, Some(metrics))
    }

    fn build(config: ClientConfig, metrics: Option<Arc<ClientMetrics>>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                snapd: SocketAddress::parse(&config.socket_path),
                snapctl: SocketAddress::parse(&config.snapctl_socket_path),
                config,
                auth: RwLock::new(None),
                maintenance: Mutex::new(None),
                metrics,
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Credentials attached to every request sent from now on.
    pub fn set_auth_data(&self, auth: Option<AuthData>) {
        *self.inner.auth.write().unwrap_or_else(PoisonError::into_inner) = auth;
    }

    pub fn auth_data(&self) -> Option<AuthData> {
        self.inner.auth_data()
    }

    /// Maintenance announced by the most recent reply, if it carried one.
    pub fn maintenance(&self) -> Option<Maintenance> {
        self.inner
            .maintenance
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run a request to completion, following its change if it starts one.
    ///
    /// Dropping the returned future abandons the request.
    pub async fn call<R: Request>(&self, request: R) -> Result<R::Output> {
        self.inner
            .run(&request, &CancellationToken::new(), None)
            .await
    }

    /// Run a request in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<R: Request>(&self, request: R) -> Operation<R::Output> {
        let cancel = CancellationToken::new();
        let (progress_tx, progress_rx) = unbounded_channel();
        let inner = self.inner.clone();
        let token = cancel.clone();
        let handle =
            tokio::spawn(async move { inner.run(&request, &token, Some(progress_tx)).await });
        Operation {
            handle,
            cancel,
            progress: Some(progress_rx),
        }
    }
}

/// A request running in the background.
///
/// Resolves to the request's outcome. Dropping it cancels the request.
pub struct Operation<T> {
    handle: JoinHandle<Result<T>>,
    cancel: CancellationToken,
    progress: Option<UnboundedReceiver<ChangeProgress>>,
}

impl<T> Operation<T> {
    /// Progress of the change the request started. Can be taken once.
    ///
    /// The stream ends when the operation finishes.
    pub fn progress(&mut self) -> Option<UnboundedReceiver<ChangeProgress>> {
        self.progress.take()
    }

    /// Stop the request at its next I/O or poll checkpoint.
    ///
    /// A change already started keeps running in the daemon; see
    /// [`Client::abort_change`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl<T> Future for Operation<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(join_error)) if join_error.is_cancelled() => {
                Poll::Ready(Err(Error::Cancelled))
            }
            Poll::Ready(Err(join_error)) => std::panic::resume_unwind(join_error.into_panic()),
        }
    }
}

impl<T> Drop for Operation<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl ClientInner {
    fn auth_data(&self) -> Option<AuthData> {
        self.auth
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn request_context(&self) -> RequestContext {
        RequestContext {
            user_agent: self.config.user_agent.clone(),
            allow_interaction: self.config.allow_interaction,
            auth: self.auth_data(),
        }
    }

    fn record_maintenance(&self, maintenance: Option<Maintenance>) {
        *self
            .maintenance
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = maintenance;
    }

    async fn run<R: Request>(
        &self,
        request: &R,
        cancel: &CancellationToken,
        progress: Option<UnboundedSender<ChangeProgress>>,
    ) -> Result<R::Output> {
        let started = Instant::now();
        let result = self.execute(request, cancel, progress).await;
        self.record_outcome(R::NAME, &result, started.elapsed());
        result
    }

    async fn execute<R: Request>(
        &self,
        request: &R,
        cancel: &CancellationToken,
        progress: Option<UnboundedSender<ChangeProgress>>,
    ) -> Result<R::Output> {
        let reply = match self.round_trip(request, cancel).await {
            Ok(response) => request.parse_response(response),
            Err(error) => Err(error),
        };
        let id = match reply {
            Ok(Reply::Done(output)) => return Ok(output),
            Ok(Reply::Change(id)) => id,
            Err(error) => return request.recover(error),
        };

        debug!(request = R::NAME, change = %id, "following change");
        let strategy = self.config.poll_strategy();
        let mut poller = ChangePoller::new(self, id, strategy).with_progress(progress);
        let result = poller.run(cancel).await;
        if let Some(metrics) = &self.metrics {
            metrics
                .change_polls
                .with_label_values(&[strategy.label()])
                .inc_by(poller.polls());
        }
        request.complete(&result?)
    }

    /// One request, one connection, one reply. Never follows changes.
    async fn round_trip<R: Request>(
        &self,
        request: &R,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        let http = request.generate()?;
        let data = http.encode(&self.request_context())?;
        let address = match request.endpoint() {
            Endpoint::Snapd => &self.snapd,
            Endpoint::Snapctl => &self.snapctl,
        };
        debug!(request = R::NAME, method = %http.method, target = %http.target(), %address, "sending request");

        let mut connection =
            Connection::connect(address, self.config.connect_timeout(), cancel).await?;
        connection.send(&data, cancel).await?;
        let response = connection.read_response(cancel).await?;
        debug!(request = R::NAME, status = response.status_code, "received response");

        let response = Response::decode(response)?;
        if let Response::Payload(payload) = &response {
            self.record_maintenance(payload.maintenance().cloned());
        }
        Ok(response)
    }

    async fn call_sync<R: Request>(
        &self,
        request: &R,
        cancel: &CancellationToken,
    ) -> Result<R::Output> {
        let response = self.round_trip(request, cancel).await?;
        match request.parse_response(response)? {
            Reply::Done(output) => Ok(output),
            Reply::Change(id) => Err(Error::bad_response(format!(
                "{} unexpectedly started change {id}",
                R::NAME
            ))),
        }
    }

    fn record_outcome<T>(&self, name: &str, result: &Result<T>, elapsed: Duration) {
        let Some(metrics) = &self.metrics else {
            return;
        };
        let outcome = match result {
            Ok(_) => "ok".to_string(),
            Err(Error::Cancelled) => "cancelled".to_string(),
            Err(error) => error.kind().to_string(),
        };
        metrics
            .requests
            .with_label_values(&[name, outcome.as_str()])
            .inc();
        metrics
            .request_duration
            .with_label_values(&[name])
            .observe(elapsed.as_secs_f64());
    }
}

impl ChangeSource for ClientInner {
    async fn fetch_change(&self, id: &str, cancel: &CancellationToken) -> Result<Change> {
        self.call_sync(&GetChange::new(id), cancel).await
    }

    async fn wait_for_notices(
        &self,
        id: &str,
        after: Option<NoticeTimestamp>,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Vec<Notice>> {
        let mut request = GetNotices::new()
            .types([NoticeType::ChangeUpdate])
            .keys([id])
            .timeout(timeout);
        request.after = after;
        self.call_sync(&request, cancel).await
    }
}
