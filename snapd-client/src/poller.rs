// SPDX-FileCopyrightText: 2025 snapd-rs contributors
// SPDX-License-Identifier: MIT

//! Follow a change until the daemon reports it ready.
//!
//! ```text
//! Pending -> Polling -> Ready
//!                    -> Failed
//!                    -> Cancelled
//! ```
//!
//! Cancelling only stops the client from watching. The change keeps running
//! in the daemon unless it is aborted explicitly.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use snapd_protocol::timestamp::NoticeTimestamp;
use snapd_protocol::types::{Change, Notice};
use snapd_protocol::{Error, Result};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Interval between change fetches when long polling is off.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Pending,
    Polling,
    Ready,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStrategy {
    /// Sleep between fetches.
    Interval(Duration),
    /// Wait on `change-update` notices for the change between fetches.
    LongPoll { timeout: Duration },
}

impl Default for PollStrategy {
    fn default() -> Self {
        Self::Interval(DEFAULT_POLL_INTERVAL)
    }
}

impl PollStrategy {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::Interval(_) => "interval",
            Self::LongPoll { .. } => "long-poll",
        }
    }
}

/// A non-terminal snapshot of a change being followed.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeProgress {
    pub change: Change,
}

impl ChangeProgress {
    /// Sum of `done` and `total` over all tasks.
    pub fn totals(&self) -> (u64, u64) {
        self.change.tasks.iter().fold((0, 0), |(done, total), task| {
            (done + task.progress.done, total + task.progress.total)
        })
    }
}

/// Where the poller gets its snapshots from.
pub trait ChangeSource {
    fn fetch_change(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Change>> + Send;

    /// Block until a `change-update` notice for `id` newer than `after`
    /// arrives, or `timeout` passes.
    fn wait_for_notices(
        &self,
        id: &str,
        after: Option<NoticeTimestamp>,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<Notice>>> + Send;
}

pub struct ChangePoller<'a, S> {
    source: &'a S,
    id: String,
    strategy: PollStrategy,
    progress: Option<UnboundedSender<ChangeProgress>>,
    state: PollState,
    last_emitted: Option<Change>,
    high_water: HashMap<String, u64>,
    notices_after: Option<NoticeTimestamp>,
    polls: u64,
}

impl<'a, S: ChangeSource + Sync> ChangePoller<'a, S> {
    pub fn new(source: &'a S, id: impl Into<String>, strategy: PollStrategy) -> Self {
        Self {
            source,
            id: id.into(),
            strategy,
            progress: None,
            state: PollState::Pending,
            last_emitted: None,
            high_water: HashMap::new(),
            notices_after: None,
            polls: 0,
        }
    }

    pub fn with_progress(mut self, progress: Option<UnboundedSender<ChangeProgress>>) -> Self {
        self.progress = progress;
        self
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// Number of change fetches issued so far.
    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// Poll until the change is ready. A failed change is
    /// [`Error::ChangeFailed`]; cancellation is [`Error::Cancelled`].
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<Change> {
        let result = self.poll_loop(cancel).await;
        self.state = match &result {
            Ok(_) => PollState::Ready,
            Err(Error::Cancelled) => PollState::Cancelled,
            Err(_) => PollState::Failed,
        };
        debug!(change = %self.id, state = ?self.state, polls = self.polls, "stopped following change");
        result
    }

    async fn poll_loop(&mut self, cancel: &CancellationToken) -> Result<Change> {
        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            self.state = PollState::Polling;
            self.polls += 1;
            let change = self.source.fetch_change(&self.id, cancel).await?;
            trace!(change = %self.id, status = %change.status, ready = change.ready, "polled change");

            if change.ready {
                if change.succeeded() {
                    return Ok(change);
                }
                let message = change
                    .err
                    .clone()
                    .unwrap_or_else(|| format!("change finished with status {}", change.status));
                return Err(Error::ChangeFailed {
                    id: self.id.clone(),
                    message,
                });
            }

            let snapshot = self.clamp_progress(change);
            if self.last_emitted.as_ref() != Some(&snapshot) {
                if let Some(progress) = &self.progress {
                    // receiver gone means nobody is watching; keep polling regardless
                    let _ = progress.send(ChangeProgress {
                        change: snapshot.clone(),
                    });
                }
                self.last_emitted = Some(snapshot);
            }

            self.wait(cancel).await?;
        }
    }

    async fn wait(&mut self, cancel: &CancellationToken) -> Result<()> {
        match self.strategy {
            PollStrategy::Interval(interval) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(Error::Cancelled),
                    _ = tokio::time::sleep(interval) => Ok(()),
                }
            }
            PollStrategy::LongPoll { timeout } => {
                let notices = self
                    .source
                    .wait_for_notices(&self.id, self.notices_after, timeout, cancel)
                    .await?;
                if let Some(latest) = notices.iter().max_by(|a, b| a.cmp_last_occurred(b)) {
                    self.notices_after = latest.after_timestamp().or(self.notices_after);
                }
                Ok(())
            }
        }
    }

    /// Keep per-task `done` from going backwards between snapshots.
    fn clamp_progress(&mut self, mut change: Change) -> Change {
        for task in &mut change.tasks {
            let seen = self.high_water.entry(task.id.clone()).or_insert(0);
            if task.progress.done < *seen {
                warn!(
                    change = %change.id,
                    task = %task.id,
                    reported = task.progress.done,
                    previous = *seen,
                    "ignoring task progress going backwards"
                );
                task.progress.done = *seen;
            } else {
                *seen = task.progress.done;
            }
        }
        change
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc::unbounded_channel;

    /// Hands out scripted snapshots; repeats the last one forever.
    struct Script {
        changes: Mutex<VecDeque<Change>>,
        fetches: AtomicUsize,
        waits: AtomicUsize,
    }

    impl Script {
        fn new(changes: Vec<serde_json::Value>) -> Self {
            Self {
                changes: Mutex::new(
                    changes
                        .into_iter()
                        .map(|c| serde_json::from_value(c).unwrap())
                        .collect(),
                ),
                fetches: AtomicUsize::new(0),
                waits: AtomicUsize::new(0),
            }
        }
    }

    impl ChangeSource for Script {
        async fn fetch_change(&self, _id: &str, _cancel: &CancellationToken) -> Result<Change> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let mut changes = self.changes.lock().unwrap();
            if changes.len() > 1 {
                Ok(changes.pop_front().unwrap())
            } else {
                Ok(changes.front().unwrap().clone())
            }
        }

        async fn wait_for_notices(
            &self,
            _id: &str,
            _after: Option<NoticeTimestamp>,
            _timeout: Duration,
            _cancel: &CancellationToken,
        ) -> Result<Vec<Notice>> {
            self.waits.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    fn doing(done: u64) -> serde_json::Value {
        json!({
            "id": "42", "status": "Doing", "ready": false,
            "tasks": [{"id": "1", "status": "Doing", "progress": {"done": done, "total": 100}}]
        })
    }

    fn done() -> serde_json::Value {
        json!({"id": "42", "status": "Done", "ready": true,
               "tasks": [{"id": "1", "status": "Done", "progress": {"done": 100, "total": 100}}]})
    }

    const FAST: PollStrategy = PollStrategy::Interval(Duration::from_millis(1));

    #[test_log::test(tokio::test)]
    async fn reaches_ready_and_reports_progress() {
        let source = Script::new(vec![doing(10), doing(10), doing(50), done()]);
        let (tx, mut rx) = unbounded_channel();
        let mut poller = ChangePoller::new(&source, "42", FAST).with_progress(Some(tx));
        assert_eq!(poller.state(), PollState::Pending);

        let change = poller.run(&CancellationToken::new()).await.unwrap();
        assert!(change.ready);
        assert_eq!(poller.state(), PollState::Ready);
        assert_eq!(poller.polls(), 4);

        // the repeated snapshot is not re-emitted
        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            seen.push(event.change.tasks[0].progress.done);
        }
        assert_eq!(seen, vec![10, 50]);
    }

    #[test_log::test(tokio::test)]
    async fn progress_never_goes_backwards() {
        let source = Script::new(vec![doing(60), doing(20), doing(70), done()]);
        let (tx, mut rx) = unbounded_channel();
        let mut poller = ChangePoller::new(&source, "42", FAST).with_progress(Some(tx));
        poller.run(&CancellationToken::new()).await.unwrap();

        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            seen.push(event.change.tasks[0].progress.done);
        }
        assert_eq!(seen, vec![60, 70]);
    }

    #[test_log::test(tokio::test)]
    async fn failed_change_carries_daemon_message() {
        let source = Script::new(vec![
            doing(10),
            json!({"id": "42", "status": "Error", "ready": true, "err": "cannot install snap"}),
        ]);
        let mut poller = ChangePoller::new(&source, "42", FAST);
        let err = poller.run(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(poller.state(), PollState::Failed);
        match err {
            Error::ChangeFailed { id, message } => {
                assert_eq!(id, "42");
                assert_eq!(message, "cannot install snap");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test_log::test(tokio::test)]
    async fn cancellation_stops_polling() {
        let source = Script::new(vec![doing(10)]);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.cancel();
        });
        let mut poller = ChangePoller::new(&source, "42", FAST);
        let err = poller.run(&cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(poller.state(), PollState::Cancelled);

        let fetched = source.fetches.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), fetched);
    }

    #[test_log::test(tokio::test)]
    async fn long_poll_waits_on_notices_between_fetches() {
        let source = Script::new(vec![doing(10), doing(20), done()]);
        let mut poller = ChangePoller::new(
            &source,
            "42",
            PollStrategy::LongPoll {
                timeout: Duration::from_secs(30),
            },
        );
        poller.run(&CancellationToken::new()).await.unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 3);
        assert_eq!(source.waits.load(Ordering::SeqCst), 2);
    }
}
