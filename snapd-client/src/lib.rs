// SPDX-FileCopyrightText: 2025 snapd-rs contributors
// SPDX-License-Identifier: MIT

//! snapd client library.
//!
//! Talks to snapd over its unix socket: every capability is a [`Request`]
//! variant, run by a [`Client`] (async) or a [`BlockingClient`]. Requests
//! the daemon answers with a change are followed until the change is done.
//!
//! **Architecture**: This is the Client Layer on top of `snapd-protocol`,
//! which does the HTTP framing and envelope parsing.
//!
//! # Basic Example
//!
//! ```ignore
//! use snapd_client::{Client, ClientConfig, SnapSelect};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(ClientConfig::default());
//!     for snap in client.get_snaps(SnapSelect::Active, vec![]).await? {
//!         println!("{} {}", snap.name, snap.version);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Following a change
//!
//! ```ignore
//! let mut operation = client.spawn(SnapAction::new(SnapActionKind::Install, "hello"));
//! let mut progress = operation.progress().unwrap();
//! tokio::spawn(async move {
//!     while let Some(event) = progress.recv().await {
//!         let (done, total) = event.totals();
//!         println!("{done}/{total}");
//!     }
//! });
//! operation.await?;
//! ```

mod blocking;
mod client;
mod config;
mod facade;
pub mod metrics;
pub mod poller;
pub mod request;
pub mod requests;
pub mod transport;

pub use blocking::BlockingClient;
pub use client::{Client, Operation};
pub use config::{ClientConfig, ConfigError};
pub use metrics::ClientMetrics;
pub use poller::{ChangePoller, ChangeProgress, ChangeSource, PollState, PollStrategy};
pub use request::{Endpoint, Reply, Request, Response};
pub use requests::*;
pub use snapd_protocol::{Error, ErrorKind, Result, types};
pub use transport::SocketAddress;
