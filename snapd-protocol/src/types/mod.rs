//! Records built from envelope results.
//!
//! These are plain owned values: they carry no reference to the client or
//! the connection that produced them.

mod change;
mod interface;
mod misc;
mod notice;
mod snap;
mod system;
mod user;

pub use change::{Change, ChangeStatus, Task, TaskProgress};
pub use interface::{Connection, Connections, Interface, Plug, PlugRef, Slot, SlotRef};
pub use misc::{Alias, CategoryDetails, Icon, LogEntry, SnapctlOutput, ThemeAvailability, ThemeStatus};
pub use notice::{Notice, NoticeType};
pub use snap::{App, Category, ChannelInfo, FindResult, Media, Publisher, Snap};
pub use system::{OsRelease, RefreshInfo, SystemInformation};
pub use user::UserInformation;

use serde::{Deserialize, Serialize};

/// Opaque macaroon credentials, attached to requests as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthData {
    pub macaroon: String,
    pub discharges: Vec<String>,
}

impl AuthData {
    pub fn new(macaroon: impl Into<String>, discharges: Vec<String>) -> Self {
        Self {
            macaroon: macaroon.into(),
            discharges,
        }
    }
}

/// The daemon is restarting or the system is about to reboot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Maintenance {
    pub kind: String,
    #[serde(default)]
    pub message: String,
}
