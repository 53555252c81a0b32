//! One request type per daemon endpoint.

mod actions;
mod assertions;
mod changes;
mod interfaces;
mod logs;
mod notices;
mod snapctl;
mod snaps;
mod system;
mod themes;
mod users;

pub use actions::{
    AppAction, ControlApps, InstallStream, RefreshAll, SnapAction, SnapActionKind,
    SnapActionOptions, TrySnap,
};
pub use assertions::{AddAssertions, GetAssertions, split_assertions};
pub use changes::{AbortChange, ChangeFilter, GetChange, GetChanges};
pub use interfaces::{
    AliasAction, ChangeAliases, ChangeInterfaces, GetAliases, GetConnections, GetInterfaces,
    InterfaceAction,
};
pub use logs::GetLogs;
pub use notices::GetNotices;
pub use snapctl::RunSnapctl;
pub use snaps::{
    Find, FindScope, GetApps, GetCategories, GetIcon, GetSnap, GetSnapConf, GetSnaps,
    SetSnapConf, SnapSelect,
};
pub use system::GetSystemInfo;
pub use themes::{CheckThemes, InstallThemes};
pub use users::{CreateUser, GetUsers, Login, Logout};
