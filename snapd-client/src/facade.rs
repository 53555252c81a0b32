//! One method per daemon capability, on both [`Client`] and [`BlockingClient`].

use bytes::Bytes;
use serde_json::{Map, Value};
use snapd_protocol::Result;
use snapd_protocol::types::{
    Alias, App, CategoryDetails, Change, Connections, FindResult, Icon, Interface, LogEntry,
    Notice, PlugRef, SlotRef, Snap, SnapctlOutput, SystemInformation, ThemeStatus,
    UserInformation,
};

use crate::blocking::BlockingClient;
use crate::client::Client;
use crate::requests::*;

macro_rules! capabilities {
    ($(
        $(#[$meta:meta])*
        fn $name:ident($($arg:ident: $ty:ty),* $(,)?) -> $out:ty = $request:expr;
    )*) => {
        impl Client {
            $(
                $(#[$meta])*
                pub async fn $name(&self, $($arg: $ty),*) -> Result<$out> {
                    self.call($request).await
                }
            )*
        }

        impl BlockingClient {
            $(
                $(#[$meta])*
                pub fn $name(&self, $($arg: $ty),*) -> Result<$out> {
                    self.block_on(self.client().$name($($arg),*))
                }
            )*
        }
    };
}

capabilities! {
    fn get_system_information() -> SystemInformation = GetSystemInfo;

    fn get_snaps(select: SnapSelect, names: Vec<String>) -> Vec<Snap> =
        GetSnaps::new().select(select).names(names);

    fn get_snap(name: &str) -> Snap = GetSnap::new(name);

    fn get_apps(names: Vec<String>, services_only: bool) -> Vec<App> =
        GetApps { names, services_only };

    fn get_icon(name: &str) -> Icon = GetIcon { name: name.to_string() };

    /// Search the store.
    fn find(request: Find) -> FindResult = request;

    fn get_categories() -> Vec<CategoryDetails> = GetCategories;

    /// Configuration of a snap; all of it when `keys` is empty.
    fn get_snap_conf(name: &str, keys: Vec<String>) -> Map<String, Value> =
        GetSnapConf { name: name.to_string(), keys };

    fn set_snap_conf(name: &str, values: Map<String, Value>) -> () =
        SetSnapConf { name: name.to_string(), values };

    fn install(name: &str, options: SnapActionOptions) -> () =
        SnapAction::new(SnapActionKind::Install, name).with_options(options);

    fn refresh(name: &str, options: SnapActionOptions) -> () =
        SnapAction::new(SnapActionKind::Refresh, name).with_options(options);

    /// Refresh every snap with an update. Yields the names of the refreshed snaps.
    fn refresh_all() -> Vec<String> = RefreshAll;

    fn remove(name: &str, options: SnapActionOptions) -> () =
        SnapAction::new(SnapActionKind::Remove, name).with_options(options);

    fn enable(name: &str) -> () = SnapAction::new(SnapActionKind::Enable, name);

    fn disable(name: &str) -> () = SnapAction::new(SnapActionKind::Disable, name);

    /// Track a different channel without refreshing.
    fn switch(name: &str, channel: &str) -> () =
        SnapAction::new(SnapActionKind::Switch, name).with_options(SnapActionOptions {
            channel: Some(channel.to_string()),
            ..SnapActionOptions::default()
        });

    fn revert(name: &str, options: SnapActionOptions) -> () =
        SnapAction::new(SnapActionKind::Revert, name).with_options(options);

    /// Install a snap from its file contents.
    fn install_stream(filename: &str, data: Bytes, options: SnapActionOptions) -> () =
        InstallStream { filename: filename.to_string(), data, options };

    fn try_snap(path: &str) -> () = TrySnap { path: path.to_string() };

    fn control_apps(names: Vec<String>, action: AppAction) -> () =
        ControlApps { names, action };

    fn get_changes(filter: ChangeFilter, snap: Option<String>) -> Vec<Change> =
        GetChanges { filter, snap };

    fn get_change(id: &str) -> Change = GetChange::new(id);

    /// Ask the daemon to abort a change. Cancelling an operation does not.
    fn abort_change(id: &str) -> Change = AbortChange { id: id.to_string() };

    fn get_notices(request: GetNotices) -> Vec<Notice> = request;

    fn get_connections(request: GetConnections) -> Connections = request;

    fn get_interfaces(request: GetInterfaces) -> Vec<Interface> = request;

    fn connect_interface(plug: PlugRef, slot: SlotRef) -> () =
        ChangeInterfaces { action: InterfaceAction::Connect, plug, slot };

    fn disconnect_interface(plug: PlugRef, slot: SlotRef) -> () =
        ChangeInterfaces { action: InterfaceAction::Disconnect, plug, slot };

    fn get_aliases() -> Vec<Alias> = GetAliases;

    fn alias(snap: &str, app: &str, alias: &str) -> () = ChangeAliases {
        action: AliasAction::Alias {
            snap: snap.to_string(),
            app: app.to_string(),
            alias: alias.to_string(),
        },
    };

    fn unalias(snap: Option<String>, alias: Option<String>) -> () =
        ChangeAliases { action: AliasAction::Unalias { snap, alias } };

    fn prefer(snap: &str) -> () =
        ChangeAliases { action: AliasAction::Prefer { snap: snap.to_string() } };

    fn get_assertions(request: GetAssertions) -> Vec<String> = request;

    fn add_assertions(assertions: Vec<String>) -> () = AddAssertions { assertions };

    /// Log in to the store. Pass the result's credentials to `set_auth_data`.
    fn login(email: &str, password: &str, otp: Option<String>) -> UserInformation = Login {
        email: email.to_string(),
        password: password.to_string(),
        otp,
    };

    fn logout(id: i64) -> () = Logout { id };

    fn get_users() -> Vec<UserInformation> = GetUsers;

    fn create_user(request: CreateUser) -> Vec<UserInformation> = request;

    fn get_logs(names: Vec<String>, lines: Option<usize>) -> Vec<LogEntry> =
        GetLogs { names, lines };

    fn check_themes(request: CheckThemes) -> ThemeStatus = request;

    fn install_themes(request: InstallThemes) -> () = request;

    /// Relay a snapctl command. A non-zero exit is not an error.
    fn run_snapctl(request: RunSnapctl) -> SnapctlOutput = request;
}
