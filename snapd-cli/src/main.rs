// SPDX-FileCopyrightText: 2025 snapd-rs contributors
// SPDX-License-Identifier: MIT

mod error;

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{error, info};
use snapd_client::types::NoticeType;
use snapd_client::{
    ChangeFilter, Client, ClientConfig, Find, GetNotices, RunSnapctl, SnapAction, SnapActionKind,
    SnapActionOptions, SnapSelect,
};

use crate::error::{CliError, IoContext};

/// Query and drive snapd over its socket.
#[derive(Parser, Debug)]
#[command(name = "snapd-query", version)]
struct Cli {
    /// Socket to use instead of the configured one ("@name" for abstract sockets).
    #[arg(long, global = true)]
    socket: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List installed snaps.
    List {
        /// Include disabled revisions.
        #[arg(long)]
        all: bool,
    },
    /// Show one installed snap.
    Info { name: String },
    /// Search the store.
    Find { query: String },
    /// List changes, in progress ones unless --all is given.
    Changes {
        #[arg(long)]
        all: bool,
        #[arg(long)]
        snap: Option<String>,
    },
    /// Install a snap and follow the change.
    Install {
        name: String,
        #[arg(long)]
        channel: Option<String>,
        #[arg(long)]
        classic: bool,
    },
    /// Remove a snap.
    Remove {
        name: String,
        #[arg(long)]
        purge: bool,
    },
    /// Abort a change in the daemon.
    Abort { id: String },
    /// List notices.
    Notices {
        #[arg(long = "type")]
        types: Vec<String>,
        #[arg(long)]
        key: Vec<String>,
    },
    /// Show daemon and system information.
    SystemInfo,
    /// Relay a snapctl command; exits with its exit code.
    Snapctl {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

fn load_config(socket: Option<String>) -> Result<ClientConfig, CliError> {
    let mut config = match std::env::var("SNAPD_CLIENT_CONFIG") {
        Ok(path) => ClientConfig::from_file(&PathBuf::from(path))?,
        Err(_) => ClientConfig::default(),
    };
    if let Some(socket) = socket {
        config.socket_path = socket;
    }
    Ok(config)
}

async fn run(command: Command, client: &Client, out: &mut impl Write) -> Result<u8, CliError> {
    match command {
        Command::List { all } => {
            let select = if all {
                SnapSelect::All
            } else {
                SnapSelect::Active
            };
            for snap in client.get_snaps(select, Vec::new()).await? {
                writeln!(
                    out,
                    "{:<24} {:<20} {:<8} {}",
                    snap.name,
                    snap.version,
                    snap.revision,
                    snap.tracking_channel.as_deref().unwrap_or("-")
                )
                .io_context(|| "Failed to write snap list".to_string())?;
            }
        }
        Command::Info { name } => {
            let snap = client.get_snap(&name).await?;
            writeln!(
                out,
                "name: {}\nsummary: {}\nversion: {}\nrevision: {}\nconfinement: {}",
                snap.name, snap.summary, snap.version, snap.revision, snap.confinement
            )
            .io_context(|| format!("Failed to write info for {name}"))?;
        }
        Command::Find { query } => {
            let found = client.find(Find::query(query)).await?;
            for snap in found.snaps {
                writeln!(out, "{:<24} {:<20} {}", snap.name, snap.version, snap.summary)
                    .io_context(|| "Failed to write search results".to_string())?;
            }
        }
        Command::Changes { all, snap } => {
            let filter = if all {
                ChangeFilter::All
            } else {
                ChangeFilter::InProgress
            };
            for change in client.get_changes(filter, snap).await? {
                writeln!(out, "{:<6} {:<8} {}", change.id, change.status, change.summary)
                    .io_context(|| "Failed to write changes".to_string())?;
            }
        }
        Command::Install {
            name,
            channel,
            classic,
        } => {
            let options = SnapActionOptions {
                channel,
                classic,
                ..SnapActionOptions::default()
            };
            follow(client, SnapAction::new(SnapActionKind::Install, &name).with_options(options))
                .await?;
            writeln!(out, "{name} installed")
                .io_context(|| "Failed to write result".to_string())?;
        }
        Command::Remove { name, purge } => {
            let options = SnapActionOptions {
                purge,
                ..SnapActionOptions::default()
            };
            follow(client, SnapAction::new(SnapActionKind::Remove, &name).with_options(options))
                .await?;
            writeln!(out, "{name} removed")
                .io_context(|| "Failed to write result".to_string())?;
        }
        Command::Abort { id } => {
            let change = client.abort_change(&id).await?;
            writeln!(out, "{} {}", change.id, change.status)
                .io_context(|| "Failed to write result".to_string())?;
        }
        Command::Notices { types, key } => {
            let request = GetNotices::new()
                .types(types.iter().map(|t| NoticeType::parse(t)))
                .keys(key);
            for notice in client.get_notices(request).await? {
                writeln!(
                    out,
                    "{:<6} {:<28} {}",
                    notice.id, notice.notice_type, notice.key
                )
                .io_context(|| "Failed to write notices".to_string())?;
            }
        }
        Command::SystemInfo => {
            let info = client.get_system_information().await?;
            writeln!(
                out,
                "snapd {} on {} {} (series {})",
                info.version, info.os_release.id, info.os_release.version_id, info.series
            )
            .io_context(|| "Failed to write system information".to_string())?;
        }
        Command::Snapctl { args } => {
            let output = client.run_snapctl(RunSnapctl::new(args)).await?;
            out.write_all(output.stdout.as_bytes())
                .io_context(|| "Failed to write snapctl output".to_string())?;
            eprint!("{}", output.stderr);
            return Ok(u8::try_from(output.exit_code).unwrap_or(1));
        }
    }
    Ok(0)
}

/// Run a change-starting request, logging task progress as it moves.
async fn follow(client: &Client, action: SnapAction) -> Result<(), CliError> {
    let mut operation = client.spawn(action);
    if let Some(mut progress) = operation.progress() {
        tokio::spawn(async move {
            while let Some(event) = progress.recv().await {
                let (done, total) = event.totals();
                info!("{}: {done}/{total}", event.change.summary);
            }
        });
    }
    operation.await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match load_config(cli.socket) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let client = Client::new(config);

    let mut stdout = std::io::stdout().lock();
    match run(cli.command, &client, &mut stdout).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use snapd_test_utils::{MockDaemon, MockResponse};

    fn client_for(daemon: &MockDaemon) -> Client {
        Client::new(ClientConfig {
            socket_path: daemon.address().to_string(),
            snapctl_socket_path: daemon.address().to_string(),
            poll_interval_ms: 5,
            ..ClientConfig::default()
        })
    }

    #[test]
    fn parses_snapctl_arguments_verbatim() {
        let cli = Cli::parse_from(["snapd-query", "snapctl", "get", "-d", "key"]);
        match cli.command {
            Command::Snapctl { args } => assert_eq!(args, vec!["get", "-d", "key"]),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn socket_flag_overrides_default() {
        let config = load_config(Some("@snapd-test".into())).unwrap();
        assert_eq!(config.socket_path, "@snapd-test");
    }

    #[test_log::test(tokio::test)]
    async fn list_prints_one_line_per_snap() {
        let daemon = MockDaemon::start(|_| {
            MockResponse::sync(json!([
                {"name": "hello", "version": "2.10", "revision": "42", "tracking-channel": "latest/stable"},
                {"name": "core22", "version": "20240111", "revision": "1122"}
            ]))
        })
        .unwrap();
        let mut out = Vec::new();
        let code = run(Command::List { all: false }, &client_for(&daemon), &mut out)
            .await
            .unwrap();
        assert_eq!(code, 0);
        let out = String::from_utf8(out).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("hello"));
        assert!(lines[0].ends_with("latest/stable"));
        assert!(lines[1].ends_with('-'));
    }

    #[test_log::test(tokio::test)]
    async fn snapctl_exit_code_is_propagated() {
        let daemon = MockDaemon::start(|_| {
            MockResponse::json(
                200,
                json!({"type": "error", "status-code": 200, "result": {
                    "kind": "unsuccessful", "message": "exit status 3",
                    "value": {"stdout": "partial\n", "stderr": "", "exit-code": 3}
                }}),
            )
        })
        .unwrap();
        let mut out = Vec::new();
        let code = run(
            Command::Snapctl {
                args: vec!["is-connected".into(), "home".into()],
            },
            &client_for(&daemon),
            &mut out,
        )
        .await
        .unwrap();
        assert_eq!(code, 3);
        assert_eq!(out, b"partial\n");
    }

    #[test_log::test(tokio::test)]
    async fn daemon_errors_are_reported() {
        let daemon = MockDaemon::start(|_| {
            MockResponse::error(404, Some("snap-not-found"), "snap \"nope\" not found")
        })
        .unwrap();
        let err = run(
            Command::Info {
                name: "nope".into(),
            },
            &client_for(&daemon),
            &mut Vec::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "snap \"nope\" not found");
    }
}
