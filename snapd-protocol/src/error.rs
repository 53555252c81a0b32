//! Error taxonomy shared by the codec, the envelope parser and the client.

use std::io;

use serde_json::Value;
use thiserror::Error;

/// The coarse classification every [`Error`] projects onto.
///
/// Callers match on this rather than on [`Error`] variants when deciding what
/// to tell the user or whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ErrorKind {
    ConnectionFailed,
    WriteFailed,
    ReadFailed,
    BadRequest,
    BadResponse,
    AuthDataRequired,
    AuthDataInvalid,
    TwoFactorRequired,
    TwoFactorInvalid,
    PermissionDenied,
    Failed,
    TermsNotAccepted,
    PaymentNotSetup,
    PaymentDeclined,
    AlreadyInstalled,
    NotInstalled,
    NoUpdateAvailable,
    PasswordPolicy,
    NeedsDevmode,
    NeedsClassic,
    NeedsClassicSystem,
    Cancelled,
    BadQuery,
    NetworkTimeout,
    NotFound,
    NotInStore,
    AuthCancelled,
    NotClassic,
    RevisionNotAvailable,
    ChannelNotAvailable,
    ArchitectureNotAvailable,
    ChangeConflict,
}

impl ErrorKind {
    /// Map the `kind` field of a daemon error result.
    ///
    /// Unknown kinds become [`ErrorKind::Failed`].
    pub fn from_daemon_kind(kind: &str) -> Self {
        match kind {
            "login-required" => Self::AuthDataRequired,
            "invalid-auth-data" => Self::AuthDataInvalid,
            "two-factor-required" => Self::TwoFactorRequired,
            "two-factor-failed" => Self::TwoFactorInvalid,
            "terms-not-accepted" => Self::TermsNotAccepted,
            "no-payment-methods" => Self::PaymentNotSetup,
            "payment-declined" => Self::PaymentDeclined,
            "snap-already-installed" => Self::AlreadyInstalled,
            "snap-not-installed" => Self::NotInstalled,
            "snap-no-update-available" => Self::NoUpdateAvailable,
            "password-policy" => Self::PasswordPolicy,
            "snap-needs-devmode" => Self::NeedsDevmode,
            "snap-needs-classic" => Self::NeedsClassic,
            "snap-needs-classic-system" => Self::NeedsClassicSystem,
            "snap-not-classic" => Self::NotClassic,
            "bad-query" => Self::BadQuery,
            "network-timeout" => Self::NetworkTimeout,
            "snap-not-found" | "app-not-found" | "option-not-found" => Self::NotFound,
            "snap-not-in-store" | "snap-not-available" => Self::NotInStore,
            "auth-cancelled" => Self::AuthCancelled,
            "snap-revision-not-available" => Self::RevisionNotAvailable,
            "snap-channel-not-available" => Self::ChannelNotAvailable,
            "snap-architecture-not-available" => Self::ArchitectureNotAvailable,
            "snap-change-conflict" => Self::ChangeConflict,
            _ => Self::Failed,
        }
    }

    /// Classification used when an error result carries no `kind` at all.
    pub fn from_status_code(status_code: u16) -> Self {
        match status_code {
            400 => Self::BadRequest,
            401 => Self::AuthDataRequired,
            403 => Self::PermissionDenied,
            _ => Self::Failed,
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to connect to {address}: {source}")]
    ConnectionFailed {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("abstract socket address {0} is not supported on this platform")]
    UnsupportedPlatform(String),

    #[error("connection closed before any response was received")]
    ConnectionClosed,

    #[error("{context}: {source}")]
    WriteFailed {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("{context}: {source}")]
    ReadFailed {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("truncated response: {0}")]
    Truncated(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    /// An error envelope reported by snapd.
    #[error("{message}")]
    Daemon {
        kind: ErrorKind,
        /// The raw `kind` string, when the daemon sent one.
        daemon_kind: Option<String>,
        message: String,
        status_code: u16,
        value: Option<Value>,
    },

    #[error("change {id} failed: {message}")]
    ChangeFailed { id: String, message: String },

    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn bad_response(message: impl Into<String>) -> Self {
        Self::BadResponse(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConnectionFailed { .. } | Self::UnsupportedPlatform(_) | Self::ConnectionClosed => {
                ErrorKind::ConnectionFailed
            }
            Self::WriteFailed { .. } => ErrorKind::WriteFailed,
            Self::ReadFailed { .. } | Self::Truncated(_) => ErrorKind::ReadFailed,
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::BadResponse(_) => ErrorKind::BadResponse,
            Self::Daemon { kind, .. } => *kind,
            Self::ChangeFailed { .. } => ErrorKind::Failed,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to IO errors
pub trait IoErrorContext<T> {
    fn read_context(self, context: impl Into<String>) -> Result<T>;
    fn write_context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> IoErrorContext<T> for std::result::Result<T, io::Error> {
    fn read_context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::ReadFailed {
            context: context.into(),
            source: e,
        })
    }

    fn write_context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::WriteFailed {
            context: context.into(),
            source: e,
        })
    }
}
