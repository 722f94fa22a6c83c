use std::fmt;
use thiserror::Error;

use super::RecordId;

/// Failure reported by the remote store itself.
///
/// The client never reinterprets these; they travel to the caller inside
/// [`SyncError::RemoteOperationFailed`] exactly as the store produced them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Network unavailable")]
    NetworkUnavailable,

    #[error("Request rejected by server: {0}")]
    ServerRejected(String),

    #[error("Record '{0}' not found")]
    RecordNotFound(RecordId),

    #[error("Quota exceeded")]
    QuotaExceeded,

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Internal store error: {0}")]
    Internal(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("No account is signed in on this device")]
    AccountNotFound,

    #[error("Account status could not be determined")]
    AccountIndeterminate,

    #[error("Account is restricted")]
    AccountRestricted,

    #[error("Account status is unknown")]
    AccountUnknown,

    #[error("Application permission was not granted")]
    PermissionNotGranted,

    #[error("Could not fetch the current user's record id")]
    UserIdFetchFailed,

    #[error("Could not discover the current user's identity")]
    UserDiscoveryFailed,

    #[error("Remote operation failed: {0}")]
    RemoteOperationFailed(#[source] RemoteError),

    #[error("Record of type '{record_type}' has no identity; save it first")]
    MissingIdentity { record_type: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Stable, machine-readable identifier for each [`SyncError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AccountNotFound,
    AccountIndeterminate,
    AccountRestricted,
    AccountUnknown,
    PermissionNotGranted,
    UserIdFetchFailed,
    UserDiscoveryFailed,
    RemoteOperationFailed,
    MissingIdentity,
    InvalidConfig,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccountNotFound => "account_not_found",
            Self::AccountIndeterminate => "account_indeterminate",
            Self::AccountRestricted => "account_restricted",
            Self::AccountUnknown => "account_unknown",
            Self::PermissionNotGranted => "permission_not_granted",
            Self::UserIdFetchFailed => "user_id_fetch_failed",
            Self::UserDiscoveryFailed => "user_discovery_failed",
            Self::RemoteOperationFailed => "remote_operation_failed",
            Self::MissingIdentity => "missing_identity",
            Self::InvalidConfig => "invalid_config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AccountNotFound => ErrorKind::AccountNotFound,
            Self::AccountIndeterminate => ErrorKind::AccountIndeterminate,
            Self::AccountRestricted => ErrorKind::AccountRestricted,
            Self::AccountUnknown => ErrorKind::AccountUnknown,
            Self::PermissionNotGranted => ErrorKind::PermissionNotGranted,
            Self::UserIdFetchFailed => ErrorKind::UserIdFetchFailed,
            Self::UserDiscoveryFailed => ErrorKind::UserDiscoveryFailed,
            Self::RemoteOperationFailed(_) => ErrorKind::RemoteOperationFailed,
            Self::MissingIdentity { .. } => ErrorKind::MissingIdentity,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }

    /// The store-level cause, if this error came from a remote call.
    pub fn remote_cause(&self) -> Option<&RemoteError> {
        match self {
            Self::RemoteOperationFailed(cause) => Some(cause),
            _ => None,
        }
    }
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        Self::RemoteOperationFailed(err)
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
