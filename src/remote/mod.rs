//! The remote record store as seen by this crate.
//!
//! Every method is one request/response round trip. Implementations own
//! their transport; this crate only awaits the single result of each call.

pub mod memory;

pub use memory::{InMemoryRemoteStore, StoreOperation};

use async_trait::async_trait;

use crate::config::DatabaseScope;
use crate::core::{RawRecord, RecordId, RemoteError};
use crate::query::Query;

/// Account state reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountStatus {
    Available,
    NoAccount,
    Restricted,
    CouldNotDetermine,
    TemporarilyUnavailable,
}

/// Answer to a discoverability permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionStatus {
    /// The user has not been asked yet.
    InitialState,
    Granted,
    Denied,
    CouldNotComplete,
}

/// Identity the store returns for a user record id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub user_record_id: RecordId,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

impl UserIdentity {
    pub fn new(user_record_id: impl Into<RecordId>, given_name: &str) -> Self {
        Self {
            user_record_id: user_record_id.into(),
            given_name: Some(given_name.to_string()),
            family_name: None,
        }
    }
}

/// One record delivered by a query: the id it matched under, and either the
/// record or the per-record failure the store reported for it.
pub type RecordMatch = (RecordId, Result<RawRecord, RemoteError>);

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn account_status(&self) -> Result<AccountStatus, RemoteError>;

    async fn request_permission(&self) -> Result<PermissionStatus, RemoteError>;

    /// Record id of the signed-in user, if the store can name one.
    async fn fetch_user_record_id(&self) -> Result<Option<RecordId>, RemoteError>;

    async fn discover_user_identity(&self, user_record_id: &RecordId) -> Result<Option<UserIdentity>, RemoteError>;

    /// Runs a query to completion and returns its matches in result order.
    async fn query(&self, scope: DatabaseScope, query: &Query) -> Result<Vec<RecordMatch>, RemoteError>;

    /// Upserts a record keyed by its id; a record without one is assigned a
    /// fresh id. Returns the record as stored.
    async fn save(&self, scope: DatabaseScope, record: RawRecord) -> Result<RawRecord, RemoteError>;

    /// Returns the id of the deleted record.
    async fn delete(&self, scope: DatabaseScope, id: &RecordId) -> Result<RecordId, RemoteError>;
}
