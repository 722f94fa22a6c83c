use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AccountStatus, PermissionStatus, RecordMatch, RemoteStore, UserIdentity};
use crate::config::DatabaseScope;
use crate::core::{RawRecord, RecordId, RemoteError, SystemFields};
use crate::query::Query;

/// Remote operations, for fault injection and call accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    AccountStatus,
    RequestPermission,
    FetchUserRecordId,
    DiscoverUserIdentity,
    Query,
    Save,
    Delete,
}

#[derive(Debug, Clone)]
struct AccountState {
    status: AccountStatus,
    permission_response: PermissionStatus,
    user: Option<UserIdentity>,
}

impl Default for AccountState {
    fn default() -> Self {
        Self {
            status: AccountStatus::Available,
            permission_response: PermissionStatus::Granted,
            user: Some(UserIdentity::new("_user", "Alex")),
        }
    }
}

/// Records of one database, in insertion order.
#[derive(Debug, Default)]
struct Database {
    records: Vec<RawRecord>,
}

impl Database {
    fn position(&self, id: &RecordId) -> Option<usize> {
        self.records.iter().position(|record| record.id() == Some(id))
    }
}

/// Remote store that keeps everything in process memory.
///
/// Behaves like a hosted record database from the client's side: ids are
/// assigned on first save (`r1`, `r2`, ...), saves are unconditional
/// upserts, and system fields are stamped on every write. Account state,
/// one-shot failures and per-record failures can be scripted, and every
/// call is counted.
pub struct InMemoryRemoteStore {
    databases: RwLock<HashMap<DatabaseScope, Database>>,
    account: Mutex<AccountState>,
    faults: Mutex<HashMap<StoreOperation, RemoteError>>,
    record_faults: Mutex<HashMap<RecordId, RemoteError>>,
    calls: Mutex<HashMap<StoreOperation, usize>>,
    next_id: AtomicU64,
    latency: Option<Duration>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self {
            databases: RwLock::new(HashMap::new()),
            account: Mutex::new(AccountState::default()),
            faults: Mutex::new(HashMap::new()),
            record_faults: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            latency: None,
        }
    }

    /// Delay every call by `latency` before it is served.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_account_status(self, status: AccountStatus) -> Self {
        self.set_account_status(status);
        self
    }

    pub fn with_permission_response(self, response: PermissionStatus) -> Self {
        self.set_permission_response(response);
        self
    }

    pub fn with_user(self, user: Option<UserIdentity>) -> Self {
        self.set_user(user);
        self
    }

    pub fn set_account_status(&self, status: AccountStatus) {
        lock(&self.account).status = status;
    }

    pub fn set_permission_response(&self, response: PermissionStatus) {
        lock(&self.account).permission_response = response;
    }

    pub fn set_user(&self, user: Option<UserIdentity>) {
        lock(&self.account).user = user;
    }

    /// The next call of `operation` fails with `error`; later calls succeed.
    pub fn fail_next(&self, operation: StoreOperation, error: RemoteError) {
        lock(&self.faults).insert(operation, error);
    }

    /// Queries report `error` for this record instead of returning it.
    pub fn fail_record(&self, id: RecordId, error: RemoteError) {
        lock(&self.record_faults).insert(id, error);
    }

    /// Number of times `operation` has been called.
    pub fn calls(&self, operation: StoreOperation) -> usize {
        lock(&self.calls).get(&operation).copied().unwrap_or(0)
    }

    /// Stores a record as-is, bypassing id assignment.
    ///
    /// Used to seed records the client's codecs may not accept.
    pub async fn insert_raw(&self, scope: DatabaseScope, mut record: RawRecord) -> RecordId {
        let id = match record.id() {
            Some(id) => {
                self.reserve_id(id);
                id.clone()
            }
            None => {
                let id = self.allocate_id();
                record.assign_id(id.clone());
                id
            }
        };
        let mut databases = self.databases.write().await;
        let database = databases.entry(scope).or_default();
        match database.position(&id) {
            Some(pos) => database.records[pos] = record,
            None => database.records.push(record),
        }
        id
    }

    pub async fn record_count(&self, scope: DatabaseScope) -> usize {
        let databases = self.databases.read().await;
        databases.get(&scope).map_or(0, |db| db.records.len())
    }

    fn allocate_id(&self) -> RecordId {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        RecordId::new(format!("r{}", n))
    }

    /// Keeps generated ids clear of an explicit `r<N>` id.
    fn reserve_id(&self, id: &RecordId) {
        if let Some(n) = id.as_str().strip_prefix('r').and_then(|n| n.parse::<u64>().ok()) {
            self.next_id.fetch_max(n.saturating_add(1), Ordering::SeqCst);
        }
    }

    /// Counts the call, waits out the configured latency, then fires any
    /// scripted failure.
    async fn begin(&self, operation: StoreOperation) -> Result<(), RemoteError> {
        *lock(&self.calls).entry(operation).or_insert(0) += 1;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match lock(&self.faults).remove(&operation) {
            Some(error) => {
                debug!("injected failure for {:?}: {}", operation, error);
                Err(error)
            }
            None => Ok(()),
        }
    }

    fn account(&self) -> AccountState {
        lock(&self.account).clone()
    }
}

impl Default for InMemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn account_status(&self) -> Result<AccountStatus, RemoteError> {
        self.begin(StoreOperation::AccountStatus).await?;
        Ok(self.account().status)
    }

    async fn request_permission(&self) -> Result<PermissionStatus, RemoteError> {
        self.begin(StoreOperation::RequestPermission).await?;
        Ok(self.account().permission_response)
    }

    async fn fetch_user_record_id(&self) -> Result<Option<RecordId>, RemoteError> {
        self.begin(StoreOperation::FetchUserRecordId).await?;
        Ok(self.account().user.map(|user| user.user_record_id))
    }

    async fn discover_user_identity(&self, user_record_id: &RecordId) -> Result<Option<UserIdentity>, RemoteError> {
        self.begin(StoreOperation::DiscoverUserIdentity).await?;
        Ok(self
            .account()
            .user
            .filter(|user| &user.user_record_id == user_record_id))
    }

    async fn query(&self, scope: DatabaseScope, query: &Query) -> Result<Vec<RecordMatch>, RemoteError> {
        self.begin(StoreOperation::Query).await?;

        let matched = {
            let databases = self.databases.read().await;
            match databases.get(&scope) {
                Some(database) => query.execute(&database.records)?,
                None => {
                    query.validate()?;
                    Vec::new()
                }
            }
        };

        let record_faults = lock(&self.record_faults);
        let results = matched
            .into_iter()
            .filter_map(|record| {
                let id = record.id()?.clone();
                let result = match record_faults.get(&id) {
                    Some(error) => Err(error.clone()),
                    None => Ok(record),
                };
                Some((id, result))
            })
            .collect::<Vec<_>>();

        debug!(
            "query on {} '{}' [{}] matched {} record(s)",
            scope.as_str(),
            query.record_type,
            query.filter,
            results.len()
        );
        Ok(results)
    }

    async fn save(&self, scope: DatabaseScope, mut record: RawRecord) -> Result<RawRecord, RemoteError> {
        self.begin(StoreOperation::Save).await?;

        let now = Utc::now();
        let mut databases = self.databases.write().await;
        let database = databases.entry(scope).or_default();

        let id = match record.id() {
            Some(id) => {
                self.reserve_id(id);
                id.clone()
            }
            None => self.allocate_id(),
        };
        record.assign_id(id.clone());

        let existing = database.position(&id);
        let created_at = existing
            .and_then(|pos| database.records[pos].system())
            .map_or(now, |system| system.created_at);
        record.set_system(SystemFields {
            created_at,
            modified_at: now,
            change_tag: Uuid::new_v4().to_string(),
        });

        match existing {
            Some(pos) => database.records[pos] = record.clone(),
            None => database.records.push(record.clone()),
        }

        debug!("saved {} '{}' in {}", record.record_type(), id, scope.as_str());
        Ok(record)
    }

    async fn delete(&self, scope: DatabaseScope, id: &RecordId) -> Result<RecordId, RemoteError> {
        self.begin(StoreOperation::Delete).await?;

        let mut databases = self.databases.write().await;
        let database = databases
            .get_mut(&scope)
            .ok_or_else(|| RemoteError::RecordNotFound(id.clone()))?;
        let pos = database
            .position(id)
            .ok_or_else(|| RemoteError::RecordNotFound(id.clone()))?;
        database.records.remove(pos);

        debug!("deleted '{}' from {}", id, scope.as_str());
        Ok(id.clone())
    }
}
