//! Typed CRUD and query calls against a [`RemoteStore`].
//!
//! Each call performs exactly one remote operation and resolves exactly
//! once. Calls are independent: nothing is queued, deduplicated, retried or
//! cancelled here, and two overlapping calls may complete in either order.

use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};

use crate::codec::RecordCodec;
use crate::config::ClientConfig;
use crate::core::{RecordId, RemoteError, Result, SyncError};
use crate::query::{Filter, Query, SortDescriptor};
use crate::remote::RemoteStore;

/// Handle for typed record operations.
///
/// Cheap to clone; clones share the same store handle.
#[derive(Clone)]
pub struct RecordClient {
    store: Arc<dyn RemoteStore>,
    config: Arc<ClientConfig>,
}

impl RecordClient {
    pub fn new(store: Arc<dyn RemoteStore>, config: ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    /// Runs a query for entities of type `T`.
    ///
    /// Records that fail to decode, and records the store reports a
    /// per-record failure for, are dropped; they do not fail the query.
    /// Without an explicit `limit` the configured default applies.
    pub async fn query<T: RecordCodec>(
        &self,
        filter: Filter,
        sort: Vec<SortDescriptor>,
        limit: Option<usize>,
    ) -> Result<Vec<T>> {
        let query = Query::new(T::RECORD_TYPE, filter)
            .sorted(sort)
            .limit(limit.or(self.config.default_results_limit));
        self.run_query(query).await
    }

    /// All entities of type `T`, in store order.
    pub async fn fetch_all<T: RecordCodec>(&self) -> Result<Vec<T>> {
        self.query(Filter::all(), Vec::new(), None).await
    }

    pub async fn run_query<T: RecordCodec>(&self, query: Query) -> Result<Vec<T>> {
        let span = info_span!(
            "record.query",
            record_type = %query.record_type,
            filter = %query.filter,
            limit = ?query.limit
        );

        async move {
            let matches = self
                .store
                .query(self.config.scope, &query)
                .await
                .map_err(|err| {
                    event!(Level::WARN, error = %err, "query failed");
                    SyncError::RemoteOperationFailed(err)
                })?;

            let total = matches.len();
            let items: Vec<T> = matches
                .into_iter()
                .filter_map(|(id, result)| match result {
                    Ok(record) => {
                        let item = T::decode(&record);
                        if item.is_none() {
                            event!(Level::DEBUG, record_id = %id, "record skipped: decode failed");
                        }
                        item
                    }
                    Err(err) => {
                        event!(Level::DEBUG, record_id = %id, error = %err, "record skipped: match failed");
                        None
                    }
                })
                .collect();

            event!(Level::DEBUG, matched = total, returned = items.len(), "query finished");
            Ok(items)
        }
        .instrument(span)
        .await
    }

    /// Saves a new entity and returns the identity the store assigned.
    ///
    /// An entity that already carries an identity is saved under it, which
    /// makes this the same operation as [`RecordClient::update`].
    pub async fn create<T: RecordCodec>(&self, entity: &T) -> Result<RecordId> {
        self.save(entity, "record.create").await
    }

    /// Unconditionally overwrites the stored record (last write wins).
    ///
    /// If the record was deleted meanwhile, the store recreates it under
    /// the same identity.
    pub async fn update<T: RecordCodec>(&self, entity: &T) -> Result<RecordId> {
        require_identity(entity)?;
        self.save(entity, "record.update").await
    }

    /// Removes the entity's record. Resolves to `true` once the store
    /// confirms the delete.
    pub async fn delete<T: RecordCodec>(&self, entity: &T) -> Result<bool> {
        let id = require_identity(entity)?;
        let span = info_span!("record.delete", record_type = T::RECORD_TYPE, record_id = %id);

        async move {
            match self.store.delete(self.config.scope, id).await {
                Ok(_) => {
                    event!(Level::DEBUG, "record deleted");
                    Ok(true)
                }
                Err(err) => {
                    event!(Level::WARN, error = %err, "delete failed");
                    Err(SyncError::RemoteOperationFailed(err))
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn save<T: RecordCodec>(&self, entity: &T, operation: &'static str) -> Result<RecordId> {
        let record = entity.encode();
        let span = info_span!(
            "record.save",
            operation,
            record_type = T::RECORD_TYPE,
            record_id = ?entity.record_id()
        );

        async move {
            match self.store.save(self.config.scope, record).await {
                Ok(saved) => {
                    let id = saved.id().cloned().ok_or_else(|| {
                        SyncError::RemoteOperationFailed(RemoteError::Internal(
                            "store returned a saved record without an id".into(),
                        ))
                    })?;
                    event!(Level::DEBUG, record_id = %id, "record saved");
                    Ok(id)
                }
                Err(err) => {
                    event!(Level::WARN, error = %err, "save failed");
                    Err(SyncError::RemoteOperationFailed(err))
                }
            }
        }
        .instrument(span)
        .await
    }
}

fn require_identity<T: RecordCodec>(entity: &T) -> Result<&RecordId> {
    entity.record_id().ok_or_else(|| SyncError::MissingIdentity {
        record_type: T::RECORD_TYPE.to_string(),
    })
}
