// ============================================================================
// RecordSync Library
// ============================================================================

pub mod core;
pub mod codec;
pub mod query;
pub mod remote;
pub mod client;
pub mod identity;
pub mod adapter;
pub mod model;
pub mod config;
pub mod prelude;

// Re-export main types for convenience
pub use crate::core::{AssetRef, ErrorKind, FieldValue, RawRecord, RecordId, RemoteError, Result, SyncError};
pub use codec::{FieldReader, RecordCodec};
pub use query::{Filter, Query, SortDescriptor};
pub use config::{ClientConfig, DatabaseScope};

pub use remote::{
    AccountStatus, InMemoryRemoteStore, PermissionStatus, RecordMatch, RemoteStore, StoreOperation,
    UserIdentity,
};
pub use client::RecordClient;
pub use identity::{AccountSnapshot, GateState, IdentityGate};
pub use adapter::{ListRequest, ListState, RecordListModel};

// ============================================================================
// Container: one store handle shared by the gate and its clients
// ============================================================================

use std::sync::Arc;

/// Entry point bundling a remote store handle with its configuration.
///
/// The store is constructed once and passed in explicitly, so tests can hand
/// in an [`InMemoryRemoteStore`] where an app hands in its real transport.
///
/// # Examples
///
/// ```
/// use recordsync::{ClientConfig, Container, InMemoryRemoteStore, model::Fruit};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let container = Container::new(
///     Arc::new(InMemoryRemoteStore::new()),
///     ClientConfig::new("iCloud.com.example.FrontRunner"),
/// )
/// .unwrap();
///
/// let client = container.connect().await.unwrap();
/// let id = client.create(&Fruit::new("Banana")).await.unwrap();
/// let fruits: Vec<Fruit> = client.fetch_all().await.unwrap();
/// assert_eq!(fruits[0].id(), Some(&id));
/// # });
/// ```
pub struct Container {
    gate: IdentityGate,
}

impl Container {
    pub fn new(store: Arc<dyn RemoteStore>, config: ClientConfig) -> Result<Self> {
        Ok(Self {
            gate: IdentityGate::new(store, config)?,
        })
    }

    /// Connect using a `recordsync://<container>/<scope>` URL.
    pub fn from_url(store: Arc<dyn RemoteStore>, url: &str) -> Result<Self> {
        Self::new(store, ClientConfig::from_url(url)?)
    }

    pub fn identity(&self) -> &IdentityGate {
        &self.gate
    }

    /// Passes the identity gate and returns a client for record operations.
    pub async fn connect(&self) -> Result<RecordClient> {
        self.gate.connect().await
    }
}
