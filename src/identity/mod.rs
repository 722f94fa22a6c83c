//! Account and permission checks that run before records are touched.
//!
//! The gate walks a fixed sequence: account status, then (optionally)
//! discoverability permission, then user-record id and identity lookup.
//! The first failing step decides the error and no later step is attempted.
//! Nothing is retried.

use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};

use crate::client::RecordClient;
use crate::config::ClientConfig;
use crate::core::{RecordId, Result, SyncError};
use crate::remote::{AccountStatus, PermissionStatus, RemoteStore};

/// Progress of the gate for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Unknown,
    AccountChecked(AccountStatus),
    PermissionResolved(PermissionStatus),
    UserIdFetched(RecordId),
    Discovered { user_record_id: RecordId, given_name: String },
}

/// What the account screen shows: each check's outcome, collected
/// independently, plus the first error's description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub is_signed_in: bool,
    pub permission_granted: bool,
    pub user_name: Option<String>,
    pub error: Option<String>,
}

pub struct IdentityGate {
    store: Arc<dyn RemoteStore>,
    config: ClientConfig,
}

impl IdentityGate {
    pub fn new(store: Arc<dyn RemoteStore>, config: ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    /// Resolves to `true` when an account is available.
    pub async fn account_status(&self) -> Result<bool> {
        let status = self
            .store
            .account_status()
            .instrument(info_span!("identity.account_status"))
            .await;

        match status {
            Ok(AccountStatus::Available) => Ok(true),
            Ok(AccountStatus::NoAccount) => Err(SyncError::AccountNotFound),
            Ok(AccountStatus::CouldNotDetermine) => Err(SyncError::AccountIndeterminate),
            Ok(AccountStatus::Restricted) => Err(SyncError::AccountRestricted),
            Ok(AccountStatus::TemporarilyUnavailable) => Err(SyncError::AccountUnknown),
            Err(err) => {
                event!(Level::WARN, error = %err, "account status check failed");
                Err(SyncError::AccountIndeterminate)
            }
        }
    }

    /// Resolves to `true` when discoverability permission is granted.
    pub async fn request_permission(&self) -> Result<bool> {
        let status = self
            .store
            .request_permission()
            .instrument(info_span!("identity.request_permission"))
            .await;

        match status {
            Ok(PermissionStatus::Granted) => Ok(true),
            Ok(other) => {
                event!(Level::DEBUG, status = ?other, "permission not granted");
                Err(SyncError::PermissionNotGranted)
            }
            Err(err) => {
                event!(Level::WARN, error = %err, "permission request failed");
                Err(SyncError::PermissionNotGranted)
            }
        }
    }

    pub async fn fetch_user_record_id(&self) -> Result<RecordId> {
        match self.store.fetch_user_record_id().await {
            Ok(Some(id)) => Ok(id),
            Ok(None) => Err(SyncError::UserIdFetchFailed),
            Err(err) => {
                event!(Level::WARN, error = %err, "user record id fetch failed");
                Err(SyncError::UserIdFetchFailed)
            }
        }
    }

    /// Fetches the current user's record id, then looks up their given name.
    pub async fn discover_user_identity(&self) -> Result<String> {
        async {
            let user_record_id = self.fetch_user_record_id().await?;
            self.discover_name(&user_record_id).await
        }
        .instrument(info_span!("identity.discover"))
        .await
    }

    async fn discover_name(&self, user_record_id: &RecordId) -> Result<String> {
        match self.store.discover_user_identity(user_record_id).await {
            Ok(identity) => identity
                .and_then(|identity| identity.given_name)
                .ok_or(SyncError::UserDiscoveryFailed),
            Err(err) => {
                event!(Level::WARN, error = %err, "user discovery failed");
                Err(SyncError::UserDiscoveryFailed)
            }
        }
    }

    /// Runs every step in order and returns the final state.
    pub async fn authenticate(&self) -> Result<GateState> {
        let mut state = GateState::Unknown;
        let span = info_span!("identity.authenticate", container = %self.config.container);

        if let Err(err) = self.advance(&mut state).instrument(span).await {
            event!(Level::DEBUG, reached = ?state, error = %err, "gate stopped");
            return Err(err);
        }
        Ok(state)
    }

    async fn advance(&self, state: &mut GateState) -> Result<()> {
        self.account_status().await?;
        *state = GateState::AccountChecked(AccountStatus::Available);

        self.request_permission().await?;
        *state = GateState::PermissionResolved(PermissionStatus::Granted);

        let user_record_id = self.fetch_user_record_id().await?;
        *state = GateState::UserIdFetched(user_record_id.clone());

        let given_name = self.discover_name(&user_record_id).await?;
        *state = GateState::Discovered {
            user_record_id,
            given_name,
        };
        Ok(())
    }

    /// Checks the account (and permission, when configured) and hands out
    /// a client for record operations.
    pub async fn connect(&self) -> Result<RecordClient> {
        self.account_status().await?;
        if self.config.require_permission {
            self.request_permission().await?;
        }
        RecordClient::new(Arc::clone(&self.store), self.config.clone())
    }

    /// Walks the same steps as [`IdentityGate::authenticate`] and reports how
    /// far it got. Steps after the first failure are not attempted; the
    /// error text is that failure's description.
    pub async fn account_snapshot(&self) -> AccountSnapshot {
        let mut snapshot = AccountSnapshot::default();

        let step = async {
            snapshot.is_signed_in = self.account_status().await?;
            snapshot.permission_granted = self.request_permission().await?;
            snapshot.user_name = Some(self.discover_user_identity().await?);
            Ok::<(), SyncError>(())
        }
        .instrument(info_span!("identity.snapshot"))
        .await;

        if let Err(err) = step {
            snapshot.error = Some(err.to_string());
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RemoteError;
    use crate::remote::{InMemoryRemoteStore, StoreOperation, UserIdentity};

    fn gate(store: &Arc<InMemoryRemoteStore>) -> IdentityGate {
        IdentityGate::new(store.clone(), ClientConfig::new("test")).unwrap()
    }

    #[tokio::test]
    async fn test_account_status_mapping() {
        let cases = [
            (AccountStatus::NoAccount, SyncError::AccountNotFound),
            (AccountStatus::CouldNotDetermine, SyncError::AccountIndeterminate),
            (AccountStatus::Restricted, SyncError::AccountRestricted),
            (AccountStatus::TemporarilyUnavailable, SyncError::AccountUnknown),
        ];

        for (status, expected) in cases {
            let store = Arc::new(InMemoryRemoteStore::new().with_account_status(status));
            assert_eq!(gate(&store).account_status().await.unwrap_err(), expected);
        }
    }

    #[tokio::test]
    async fn test_status_transport_error_is_indeterminate() {
        let store = Arc::new(InMemoryRemoteStore::new());
        store.fail_next(StoreOperation::AccountStatus, RemoteError::NetworkUnavailable);

        assert_eq!(
            gate(&store).account_status().await.unwrap_err(),
            SyncError::AccountIndeterminate
        );
    }

    #[tokio::test]
    async fn test_permission_outcomes() {
        for response in [
            PermissionStatus::Denied,
            PermissionStatus::InitialState,
            PermissionStatus::CouldNotComplete,
        ] {
            let store = Arc::new(InMemoryRemoteStore::new().with_permission_response(response));
            assert_eq!(
                gate(&store).request_permission().await.unwrap_err(),
                SyncError::PermissionNotGranted
            );
        }

        let store = Arc::new(InMemoryRemoteStore::new());
        assert!(gate(&store).request_permission().await.unwrap());
    }

    #[tokio::test]
    async fn test_discovery_requires_given_name() {
        let nameless = UserIdentity {
            user_record_id: RecordId::new("u1"),
            given_name: None,
            family_name: Some("Epp".into()),
        };
        let store = Arc::new(InMemoryRemoteStore::new().with_user(Some(nameless)));

        assert_eq!(
            gate(&store).discover_user_identity().await.unwrap_err(),
            SyncError::UserDiscoveryFailed
        );
    }

    #[tokio::test]
    async fn test_missing_user_id_skips_discovery() {
        let store = Arc::new(InMemoryRemoteStore::new().with_user(None));

        assert_eq!(
            gate(&store).discover_user_identity().await.unwrap_err(),
            SyncError::UserIdFetchFailed
        );
        assert_eq!(store.calls(StoreOperation::DiscoverUserIdentity), 0);
    }

    #[tokio::test]
    async fn test_authenticate_reaches_discovered() {
        let store = Arc::new(InMemoryRemoteStore::new().with_user(Some(UserIdentity::new("u1", "Sam"))));

        let state = gate(&store).authenticate().await.unwrap();
        assert_eq!(
            state,
            GateState::Discovered {
                user_record_id: RecordId::new("u1"),
                given_name: "Sam".into()
            }
        );
    }

    #[tokio::test]
    async fn test_denied_permission_short_circuits_authenticate() {
        let store = Arc::new(InMemoryRemoteStore::new().with_permission_response(PermissionStatus::Denied));

        let err = gate(&store).authenticate().await.unwrap_err();
        assert_eq!(err, SyncError::PermissionNotGranted);
        assert_eq!(store.calls(StoreOperation::FetchUserRecordId), 0);
        assert_eq!(store.calls(StoreOperation::DiscoverUserIdentity), 0);
    }

    #[tokio::test]
    async fn test_connect_skips_permission_when_not_required() {
        let store = Arc::new(InMemoryRemoteStore::new().with_permission_response(PermissionStatus::Denied));
        let gate = IdentityGate::new(
            store.clone(),
            ClientConfig::new("test").require_permission(false),
        )
        .unwrap();

        assert!(gate.connect().await.is_ok());
        assert_eq!(store.calls(StoreOperation::RequestPermission), 0);
    }

    #[tokio::test]
    async fn test_account_snapshot_stops_at_denied_permission() {
        let store = Arc::new(
            InMemoryRemoteStore::new()
                .with_permission_response(PermissionStatus::Denied)
                .with_user(Some(UserIdentity::new("u1", "Sam"))),
        );

        let snapshot = gate(&store).account_snapshot().await;
        assert!(snapshot.is_signed_in);
        assert!(!snapshot.permission_granted);
        assert_eq!(snapshot.user_name, None);
        assert_eq!(
            snapshot.error.as_deref(),
            Some("Application permission was not granted")
        );
        assert_eq!(store.calls(StoreOperation::FetchUserRecordId), 0);
        assert_eq!(store.calls(StoreOperation::DiscoverUserIdentity), 0);
    }

    #[tokio::test]
    async fn test_account_snapshot_all_granted() {
        let store = Arc::new(InMemoryRemoteStore::new().with_user(Some(UserIdentity::new("u1", "Sam"))));

        let snapshot = gate(&store).account_snapshot().await;
        assert_eq!(
            snapshot,
            AccountSnapshot {
                is_signed_in: true,
                permission_granted: true,
                user_name: Some("Sam".into()),
                error: None,
            }
        );
    }
}
