/// Identity gate tests
///
/// Account, permission and user discovery checks against scripted store state.
/// Run with: cargo test --test identity_gate_tests
use recordsync::{
    AccountStatus, ClientConfig, Container, ErrorKind, GateState, IdentityGate,
    InMemoryRemoteStore, PermissionStatus, RecordId, RemoteError, StoreOperation, SyncError,
    UserIdentity,
};
use std::sync::Arc;

fn gate_with(store: InMemoryRemoteStore) -> (Arc<InMemoryRemoteStore>, IdentityGate) {
    let store = Arc::new(store);
    let gate = IdentityGate::new(store.clone(), ClientConfig::new("iCloud.com.example.FrontRunner"))
        .unwrap();
    (store, gate)
}

#[tokio::test]
async fn test_no_account_stops_the_sequence() {
    let (store, gate) = gate_with(InMemoryRemoteStore::new().with_account_status(AccountStatus::NoAccount));

    let err = gate.authenticate().await.unwrap_err();

    assert_eq!(err, SyncError::AccountNotFound);
    assert_eq!(store.calls(StoreOperation::AccountStatus), 1);
    assert_eq!(store.calls(StoreOperation::RequestPermission), 0);
    assert_eq!(store.calls(StoreOperation::FetchUserRecordId), 0);
    assert_eq!(store.calls(StoreOperation::DiscoverUserIdentity), 0);
}

#[tokio::test]
async fn test_available_account_resolves_true() {
    let (_store, gate) = gate_with(InMemoryRemoteStore::new());
    assert!(gate.account_status().await.unwrap());
}

#[tokio::test]
async fn test_each_account_status_maps_to_its_error() {
    let cases = [
        (AccountStatus::NoAccount, ErrorKind::AccountNotFound),
        (AccountStatus::CouldNotDetermine, ErrorKind::AccountIndeterminate),
        (AccountStatus::Restricted, ErrorKind::AccountRestricted),
        (AccountStatus::TemporarilyUnavailable, ErrorKind::AccountUnknown),
    ];

    for (status, kind) in cases {
        let (_store, gate) = gate_with(InMemoryRemoteStore::new().with_account_status(status));
        let err = gate.account_status().await.unwrap_err();
        assert_eq!(err.kind(), kind, "status {:?}", status);
    }
}

#[tokio::test]
async fn test_full_sequence_discovers_given_name() {
    let (store, gate) = gate_with(
        InMemoryRemoteStore::new().with_user(Some(UserIdentity::new("_abc123", "Jordan"))),
    );

    let state = gate.authenticate().await.unwrap();

    assert_eq!(
        state,
        GateState::Discovered {
            user_record_id: RecordId::new("_abc123"),
            given_name: "Jordan".to_string(),
        }
    );
    assert_eq!(store.calls(StoreOperation::DiscoverUserIdentity), 1);
}

#[tokio::test]
async fn test_discovery_transport_error() {
    let (store, gate) = gate_with(InMemoryRemoteStore::new());
    store.fail_next(StoreOperation::DiscoverUserIdentity, RemoteError::NetworkUnavailable);

    assert_eq!(
        gate.discover_user_identity().await.unwrap_err(),
        SyncError::UserDiscoveryFailed
    );
}

#[tokio::test]
async fn test_user_id_fetch_error() {
    let (store, gate) = gate_with(InMemoryRemoteStore::new());
    store.fail_next(StoreOperation::FetchUserRecordId, RemoteError::ServerRejected("503".into()));

    assert_eq!(
        gate.fetch_user_record_id().await.unwrap_err(),
        SyncError::UserIdFetchFailed
    );
    assert_eq!(store.calls(StoreOperation::DiscoverUserIdentity), 0);
}

#[tokio::test]
async fn test_account_recovers_between_calls() {
    let (store, gate) = gate_with(InMemoryRemoteStore::new().with_account_status(AccountStatus::Restricted));
    assert_eq!(gate.account_status().await.unwrap_err(), SyncError::AccountRestricted);

    // Nothing is cached; the next call asks the store again.
    store.set_account_status(AccountStatus::Available);
    assert!(gate.account_status().await.unwrap());
    assert_eq!(store.calls(StoreOperation::AccountStatus), 2);
}

#[tokio::test]
async fn test_snapshot_without_account() {
    let (store, gate) = gate_with(InMemoryRemoteStore::new().with_account_status(AccountStatus::NoAccount));

    let snapshot = gate.account_snapshot().await;

    assert!(!snapshot.is_signed_in);
    assert!(!snapshot.permission_granted);
    assert_eq!(snapshot.user_name, None);
    assert_eq!(
        snapshot.error.as_deref(),
        Some(SyncError::AccountNotFound.to_string().as_str())
    );
    assert_eq!(store.calls(StoreOperation::AccountStatus), 1);
    assert_eq!(store.calls(StoreOperation::RequestPermission), 0);
    assert_eq!(store.calls(StoreOperation::FetchUserRecordId), 0);
    assert_eq!(store.calls(StoreOperation::DiscoverUserIdentity), 0);
}

#[tokio::test]
async fn test_container_connect_requires_permission() {
    let store = Arc::new(InMemoryRemoteStore::new().with_permission_response(PermissionStatus::Denied));
    let container = Container::new(store.clone(), ClientConfig::new("test")).unwrap();

    assert!(matches!(
        container.connect().await,
        Err(SyncError::PermissionNotGranted)
    ));
    assert_eq!(store.calls(StoreOperation::RequestPermission), 1);
}

#[test]
fn test_gate_rejects_invalid_config() {
    let store = Arc::new(InMemoryRemoteStore::new());
    let result = IdentityGate::new(store, ClientConfig::new(""));

    assert!(matches!(result, Err(SyncError::InvalidConfig(_))));
}

#[test]
fn test_gate_from_blocking_context() {
    let (_store, gate) = gate_with(InMemoryRemoteStore::new());

    let name = tokio_test::block_on(gate.discover_user_identity()).unwrap();
    assert_eq!(name, "Alex");
}
