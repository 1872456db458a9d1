#![allow(clippy::unwrap_used)]
// Registry behaviour against stub devices.

mod common;

use std::path::PathBuf;
use std::sync::Arc;

use common::{Script, StubFactory};
use southbound_core::{
    CoreError, DeviceDescriptor, Registry, TlsPolicy, TlsSettings, VersionedId,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn plain_device(id: &str) -> DeviceDescriptor {
    let mut device = DeviceDescriptor::new(id, "1.0.0", "localhost:10161");
    device.tls = TlsSettings::plaintext();
    device
}

fn registry() -> (Registry, Arc<StubFactory>) {
    let factory = StubFactory::with_script(Script::default());
    (Registry::new(factory.clone()), factory)
}

// ── Connect / lookup ────────────────────────────────────────────────

#[tokio::test]
async fn plain_device_connects_and_is_found() {
    let (registry, factory) = registry();

    let key = registry.connect(&plain_device("device1")).await.unwrap();
    assert_eq!(key, VersionedId::new("device1", "1.0.0"));

    let session = registry.get(&key).unwrap();
    let again = registry.get(&key).unwrap();
    assert!(Arc::ptr_eq(&session, &again));
    assert_eq!(session.key(), &key);

    let dest = factory.destinations.lock().unwrap()[0].clone();
    assert!(dest.is_plaintext());
    assert_eq!(dest.addrs, vec!["localhost:10161".to_string()]);
    assert_eq!(dest.target, "device1");
}

#[tokio::test]
async fn reconnect_closes_the_previous_client_once() {
    let (registry, factory) = registry();
    let device = plain_device("device1");

    let key = registry.connect(&device).await.unwrap();
    let session = registry.get(&key).unwrap();
    registry.connect(&device).await.unwrap();

    assert_eq!(registry.len(), 1);
    assert_eq!(factory.open_count(), 2);
    assert_eq!(factory.client(0).closes(), 1);
    assert_eq!(factory.client(1).closes(), 0);

    // The session object survives; only its client changed.
    let current = registry.get(&key).unwrap();
    assert!(Arc::ptr_eq(&session, &current));
    current.get_with_str("path: <elem: <name: 'a'>>").await.unwrap();
    assert_eq!(factory.client(0).calls(), 0);
    assert_eq!(factory.client(1).calls(), 1);
}

#[tokio::test]
async fn failed_reconnect_keeps_the_old_client() {
    let (registry, factory) = registry();
    let device = plain_device("device1");
    let key = registry.connect(&device).await.unwrap();

    factory.set_failing(true);
    let err = registry.connect(&device).await.unwrap_err();
    assert!(matches!(err, CoreError::ConnectFailed { .. }), "got: {err}");
    assert!(err.to_string().contains("connection refused"));

    let session = registry.get(&key).unwrap();
    session.capabilities_with_str("").await.unwrap();
    assert_eq!(factory.client(0).closes(), 0);
    assert_eq!(factory.client(0).calls(), 1);
}

#[tokio::test]
async fn failed_first_connect_registers_nothing() {
    let (registry, factory) = registry();
    factory.set_failing(true);

    registry.connect(&plain_device("device1")).await.unwrap_err();
    assert!(registry.is_empty());
}

#[tokio::test]
async fn versions_are_separate_sessions() {
    let (registry, _factory) = registry();
    let v1 = plain_device("device1");
    let mut v2 = plain_device("device1");
    v2.version = "2.0.0".into();

    registry.connect(&v1).await.unwrap();
    registry.connect(&v2).await.unwrap();

    assert_eq!(
        registry.keys(),
        vec![
            VersionedId::new("device1", "1.0.0"),
            VersionedId::new("device1", "2.0.0"),
        ]
    );
}

#[tokio::test]
async fn closed_session_is_replaced_on_connect() {
    let (registry, factory) = registry();
    let device = plain_device("device1");
    let key = registry.connect(&device).await.unwrap();
    let old = registry.get(&key).unwrap();
    old.close().await.unwrap();

    registry.connect(&device).await.unwrap();
    let new = registry.get(&key).unwrap();
    assert!(!Arc::ptr_eq(&old, &new));
    assert!(!new.is_closed());
    // Already closed by the session; not closed again by the swap.
    assert_eq!(factory.client(0).closes(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_connects_leave_one_live_client() {
    let (registry, factory) = registry();
    let registry = Arc::new(registry);
    let device = plain_device("device1");

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let device = device.clone();
            tokio::spawn(async move { registry.connect(&device).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(registry.len(), 1);
    assert_eq!(factory.open_count(), 8);
    let closed: usize = (0..8).map(|i| factory.client(i).closes()).sum();
    assert_eq!(closed, 7);
}

// ── Lookup misses ───────────────────────────────────────────────────

#[test]
fn empty_registry_lookup_is_not_found() {
    let (registry, _factory) = registry();
    let err = registry.get(&VersionedId::new("device1", "1.0.0")).unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("Known clients: []"));
}

#[tokio::test]
async fn not_found_lists_known_keys() {
    let (registry, _factory) = registry();
    registry.connect(&plain_device("device1")).await.unwrap();
    registry.connect(&plain_device("device2")).await.unwrap();

    let err = registry.get(&VersionedId::new("device3", "1.0.0")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "gNMI client for device3:1.0.0 does not exist. Known clients: [device1:1.0.0, device2:1.0.0]"
    );
}

// ── Disconnect ──────────────────────────────────────────────────────

#[tokio::test]
async fn disconnect_removes_and_closes() {
    let (registry, factory) = registry();
    let key = registry.connect(&plain_device("device1")).await.unwrap();
    let session = registry.get(&key).unwrap();

    registry.disconnect(&key).await.unwrap();
    assert!(registry.is_empty());
    assert!(session.is_closed());
    assert_eq!(factory.client(0).closes(), 1);

    let err = session.get_with_str("path: <elem: <name: 'a'>>").await.unwrap_err();
    assert!(matches!(err, CoreError::Closed { .. }));

    assert!(registry.disconnect(&key).await.unwrap_err().is_not_found());
}

// ── TLS policy ──────────────────────────────────────────────────────

#[tokio::test]
async fn strict_policy_rejects_partial_keypair_before_dialing() {
    let factory = StubFactory::with_script(Script::default());
    let registry = Registry::with_policy(factory.clone(), TlsPolicy::Strict);
    let mut device = DeviceDescriptor::new("device1", "1.0.0", "device1:10161");
    device.tls.cert = Some(PathBuf::from("/nonexistent/client.crt"));

    let err = registry.connect(&device).await.unwrap_err();
    assert!(matches!(err, CoreError::CertLoad { .. }), "got: {err}");
    assert_eq!(factory.open_count(), 0);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn lenient_policy_dials_degraded() {
    let (registry, factory) = registry();
    let mut device = DeviceDescriptor::new("device1", "1.0.0", "device1:10161");
    device.tls.key = Some(PathBuf::from("/nonexistent/client.key"));

    registry.connect(&device).await.unwrap();
    let tls = factory.destinations.lock().unwrap()[0].tls.clone().unwrap();
    assert!(tls.degraded);
    assert!(tls.insecure_skip_verify);
}
