//! RPC Client Tests
//!
//! Tests for the binary protocol backend against an in-process server.

#[path = "../support/mod.rs"]
mod support;

use std::thread;
use std::time::Duration;

use cachecon::codec::encode_string;
use cachecon::protocol::rpc::{Command, RemoteCache, VersionedWrite};
use cachecon::{CacheClient, CacheError, Client, ClientKind, Config, PutOptions, VersionToken};
use support::{config_for, MockRpcServer};

fn connect(server: &MockRpcServer) -> Client {
    Client::connect(&config_for(ClientKind::Rpc, server.addr)).unwrap()
}

// =============================================================================
// Basic Operations
// =============================================================================

#[test]
fn test_put_then_get() {
    let server = MockRpcServer::start();
    let mut client = connect(&server);

    client.put(b"k", b"v", &PutOptions::new()).unwrap();
    let entry = client.get(b"k", false).unwrap();

    assert_eq!(entry.value, b"v");
    assert_eq!(entry.version, None);
}

#[test]
fn test_get_missing_is_not_found() {
    let server = MockRpcServer::start();
    let mut client = connect(&server);

    assert!(matches!(client.get(b"nope", false), Err(CacheError::NotFound)));
    assert!(matches!(client.get(b"nope", true), Err(CacheError::NotFound)));
}

#[test]
fn test_exists_uses_contains_key() {
    let server = MockRpcServer::start();
    let mut client = connect(&server);

    assert!(matches!(client.exists(b"k"), Err(CacheError::NotFound)));
    client.put(b"k", b"v", &PutOptions::new()).unwrap();
    client.exists(b"k").unwrap();

    assert!(matches!(
        server.last_request().command,
        Command::ContainsKey { .. }
    ));
}

#[test]
fn test_delete_and_clear() {
    let server = MockRpcServer::start();
    let mut client = connect(&server);

    client.put(b"a", b"1", &PutOptions::new()).unwrap();
    client.put(b"b", b"2", &PutOptions::new()).unwrap();

    client.delete(b"a", None).unwrap();
    assert!(matches!(client.delete(b"a", None), Err(CacheError::NotFound)));

    client.clear().unwrap();
    assert!(matches!(client.get(b"b", false), Err(CacheError::NotFound)));
}

// =============================================================================
// Versioning
// =============================================================================

#[test]
fn test_get_version_matches_version() {
    let server = MockRpcServer::start();
    let mut client = connect(&server);

    client.put(b"k", b"v", &PutOptions::new()).unwrap();
    let entry = client.get(b"k", true).unwrap();
    let version = client.version(b"k").unwrap();

    assert_eq!(entry.version, Some(version));
}

#[test]
fn test_versioned_put_applies_and_conflicts() {
    let server = MockRpcServer::start();
    let mut client = connect(&server);

    client.put(b"k", b"v1", &PutOptions::new()).unwrap();
    let v1 = client.version(b"k").unwrap();

    client.put(b"k", b"v2", &PutOptions::new().version(v1.clone())).unwrap();
    assert_eq!(client.get(b"k", false).unwrap().value, b"v2");

    // Stale version now
    let result = client.put(b"k", b"v3", &PutOptions::new().version(v1));
    assert!(matches!(result, Err(CacheError::Conflict)));
    assert_eq!(client.get(b"k", false).unwrap().value, b"v2");
}

#[test]
fn test_versioned_put_on_missing_key_is_not_found() {
    let server = MockRpcServer::start();
    let mut client = connect(&server);

    let result = client.put(b"ghost", b"v", &PutOptions::new().version("1"));
    assert!(matches!(result, Err(CacheError::NotFound)));
}

#[test]
fn test_non_numeric_version_rejected_before_sending() {
    let server = MockRpcServer::start();
    let mut client = connect(&server);

    let result = client.put(b"k", b"v", &PutOptions::new().version("abc"));
    assert!(matches!(result, Err(CacheError::Validation(_))));

    let token = VersionToken::new("\"etag\"");
    assert!(matches!(client.delete(b"k", Some(&token)), Err(CacheError::Validation(_))));
    assert_eq!(server.request_count(), 0);
}

#[test]
fn test_versioned_delete() {
    let server = MockRpcServer::start();
    let mut client = connect(&server);

    client.put(b"k", b"v", &PutOptions::new()).unwrap();
    let version = client.version(b"k").unwrap();
    let stale = VersionToken::new("999999");

    assert!(matches!(client.delete(b"k", Some(&stale)), Err(CacheError::Conflict)));
    client.delete(b"k", Some(&version)).unwrap();
    assert!(matches!(client.delete(b"k", Some(&version)), Err(CacheError::NotFound)));
}

#[test]
fn test_version_wins_over_put_if_absent() {
    let server = MockRpcServer::start();
    let mut client = connect(&server);

    client.put(b"k", b"v1", &PutOptions::new()).unwrap();
    let version = client.version(b"k").unwrap();

    let options = PutOptions::new().version(version).put_if_absent(true);
    client.put(b"k", b"v2", &options).unwrap();

    assert!(matches!(
        server.last_request().command,
        Command::ReplaceIfUnmodified { .. }
    ));
}

// =============================================================================
// Put If Absent And Expiry
// =============================================================================

#[test]
fn test_put_if_absent_second_call_conflicts() {
    let server = MockRpcServer::start();
    let mut client = connect(&server);
    let options = PutOptions::new().put_if_absent(true);

    client.put(b"k", b"first", &options).unwrap();
    assert!(matches!(
        client.put(b"k", b"second", &options),
        Err(CacheError::Conflict)
    ));
    assert_eq!(client.get(b"k", false).unwrap().value, b"first");
}

#[test]
fn test_expiry_fields_sent() {
    let server = MockRpcServer::start();
    let mut client = connect(&server);

    client
        .put(b"k", b"v", &PutOptions::new().lifespan(60).max_idle(30))
        .unwrap();

    match server.last_request().command {
        Command::Put {
            lifespan, max_idle, ..
        } => {
            assert_eq!(lifespan, 60);
            assert_eq!(max_idle, 30);
        }
        other => panic!("Expected PUT, got {:?}", other),
    }
}

// =============================================================================
// Wire Details
// =============================================================================

#[test]
fn test_keys_are_framed_by_default() {
    let server = MockRpcServer::start();
    let mut client = connect(&server);

    client.put(b"user", b"v", &PutOptions::new()).unwrap();
    match server.last_request().command {
        Command::Put { key, .. } => assert_eq!(key, encode_string("user")),
        other => panic!("Expected PUT, got {:?}", other),
    }
}

#[test]
fn test_raw_keys_when_encoding_disabled() {
    let server = MockRpcServer::start();
    let mut config = config_for(ClientKind::Rpc, server.addr);
    config.rpc_encode_keys = false;
    let mut client = Client::connect(&config).unwrap();

    client.put(b"user", b"v", &PutOptions::new()).unwrap();
    match server.last_request().command {
        Command::Put { key, .. } => assert_eq!(key, b"user"),
        other => panic!("Expected PUT, got {:?}", other),
    }
}

#[test]
fn test_cache_name_in_header() {
    let server = MockRpcServer::start();
    let config = Config {
        cache_name: "sessions".to_string(),
        ..config_for(ClientKind::Rpc, server.addr)
    };
    let mut client = Client::connect(&config).unwrap();

    client.clear().unwrap();
    assert_eq!(server.last_request().cache_name, b"sessions");
}

#[test]
fn test_message_ids_increase() {
    let server = MockRpcServer::start();
    let mut client = connect(&server);

    client.clear().unwrap();
    client.clear().unwrap();

    let requests = server.state.lock().unwrap().requests.clone();
    assert!(requests[1].message_id > requests[0].message_id);
}

#[test]
fn test_server_error_is_transport_error() {
    let server = MockRpcServer::start();
    let mut client = connect(&server);

    match client.put(b"boom", b"v", &PutOptions::new()) {
        Err(CacheError::Transport(msg)) => assert!(msg.contains("boom")),
        other => panic!("Expected transport error, got {:?}", other),
    }
}

#[test]
fn test_connect_refused_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = Client::connect(&config_for(ClientKind::Rpc, addr));
    assert!(matches!(result, Err(CacheError::Transport(_))));
}

// =============================================================================
// Remote Cache
// =============================================================================

#[test]
fn test_remote_cache_versioned_write_codes() {
    let server = MockRpcServer::start();
    let mut remote = RemoteCache::connect(&server.addr.to_string(), "", 2000).unwrap();

    remote.ping().unwrap();
    assert_eq!(
        remote.replace_with_version(b"k", b"v", 1, 0, 0).unwrap(),
        VersionedWrite::KeyMissing
    );

    remote.put(b"k", b"v", 0, 0).unwrap();
    let (version, value) = remote.get_versioned(b"k").unwrap().unwrap();
    assert_eq!(value, b"v");

    assert_eq!(
        remote.replace_with_version(b"k", b"w", version + 1, 0, 0).unwrap(),
        VersionedWrite::VersionMismatch
    );
    assert_eq!(
        remote.replace_with_version(b"k", b"w", version, 0, 0).unwrap(),
        VersionedWrite::Applied
    );

    assert_eq!(VersionedWrite::Applied.code(), 1);
    assert_eq!(VersionedWrite::KeyMissing.code(), 0);
    assert_eq!(VersionedWrite::VersionMismatch.code(), -1);
}

// =============================================================================
// Transport Failures
// =============================================================================

#[test]
fn test_connection_unusable_after_timeout() {
    let server = MockRpcServer::start_delayed(Duration::from_millis(500));
    let mut config = config_for(ClientKind::Rpc, server.addr);
    config.timeout_ms = 200;
    let mut client = Client::connect(&config).unwrap();

    let first = client.put(b"k", b"v1", &PutOptions::new());
    assert!(matches!(first, Err(CacheError::Transport(_))), "{:?}", first);

    thread::sleep(Duration::from_millis(400));
    match client.get(b"k", false) {
        Err(CacheError::Transport(msg)) => assert!(msg.contains("unusable"), "{}", msg),
        other => panic!("Expected transport error, got {:?}", other),
    }
    assert_eq!(server.request_count(), 1);

    let mut fresh = Client::connect(&config).unwrap();
    assert_eq!(fresh.get(b"k", false).unwrap().value, b"v1");
}
