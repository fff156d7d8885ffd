//! Server Tests
//!
//! Drives a live server with hand-built frames to pin down the wire
//! behaviour independently of the client.

#[path = "../common/mod.rs"]
mod common;

use std::fs;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use common::{blob_frame, send_and_drain, string_frame, TestServer};
use drawvault::{Config, Server, StorageDir, VaultError};
use tempfile::TempDir;

fn save_request(name: &str, data: &[u8]) -> Vec<u8> {
    let mut req = string_frame("save");
    req.extend(string_frame(name));
    req.extend(blob_frame(data));
    req
}

fn load_request(name: &str) -> Vec<u8> {
    let mut req = string_frame("load");
    req.extend(string_frame(name));
    req
}

// =============================================================================
// Greeting and Lifecycle
// =============================================================================

#[test]
fn test_greeting_on_connect() {
    let server = TestServer::start();

    let mut stream = TcpStream::connect(server.addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let mut greeting = [0u8; 2];
    stream.read_exact(&mut greeting).unwrap();

    assert_eq!(greeting, [drawvault::protocol::PROTOCOL_VERSION, 0x00]);
}

// =============================================================================
// Commands on the Wire
// =============================================================================

#[test]
fn test_list_empty() {
    let server = TestServer::start();
    let mut stream = server.raw();

    let reply = send_and_drain(&mut stream, &string_frame("list"));

    assert_eq!(reply, vec![0x00, 0, 0, 0, 0]);
}

#[test]
fn test_save_then_load_raw() {
    let server = TestServer::start();

    let mut stream = server.raw();
    let reply = send_and_drain(&mut stream, &save_request("a.xml", &[1, 2, 3, 4, 5]));
    assert_eq!(reply, vec![0x00]);
    assert_eq!(
        fs::read(server.storage_path().join("a.xml")).unwrap(),
        vec![1, 2, 3, 4, 5]
    );

    let mut stream = server.raw();
    let reply = send_and_drain(&mut stream, &load_request("a.xml"));
    assert_eq!(reply, vec![0x00, 0, 0, 0, 5, 1, 2, 3, 4, 5]);
}

#[test]
fn test_list_raw_frames() {
    let server = TestServer::start();
    send_and_drain(&mut server.raw(), &save_request("a.xml", b"x"));
    send_and_drain(&mut server.raw(), &save_request("skip.txt", b"y"));

    let reply = send_and_drain(&mut server.raw(), &string_frame("list"));

    let mut expected = vec![0x00, 0, 0, 0, 1];
    expected.extend(string_frame("a.xml"));
    assert_eq!(reply, expected);
}

#[test]
fn test_load_missing_answers_not_found() {
    let server = TestServer::start();
    let mut stream = server.raw();

    let reply = send_and_drain(&mut stream, &load_request("missing.xml"));

    assert_eq!(reply, vec![0x01]);
}

#[test]
fn test_unknown_command_closes_without_reply() {
    let server = TestServer::start();
    let mut stream = server.raw();

    let reply = send_and_drain(&mut stream, &string_frame("delete"));

    assert!(reply.is_empty());
}

#[test]
fn test_traversal_rejected() {
    let server = TestServer::start();

    let reply = send_and_drain(&mut server.raw(), &save_request("../escape.xml", b"evil"));
    assert_eq!(reply, vec![0x02]);
    assert!(!server.scratch().join("escape.xml").exists());

    fs::write(server.scratch().join("outside.xml"), b"secret").unwrap();
    let reply = send_and_drain(&mut server.raw(), &load_request("../outside.xml"));
    assert_eq!(reply, vec![0x02]);
}

#[test]
fn test_truncated_save_writes_nothing() {
    let server = TestServer::start();
    let mut stream = server.raw();

    let mut req = string_frame("save");
    req.extend(string_frame("partial.xml"));
    req.extend_from_slice(&100u32.to_be_bytes());
    req.extend_from_slice(&[1, 2, 3]);
    stream.write_all(&req).unwrap();
    stream.shutdown(Shutdown::Write).unwrap();

    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).unwrap();

    assert!(reply.is_empty());
    assert!(!server.storage_path().join("partial.xml").exists());
}

#[test]
fn test_bad_connection_does_not_affect_others() {
    let server = TestServer::start();

    send_and_drain(&mut server.raw(), &string_frame("bogus"));
    drop(server.raw());

    let reply = send_and_drain(&mut server.raw(), &save_request("ok.xml", b"fine"));
    assert_eq!(reply, vec![0x00]);
}

// =============================================================================
// Concurrency Ceiling
// =============================================================================

#[test]
fn test_overloaded_when_pool_and_queue_full() {
    let server = TestServer::start_with(|b| b.workers(1).max_pending(1));

    // Occupies the only worker (greeting proves it was picked up)
    let busy = server.raw();

    // Waits in the queue
    let queued = TcpStream::connect(server.addr).unwrap();

    // Nowhere left to go
    let mut rejected = TcpStream::connect(server.addr).unwrap();
    rejected
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let mut reply = Vec::new();
    rejected.read_to_end(&mut reply).unwrap();

    assert_eq!(reply, vec![drawvault::protocol::PROTOCOL_VERSION, 0x03]);

    drop(busy);
    drop(queued);
}

#[test]
fn test_queued_connection_served_when_worker_frees() {
    let server = TestServer::start_with(|b| b.workers(1).max_pending(1));

    let mut busy = server.raw();
    let mut queued = TcpStream::connect(server.addr).unwrap();
    queued.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

    // Finish the first connection's command to free the worker
    send_and_drain(&mut busy, &string_frame("list"));

    let mut greeting = [0u8; 2];
    queued.read_exact(&mut greeting).unwrap();
    assert_eq!(greeting[1], 0x00);
}

// =============================================================================
// Startup and Shutdown
// =============================================================================

#[test]
fn test_bind_failure_is_connect_error() {
    let occupied = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = occupied.local_addr().unwrap();
    let dir = TempDir::new().unwrap();

    let config = Config::builder()
        .storage_dir(dir.path())
        .listen_addr(addr.to_string())
        .build();
    let storage = Arc::new(StorageDir::open(dir.path()).unwrap());

    let result = Server::bind(config, storage);
    assert!(matches!(result, Err(VaultError::Connect { .. })));
}

#[test]
fn test_zero_workers_rejected() {
    let dir = TempDir::new().unwrap();
    let config = Config::builder()
        .storage_dir(dir.path())
        .listen_addr("127.0.0.1:0")
        .workers(0)
        .build();

    let result = Server::open(config);
    assert!(matches!(result, Err(VaultError::Config(_))));
}

#[test]
fn test_open_creates_storage_directory() {
    let dir = TempDir::new().unwrap();
    let storage_dir = dir.path().join("xml");
    let config = Config::builder()
        .storage_dir(&storage_dir)
        .listen_addr("127.0.0.1:0")
        .build();

    let server = Server::open(config).unwrap();

    assert!(storage_dir.is_dir());
    assert_eq!(server.storage().root(), storage_dir.as_path());
}

#[test]
fn test_shutdown_stops_run() {
    let dir = TempDir::new().unwrap();
    let config = Config::builder()
        .storage_dir(dir.path())
        .listen_addr("127.0.0.1:0")
        .build();
    let server = Server::open(config).unwrap();
    let handle = server.shutdown_handle();

    let thread = std::thread::spawn(move || server.run());
    handle.shutdown();

    assert!(handle.is_shutdown());
    assert!(thread.join().unwrap().is_ok());
}

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.listen_addr, "0.0.0.0:10000");
    assert_eq!(config.storage_dir, std::path::PathBuf::from("xml"));
    assert_eq!(config.read_timeout(), Some(Duration::from_secs(10)));
    assert!(config.workers > 0);
}
