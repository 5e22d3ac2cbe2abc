//! Tests for listener read loops.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::mpsc;
use udp_dispatch::{
    DatagramEvent, DispatchError, InitialHandler, Listener, ListenerConfig, ListenerState,
    MAX_UDP_PAYLOAD_SIZE, Result,
};

/// Initial handler forwarding every event into a channel.
fn forward_to(tx: mpsc::UnboundedSender<DatagramEvent>) -> InitialHandler {
    Arc::new(move |event| -> BoxFuture<'static, Result<()>> {
        let tx = tx.clone();
        Box::pin(async move {
            tx.send(event).map_err(|_| DispatchError::QueueClosed)
        })
    })
}

async fn client() -> tokio::net::UdpSocket {
    tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap()
}

#[test]
fn test_config_builder() {
    let config = ListenerConfig::new("127.0.0.1:9000").buffer_size(1500);
    assert_eq!(config.address, "127.0.0.1:9000");
    assert_eq!(config.buffer_size, 1500);
    assert!(config.initial_handler.is_none());

    let config = ListenerConfig::any_address(5000);
    assert_eq!(config.address, "0.0.0.0:5000");
    assert_eq!(config.buffer_size, MAX_UDP_PAYLOAD_SIZE);
}

#[test]
fn test_listener_initial_state() {
    let listener = Listener::new(ListenerConfig::new("127.0.0.1:0"));
    assert_eq!(listener.state(), ListenerState::Unbound);
    assert!(!listener.is_running());
    assert!(listener.local_addr().is_none());
}

#[test]
fn test_listener_state_display() {
    assert_eq!(ListenerState::Unbound.to_string(), "Unbound");
    assert_eq!(ListenerState::Running.to_string(), "Running");
    assert_eq!(ListenerState::Closed.to_string(), "Closed");
}

#[tokio::test]
async fn test_listener_bind() {
    let listener = Listener::new(ListenerConfig::new("127.0.0.1:0"));
    let addr = listener.bind().await.unwrap();

    assert_ne!(addr.port(), 0);
    assert_eq!(listener.state(), ListenerState::Bound);
    assert_eq!(listener.local_addr(), Some(addr));

    let err = listener.bind().await.unwrap_err();
    assert!(matches!(err, DispatchError::ListenerAlreadyRunning(_)));

    listener.halt().unwrap();
    assert_eq!(listener.state(), ListenerState::Closed);
}

#[tokio::test]
async fn test_bind_address_in_use() {
    let first = Listener::new(ListenerConfig::new("127.0.0.1:0"));
    let addr = first.bind().await.unwrap();

    let second = Listener::new(ListenerConfig::new(addr.to_string()));
    let err = second.bind().await.unwrap_err();
    assert!(matches!(err, DispatchError::Bind { .. }));
    assert_eq!(second.state(), ListenerState::Unbound);

    first.halt().unwrap();
}

#[tokio::test]
async fn test_halt_not_running() {
    let listener = Listener::new(ListenerConfig::new("127.0.0.1:0"));
    let err = listener.halt().unwrap_err();
    assert!(matches!(err, DispatchError::ListenerNotRunning(_)));
}

#[tokio::test]
async fn test_start_before_bind_fails() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let listener = Listener::new(ListenerConfig::new("127.0.0.1:0"));
    let err = listener.start(forward_to(tx)).unwrap_err();
    assert!(matches!(err, DispatchError::ListenerNotRunning(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ping_produces_event_and_reply() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let listener = Listener::new(ListenerConfig::new("127.0.0.1:0"));
    let addr = listener.bind().await.unwrap();
    listener.start(forward_to(tx)).unwrap();
    assert!(listener.is_running());

    let client = client().await;
    client.send_to(b"ping", addr).await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.length, 4);
    assert_eq!(&event.data[..], b"ping");
    assert!(event.error.is_none());
    assert_eq!(event.local_address, addr);
    assert_eq!(event.remote_address, Some(client.local_addr().unwrap()));

    // Handlers reply from the blocking pool.
    let responder = event.responder().clone();
    let written = tokio::task::spawn_blocking(move || responder.write(b"pong"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(written, 4);

    let mut buf = [0u8; 16];
    let (len, from) = tokio::time::timeout(Duration::from_secs(2), client.recv_from(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf[..len], b"pong");
    assert_eq!(from, addr);

    listener.halt().unwrap();
    listener.join().await;
}

#[tokio::test]
async fn test_datagrams_keep_their_own_payload() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let listener = Listener::new(ListenerConfig::new("127.0.0.1:0"));
    let addr = listener.bind().await.unwrap();
    listener.start(forward_to(tx)).unwrap();

    let client = client().await;
    client.send_to(b"a longer first datagram", addr).await.unwrap();
    client.send_to(b"short", addr).await.unwrap();

    let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    let second = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(&first.data[..], b"a longer first datagram");
    assert_eq!(&second.data[..], b"short");
    assert_eq!(second.length, 5);

    listener.halt().unwrap();
    listener.join().await;
}

#[tokio::test]
async fn test_halt_closes_without_spurious_event() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let listener = Listener::new(ListenerConfig::new("127.0.0.1:0"));
    listener.bind().await.unwrap();
    listener.start(forward_to(tx)).unwrap();

    // Let the read loop block in recv.
    tokio::time::sleep(Duration::from_millis(20)).await;
    listener.halt().unwrap();
    tokio::time::timeout(Duration::from_secs(2), listener.join())
        .await
        .unwrap();

    assert_eq!(listener.state(), ListenerState::Closed);
    assert!(listener.local_addr().is_none());
    // The sender was owned by the read loop, so the channel is now closed and empty.
    assert!(rx.recv().await.is_none());

    let err = listener.halt().unwrap_err();
    assert!(matches!(err, DispatchError::ListenerNotRunning(_)));
}

#[tokio::test]
async fn test_responder_fails_after_halt() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let listener = Listener::new(ListenerConfig::new("127.0.0.1:0"));
    let addr = listener.bind().await.unwrap();
    listener.start(forward_to(tx)).unwrap();

    let client = client().await;
    client.send_to(b"hello", addr).await.unwrap();
    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();

    listener.halt().unwrap();
    listener.join().await;

    let err = event.responder().send(b"late").await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::NotConnected);
}

#[tokio::test]
async fn test_listener_can_rebind_after_close() {
    let listener = Listener::new(ListenerConfig::new("127.0.0.1:0"));
    listener.bind().await.unwrap();
    listener.halt().unwrap();

    listener.bind().await.unwrap();
    assert_eq!(listener.state(), ListenerState::Bound);
    listener.halt().unwrap();
}

#[tokio::test]
async fn test_initial_handler_failure_keeps_reading() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let seen = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = seen.clone();
    let deliver: InitialHandler =
        Arc::new(move |event: DatagramEvent| -> BoxFuture<'static, Result<()>> {
            let tx = tx.clone();
            let first = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0;
            Box::pin(async move {
                if first {
                    return Err(DispatchError::InvalidConfig("rejected".into()));
                }
                tx.send(event).map_err(|_| DispatchError::QueueClosed)
            })
        });

    let listener = Listener::new(ListenerConfig::new("127.0.0.1:0"));
    let addr = listener.bind().await.unwrap();
    listener.start(deliver).unwrap();

    let client = client().await;
    client.send_to(b"rejected", addr).await.unwrap();
    client.send_to(b"accepted", addr).await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&event.data[..], b"accepted");
    assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 2);
    assert!(listener.is_running());

    listener.halt().unwrap();
    listener.join().await;
}

#[tokio::test]
async fn test_queue_closed_stops_read_loop() {
    let deliver: InitialHandler = Arc::new(|_: DatagramEvent| -> BoxFuture<'static, Result<()>> {
        Box::pin(async { Err(DispatchError::QueueClosed) })
    });

    let listener = Listener::new(ListenerConfig::new("127.0.0.1:0"));
    let addr = listener.bind().await.unwrap();
    listener.start(deliver).unwrap();

    client().await.send_to(b"late", addr).await.unwrap();
    tokio::time::timeout(Duration::from_secs(2), listener.join())
        .await
        .unwrap();

    assert_eq!(listener.state(), ListenerState::Closed);
    assert!(listener.local_addr().is_none());
}

// Windows reports an oversized datagram as a read error; elsewhere it is truncated.
#[cfg(windows)]
#[tokio::test]
async fn test_oversized_datagram_becomes_error_event() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let listener = Listener::new(ListenerConfig::new("127.0.0.1:0").buffer_size(4));
    let addr = listener.bind().await.unwrap();
    listener.start(forward_to(tx)).unwrap();

    let client = client().await;
    client.send_to(b"far too long", addr).await.unwrap();
    client.send_to(b"ok", addr).await.unwrap();

    let failed = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(failed.error.is_some());
    assert_eq!(failed.length, 0);
    assert!(failed.remote_address.is_none());

    // The loop keeps reading after a failed read.
    let next = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&next.data[..], b"ok");

    listener.halt().unwrap();
    listener.join().await;
}

#[cfg(not(windows))]
#[tokio::test]
async fn test_oversized_datagram_is_truncated() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let listener = Listener::new(ListenerConfig::new("127.0.0.1:0").buffer_size(4));
    let addr = listener.bind().await.unwrap();
    listener.start(forward_to(tx)).unwrap();

    let client = client().await;
    client.send_to(b"far too long", addr).await.unwrap();
    client.send_to(b"ok", addr).await.unwrap();

    let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(first.error.is_none());
    assert_eq!(&first.data[..], b"far ");

    let next = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&next.data[..], b"ok");

    listener.halt().unwrap();
    listener.join().await;
}
