//! Client and server over a real TCP connection.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use cipherpost_client::{Client, ClientConfig, ClientError, Encryption, Poller, TcpRelay};
use cipherpost_proto::TransportError;
use cipherpost_server::{Server, ServerRuntimeConfig, SystemEnv};
use tokio::{net::TcpListener, time::timeout};

async fn start_server() -> String {
    let config =
        ServerRuntimeConfig { bind_address: "127.0.0.1:0".to_string(), ..Default::default() };
    let server = Server::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr.to_string()
}

#[tokio::test]
async fn rsa_and_elgamal_over_tcp() {
    let addr = start_server().await;
    let alice = Client::connect("alice", addr.clone(), ClientConfig::default());
    let bob = Client::connect("bob", addr, ClientConfig::default());

    alice.register("Alice").await.unwrap();
    bob.register("Bob").await.unwrap();
    alice.create_rsa_key("1009", "1013", "5").await.unwrap();
    alice.create_elgamal_key("30011", "2", "1234").await.unwrap();

    bob.send_message("alice", b"HI", &Encryption::Rsa).await.unwrap();
    bob.send_message("alice", b"HI", &Encryption::ElGamal { k: "4321".into() }).await.unwrap();

    let messages = alice.poll_once().await.unwrap();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| m.text().as_deref() == Some("HI")));
    assert!(messages.iter().all(|m| m.sender_id == "bob"));
}

#[tokio::test]
async fn relay_reconnects_after_server_appears() {
    // Reserve a port, then release it so the first call fails.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let client = Client::new("alice", TcpRelay::new(addr.clone()), ClientConfig::default());
    let err = client.register("Alice").await.unwrap_err();
    assert!(err.is_transient());

    let config = ServerRuntimeConfig { bind_address: addr, ..Default::default() };
    let server = Server::bind(config).await.unwrap();
    tokio::spawn(server.run());
    tokio::time::sleep(Duration::from_millis(20)).await;

    client.register("Alice").await.unwrap();
    let users = client.list_users().await.unwrap();
    assert_eq!(users.len(), 1);
}

#[tokio::test]
async fn directory_rejections_are_not_transient() {
    let addr = start_server().await;
    let bob = Client::new("bob", TcpRelay::new(addr), ClientConfig::default());
    bob.register("Bob").await.unwrap();

    let err = bob.send_message("nobody", b"HI", &Encryption::Rsa).await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected { .. }));
    assert!(!err.is_transient());
}

/// Listener that accepts connections and never answers. Returns its address
/// and a count of accepted connections.
async fn start_silent_relay() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let accepted = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&accepted);
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            held.push(stream);
        }
    });

    (addr, accepted)
}

#[tokio::test]
async fn silent_relay_times_out_as_transient() {
    let (addr, _accepted) = start_silent_relay().await;
    let config =
        ClientConfig { request_timeout: Duration::from_millis(100), ..ClientConfig::default() };
    let client = Client::connect("alice", addr, config);

    let err = timeout(Duration::from_secs(3), client.list_users()).await.unwrap().unwrap_err();
    assert!(matches!(err, ClientError::Transport(TransportError::Timeout { .. })));
    assert!(err.is_transient());
}

#[tokio::test]
async fn silent_relay_does_not_wedge_poller_or_interactive_calls() {
    let (addr, accepted) = start_silent_relay().await;
    let config = ClientConfig {
        poll_interval: Duration::from_millis(10),
        request_timeout: Duration::from_millis(100),
        ..ClientConfig::default()
    };
    let client = Arc::new(Client::connect("alice", addr, config));
    let (poller, _rx) = Poller::spawn(Arc::clone(&client), SystemEnv::new());

    // Interactive calls queue behind the poll for at most one deadline each.
    let err = timeout(Duration::from_secs(3), client.list_users()).await.unwrap().unwrap_err();
    assert!(err.is_transient());

    // The poller keeps ticking, redialling after every timeout.
    timeout(Duration::from_secs(3), async {
        while accepted.load(Ordering::SeqCst) < 3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    assert!(!poller.is_finished());
    poller.abort();
}
