//! End-to-end flows against an in-process directory.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use cipherpost_client::{Client, ClientConfig, ClientError, Encryption};
use cipherpost_core::{Algorithm, KeyStore, env::Environment};
use cipherpost_crypto::CryptoError;
use cipherpost_server::{Directory, DirectoryConfig};

// Test environment with a manually advanced clock
#[derive(Clone, Default)]
struct TestEnv {
    now: Arc<AtomicU64>,
}

impl Environment for TestEnv {
    fn unix_time(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        async move {
            tokio::time::sleep(duration).await;
        }
    }
}

type TestClient = Client<Arc<Directory<TestEnv>>>;

async fn setup() -> (Arc<Directory<TestEnv>>, TestClient, TestClient) {
    let env = TestEnv::default();
    env.now.store(1_700_000_000, Ordering::SeqCst);
    let directory = Arc::new(Directory::new(env, DirectoryConfig::default()));

    let alice = Client::new("alice", Arc::clone(&directory), ClientConfig::default());
    let bob = Client::new("bob", Arc::clone(&directory), ClientConfig::default());
    alice.register("Alice").await.unwrap();
    bob.register("Bob").await.unwrap();

    (directory, alice, bob)
}

async fn give_rsa_key(client: &TestClient) {
    let d = client.suggest_rsa_exponents("1009", "1013").unwrap()[0].to_string();
    client.create_rsa_key("1009", "1013", &d).await.unwrap();
}

#[tokio::test]
async fn rsa_message_reaches_recipient() {
    let (_directory, alice, bob) = setup().await;
    give_rsa_key(&alice).await;

    bob.send_message("alice", b"HI", &Encryption::Rsa).await.unwrap();

    let messages = alice.poll_once().await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender_id, "bob");
    assert_eq!(messages[0].algorithm, Algorithm::Rsa);
    assert_eq!(messages[0].timestamp, 1_700_000_000);
    assert_eq!(messages[0].text().as_deref(), Some("HI"));

    assert!(alice.poll_once().await.unwrap().is_empty());
}

#[tokio::test]
async fn elgamal_message_reaches_recipient() {
    let (_directory, alice, bob) = setup().await;
    alice.create_elgamal_key("30011", "2", "1234").await.unwrap();

    bob.send_message("alice", b"HI", &Encryption::ElGamal { k: "4321".into() }).await.unwrap();

    let messages = alice.poll_once().await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].algorithm, Algorithm::ElGamal);
    assert_eq!(messages[0].plaintext.as_ref().unwrap(), b"HI");
}

#[tokio::test]
async fn poll_decrypts_each_envelope_with_its_own_algorithm() {
    let (_directory, alice, bob) = setup().await;
    give_rsa_key(&alice).await;
    alice.create_elgamal_key("30011", "2", "1234").await.unwrap();

    bob.send_message("alice", b"A", &Encryption::Rsa).await.unwrap();
    bob.send_message("alice", b"B", &Encryption::ElGamal { k: "77".into() }).await.unwrap();
    bob.send_message("alice", b"C", &Encryption::Rsa).await.unwrap();

    let texts: Vec<_> = alice.poll_once().await.unwrap().iter().filter_map(|m| m.text()).collect();
    assert_eq!(texts, ["A", "B", "C"]);
}

#[tokio::test]
async fn oversized_message_is_not_queued() {
    let (directory, alice, bob) = setup().await;
    give_rsa_key(&alice).await;

    // "one" is 0x6f6e65, above n = 1009 * 1013
    let err = bob.send_message("alice", b"one", &Encryption::Rsa).await.unwrap_err();
    assert!(matches!(err, ClientError::Crypto(CryptoError::MessageTooLarge { .. })));
    assert_eq!(directory.pending_messages("alice"), 0);
}

#[tokio::test]
async fn recipient_without_key_is_rejected() {
    let (_directory, _alice, bob) = setup().await;

    let err = bob.send_message("alice", b"HI", &Encryption::Rsa).await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected { ref message } if message.contains("no RSA key")));
}

#[tokio::test]
async fn unknown_recipient_is_rejected() {
    let (_directory, _alice, bob) = setup().await;

    let err = bob.send_message("carol", b"HI", &Encryption::Rsa).await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected { .. }));
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let (directory, _alice, _bob) = setup().await;
    let impostor = Client::new("alice", Arc::clone(&directory), ClientConfig::default());

    let err = impostor.register("Mallory").await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected { .. }));
    assert_eq!(directory.identity("alice").unwrap().name, "Alice");
}

#[tokio::test]
async fn private_keys_never_reach_the_directory() {
    let (directory, alice, _bob) = setup().await;
    give_rsa_key(&alice).await;
    alice.create_elgamal_key("30011", "2", "1234").await.unwrap();

    let published = directory.display_keys();
    let private_rsa =
        String::from_utf8(alice.key_store().private_key(Algorithm::Rsa).unwrap()).unwrap();
    assert!(!published.contains(&private_rsa));

    // The directory holds exactly what the client cached for itself.
    for algorithm in Algorithm::ALL {
        assert_eq!(
            directory.public_key("alice", algorithm).unwrap(),
            alice.key_store().public_key("alice", algorithm).unwrap()
        );
    }
}

#[tokio::test]
async fn users_are_listed_with_presence() {
    let (_directory, alice, _bob) = setup().await;

    let users = alice.list_users().await.unwrap();
    let ids: Vec<_> = users.iter().map(|u| u.user_id.as_str()).collect();
    assert_eq!(ids, ["alice", "bob"]);
    assert!(users.iter().all(|u| u.online));
}
