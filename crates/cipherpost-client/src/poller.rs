//! Background mailbox poller.
//!
//! A spawned task that drains the local identity's mailbox every
//! [`ClientConfig::poll_interval`](crate::ClientConfig::poll_interval) and
//! forwards each decrypted message over an mpsc channel. It never blocks the
//! interactive path: sends, key creation and lookups keep working while a poll
//! is in flight.
//!
//! Relay failures are logged and retried on the next tick. The task ends when
//! the receiving half of the channel is dropped.

use std::sync::Arc;

use cipherpost_core::env::Environment;
use cipherpost_proto::Relay;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{Client, DeliveredMessage};

/// Messages buffered between the poller and its consumer.
pub const DELIVERY_CHANNEL_CAPACITY: usize = 64;

/// Handle to a running poll task.
#[derive(Debug)]
pub struct Poller {
    handle: JoinHandle<()>,
}

impl Poller {
    /// Start polling on the current tokio runtime.
    ///
    /// The first poll happens immediately.
    pub fn spawn<R, E>(client: Arc<Client<R>>, env: E) -> (Self, mpsc::Receiver<DeliveredMessage>)
    where
        R: Relay + 'static,
        E: Environment,
    {
        let (tx, rx) = mpsc::channel(DELIVERY_CHANNEL_CAPACITY);
        let handle = tokio::spawn(run(client, env, tx));
        (Self { handle }, rx)
    }

    /// Check if the task has stopped.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the task without waiting for the consumer to go away.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Wait for the task to stop.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            if e.is_panic() {
                tracing::error!("poller task panicked");
            }
        }
    }
}

async fn run<R, E>(client: Arc<Client<R>>, env: E, tx: mpsc::Sender<DeliveredMessage>)
where
    R: Relay,
    E: Environment,
{
    let interval = client.config().poll_interval;
    tracing::debug!(user_id = client.user_id(), ?interval, "poller started");

    loop {
        match client.poll_once().await {
            Ok(messages) => {
                for message in messages {
                    if tx.send(message).await.is_err() {
                        tracing::debug!(user_id = client.user_id(), "poller receiver dropped");
                        return;
                    }
                }
            },
            Err(e) => {
                tracing::warn!(
                    user_id = client.user_id(),
                    transient = e.is_transient(),
                    "mailbox poll failed: {}",
                    e
                );
            },
        }

        if tx.is_closed() {
            tracing::debug!(user_id = client.user_id(), "poller receiver dropped");
            return;
        }

        env.sleep(interval).await;
    }
}
