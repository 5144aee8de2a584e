//! Notification delivery to the single active subscriber of a characteristic

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use netcfg_proto::{ChunkCodec, ChunkError};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

/// Queue depth between the service and a transport forwarding task.
const NOTIFY_QUEUE: usize = 64;

static NEXT_NOTIFIER: AtomicU64 = AtomicU64::new(1);

/// Identity of one notify session, shared by every clone of its [`Notifier`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotifierId(u64);

impl fmt::Display for NotifierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Delivery target for one subscription
///
/// Chunks sent here are forwarded to the peer by the transport in order.
#[derive(Debug, Clone)]
pub struct Notifier {
    id: NotifierId,
    tx: mpsc::Sender<Vec<u8>>,
}

impl Notifier {
    /// A notifier and the receiving end the transport drains.
    pub fn channel() -> (Self, mpsc::Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel(NOTIFY_QUEUE);
        let id = NotifierId(NEXT_NOTIFIER.fetch_add(1, Ordering::Relaxed));
        (Self { id, tx }, rx)
    }

    pub fn id(&self) -> NotifierId {
        self.id
    }

    /// Queue one chunk. Fails once the subscription has ended.
    pub async fn send(&self, chunk: Vec<u8>) -> Result<(), Closed> {
        self.tx.send(chunk).await.map_err(|_| Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("subscriber went away")]
pub struct Closed;

/// The peer end of a notify session, as the transport exposes it
#[async_trait]
pub trait NotifySink: Send {
    type Error: fmt::Display + Send;

    /// Resolves once the peer has disabled notifications.
    async fn stopped(&mut self);

    async fn notify(&mut self, chunk: Vec<u8>) -> Result<(), Self::Error>;
}

/// The subscriber flag of a notify-capable characteristic
#[derive(Debug, Default)]
pub struct Subscription {
    target: Option<Notifier>,
}

impl Subscription {
    pub fn set(&mut self, target: Option<Notifier>) {
        self.target = target;
    }

    pub fn is_active(&self) -> bool {
        self.target.as_ref().is_some_and(|n| !n.is_closed())
    }

    /// Push `value` as a sequence of chunks, yielding to the scheduler after
    /// each one. Returns whether anything was delivered.
    ///
    /// A subscriber that disappears mid-push is cleared and the rest of the
    /// value is dropped.
    pub async fn push<T: Serialize + ?Sized>(
        &mut self,
        codec: &ChunkCodec,
        value: &T,
    ) -> Result<bool, ChunkError> {
        let Some(target) = &self.target else {
            return Ok(false);
        };

        let chunks = codec.encode(value)?;
        let count = chunks.len();
        for chunk in chunks {
            if target.send(chunk).await.is_err() {
                debug!("subscriber gone, dropping notification");
                self.target = None;
                return Ok(false);
            }
            tokio::task::yield_now().await;
        }
        debug!(chunks = count, "notification queued");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netcfg_proto::{OperationStatus, Reassembler};

    #[tokio::test]
    async fn push_without_subscriber_is_a_no_op() {
        let mut sub = Subscription::default();
        let delivered = sub.push(&ChunkCodec::default(), &OperationStatus::default()).await.unwrap();
        assert!(!delivered);
        assert!(!sub.is_active());
    }

    #[tokio::test]
    async fn chunks_arrive_in_order() {
        let (notifier, mut rx) = Notifier::channel();
        let (other, _other_rx) = Notifier::channel();
        assert_ne!(notifier.id(), other.id());
        assert_eq!(notifier.clone().id(), notifier.id());

        let mut sub = Subscription::default();
        sub.set(Some(notifier));
        assert!(sub.is_active());

        let status = OperationStatus::failed("apply", "wifi_connect_done", "Error: No network with SSID 'Home' found.");
        let codec = ChunkCodec::new(8).unwrap();
        assert!(sub.push(&codec, &status).await.unwrap());

        let mut reassembler = Reassembler::new();
        reassembler.subscribe();
        let mut decoded = None;
        while let Ok(chunk) = rx.try_recv() {
            assert!(chunk.len() <= 8);
            decoded = reassembler.push(&chunk);
        }
        assert_eq!(decoded, Some(status));
    }

    #[tokio::test]
    async fn closed_subscriber_is_cleared() {
        let (notifier, rx) = Notifier::channel();
        drop(rx);
        let mut sub = Subscription::default();
        sub.set(Some(notifier));
        assert!(!sub.is_active());
        assert!(!sub.push(&ChunkCodec::default(), &OperationStatus::default()).await.unwrap());
        assert!(sub.target.is_none());
    }
}
