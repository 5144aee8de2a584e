//! Deadline-bounded notification collection for tokio clients
//!
//! One task forwards raw notifications into an mpsc channel; the caller drives
//! [`collect_or_read`], which reassembles them until the deadline and otherwise
//! falls back to a direct read of the characteristic.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

use crate::chunk::{IncompleteError, decode};
use crate::reassembly::Reassembler;

/// How a payload reached the client
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery<T> {
    Notified(T),
    Fallback(T),
}

impl<T> Delivery<T> {
    pub fn into_inner(self) -> T {
        match self {
            Delivery::Notified(v) | Delivery::Fallback(v) => v,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Delivery::Fallback(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError<E> {
    #[error("fallback read failed: {0}")]
    Read(E),
    #[error(transparent)]
    Decode(#[from] IncompleteError),
}

/// Feed notifications into `reassembler` until a payload completes, the
/// channel closes, or `wait` elapses. A zero wait skips notifications.
pub async fn collect<T: DeserializeOwned>(
    reassembler: &mut Reassembler<T>,
    rx: &mut mpsc::Receiver<Vec<u8>>,
    wait: Duration,
) -> Option<T> {
    if !wait.is_zero() {
        let completed = tokio::time::timeout(wait, async {
            while let Some(chunk) = rx.recv().await {
                if let Some(value) = reassembler.push(&chunk) {
                    return Some(value);
                }
            }
            None
        })
        .await;

        if let Ok(Some(value)) = completed {
            return Some(value);
        }
    }

    reassembler.time_out();
    None
}

/// Collect a notified payload, or read the characteristic's current value.
///
/// The read value is always a complete payload, so the fallback keeps the
/// client live when notifications are dropped or never arrive.
pub async fn collect_or_read<T, E, F, Fut>(
    rx: &mut mpsc::Receiver<Vec<u8>>,
    wait: Duration,
    read: F,
) -> Result<Delivery<T>, FetchError<E>>
where
    T: DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<u8>, E>>,
{
    let mut reassembler = Reassembler::new();
    reassembler.subscribe();

    if let Some(value) = collect(&mut reassembler, rx, wait).await {
        return Ok(Delivery::Notified(value));
    }

    let bytes = read().await.map_err(FetchError::Read)?;
    Ok(Delivery::Fallback(decode(&bytes)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkCodec;
    use crate::scan::{AccessPoint, ScanResult};

    fn scan() -> ScanResult {
        ScanResult::new(
            1_700_000_000.0,
            (0..12).map(|i| AccessPoint::new(format!("ap-{i}"), 60 + i, "WPA2")),
        )
    }

    fn read_ok(bytes: Vec<u8>) -> impl Future<Output = Result<Vec<u8>, String>> {
        async move { Ok(bytes) }
    }

    #[tokio::test]
    async fn notified_payload_wins_within_deadline() {
        let (tx, mut rx) = mpsc::channel(32);
        for chunk in ChunkCodec::new(32).unwrap().encode(&scan()).unwrap() {
            tx.send(chunk).await.unwrap();
        }

        let got = collect_or_read::<ScanResult, _, _, _>(&mut rx, Duration::from_secs(1), || {
            read_ok(b"{}".to_vec())
        })
        .await
        .unwrap();
        assert_eq!(got, Delivery::Notified(scan()));
    }

    #[tokio::test]
    async fn zero_wait_reads_directly() {
        let (tx, mut rx) = mpsc::channel(32);
        tx.send(b"{\"ts\":".to_vec()).await.unwrap();

        let bytes = serde_json::to_vec(&scan()).unwrap();
        let got = collect_or_read::<ScanResult, _, _, _>(&mut rx, Duration::ZERO, || read_ok(bytes))
            .await
            .unwrap();
        assert!(got.is_fallback());
        assert_eq!(got.into_inner(), scan());
    }

    #[tokio::test]
    async fn incomplete_stream_falls_back_after_deadline() {
        let (tx, mut rx) = mpsc::channel(32);
        let chunks = ChunkCodec::new(32).unwrap().encode(&scan()).unwrap();
        tx.send(chunks[0].clone()).await.unwrap();

        let bytes = serde_json::to_vec(&scan()).unwrap();
        let got = collect_or_read::<ScanResult, _, _, _>(&mut rx, Duration::from_millis(50), || {
            read_ok(bytes)
        })
        .await
        .unwrap();
        assert_eq!(got, Delivery::Fallback(scan()));
        drop(tx);
    }

    #[tokio::test]
    async fn failed_fallback_read_is_reported() {
        let (_tx, mut rx) = mpsc::channel::<Vec<u8>>(1);
        let err = collect_or_read::<ScanResult, _, _, _>(&mut rx, Duration::ZERO, || async {
            Err::<Vec<u8>, _>("characteristic not found".to_string())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, FetchError::Read(ref e) if e == "characteristic not found"));
    }
}
