//! Scan Cache: last Wi-Fi scan with a staleness policy
//!
//! `read` refreshes only when nothing has been scanned yet or the last scan is
//! older than the staleness window. `trigger` always scans and pushes the
//! fresh result to the Scan Result subscriber.

use std::time::{Duration, Instant};

use netcfg_proto::{ChunkCodec, ScanResult};
use tracing::{debug, warn};

use crate::backend::{BackendError, NetworkBackend};
use crate::notify::{Notifier, Subscription};

#[derive(Debug)]
pub struct ScanCache {
    last: Option<(ScanResult, Instant)>,
    stale_after: Duration,
    subscription: Subscription,
}

impl ScanCache {
    pub fn new(stale_after: Duration) -> Self {
        Self { last: None, stale_after, subscription: Subscription::default() }
    }

    pub fn subscribe(&mut self, target: Option<Notifier>) {
        self.subscription.set(target);
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_active()
    }

    /// The cached result, if any, regardless of age
    pub fn cached(&self) -> Option<&ScanResult> {
        self.last.as_ref().map(|(result, _)| result)
    }

    fn is_fresh(&self) -> bool {
        self.last.as_ref().is_some_and(|(_, at)| at.elapsed() <= self.stale_after)
    }

    /// Current result, scanning first when the cache is absent or stale.
    ///
    /// A failed refresh keeps serving the previous result (or an empty one).
    pub async fn read(&mut self, backend: &dyn NetworkBackend) -> ScanResult {
        if !self.is_fresh() {
            debug!("scan cache stale, refreshing");
            match backend.scan_wifi().await {
                Ok(result) => self.last = Some((result, Instant::now())),
                Err(e) => warn!("wifi scan failed: {e}"),
            }
        }
        self.cached().cloned().unwrap_or_default()
    }

    /// Scan unconditionally, replace the cache, and notify the subscriber.
    pub async fn trigger(
        &mut self,
        backend: &dyn NetworkBackend,
        codec: &ChunkCodec,
    ) -> Result<ScanResult, BackendError> {
        let result = backend.scan_wifi().await?;
        self.last = Some((result.clone(), Instant::now()));
        debug!(access_points = result.access_points.len(), "scan complete");
        if let Err(e) = self.subscription.push(codec, &result).await {
            warn!("failed to notify scan result: {e}");
        }
        Ok(result)
    }
}
