//! Process-wide server state
//!
//! One [`Device`] is owned by the event loop for the lifetime of the process.
//! Handlers receive it by `&mut`; nothing else holds a reference.

use std::time::Duration;

use netcfg_proto::{ChunkCodec, DeviceInfo, LanReport, OperationStatus, ScanResult, WifiState};
use tracing::warn;

use crate::backend::{BackendError, NetworkBackend};
use crate::notify::{Notifier, Subscription};
use crate::scan_cache::ScanCache;
use crate::status::StatusTracker;

pub struct Device<B> {
    pub(crate) backend: B,
    pub(crate) codec: ChunkCodec,
    pub(crate) status: StatusTracker,
    pub(crate) scans: ScanCache,
    device_info: Subscription,
}

impl<B: NetworkBackend> Device<B> {
    pub fn new(backend: B, codec: ChunkCodec, scan_stale_after: Duration) -> Self {
        Self {
            backend,
            codec,
            status: StatusTracker::default(),
            scans: ScanCache::new(scan_stale_after),
            device_info: Subscription::default(),
        }
    }

    pub fn status(&self) -> &OperationStatus {
        self.status.current()
    }

    pub fn scan_cache(&self) -> &ScanCache {
        &self.scans
    }

    pub async fn device_info(&self) -> Result<DeviceInfo, BackendError> {
        self.backend.read_telemetry().await
    }

    pub async fn scan_result(&mut self) -> ScanResult {
        self.scans.read(&self.backend).await
    }

    pub async fn wifi_state(&self) -> Result<WifiState, BackendError> {
        self.backend.read_wifi_status().await
    }

    /// Configuration of every ethernet and Wi-Fi interface. Interfaces that
    /// cannot be read are left out.
    pub async fn lan_report(&self) -> Result<LanReport, BackendError> {
        let mut ifaces = Vec::new();
        for iface in self.backend.list_interfaces().await? {
            match self.backend.read_interface_config(&iface.device).await {
                Ok(cfg) => ifaces.push(cfg),
                Err(e) => warn!(device = %iface.device, "cannot read interface config: {e}"),
            }
        }
        Ok(LanReport { ifaces })
    }

    pub fn subscribe_device_info(&mut self, target: Option<Notifier>) {
        self.device_info.set(target);
    }

    pub fn subscribe_scan_result(&mut self, target: Option<Notifier>) {
        self.scans.subscribe(target);
    }

    pub fn subscribe_status(&mut self, target: Option<Notifier>) {
        self.status.subscribe(target);
    }

    pub(crate) async fn publish(&mut self, status: OperationStatus) {
        self.status.publish(&self.codec, status).await;
    }
}
