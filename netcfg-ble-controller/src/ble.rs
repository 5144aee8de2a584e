//! BLE client for netcfg devices
//!
//! Every remote operation runs inside one [`Session`]: find the peripheral,
//! connect, discover services, do the work, disconnect.

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::pin;
use std::time::Duration;

use btleplug::api::{Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use netcfg_proto::async_io::{Delivery, collect_or_read};
use netcfg_proto::ble::{LOCAL_NAME_PREFIX, SERVICE_UUID, commands};
use netcfg_proto::{
    Action, DeviceInfo, LanConfig, LanConfigRequest, LanReport, OperationStatus, Reassembler,
    ScanResult, Slot, WifiConfig, WifiState, decode, to_json_bytes,
};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ControllerError;

/// How long to listen for advertisements before picking a device
pub const DEFAULT_SCAN_WINDOW: Duration = Duration::from_secs(6);

/// Pause between triggering a scan and reading its result when
/// notifications are skipped.
pub const SCAN_SETTLE: Duration = Duration::from_millis(800);

const NOTIFY_QUEUE: usize = 64;

/// A discovered peripheral
#[derive(Debug, Clone)]
pub struct NetcfgDevice {
    pub name: String,
    pub address: String,
    pub rssi: Option<i16>,
    pub is_netcfg: bool,
}

/// Which peripheral to talk to
#[derive(Debug, Clone)]
pub struct Target {
    /// Exact address; when set, the name hint is not consulted
    pub addr: Option<String>,
    pub name: String,
    pub scan_window: Duration,
}

impl Default for Target {
    fn default() -> Self {
        Self {
            addr: None,
            name: LOCAL_NAME_PREFIX.to_string(),
            scan_window: DEFAULT_SCAN_WINDOW,
        }
    }
}

impl Target {
    fn describe(&self) -> String {
        match &self.addr {
            Some(addr) => format!("address {addr}"),
            None => format!("name '{}' or service {SERVICE_UUID}", self.name),
        }
    }
}

/// Advertisement data a peripheral is selected by
#[derive(Debug, Clone, Default)]
pub struct Candidate {
    pub name: Option<String>,
    pub address: String,
    pub services: Vec<Uuid>,
}

impl Candidate {
    pub fn advertises_service(&self) -> bool {
        self.services.contains(&SERVICE_UUID)
    }

    pub fn is_netcfg(&self) -> bool {
        self.advertises_service()
            || self
                .name
                .as_deref()
                .is_some_and(|n| n.to_ascii_lowercase().starts_with(LOCAL_NAME_PREFIX))
    }

    fn normalized_name(&self) -> Option<String> {
        self.name.as_deref().map(|n| n.trim().to_lowercase())
    }
}

/// Index of the candidate `target` selects.
///
/// An address must match exactly. Without one, an exact name match wins over
/// a name containing the hint, and any peripheral advertising the netcfg
/// service is the last resort.
pub fn select(candidates: &[Candidate], target: &Target) -> Option<usize> {
    if let Some(addr) = &target.addr {
        let addr = addr.trim();
        return candidates.iter().position(|c| c.address.eq_ignore_ascii_case(addr));
    }

    let hint = target.name.trim().to_lowercase();
    let by_name = |exact: bool| {
        candidates.iter().position(|c| {
            c.normalized_name().is_some_and(|n| {
                if exact { n == hint } else { !hint.is_empty() && n.contains(&hint) }
            })
        })
    };

    by_name(true)
        .or_else(|| by_name(false))
        .or_else(|| candidates.iter().position(Candidate::advertises_service))
}

/// Get the default Bluetooth adapter
pub async fn get_adapter() -> Result<Adapter, ControllerError> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;
    adapters.into_iter().next().ok_or(ControllerError::NoAdapter)
}

struct Discovered {
    peripheral: Peripheral,
    candidate: Candidate,
    rssi: Option<i16>,
}

async fn discover(adapter: &Adapter, window: Duration) -> Result<Vec<Discovered>, ControllerError> {
    adapter.start_scan(ScanFilter::default()).await?;
    tokio::time::sleep(window).await;

    let peripherals = adapter.peripherals().await?;
    let mut found = Vec::new();

    for peripheral in peripherals {
        if let Some(props) = peripheral.properties().await? {
            let candidate = Candidate {
                name: props.local_name,
                address: peripheral.address().to_string(),
                services: props.services,
            };
            found.push(Discovered { peripheral, candidate, rssi: props.rssi });
        }
    }

    adapter.stop_scan().await?;
    debug!(count = found.len(), "discovery finished");
    Ok(found)
}

/// Scan for BLE devices. netcfg devices have `is_netcfg = true`.
pub async fn scan(window: Duration) -> Result<Vec<NetcfgDevice>, ControllerError> {
    let adapter = get_adapter().await?;
    let found = discover(&adapter, window).await?;

    Ok(found
        .into_iter()
        .map(|d| NetcfgDevice {
            is_netcfg: d.candidate.is_netcfg(),
            name: d.candidate.name.unwrap_or_else(|| "Unknown".to_string()),
            address: d.candidate.address,
            rssi: d.rssi,
        })
        .collect())
}

/// Find the peripheral `target` names
pub async fn find_device(target: &Target) -> Result<Peripheral, ControllerError> {
    let adapter = get_adapter().await?;
    let mut found = discover(&adapter, target.scan_window).await?;

    let candidates: Vec<Candidate> = found.iter().map(|d| d.candidate.clone()).collect();
    let index = select(&candidates, target).ok_or_else(|| ControllerError::NotFound(target.describe()))?;

    let chosen = found.swap_remove(index);
    info!(name = ?chosen.candidate.name, address = %chosen.candidate.address, "found device");
    Ok(chosen.peripheral)
}

/// A connected peripheral with its characteristics discovered
pub struct Session {
    peripheral: Peripheral,
    characteristics: BTreeSet<Characteristic>,
}

impl Session {
    pub async fn connect(peripheral: Peripheral) -> Result<Self, ControllerError> {
        peripheral.connect().await?;
        if let Err(e) = peripheral.discover_services().await {
            let _ = peripheral.disconnect().await;
            return Err(e.into());
        }
        let characteristics = peripheral.characteristics();
        debug!(count = characteristics.len(), "services discovered");
        Ok(Self { peripheral, characteristics })
    }

    fn characteristic(&self, slot: Slot) -> Result<&Characteristic, ControllerError> {
        self.characteristics
            .iter()
            .find(|c| c.uuid == slot.uuid())
            .ok_or(ControllerError::MissingCharacteristic(slot))
    }

    pub async fn read(&self, slot: Slot) -> Result<Vec<u8>, ControllerError> {
        Ok(self.peripheral.read(self.characteristic(slot)?).await?)
    }

    pub async fn read_json<T: DeserializeOwned>(&self, slot: Slot) -> Result<T, ControllerError> {
        Ok(decode(&self.read(slot).await?)?)
    }

    pub async fn write(&self, slot: Slot, value: &[u8]) -> Result<(), ControllerError> {
        let characteristic = self.characteristic(slot)?;
        self.peripheral.write(characteristic, value, WriteType::WithResponse).await?;
        Ok(())
    }

    /// Enable notifications on `slot`.
    ///
    /// The peripheral's notification stream is taken before subscribing so
    /// nothing sent right after the subscription is missed.
    pub async fn subscribe(&self, slot: Slot) -> Result<Notifications, ControllerError> {
        let characteristic = self.characteristic(slot)?;
        let mut stream = self.peripheral.notifications().await?;
        self.peripheral.subscribe(characteristic).await?;

        let (tx, rx) = mpsc::channel(NOTIFY_QUEUE);
        let uuid = slot.uuid();
        let forwarder = tokio::spawn(async move {
            while let Some(notification) = stream.next().await {
                if notification.uuid == uuid && tx.send(notification.value).await.is_err() {
                    break;
                }
            }
        });

        Ok(Notifications { slot, rx, forwarder })
    }

    pub async fn unsubscribe(&self, notifications: Notifications) {
        let slot = notifications.slot;
        drop(notifications);
        if let Ok(characteristic) = self.characteristic(slot)
            && let Err(e) = self.peripheral.unsubscribe(characteristic).await
        {
            debug!(%slot, "unsubscribe failed: {e}");
        }
    }

    pub async fn disconnect(self) {
        if let Err(e) = self.peripheral.disconnect().await {
            warn!("disconnect failed: {e}");
        }
    }
}

/// Raw notification values of one characteristic
pub struct Notifications {
    slot: Slot,
    rx: mpsc::Receiver<Vec<u8>>,
    forwarder: JoinHandle<()>,
}

impl Notifications {
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.rx.recv().await
    }
}

impl Drop for Notifications {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

/// Run `op` against the device `target` names. The session is disconnected
/// whether `op` succeeds or not.
pub async fn with_session<T>(
    target: &Target,
    op: impl AsyncFnOnce(&Session) -> Result<T, ControllerError>,
) -> Result<T, ControllerError> {
    let session = Session::connect(find_device(target).await?).await?;
    let result = op(&session).await;
    session.disconnect().await;
    result
}

pub async fn device_info(target: &Target) -> Result<DeviceInfo, ControllerError> {
    with_session(target, async |s| s.read_json(Slot::DeviceInfo).await).await
}

pub async fn wifi_get(target: &Target) -> Result<WifiState, ControllerError> {
    with_session(target, async |s| s.read_json(Slot::WifiConfig).await).await
}

pub async fn wifi_set(target: &Target, config: &WifiConfig) -> Result<(), ControllerError> {
    let payload = to_json_bytes(config)?;
    with_session(target, async |s| s.write(Slot::WifiConfig, &payload).await).await
}

pub async fn lan_get(target: &Target) -> Result<LanReport, ControllerError> {
    with_session(target, async |s| s.read_json(Slot::LanConfig).await).await
}

pub async fn lan_set(target: &Target, config: &LanConfig) -> Result<(), ControllerError> {
    let payload = to_json_bytes(&LanConfigRequest::from(config))?;
    with_session(target, async |s| s.write(Slot::LanConfig, &payload).await).await
}

pub async fn action(target: &Target, action: Action) -> Result<(), ControllerError> {
    with_session(target, async |s| s.write(Slot::Action, action.as_str().as_bytes()).await).await
}

/// Trigger a Wi-Fi scan on the device and fetch its result.
///
/// Chunked notifications are collected for up to `wait`; if the result has
/// not completed by then it is read directly. A zero `wait` skips
/// notifications and reads after a short settle delay.
pub async fn scan_wifi(target: &Target, wait: Duration) -> Result<Delivery<ScanResult>, ControllerError> {
    with_session(target, async |s| {
        let mut notifications = s.subscribe(Slot::ScanResult).await?;
        s.write(Slot::ScanControl, commands::SCAN_START.as_bytes()).await?;
        if wait.is_zero() {
            tokio::time::sleep(SCAN_SETTLE).await;
        }

        let delivered = collect_or_read::<ScanResult, _, _, _>(&mut notifications.rx, wait, || {
            s.read(Slot::ScanResult)
        })
        .await;
        s.unsubscribe(notifications).await;

        let delivered = delivered?;
        if delivered.is_fallback() {
            debug!("scan result read directly");
        }
        Ok(delivered)
    })
    .await
}

/// Follow status notifications until `stop` resolves
pub async fn watch_status(
    target: &Target,
    stop: impl Future<Output = ()>,
    mut on_status: impl FnMut(OperationStatus),
) -> Result<(), ControllerError> {
    let mut stop = pin!(stop);

    with_session(target, async |s| {
        let mut notifications = s.subscribe(Slot::Status).await?;
        let mut reassembler = Reassembler::<OperationStatus>::new();
        reassembler.subscribe();

        loop {
            tokio::select! {
                _ = &mut stop => break,
                chunk = notifications.recv() => match chunk {
                    Some(chunk) => {
                        if let Some(status) = reassembler.push(&chunk) {
                            on_status(status);
                        }
                    }
                    None => {
                        warn!("status notifications ended");
                        break;
                    }
                },
            }
        }

        s.unsubscribe(notifications).await;
        Ok(())
    })
    .await
}
