//! Network backend abstraction
//!
//! The dispatcher never talks to the operating system directly. Everything
//! that reads or changes host networking goes through [`NetworkBackend`], so
//! the service can run against NetworkManager on a real device and against an
//! in-memory fake in tests.

mod host;
mod nmcli;

pub use host::read_device_info;
pub use nmcli::NmcliBackend;

use async_trait::async_trait;
use netcfg_proto::{DeviceInfo, LanConfig, LanInterface, ScanResult, WifiConfig, WifiState};

/// Failure reported by the backend
///
/// The `Display` text is what ends up in the status record's `err` field, so
/// command diagnostics are carried verbatim.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("{0}")]
    Failed(String),
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unexpected output from {program}: {detail}")]
    Parse { program: String, detail: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceKind {
    Ethernet,
    Wifi,
}

/// A network interface known to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetInterface {
    pub device: String,
    pub kind: InterfaceKind,
    pub connected: bool,
}

/// The ethernet interface LAN writes without an explicit device apply to:
/// the first connected one, else the first one listed.
pub fn primary_ethernet(ifaces: &[NetInterface]) -> Option<&NetInterface> {
    let mut ethernet = ifaces.iter().filter(|i| i.kind == InterfaceKind::Ethernet);
    ethernet.clone().find(|i| i.connected).or_else(|| ethernet.next())
}

/// Host networking and telemetry operations
#[async_trait]
pub trait NetworkBackend: Send + Sync {
    async fn read_telemetry(&self) -> Result<DeviceInfo, BackendError>;

    /// What the station interface is currently joined to
    async fn read_wifi_status(&self) -> Result<WifiState, BackendError>;

    /// Ethernet and Wi-Fi interfaces, in the backend's order
    async fn list_interfaces(&self) -> Result<Vec<NetInterface>, BackendError>;

    async fn read_interface_config(&self, device: &str) -> Result<LanInterface, BackendError>;

    async fn apply_wifi(&self, config: &WifiConfig) -> Result<(), BackendError>;

    /// Apply a LAN configuration. `config.device` is already resolved when an
    /// ethernet interface exists.
    async fn apply_lan(&self, config: &LanConfig) -> Result<(), BackendError>;

    /// Run a fresh scan. The result is already filtered and timestamped.
    async fn scan_wifi(&self) -> Result<ScanResult, BackendError>;

    async fn reboot(&self) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iface(device: &str, kind: InterfaceKind, connected: bool) -> NetInterface {
        NetInterface { device: device.to_string(), kind, connected }
    }

    #[test]
    fn primary_ethernet_prefers_connected() {
        let ifaces = vec![
            iface("wlan0", InterfaceKind::Wifi, true),
            iface("eth0", InterfaceKind::Ethernet, false),
            iface("eth1", InterfaceKind::Ethernet, true),
        ];
        assert_eq!(primary_ethernet(&ifaces).map(|i| i.device.as_str()), Some("eth1"));
    }

    #[test]
    fn primary_ethernet_falls_back_to_first() {
        let ifaces = vec![
            iface("wlan0", InterfaceKind::Wifi, true),
            iface("eth0", InterfaceKind::Ethernet, false),
        ];
        assert_eq!(primary_ethernet(&ifaces).map(|i| i.device.as_str()), Some("eth0"));
        assert!(primary_ethernet(&ifaces[..1]).is_none());
    }
}
