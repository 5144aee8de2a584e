//! Daemon configuration from command-line flags and the environment

use std::time::Duration;

use clap::Parser;
use netcfg_proto::ble::{DEFAULT_CHUNK_SIZE, LOCAL_NAME_PREFIX, SCAN_STALE_SECS};

#[derive(Debug, Clone, Parser)]
#[command(name = "netcfg-device")]
#[command(about = "Expose network configuration and telemetry over a BLE GATT service")]
pub struct DeviceConfig {
    /// Advertised local name (default: rpi-netcfg-<hostname>)
    #[arg(long, env = "NETCFG_NAME")]
    pub name: Option<String>,

    /// Maximum bytes per notification
    #[arg(long, env = "NETCFG_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Age in seconds after which a cached scan is refreshed on read
    #[arg(long, env = "NETCFG_SCAN_STALE_SECS", default_value_t = SCAN_STALE_SECS)]
    pub scan_stale_secs: u64,

    /// Wi-Fi station interface
    #[arg(long, env = "NETCFG_WIFI_IFACE", default_value = "wlan0")]
    pub wifi_iface: String,

    /// Run backend commands through `sudo -n`
    #[arg(long, env = "NETCFG_USE_SUDO")]
    pub use_sudo: bool,
}

impl DeviceConfig {
    pub fn scan_stale_after(&self) -> Duration {
        Duration::from_secs(self.scan_stale_secs)
    }

    pub fn local_name(&self, hostname: &str) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("{LOCAL_NAME_PREFIX}-{hostname}"),
        }
    }
}
