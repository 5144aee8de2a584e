#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use netcfg_device::{
    BackendError, Device, EventLoop, GattService, InterfaceKind, NetInterface, NetworkBackend,
    ServiceHandle, netcfg_service,
};
use netcfg_proto::{
    AccessPoint, ChunkCodec, DeviceInfo, LanConfig, LanInterface, ScanResult, WifiConfig, WifiState,
};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Telemetry,
    WifiStatus,
    ListInterfaces,
    InterfaceConfig(String),
    ApplyWifi(WifiConfig),
    ApplyLan(LanConfig),
    Scan,
    Reboot,
}

/// In-memory backend recording every call
#[derive(Clone, Default)]
pub struct FakeBackend {
    calls: Arc<Mutex<Vec<Call>>>,
    pub fail_apply: Option<String>,
    pub fail_scan: bool,
    pub access_points: Vec<AccessPoint>,
    pub interfaces: Vec<NetInterface>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            access_points: vec![
                AccessPoint::new("Home", 82, "WPA2"),
                AccessPoint::new("Neighbour", 51, "WPA2 WPA3"),
                AccessPoint::new("Faint", 20, "WPA2"),
            ],
            interfaces: vec![
                NetInterface { device: "wlan0".into(), kind: InterfaceKind::Wifi, connected: true },
                NetInterface { device: "eth1".into(), kind: InterfaceKind::Ethernet, connected: false },
                NetInterface { device: "eth0".into(), kind: InterfaceKind::Ethernet, connected: true },
            ],
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn outcome(&self) -> Result<(), BackendError> {
        match &self.fail_apply {
            Some(msg) => Err(BackendError::Failed(msg.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl NetworkBackend for FakeBackend {
    async fn read_telemetry(&self) -> Result<DeviceInfo, BackendError> {
        self.record(Call::Telemetry);
        Ok(DeviceInfo {
            hostname: "pi4".into(),
            cpu_load: 0.12,
            cpu_temp_c: Some(47.2),
            mem_used_pct: 31.5,
            disk_used_pct: 22.0,
            uptime: "up 3 hours".into(),
            uptime_s: 10_800,
            os: "Debian GNU/Linux 12 (bookworm) aarch64".into(),
            host: "Raspberry Pi 4 Model B Rev 1.4".into(),
            kernel: "6.6.31+rpt-rpi-v8".into(),
        })
    }

    async fn read_wifi_status(&self) -> Result<WifiState, BackendError> {
        self.record(Call::WifiStatus);
        Ok(WifiState { ssid: Some("Home".into()), ip: Some("192.168.1.20".into()), connected: true })
    }

    async fn list_interfaces(&self) -> Result<Vec<NetInterface>, BackendError> {
        self.record(Call::ListInterfaces);
        Ok(self.interfaces.clone())
    }

    async fn read_interface_config(&self, device: &str) -> Result<LanInterface, BackendError> {
        self.record(Call::InterfaceConfig(device.to_string()));
        if device == "eth1" {
            return Err(BackendError::Failed("Error: Device 'eth1' not found.".into()));
        }
        Ok(LanInterface {
            device: device.to_string(),
            method: Some("dhcp".into()),
            ip: Some("192.168.1.20".into()),
            mask: Some("255.255.255.0".into()),
            gw: Some("192.168.1.1".into()),
            dns: vec!["192.168.1.1".into()],
        })
    }

    async fn apply_wifi(&self, config: &WifiConfig) -> Result<(), BackendError> {
        self.record(Call::ApplyWifi(config.clone()));
        self.outcome()
    }

    async fn apply_lan(&self, config: &LanConfig) -> Result<(), BackendError> {
        self.record(Call::ApplyLan(config.clone()));
        self.outcome()
    }

    async fn scan_wifi(&self) -> Result<ScanResult, BackendError> {
        self.record(Call::Scan);
        if self.fail_scan {
            return Err(BackendError::Failed("Error: Wi-Fi scan request failed".into()));
        }
        Ok(ScanResult::now(self.access_points.clone()))
    }

    async fn reboot(&self) -> Result<(), BackendError> {
        self.record(Call::Reboot);
        Ok(())
    }
}

pub fn device(backend: FakeBackend) -> Device<FakeBackend> {
    Device::new(backend, ChunkCodec::new(32).unwrap(), Duration::from_secs(10))
}

pub fn service(backend: FakeBackend) -> GattService<Device<FakeBackend>> {
    netcfg_service(device(backend)).unwrap()
}

pub fn spawn(backend: FakeBackend) -> (ServiceHandle, JoinHandle<GattService<Device<FakeBackend>>>) {
    EventLoop::spawn(service(backend))
}
