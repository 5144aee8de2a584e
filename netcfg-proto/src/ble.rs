//! BLE GATT service layout for netcfg
//!
//! One primary service carries seven characteristics. Each characteristic is
//! addressed by a stable slot number and has a fixed capability set; the
//! transport rejects operations outside that set before they reach a handler.

use std::fmt;

use uuid::Uuid;

/// BLE Service UUID: d84a0001-4f6f-4e10-8b27-2d9f2d6e0001
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0xd84a0001_4f6f_4e10_8b27_2d9f2d6e0001);

/// Device Info Characteristic UUID (read/notify)
pub const DEVICE_INFO_UUID: Uuid = Uuid::from_u128(0xd84a0002_4f6f_4e10_8b27_2d9f2d6e0002);

/// Scan Control Characteristic UUID (write)
pub const SCAN_CONTROL_UUID: Uuid = Uuid::from_u128(0xd84a0003_4f6f_4e10_8b27_2d9f2d6e0003);

/// Scan Result Characteristic UUID (read/notify)
pub const SCAN_RESULT_UUID: Uuid = Uuid::from_u128(0xd84a0004_4f6f_4e10_8b27_2d9f2d6e0004);

/// Wi-Fi Config Characteristic UUID (read/write)
pub const WIFI_CONFIG_UUID: Uuid = Uuid::from_u128(0xd84a0005_4f6f_4e10_8b27_2d9f2d6e0005);

/// LAN Config Characteristic UUID (read/write)
pub const LAN_CONFIG_UUID: Uuid = Uuid::from_u128(0xd84a0006_4f6f_4e10_8b27_2d9f2d6e0006);

/// Action Characteristic UUID (write)
pub const ACTION_UUID: Uuid = Uuid::from_u128(0xd84a0007_4f6f_4e10_8b27_2d9f2d6e0007);

/// Status Characteristic UUID (read/notify)
pub const STATUS_UUID: Uuid = Uuid::from_u128(0xd84a0008_4f6f_4e10_8b27_2d9f2d6e0008);

/// Local name prefix the server advertises (`<prefix>-<hostname>`) and the
/// client looks for by default.
pub const LOCAL_NAME_PREFIX: &str = "rpi-netcfg";

/// Notification chunk size, kept below the ATT payload of common negotiated MTUs.
pub const DEFAULT_CHUNK_SIZE: usize = 360;

/// Age after which a cached scan result is refreshed on read.
pub const SCAN_STALE_SECS: u64 = 10;

/// Literal command payloads
pub mod commands {
    /// Scan Control: run a fresh Wi-Fi scan
    pub const SCAN_START: &str = "start";

    /// Action: acknowledge previously written configuration
    pub const APPLY: &str = "apply";

    /// Action: reboot the device
    pub const REBOOT: &str = "reboot";
}

/// Logical characteristic slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    DeviceInfo = 1,
    ScanControl = 2,
    ScanResult = 3,
    WifiConfig = 4,
    LanConfig = 5,
    Action = 6,
    Status = 7,
}

impl Slot {
    pub const ALL: [Slot; 7] = [
        Slot::DeviceInfo,
        Slot::ScanControl,
        Slot::ScanResult,
        Slot::WifiConfig,
        Slot::LanConfig,
        Slot::Action,
        Slot::Status,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(n: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.number() == n)
    }

    pub fn uuid(self) -> Uuid {
        match self {
            Slot::DeviceInfo => DEVICE_INFO_UUID,
            Slot::ScanControl => SCAN_CONTROL_UUID,
            Slot::ScanResult => SCAN_RESULT_UUID,
            Slot::WifiConfig => WIFI_CONFIG_UUID,
            Slot::LanConfig => LAN_CONFIG_UUID,
            Slot::Action => ACTION_UUID,
            Slot::Status => STATUS_UUID,
        }
    }

    pub fn from_uuid(uuid: Uuid) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.uuid() == uuid)
    }

    pub fn name(self) -> &'static str {
        match self {
            Slot::DeviceInfo => "device_info",
            Slot::ScanControl => "scan_control",
            Slot::ScanResult => "scan_result",
            Slot::WifiConfig => "wifi_config",
            Slot::LanConfig => "lan_config",
            Slot::Action => "action",
            Slot::Status => "status",
        }
    }

    pub fn capabilities(self) -> Capabilities {
        match self {
            Slot::DeviceInfo | Slot::ScanResult | Slot::Status => Capabilities::READ_NOTIFY,
            Slot::ScanControl | Slot::Action => Capabilities::WRITE,
            Slot::WifiConfig | Slot::LanConfig => Capabilities::READ_WRITE,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (slot {})", self.name(), self.number())
    }
}

/// A single GATT operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Read,
    Write,
    Notify,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Capability::Read => "read",
            Capability::Write => "write",
            Capability::Notify => "notify",
        })
    }
}

/// Capability set of a characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub read: bool,
    pub write: bool,
    pub notify: bool,
}

impl Capabilities {
    pub const WRITE: Self = Self { read: false, write: true, notify: false };
    pub const READ_NOTIFY: Self = Self { read: true, write: false, notify: true };
    pub const READ_WRITE: Self = Self { read: true, write: true, notify: false };

    pub fn allows(self, capability: Capability) -> bool {
        match capability {
            Capability::Read => self.read,
            Capability::Write => self.write,
            Capability::Notify => self.notify,
        }
    }
}
