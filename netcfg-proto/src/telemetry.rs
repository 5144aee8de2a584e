//! Host telemetry served on the Device Info characteristic

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub hostname: String,
    /// 1-minute load average
    pub cpu_load: f64,
    pub cpu_temp_c: Option<f64>,
    pub mem_used_pct: f64,
    /// Usage of the root filesystem
    pub disk_used_pct: f64,
    /// Human readable, e.g. "up 3 hours, 2 minutes"
    pub uptime: String,
    pub uptime_s: u64,
    /// OS pretty name and machine architecture
    pub os: String,
    /// Board model, "Unknown" when the device tree has none
    pub host: String,
    pub kernel: String,
}
