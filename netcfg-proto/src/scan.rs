//! Wi-Fi scan result carried by the Scan Result characteristic

use serde::{Deserialize, Serialize};

/// Access points weaker than this (0-100 scale) are not reported.
pub const MIN_SIGNAL: u8 = 50;

/// Security label used when the backend reports none.
pub const UNKNOWN_SECURITY: &str = "?";

/// A visible access point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPoint {
    pub ssid: String,
    /// Signal strength, 0-100
    #[serde(rename = "sign")]
    pub signal: u8,
    #[serde(rename = "secu")]
    pub security: String,
}

impl AccessPoint {
    pub fn new(ssid: impl Into<String>, signal: u8, security: impl Into<String>) -> Self {
        let security = security.into();
        Self {
            ssid: ssid.into(),
            signal,
            security: if security.is_empty() { UNKNOWN_SECURITY.to_string() } else { security },
        }
    }

    /// Hidden and weak networks are filtered out of every result.
    pub fn is_reportable(&self) -> bool {
        !self.ssid.is_empty() && self.signal >= MIN_SIGNAL
    }
}

/// Result of one scan, rebuilt wholesale each time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Seconds since the Unix epoch when the scan completed
    #[serde(rename = "ts")]
    pub timestamp: f64,
    #[serde(rename = "aps")]
    pub access_points: Vec<AccessPoint>,
}

impl Default for ScanResult {
    fn default() -> Self {
        Self { timestamp: 0.0, access_points: Vec::new() }
    }
}

impl ScanResult {
    pub fn new(timestamp: f64, access_points: impl IntoIterator<Item = AccessPoint>) -> Self {
        Self {
            timestamp,
            access_points: access_points.into_iter().filter(AccessPoint::is_reportable).collect(),
        }
    }

    /// A result stamped with the current wall-clock time.
    pub fn now(access_points: impl IntoIterator<Item = AccessPoint>) -> Self {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        Self::new(timestamp, access_points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weak_and_hidden_networks_are_dropped() {
        let result = ScanResult::new(
            1.0,
            [
                AccessPoint::new("Home", 82, "WPA2"),
                AccessPoint::new("", 90, "WPA2"),
                AccessPoint::new("Neighbour", 49, "WPA2"),
                AccessPoint::new("Cafe", 50, ""),
            ],
        );
        let names: Vec<&str> = result.access_points.iter().map(|ap| ap.ssid.as_str()).collect();
        assert_eq!(names, ["Home", "Cafe"]);
        assert_eq!(result.access_points[1].security, "?");
    }

    #[test]
    fn wire_keys() {
        let result = ScanResult::new(12.5, [AccessPoint::new("Home", 70, "WPA2")]);
        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"ts":12.5,"aps":[{"ssid":"Home","sign":70,"secu":"WPA2"}]}"#
        );
    }
}
