//! Operation status record published on the Status characteristic

use serde::{Deserialize, Serialize};

/// Operation names used in status records
pub mod ops {
    pub const WIFI_SCAN: &str = "wifi_scan";
    pub const APPLY: &str = "apply";
    pub const REBOOT: &str = "reboot";
}

/// Stage names used in status records
pub mod stages {
    pub const START: &str = "start";
    pub const DONE: &str = "done";
    pub const WIFI_CONNECT: &str = "wifi_connect";
    pub const WIFI_CONNECT_DONE: &str = "wifi_connect_done";
    pub const LAN_CONFIG: &str = "lan_config";
    pub const LAN_CONFIG_DONE: &str = "lan_config_done";
    pub const NOW: &str = "now";
}

/// The latest operation status
///
/// `op` and `stage` are only `None` for the boot value, before any command has
/// run. A failed status always carries an error text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationStatus {
    pub op: Option<String>,
    pub stage: Option<String>,
    pub ok: bool,
    pub err: Option<String>,
}

impl Default for OperationStatus {
    fn default() -> Self {
        Self { op: None, stage: None, ok: true, err: None }
    }
}

impl OperationStatus {
    pub fn succeeded(op: &str, stage: &str) -> Self {
        Self {
            op: Some(op.to_string()),
            stage: Some(stage.to_string()),
            ok: true,
            err: None,
        }
    }

    pub fn failed(op: &str, stage: &str, err: impl Into<String>) -> Self {
        Self {
            op: Some(op.to_string()),
            stage: Some(stage.to_string()),
            ok: false,
            err: Some(err.into()),
        }
    }

    /// Build from a backend outcome: `Ok` succeeds, `Err` carries its text.
    pub fn from_outcome<E: std::fmt::Display>(op: &str, stage: &str, outcome: &Result<(), E>) -> Self {
        match outcome {
            Ok(()) => Self::succeeded(op, stage),
            Err(e) => Self::failed(op, stage, e.to_string()),
        }
    }

    pub fn is(&self, op: &str, stage: &str) -> bool {
        self.op.as_deref() == Some(op) && self.stage.as_deref() == Some(stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape() {
        let s = OperationStatus::succeeded(ops::APPLY, stages::WIFI_CONNECT_DONE);
        assert_eq!(
            serde_json::to_string(&s).unwrap(),
            r#"{"op":"apply","stage":"wifi_connect_done","ok":true,"err":null}"#
        );
        assert_eq!(
            serde_json::to_string(&OperationStatus::default()).unwrap(),
            r#"{"op":null,"stage":null,"ok":true,"err":null}"#
        );
    }

    #[test]
    fn failure_keeps_error_text() {
        let outcome: Result<(), String> = Err("Error: No network with SSID 'Home' found.".into());
        let s = OperationStatus::from_outcome(ops::APPLY, stages::WIFI_CONNECT_DONE, &outcome);
        assert!(!s.ok);
        assert_eq!(s.err.as_deref(), Some("Error: No network with SSID 'Home' found."));
        assert!(s.is(ops::APPLY, stages::WIFI_CONNECT_DONE));
    }
}
