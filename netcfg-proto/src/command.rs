//! Literal commands accepted by the Scan Control and Action characteristics

use std::fmt;

use crate::ble::commands;

/// Normalized text of a literal command payload.
fn literal(payload: &[u8]) -> Option<String> {
    std::str::from_utf8(payload).ok().map(|s| s.trim().to_ascii_lowercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanControl {
    Start,
}

impl ScanControl {
    /// Anything other than `start` is not a scan command.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        match literal(payload)?.as_str() {
            commands::SCAN_START => Some(ScanControl::Start),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Acknowledge previously written configuration
    Apply,
    Reboot,
}

impl Action {
    /// Only `apply` and `reboot` are actions; any other token is rejected.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        match literal(payload)?.as_str() {
            commands::APPLY => Some(Action::Apply),
            commands::REBOOT => Some(Action::Reboot),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Apply => commands::APPLY,
            Action::Reboot => commands::REBOOT,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::parse(s.as_bytes()).ok_or_else(|| format!("action must be 'apply' or 'reboot', got '{s}'"))
    }
}
