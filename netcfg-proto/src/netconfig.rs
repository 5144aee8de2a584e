//! Wi-Fi and LAN configuration payloads
//!
//! Writes arrive as loosely-shaped JSON. Each characteristic has a wire
//! request struct where every field is optional, and a validated config type
//! built from it with `TryFrom`. Validation failures render exactly as the
//! `err` text of the resulting status record.

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("bad_json: {0}")]
    BadJson(#[from] serde_json::Error),
    #[error("no_ssid")]
    NoSsid,
    #[error("no_method")]
    NoMethod,
    #[error("bad_method: {0}")]
    BadMethod(String),
    #[error("no_{0}")]
    Missing(&'static str),
    #[error("bad_{field}: {value}")]
    BadAddress { field: &'static str, value: String },
}

// ---------------------------------------------------------------------------
// Wi-Fi
// ---------------------------------------------------------------------------

/// Wi-Fi Config write payload as sent on the wire
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiConfigRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psk: Option<String>,
}

/// Validated Wi-Fi credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiConfig {
    pub ssid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psk: Option<String>,
}

impl WifiConfig {
    pub fn from_json(payload: &[u8]) -> Result<Self, ConfigError> {
        serde_json::from_slice::<WifiConfigRequest>(payload)?.try_into()
    }
}

impl TryFrom<WifiConfigRequest> for WifiConfig {
    type Error = ConfigError;

    fn try_from(req: WifiConfigRequest) -> Result<Self, Self::Error> {
        let ssid = req.ssid.filter(|s| !s.is_empty()).ok_or(ConfigError::NoSsid)?;
        let psk = req.psk.filter(|p| !p.is_empty());
        Ok(Self { ssid, psk })
    }
}

/// Wi-Fi Config read value: what the station interface is currently joined to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiState {
    pub ssid: Option<String>,
    pub ip: Option<String>,
    pub connected: bool,
}

// ---------------------------------------------------------------------------
// LAN
// ---------------------------------------------------------------------------

/// LAN Config write payload as sent on the wire
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanConfigRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gw: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns: Vec<String>,
}

/// IPv4 addressing method of an interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanMethod {
    Dhcp,
    Static {
        ip: Ipv4Addr,
        mask: Ipv4Addr,
        gw: Ipv4Addr,
        dns: Vec<IpAddr>,
    },
}

impl LanMethod {
    pub fn name(&self) -> &'static str {
        match self {
            LanMethod::Dhcp => "dhcp",
            LanMethod::Static { .. } => "static",
        }
    }
}

/// Validated LAN configuration
///
/// Without a `device` the server applies it to the primary ethernet interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanConfig {
    pub device: Option<String>,
    pub method: LanMethod,
}

impl LanConfig {
    pub fn from_json(payload: &[u8]) -> Result<Self, ConfigError> {
        serde_json::from_slice::<LanConfigRequest>(payload)?.try_into()
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    value.filter(|v| !v.trim().is_empty()).ok_or(ConfigError::Missing(field))
}

fn parse_ipv4(value: &str, field: &'static str) -> Result<Ipv4Addr, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::BadAddress {
        field,
        value: value.to_string(),
    })
}

impl TryFrom<LanConfigRequest> for LanConfig {
    type Error = ConfigError;

    fn try_from(req: LanConfigRequest) -> Result<Self, Self::Error> {
        let device = req.device.filter(|d| !d.is_empty());
        let method = match req.method.as_deref() {
            None | Some("") => return Err(ConfigError::NoMethod),
            Some("dhcp") => LanMethod::Dhcp,
            Some("static") => {
                let ip = parse_ipv4(&required(req.ip, "ip")?, "ip")?;
                let mask_text = required(req.mask, "mask")?;
                let mask = parse_ipv4(&mask_text, "mask")?;
                if netmask_to_prefix(mask).is_none() {
                    return Err(ConfigError::BadAddress { field: "mask", value: mask_text });
                }
                let gw = parse_ipv4(&required(req.gw, "gw")?, "gw")?;
                let dns = req
                    .dns
                    .iter()
                    .map(|d| d.trim())
                    .filter(|d| !d.is_empty())
                    .map(|d| {
                        d.parse::<IpAddr>().map_err(|_| ConfigError::BadAddress {
                            field: "dns",
                            value: d.to_string(),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                LanMethod::Static { ip, mask, gw, dns }
            }
            Some(other) => return Err(ConfigError::BadMethod(other.to_string())),
        };
        Ok(Self { device, method })
    }
}

impl From<&LanConfig> for LanConfigRequest {
    fn from(cfg: &LanConfig) -> Self {
        let mut req = LanConfigRequest {
            device: cfg.device.clone(),
            method: Some(cfg.method.name().to_string()),
            ..Default::default()
        };
        if let LanMethod::Static { ip, mask, gw, dns } = &cfg.method {
            req.ip = Some(ip.to_string());
            req.mask = Some(mask.to_string());
            req.gw = Some(gw.to_string());
            req.dns = dns.iter().map(ToString::to_string).collect();
        }
        req
    }
}

/// Current IPv4 configuration of one interface as reported by a read
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanInterface {
    pub device: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gw: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns: Vec<String>,
}

/// LAN Config read value: every ethernet and Wi-Fi interface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanReport {
    pub ifaces: Vec<LanInterface>,
}

/// Prefix length of a contiguous netmask (`255.255.255.0` -> 24).
pub fn netmask_to_prefix(mask: Ipv4Addr) -> Option<u8> {
    let bits = u32::from(mask);
    let ones = bits.leading_ones();
    if bits.checked_shl(ones).unwrap_or(0) == 0 {
        Some(ones as u8)
    } else {
        None
    }
}

/// Netmask of a prefix length (`24` -> `255.255.255.0`).
pub fn prefix_to_netmask(prefix: u8) -> Option<Ipv4Addr> {
    match prefix {
        0 => Some(Ipv4Addr::UNSPECIFIED),
        1..=32 => Some(Ipv4Addr::from(u32::MAX << (32 - u32::from(prefix)))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wifi_requires_ssid() {
        assert!(matches!(WifiConfig::from_json(br#"{"psk":"x"}"#), Err(ConfigError::NoSsid)));
        assert!(matches!(WifiConfig::from_json(br#"{"ssid":""}"#), Err(ConfigError::NoSsid)));
        assert_eq!(
            WifiConfig::from_json(br#"{"ssid":""}"#).unwrap_err().to_string(),
            "no_ssid"
        );
    }

    #[test]
    fn wifi_malformed_json() {
        let err = WifiConfig::from_json(b"{\"ssid\":").unwrap_err();
        assert!(err.to_string().starts_with("bad_json: "), "{err}");
    }

    #[test]
    fn wifi_empty_psk_means_open_network() {
        let cfg = WifiConfig::from_json(br#"{"ssid":"Cafe","psk":""}"#).unwrap();
        assert_eq!(cfg, WifiConfig { ssid: "Cafe".into(), psk: None });
    }

    #[test]
    fn lan_static_requires_addresses() {
        let err = LanConfig::from_json(br#"{"method":"static"}"#).unwrap_err();
        assert_eq!(err.to_string(), "no_ip");
        let err = LanConfig::from_json(br#"{"method":"static","ip":"10.0.0.2"}"#).unwrap_err();
        assert_eq!(err.to_string(), "no_mask");
        let err = LanConfig::from_json(
            br#"{"method":"static","ip":"10.0.0.2","mask":"255.255.255.0"}"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "no_gw");
    }

    #[test]
    fn lan_method_is_checked() {
        assert_eq!(LanConfig::from_json(b"{}").unwrap_err().to_string(), "no_method");
        assert_eq!(
            LanConfig::from_json(br#"{"method":"bootp"}"#).unwrap_err().to_string(),
            "bad_method: bootp"
        );
        let cfg = LanConfig::from_json(br#"{"method":"dhcp","device":"eth0"}"#).unwrap();
        assert_eq!(cfg, LanConfig { device: Some("eth0".into()), method: LanMethod::Dhcp });
    }

    #[test]
    fn lan_static_parses_addresses() {
        let cfg = LanConfig::from_json(
            br#"{"method":"static","ip":"192.168.1.20","mask":"255.255.255.0",
                 "gw":"192.168.1.1","dns":["1.1.1.1"," ","8.8.8.8"]}"#,
        )
        .unwrap();
        let LanMethod::Static { ip, mask, gw, dns } = &cfg.method else {
            panic!("expected static");
        };
        assert_eq!(*ip, Ipv4Addr::new(192, 168, 1, 20));
        assert_eq!(netmask_to_prefix(*mask), Some(24));
        assert_eq!(*gw, Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(dns.len(), 2);

        let back = LanConfigRequest::from(&cfg);
        assert_eq!(LanConfig::try_from(back).unwrap(), cfg);
    }

    #[test]
    fn lan_rejects_bad_addresses() {
        let err = LanConfig::from_json(
            br#"{"method":"static","ip":"192.168.1.300","mask":"255.255.255.0","gw":"192.168.1.1"}"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "bad_ip: 192.168.1.300");
        let err = LanConfig::from_json(
            br#"{"method":"static","ip":"192.168.1.3","mask":"255.0.255.0","gw":"192.168.1.1"}"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "bad_mask: 255.0.255.0");
    }

    #[test]
    fn netmask_prefix_conversions() {
        assert_eq!(netmask_to_prefix(Ipv4Addr::new(255, 255, 255, 255)), Some(32));
        assert_eq!(netmask_to_prefix(Ipv4Addr::new(255, 255, 240, 0)), Some(20));
        assert_eq!(netmask_to_prefix(Ipv4Addr::UNSPECIFIED), Some(0));
        assert_eq!(netmask_to_prefix(Ipv4Addr::new(0, 255, 0, 0)), None);
        assert_eq!(prefix_to_netmask(24), Some(Ipv4Addr::new(255, 255, 255, 0)));
        assert_eq!(prefix_to_netmask(32), Some(Ipv4Addr::new(255, 255, 255, 255)));
        assert_eq!(prefix_to_netmask(33), None);
    }

    #[test]
    fn interface_report_omits_empty_fields() {
        let report = LanReport {
            ifaces: vec![LanInterface { device: "eth0".into(), method: Some("dhcp".into()), ..Default::default() }],
        };
        assert_eq!(
            serde_json::to_string(&report).unwrap(),
            r#"{"ifaces":[{"device":"eth0","method":"dhcp"}]}"#
        );
    }
}
