//! NetworkManager backend driven through `nmcli`
//!
//! Commands are spawned with explicit argument vectors, never through a
//! shell, so SSIDs and passphrases need no quoting.

use std::net::Ipv4Addr;

use async_trait::async_trait;
use netcfg_proto::netconfig::{netmask_to_prefix, prefix_to_netmask};
use netcfg_proto::{
    AccessPoint, DeviceInfo, LanConfig, LanInterface, LanMethod, ScanResult, WifiConfig, WifiState,
};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{BackendError, InterfaceKind, NetInterface, NetworkBackend};

/// Connection profile used when the target device has none bound.
const DEFAULT_WIRED_PROFILE: &str = "Wired connection 1";

pub struct NmcliBackend {
    wifi_iface: String,
    use_sudo: bool,
}

impl NmcliBackend {
    pub fn new(wifi_iface: impl Into<String>, use_sudo: bool) -> Self {
        Self { wifi_iface: wifi_iface.into(), use_sudo }
    }

    /// Run a command and return its stdout. A non-zero exit becomes
    /// [`BackendError::Failed`] carrying stderr, or stdout when stderr is empty.
    async fn run(&self, program: &str, args: &[&str]) -> Result<String, BackendError> {
        let mut cmd = if self.use_sudo {
            let mut c = Command::new("sudo");
            c.arg("-n").arg(program);
            c
        } else {
            Command::new(program)
        };
        cmd.args(args);
        debug!(program, ?args, "running");

        let output = cmd.output().await.map_err(|source| BackendError::Spawn {
            program: program.to_string(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = [stderr.trim(), stdout.trim()]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{program} exited with {}", output.status));
        Err(BackendError::Failed(detail))
    }

    async fn nmcli(&self, args: &[&str]) -> Result<String, BackendError> {
        self.run("nmcli", args).await
    }

    /// Values of one `nmcli device show` field
    async fn device_field(&self, device: &str, field: &str) -> Result<Vec<String>, BackendError> {
        Ok(split_values(&self.nmcli(&["-g", field, "device", "show", device]).await?))
    }

    /// Active connection profile bound to `device`
    async fn connection_name(&self, device: &str) -> Result<Option<String>, BackendError> {
        Ok(self.device_field(device, "GENERAL.CONNECTION").await?.into_iter().next())
    }

    async fn connection_method(&self, profile: &str) -> Result<Option<String>, BackendError> {
        let raw = self.nmcli(&["-g", "ipv4.method", "connection", "show", profile]).await?;
        Ok(match raw.trim() {
            "" => None,
            "auto" => Some("dhcp".to_string()),
            "manual" => Some("static".to_string()),
            other => Some(other.to_string()),
        })
    }
}

#[async_trait]
impl NetworkBackend for NmcliBackend {
    async fn read_telemetry(&self) -> Result<DeviceInfo, BackendError> {
        Ok(super::read_device_info().await)
    }

    async fn read_wifi_status(&self) -> Result<WifiState, BackendError> {
        let ssid = self.connection_name(&self.wifi_iface).await?;
        let ip = self
            .device_field(&self.wifi_iface, "IP4.ADDRESS")
            .await?
            .into_iter()
            .next()
            .map(|cidr| address_part(&cidr).to_string());
        Ok(WifiState { connected: ssid.is_some(), ssid, ip })
    }

    async fn list_interfaces(&self) -> Result<Vec<NetInterface>, BackendError> {
        let out = self.nmcli(&["-t", "-f", "DEVICE,TYPE,STATE", "device"]).await?;
        Ok(parse_device_list(&out))
    }

    async fn read_interface_config(&self, device: &str) -> Result<LanInterface, BackendError> {
        let method = match self.connection_name(device).await? {
            Some(profile) => self.connection_method(&profile).await?,
            None => None,
        };

        let (ip, mask) = match self.device_field(device, "IP4.ADDRESS").await?.first() {
            Some(cidr) => {
                let (ip, mask) = split_cidr(cidr);
                (Some(ip.to_string()), mask.map(|m| m.to_string()))
            }
            None => (None, None),
        };

        Ok(LanInterface {
            device: device.to_string(),
            method,
            ip,
            mask,
            gw: self.device_field(device, "IP4.GATEWAY").await?.into_iter().next(),
            dns: self.device_field(device, "IP4.DNS").await?,
        })
    }

    async fn apply_wifi(&self, config: &WifiConfig) -> Result<(), BackendError> {
        let mut args = vec!["device", "wifi", "connect", config.ssid.as_str()];
        if let Some(psk) = &config.psk {
            args.extend(["password", psk.as_str()]);
        }
        args.extend(["ifname", self.wifi_iface.as_str()]);

        info!(ssid = %config.ssid, iface = %self.wifi_iface, "connecting to wifi");
        self.nmcli(&args).await.map(drop)
    }

    async fn apply_lan(&self, config: &LanConfig) -> Result<(), BackendError> {
        let bound = match &config.device {
            Some(device) => self.connection_name(device).await?,
            None => None,
        };
        let profile = bound.unwrap_or_else(|| DEFAULT_WIRED_PROFILE.to_string());
        info!(%profile, method = config.method.name(), "applying lan config");

        let (method, addresses, gateway, dns) = match &config.method {
            LanMethod::Dhcp => ("auto", String::new(), String::new(), String::new()),
            LanMethod::Static { ip, mask, gw, dns } => {
                let prefix = netmask_to_prefix(*mask)
                    .ok_or_else(|| BackendError::Failed(format!("bad_mask: {mask}")))?;
                let dns = dns.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ");
                ("manual", format!("{ip}/{prefix}"), gw.to_string(), dns)
            }
        };

        self.nmcli(&[
            "connection",
            "modify",
            &profile,
            "ipv4.method",
            method,
            "ipv4.addresses",
            &addresses,
            "ipv4.gateway",
            &gateway,
            "ipv4.dns",
            &dns,
        ])
        .await?;
        self.nmcli(&["connection", "up", profile.as_str()]).await.map(drop)
    }

    async fn scan_wifi(&self) -> Result<ScanResult, BackendError> {
        // NetworkManager refuses rescans issued too close together; the list
        // below still reflects the previous scan.
        if let Err(e) = self.nmcli(&["device", "wifi", "rescan"]).await {
            warn!("wifi rescan failed: {e}");
        }
        let out = self.nmcli(&["-t", "-f", "SSID,SIGNAL,SECURITY", "device", "wifi", "list"]).await?;
        Ok(ScanResult::now(parse_wifi_list(&out)))
    }

    async fn reboot(&self) -> Result<(), BackendError> {
        info!("rebooting");
        self.run("reboot", &[]).await.map(drop)
    }
}

/// Split one line of `nmcli -t` output into fields. Literal colons and
/// backslashes inside a field are escaped with a backslash.
fn split_terse(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => current.extend(chars.next()),
            ':' => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Values printed by `nmcli -g`: one per line, multi-valued fields joined
/// with ` | `.
fn split_values(out: &str) -> Vec<String> {
    out.lines()
        .flat_map(|line| line.split(" | "))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

fn address_part(cidr: &str) -> &str {
    cidr.split_once('/').map_or(cidr, |(ip, _)| ip)
}

/// `192.168.1.20/24` -> (`192.168.1.20`, `255.255.255.0`)
fn split_cidr(cidr: &str) -> (&str, Option<Ipv4Addr>) {
    match cidr.split_once('/') {
        Some((ip, bits)) => (ip, bits.parse().ok().and_then(prefix_to_netmask)),
        None => (cidr, None),
    }
}

fn parse_device_list(out: &str) -> Vec<NetInterface> {
    out.lines()
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let fields = split_terse(line);
            let kind = match fields.get(1).map(String::as_str) {
                Some("ethernet") => InterfaceKind::Ethernet,
                Some("wifi") => InterfaceKind::Wifi,
                _ => return None,
            };
            Some(NetInterface {
                device: fields[0].clone(),
                kind,
                connected: fields.get(2).is_some_and(|s| s == "connected"),
            })
        })
        .collect()
}

fn parse_wifi_list(out: &str) -> Vec<AccessPoint> {
    out.lines()
        .filter(|line| !line.is_empty())
        .map(|line| {
            let mut fields = split_terse(line).into_iter();
            let ssid = fields.next().unwrap_or_default();
            let signal = fields.next().and_then(|s| s.trim().parse().ok()).unwrap_or(0);
            let security = fields.next().unwrap_or_default();
            AccessPoint::new(ssid, signal, security)
        })
        .collect()
}
