//! Command-line client for netcfg devices
//!
//! Finds a device over BLE, then reads telemetry or changes its Wi-Fi/LAN
//! configuration. Results are printed to stdout as JSON; logs go to stderr.

use std::time::Duration;

use clap::{Parser, Subcommand};
use netcfg_ble_controller::ble::{self, Target};
use netcfg_proto::ble::LOCAL_NAME_PREFIX;
use netcfg_proto::{Action, LanConfig, LanConfigRequest, WifiConfig, WifiConfigRequest};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "netcfg-ble")]
#[command(about = "Configure netcfg devices over BLE")]
struct Cli {
    /// Exact BLE address of the device
    #[arg(long, global = true)]
    addr: Option<String>,
    /// Device name to look for; any device advertising the netcfg service is
    /// used when no name matches
    #[arg(long, global = true, default_value = LOCAL_NAME_PREFIX)]
    name: String,
    /// Seconds to listen for advertisements
    #[arg(long, global = true, default_value = "6", value_parser = parse_secs)]
    scan_secs: Duration,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List nearby BLE devices
    List,
    /// Show device telemetry
    Devinfo,
    /// Follow operation status until Ctrl-C
    Status,
    /// Scan for Wi-Fi networks
    Scan {
        /// Seconds to wait for notifications (0: read only)
        #[arg(long, default_value = "2.0", value_parser = parse_secs)]
        wait: Duration,
    },
    /// Show the current Wi-Fi connection
    WifiGet,
    /// Send Wi-Fi credentials
    WifiSet {
        #[arg(long)]
        ssid: String,
        #[arg(long)]
        psk: Option<String>,
    },
    /// Show the IPv4 configuration of every interface
    LanGet,
    /// Send a LAN configuration
    LanSet {
        #[arg(long, value_parser = ["dhcp", "static"])]
        method: String,
        #[arg(long)]
        ip: Option<String>,
        #[arg(long)]
        mask: Option<String>,
        #[arg(long)]
        gw: Option<String>,
        /// Comma-separated DNS servers
        #[arg(long, value_delimiter = ',')]
        dns: Vec<String>,
        /// Interface to configure (default: the device's primary ethernet)
        #[arg(long)]
        device: Option<String>,
    },
    /// Send `apply` or `reboot`
    Action { action: Action },
}

fn parse_secs(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|e| format!("invalid seconds '{s}': {e}"))?;
    Duration::try_from_secs_f64(secs.max(0.0)).map_err(|e| format!("invalid seconds '{s}': {e}"))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let target = Target { addr: cli.addr, name: cli.name, scan_window: cli.scan_secs };

    match cli.command {
        Commands::List => {
            for device in ble::scan(target.scan_window).await? {
                let marker = if device.is_netcfg { " [NETCFG]" } else { "" };
                println!("{}\t{}{}", device.address, device.name, marker);
            }
        }
        Commands::Devinfo => print_json(&ble::device_info(&target).await?)?,
        Commands::Status => {
            info!("subscribed to status, press Ctrl-C to stop");
            let stop = async {
                let _ = tokio::signal::ctrl_c().await;
            };
            ble::watch_status(&target, stop, |status| match serde_json::to_string(&status) {
                Ok(line) => println!("[STATUS] {line}"),
                Err(e) => warn!("unprintable status: {e}"),
            })
            .await?;
        }
        Commands::Scan { wait } => {
            let delivered = ble::scan_wifi(&target, wait).await?;
            print_json(&delivered.into_inner())?;
        }
        Commands::WifiGet => print_json(&ble::wifi_get(&target).await?)?,
        Commands::WifiSet { ssid, psk } => {
            let config = WifiConfig::try_from(WifiConfigRequest { ssid: Some(ssid), psk })?;
            ble::wifi_set(&target, &config).await?;
            println!("Wi-Fi config sent.");
        }
        Commands::LanGet => print_json(&ble::lan_get(&target).await?)?,
        Commands::LanSet { method, ip, mask, gw, dns, device } => {
            // validated before any BLE work
            let request = LanConfigRequest { device, method: Some(method), ip, mask, gw, dns };
            let config = LanConfig::try_from(request)?;
            ble::lan_set(&target, &config).await?;
            println!("LAN config sent.");
        }
        Commands::Action { action } => {
            ble::action(&target, action).await?;
            println!("Command '{action}' sent.");
        }
    }

    Ok(())
}
