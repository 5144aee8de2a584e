//! netcfg BLE Controller
//!
//! BLE client for reading telemetry from, and configuring the network of,
//! netcfg devices.
//!
//! # Example
//!
//! ```ignore
//! use netcfg_ble_controller::ble::{self, Target};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // List nearby peripherals
//!     for device in ble::scan(ble::DEFAULT_SCAN_WINDOW).await? {
//!         println!("{} ({})", device.name, device.address);
//!     }
//!
//!     // Trigger a Wi-Fi scan and wait up to two seconds for notifications
//!     let target = Target::default();
//!     let scan = ble::scan_wifi(&target, std::time::Duration::from_secs(2)).await?;
//!     println!("{} access points", scan.into_inner().access_points.len());
//!
//!     Ok(())
//! }
//! ```

pub mod ble;
mod error;

pub use ble::{NetcfgDevice, Session, Target};
pub use error::ControllerError;
