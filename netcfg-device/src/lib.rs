//! netcfg device library
//!
//! A BLE GATT server that lets a nearby client read telemetry, scan Wi-Fi, and
//! change Wi-Fi/LAN configuration of a headless Linux host.
//!
//! The pieces, leaf to root:
//! - [`service::GattService`]: characteristic table, capability checks, handlers
//! - [`status::StatusTracker`] and [`scan_cache::ScanCache`]: server state with
//!   chunked notifications
//! - [`Device`]: the state, plus the command dispatcher in `dispatch`
//! - [`event_loop::EventLoop`]: the single owner task all callbacks go through
//! - [`gatt`]: BlueZ registration and advertising
//!
//! # Example
//!
//! ```ignore
//! use netcfg_device::{Device, EventLoop, NmcliBackend, gatt, netcfg_service};
//! use netcfg_proto::ChunkCodec;
//!
//! let device = Device::new(NmcliBackend::new("wlan0", false), ChunkCodec::default(), stale);
//! let (handle, _task) = EventLoop::spawn(netcfg_service(device)?);
//! let _server = gatt::serve("rpi-netcfg-pi4", handle).await?;
//! ```

pub mod backend;
pub mod config;
mod device;
mod dispatch;
mod error;
pub mod event_loop;
pub mod gatt;
mod handlers;
pub mod notify;
pub mod scan_cache;
pub mod service;
pub mod status;

pub use backend::{BackendError, InterfaceKind, NetInterface, NetworkBackend, NmcliBackend};
pub use config::DeviceConfig;
pub use device::Device;
pub use error::DeviceError;
pub use event_loop::{EventLoop, GattRequest, ServiceHandle};
pub use handlers::netcfg_service;
pub use notify::Notifier;
pub use service::{GattService, Handlers, ServiceError};
