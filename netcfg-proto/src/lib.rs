//! netcfg wire protocol - GATT layout, payload types and chunked JSON framing
//!
//! Every characteristic carries UTF-8 JSON. Values larger than one
//! notification are split by [`chunk::ChunkCodec`] into raw byte chunks and
//! reassembled on the client by [`reassembly::Reassembler`].

pub mod ble;
pub mod chunk;
pub mod command;
pub mod netconfig;
pub mod reassembly;
pub mod scan;
pub mod status;
pub mod telemetry;

#[cfg(feature = "async")]
pub mod async_io;

pub use ble::{Capabilities, Capability, Slot};
pub use chunk::{ChunkCodec, ChunkError, IncompleteError, decode, to_json_bytes};
pub use command::{Action, ScanControl};
pub use netconfig::{
    ConfigError, LanConfig, LanConfigRequest, LanInterface, LanMethod, LanReport, WifiConfig,
    WifiConfigRequest, WifiState,
};
pub use reassembly::{Reassembler, ReassemblyState};
pub use scan::{AccessPoint, ScanResult};
pub use status::OperationStatus;
pub use telemetry::DeviceInfo;
