use netcfg_proto::ChunkError;

use crate::service::ServiceError;

/// Startup and transport failures of the daemon
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("bluetooth: {0}")]
    Bluetooth(#[from] bluer::Error),
    #[error("invalid chunk size: {0}")]
    Chunk(#[from] ChunkError),
    #[error("service setup: {0}")]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
