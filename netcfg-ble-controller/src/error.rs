use netcfg_proto::async_io::FetchError;
use netcfg_proto::{ConfigError, IncompleteError, Slot};

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("bluetooth: {0}")]
    Ble(#[from] btleplug::Error),
    #[error("no Bluetooth adapter found")]
    NoAdapter,
    #[error("no netcfg device found ({0})")]
    NotFound(String),
    #[error("{0} characteristic not found")]
    MissingCharacteristic(Slot),
    #[error("invalid payload: {0}")]
    Payload(#[from] IncompleteError),
    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl From<FetchError<ControllerError>> for ControllerError {
    fn from(e: FetchError<ControllerError>) -> Self {
        match e {
            FetchError::Read(e) => e,
            FetchError::Decode(e) => ControllerError::Payload(e),
        }
    }
}
