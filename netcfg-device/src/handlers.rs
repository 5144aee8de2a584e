//! Binds the seven netcfg characteristics to [`Device`] operations

use futures::FutureExt;
use futures::future::BoxFuture;
use netcfg_proto::{Slot, to_json_bytes};
use serde::Serialize;

use crate::backend::{BackendError, NetworkBackend};
use crate::device::Device;
use crate::notify::Notifier;
use crate::service::{GattService, Handlers, ServiceError};

impl From<BackendError> for ServiceError {
    fn from(e: BackendError) -> Self {
        ServiceError::Handler(e.to_string())
    }
}

fn json<T: Serialize>(value: &T) -> Result<Vec<u8>, ServiceError> {
    to_json_bytes(value).map_err(|e| ServiceError::Handler(e.to_string()))
}

fn read_device_info<B: NetworkBackend>(d: &mut Device<B>) -> BoxFuture<'_, Result<Vec<u8>, ServiceError>> {
    async move { json(&d.device_info().await?) }.boxed()
}

// Device Info pushes nothing on its own; only the flag is kept.
fn subscribe_device_info<B: NetworkBackend>(d: &mut Device<B>, target: Option<Notifier>) {
    d.subscribe_device_info(target);
}

fn write_scan_control<B: NetworkBackend>(d: &mut Device<B>, value: Vec<u8>) -> BoxFuture<'_, ()> {
    async move { d.scan_control(&value).await }.boxed()
}

fn read_scan_result<B: NetworkBackend>(d: &mut Device<B>) -> BoxFuture<'_, Result<Vec<u8>, ServiceError>> {
    async move { json(&d.scan_result().await) }.boxed()
}

fn subscribe_scan_result<B: NetworkBackend>(d: &mut Device<B>, target: Option<Notifier>) {
    d.subscribe_scan_result(target);
}

fn read_wifi_config<B: NetworkBackend>(d: &mut Device<B>) -> BoxFuture<'_, Result<Vec<u8>, ServiceError>> {
    async move { json(&d.wifi_state().await?) }.boxed()
}

fn write_wifi_config<B: NetworkBackend>(d: &mut Device<B>, value: Vec<u8>) -> BoxFuture<'_, ()> {
    async move { d.write_wifi_config(&value).await }.boxed()
}

fn read_lan_config<B: NetworkBackend>(d: &mut Device<B>) -> BoxFuture<'_, Result<Vec<u8>, ServiceError>> {
    async move { json(&d.lan_report().await?) }.boxed()
}

fn write_lan_config<B: NetworkBackend>(d: &mut Device<B>, value: Vec<u8>) -> BoxFuture<'_, ()> {
    async move { d.write_lan_config(&value).await }.boxed()
}

fn write_action<B: NetworkBackend>(d: &mut Device<B>, value: Vec<u8>) -> BoxFuture<'_, ()> {
    async move { d.action(&value).await }.boxed()
}

fn read_status<B: NetworkBackend>(d: &mut Device<B>) -> BoxFuture<'_, Result<Vec<u8>, ServiceError>> {
    async move { json(d.status()) }.boxed()
}

fn subscribe_status<B: NetworkBackend>(d: &mut Device<B>, target: Option<Notifier>) {
    d.subscribe_status(target);
}

/// The netcfg service over `device`
pub fn netcfg_service<B: NetworkBackend + 'static>(
    device: Device<B>,
) -> Result<GattService<Device<B>>, ServiceError> {
    let mut service = GattService::new(device);
    for slot in Slot::ALL {
        let handlers = match slot {
            Slot::DeviceInfo => Handlers::new()
                .on_read(read_device_info::<B>)
                .on_subscribe(subscribe_device_info::<B>),
            Slot::ScanControl => Handlers::new().on_write(write_scan_control::<B>),
            Slot::ScanResult => Handlers::new()
                .on_read(read_scan_result::<B>)
                .on_subscribe(subscribe_scan_result::<B>),
            Slot::WifiConfig => Handlers::new()
                .on_read(read_wifi_config::<B>)
                .on_write(write_wifi_config::<B>),
            Slot::LanConfig => Handlers::new()
                .on_read(read_lan_config::<B>)
                .on_write(write_lan_config::<B>),
            Slot::Action => Handlers::new().on_write(write_action::<B>),
            Slot::Status => Handlers::new()
                .on_read(read_status::<B>)
                .on_subscribe(subscribe_status::<B>),
        };
        service.register(slot, slot.capabilities(), handlers)?;
    }
    Ok(service)
}
