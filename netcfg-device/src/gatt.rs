//! BlueZ transport: GATT application registration and advertising
//!
//! Every characteristic callback is translated into a request on the
//! [`ServiceHandle`]. A notify session runs [`ServiceHandle::forward`] with the
//! BlueZ notifier as its sink until the peer unsubscribes.

use async_trait::async_trait;
use bluer::adv::{Advertisement, AdvertisementHandle};
use bluer::gatt::local::{
    Application, ApplicationHandle, Characteristic, CharacteristicNotifier, CharacteristicNotify,
    CharacteristicNotifyMethod, CharacteristicRead, CharacteristicReadRequest, CharacteristicWrite,
    CharacteristicWriteMethod, CharacteristicWriteRequest, ReqError, Service,
};
use netcfg_proto::Slot;
use netcfg_proto::ble::SERVICE_UUID;
use tracing::{debug, info, warn};

use crate::error::DeviceError;
use crate::event_loop::ServiceHandle;
use crate::notify::NotifySink;
use crate::service::ServiceError;

impl From<ServiceError> for ReqError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::NotPermitted { .. } => ReqError::NotPermitted,
            ServiceError::InvalidOffset { .. } => ReqError::InvalidOffset,
            ServiceError::UnknownSlot(_) => ReqError::NotSupported,
            _ => ReqError::Failed,
        }
    }
}

/// Registered application and advertisement. Dropping it unregisters both.
pub struct GattServer {
    _app: ApplicationHandle,
    _adv: AdvertisementHandle,
}

/// Power the default adapter, register the service, and start advertising.
pub async fn serve(local_name: &str, handle: ServiceHandle) -> Result<GattServer, DeviceError> {
    let session = bluer::Session::new().await?;
    let adapter = session.default_adapter().await?;
    info!("using bluetooth adapter {}", adapter.name());
    if !adapter.is_powered().await? {
        adapter.set_powered(true).await?;
    }

    let app = Application {
        services: vec![Service {
            uuid: SERVICE_UUID,
            primary: true,
            characteristics: Slot::ALL.into_iter().map(|slot| characteristic(slot, &handle)).collect(),
            ..Default::default()
        }],
        ..Default::default()
    };
    let app = adapter.serve_gatt_application(app).await?;
    info!("gatt service {SERVICE_UUID} registered");

    let adv = Advertisement {
        service_uuids: vec![SERVICE_UUID].into_iter().collect(),
        discoverable: Some(true),
        local_name: Some(local_name.to_string()),
        ..Default::default()
    };
    let adv = adapter.advertise(adv).await?;
    info!("advertising as {local_name}");

    Ok(GattServer { _app: app, _adv: adv })
}

fn characteristic(slot: Slot, handle: &ServiceHandle) -> Characteristic {
    let caps = slot.capabilities();

    let read = caps.read.then(|| {
        let handle = handle.clone();
        CharacteristicRead {
            read: true,
            fun: Box::new(move |req: CharacteristicReadRequest| {
                let handle = handle.clone();
                Box::pin(async move {
                    debug!(%slot, offset = req.offset, mtu = req.mtu, "gatt read");
                    Ok(handle.read(slot, usize::from(req.offset)).await?)
                })
            }),
            ..Default::default()
        }
    });

    let write = caps.write.then(|| {
        let handle = handle.clone();
        CharacteristicWrite {
            write: true,
            write_without_response: true,
            method: CharacteristicWriteMethod::Fun(Box::new(
                move |value: Vec<u8>, req: CharacteristicWriteRequest| {
                    let handle = handle.clone();
                    Box::pin(async move {
                        if req.offset != 0 {
                            warn!(%slot, offset = req.offset, "partial writes are not supported");
                            return Err(ReqError::InvalidOffset);
                        }
                        Ok(handle.write(slot, value).await?)
                    })
                },
            )),
            ..Default::default()
        }
    });

    let notify = caps.notify.then(|| {
        let handle = handle.clone();
        CharacteristicNotify {
            notify: true,
            method: CharacteristicNotifyMethod::Fun(Box::new(move |notifier| {
                let handle = handle.clone();
                Box::pin(forward_notifications(slot, handle, notifier))
            })),
            ..Default::default()
        }
    });

    Characteristic { uuid: slot.uuid(), read, write, notify, ..Default::default() }
}

#[async_trait]
impl NotifySink for CharacteristicNotifier {
    type Error = bluer::Error;

    async fn stopped(&mut self) {
        CharacteristicNotifier::stopped(self).await
    }

    async fn notify(&mut self, chunk: Vec<u8>) -> Result<(), Self::Error> {
        CharacteristicNotifier::notify(self, chunk).await
    }
}

async fn forward_notifications(slot: Slot, handle: ServiceHandle, notifier: CharacteristicNotifier) {
    if let Err(e) = handle.forward(slot, notifier).await {
        warn!(%slot, "notify session failed: {e}");
    }
}
