//! Server Event Loop
//!
//! Transport callbacks do not touch service state. They send a [`GattRequest`]
//! through a [`ServiceHandle`] and await the reply; one owner task applies the
//! requests one at a time, in arrival order, each to completion. Backend calls
//! made by a write hold up the requests queued behind it, but not the rest of
//! the runtime, so notification forwarding keeps flushing.

use netcfg_proto::Slot;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::notify::{Notifier, NotifierId, NotifySink};
use crate::service::{GattService, ServiceError};

const REQUEST_QUEUE: usize = 32;

#[derive(Debug)]
pub enum GattRequest {
    Read {
        slot: Slot,
        offset: usize,
        reply: oneshot::Sender<Result<Vec<u8>, ServiceError>>,
    },
    Write {
        slot: Slot,
        value: Vec<u8>,
        reply: oneshot::Sender<Result<(), ServiceError>>,
    },
    Subscribe {
        slot: Slot,
        target: Option<Notifier>,
        reply: oneshot::Sender<Result<(), ServiceError>>,
    },
    Unsubscribe {
        slot: Slot,
        id: NotifierId,
        reply: oneshot::Sender<Result<bool, ServiceError>>,
    },
}

/// Cloneable entry point to the owner task
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    tx: mpsc::Sender<GattRequest>,
}

impl ServiceHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T, ServiceError>>) -> GattRequest,
    ) -> Result<T, ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(build(reply)).await.map_err(|_| ServiceError::Closed)?;
        rx.await.map_err(|_| ServiceError::Closed)?
    }

    pub async fn read(&self, slot: Slot, offset: usize) -> Result<Vec<u8>, ServiceError> {
        self.request(|reply| GattRequest::Read { slot, offset, reply }).await
    }

    /// Completes once the write handler has finished.
    pub async fn write(&self, slot: Slot, value: Vec<u8>) -> Result<(), ServiceError> {
        self.request(|reply| GattRequest::Write { slot, value, reply }).await
    }

    pub async fn subscribe(&self, slot: Slot, target: Option<Notifier>) -> Result<(), ServiceError> {
        self.request(|reply| GattRequest::Subscribe { slot, target, reply }).await
    }

    /// End session `id` unless a newer session has replaced it.
    pub async fn unsubscribe(&self, slot: Slot, id: NotifierId) -> Result<bool, ServiceError> {
        self.request(|reply| GattRequest::Unsubscribe { slot, id, reply }).await
    }

    /// Run one notify session for `slot`: register a fresh [`Notifier`] and
    /// hand every queued chunk to `sink` until the peer stops, delivery
    /// fails, or the service drops the target.
    pub async fn forward<N: NotifySink>(&self, slot: Slot, mut sink: N) -> Result<(), ServiceError> {
        let (target, mut rx) = Notifier::channel();
        let id = target.id();
        self.subscribe(slot, Some(target)).await?;
        info!(%slot, session = %id, "notifications enabled");

        let ended_by_peer = loop {
            let chunk = tokio::select! {
                _ = sink.stopped() => break true,
                chunk = rx.recv() => chunk,
            };
            // The service dropped this target, typically for a newer session.
            let Some(chunk) = chunk else { break false };
            if let Err(e) = sink.notify(chunk).await {
                warn!(%slot, "notification failed: {e}");
                break true;
            }
        };

        if ended_by_peer {
            info!(%slot, session = %id, "notifications disabled");
            // Fails any push still waiting on a full queue, so the owner task
            // is free to serve the unsubscribe.
            drop(rx);
            self.unsubscribe(slot, id).await?;
        }
        Ok(())
    }
}

/// The owner task's loop
pub struct EventLoop<S> {
    service: GattService<S>,
    rx: mpsc::Receiver<GattRequest>,
}

impl<S: Send + 'static> EventLoop<S> {
    pub fn new(service: GattService<S>) -> (Self, ServiceHandle) {
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE);
        (Self { service, rx }, ServiceHandle { tx })
    }

    /// Start the owner task. It ends, returning the service, when every
    /// handle has been dropped.
    pub fn spawn(service: GattService<S>) -> (ServiceHandle, JoinHandle<GattService<S>>) {
        let (event_loop, handle) = Self::new(service);
        (handle, tokio::spawn(event_loop.run()))
    }

    pub async fn run(mut self) -> GattService<S> {
        info!("service event loop started");
        while let Some(request) = self.rx.recv().await {
            self.handle(request).await;
        }
        info!("service event loop stopped");
        self.service
    }

    async fn handle(&mut self, request: GattRequest) {
        // A dropped reply means the transport gave up on the request; the
        // operation has still been applied.
        match request {
            GattRequest::Read { slot, offset, reply } => {
                let result = self.service.read(slot, offset).await;
                if let Err(e) = &result {
                    debug!(%slot, "read failed: {e}");
                }
                let _ = reply.send(result);
            }
            GattRequest::Write { slot, value, reply } => {
                let result = self.service.write(slot, value).await;
                let _ = reply.send(result);
            }
            GattRequest::Subscribe { slot, target, reply } => {
                let _ = reply.send(self.service.subscribe(slot, target));
            }
            GattRequest::Unsubscribe { slot, id, reply } => {
                let _ = reply.send(self.service.unsubscribe(slot, id));
            }
        }
    }
}
