//! Service Model: characteristic table and handler registry
//!
//! Each slot is registered with its capability set and exactly one handler per
//! capability. Operations outside the capability set are rejected here, before
//! any handler runs.
//!
//! Reads honour the ATT offset. A read at offset 0 runs the handler and stores
//! the value; a read at a non-zero offset (a long read continuing) slices the
//! stored value, so one long read never mixes two snapshots.

use std::collections::BTreeMap;

use futures::future::BoxFuture;
use netcfg_proto::{Capabilities, Capability, Slot};
use tracing::debug;

use crate::notify::{Notifier, NotifierId};

pub type ReadHandler<S> = for<'a> fn(&'a mut S) -> BoxFuture<'a, Result<Vec<u8>, ServiceError>>;
pub type WriteHandler<S> = for<'a> fn(&'a mut S, Vec<u8>) -> BoxFuture<'a, ()>;
pub type SubscribeHandler<S> = fn(&mut S, Option<Notifier>);

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("characteristic {0} is not registered")]
    UnknownSlot(Slot),
    #[error("characteristic {0} is already registered")]
    Duplicate(Slot),
    #[error("{slot} does not allow {capability}")]
    NotPermitted { slot: Slot, capability: Capability },
    #[error("{slot} registered without a {capability} handler")]
    MissingHandler { slot: Slot, capability: Capability },
    #[error("{slot} has a {capability} handler but not the capability")]
    UnexpectedHandler { slot: Slot, capability: Capability },
    #[error("offset {offset} is past the end of a {len} byte value")]
    InvalidOffset { offset: usize, len: usize },
    #[error("{0}")]
    Handler(String),
    #[error("service is not running")]
    Closed,
}

/// The handlers bound to one characteristic
pub struct Handlers<S> {
    read: Option<ReadHandler<S>>,
    write: Option<WriteHandler<S>>,
    subscribe: Option<SubscribeHandler<S>>,
}

impl<S> Default for Handlers<S> {
    fn default() -> Self {
        Self { read: None, write: None, subscribe: None }
    }
}

impl<S> Handlers<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_read(mut self, f: ReadHandler<S>) -> Self {
        self.read = Some(f);
        self
    }

    pub fn on_write(mut self, f: WriteHandler<S>) -> Self {
        self.write = Some(f);
        self
    }

    pub fn on_subscribe(mut self, f: SubscribeHandler<S>) -> Self {
        self.subscribe = Some(f);
        self
    }

    fn check(&self, slot: Slot, caps: Capabilities) -> Result<(), ServiceError> {
        let present = [
            (Capability::Read, self.read.is_some()),
            (Capability::Write, self.write.is_some()),
            (Capability::Notify, self.subscribe.is_some()),
        ];
        for (capability, has_handler) in present {
            match (caps.allows(capability), has_handler) {
                (true, false) => return Err(ServiceError::MissingHandler { slot, capability }),
                (false, true) => return Err(ServiceError::UnexpectedHandler { slot, capability }),
                _ => {}
            }
        }
        Ok(())
    }
}

struct Characteristic<S> {
    caps: Capabilities,
    handlers: Handlers<S>,
    value: Vec<u8>,
    subscriber: Option<NotifierId>,
}

/// The GATT service: registered characteristics plus the state their
/// handlers operate on
pub struct GattService<S> {
    state: S,
    characteristics: BTreeMap<Slot, Characteristic<S>>,
}

impl<S> GattService<S> {
    pub fn new(state: S) -> Self {
        Self { state, characteristics: BTreeMap::new() }
    }

    pub fn register(
        &mut self,
        slot: Slot,
        caps: Capabilities,
        handlers: Handlers<S>,
    ) -> Result<(), ServiceError> {
        if self.characteristics.contains_key(&slot) {
            return Err(ServiceError::Duplicate(slot));
        }
        handlers.check(slot, caps)?;
        self.characteristics.insert(
            slot,
            Characteristic { caps, handlers, value: Vec::new(), subscriber: None },
        );
        Ok(())
    }

    pub fn slots(&self) -> impl Iterator<Item = (Slot, Capabilities)> + '_ {
        self.characteristics.iter().map(|(slot, c)| (*slot, c.caps))
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn is_subscribed(&self, slot: Slot) -> bool {
        self.characteristics.get(&slot).is_some_and(|c| c.subscriber.is_some())
    }

    /// Last value produced by a read at offset 0
    pub fn value(&self, slot: Slot) -> Option<&[u8]> {
        self.characteristics.get(&slot).map(|c| c.value.as_slice())
    }

    fn entry(&mut self, slot: Slot, capability: Capability) -> Result<&mut Characteristic<S>, ServiceError> {
        let entry = self.characteristics.get_mut(&slot).ok_or(ServiceError::UnknownSlot(slot))?;
        if !entry.caps.allows(capability) {
            return Err(ServiceError::NotPermitted { slot, capability });
        }
        Ok(entry)
    }

    pub async fn read(&mut self, slot: Slot, offset: usize) -> Result<Vec<u8>, ServiceError> {
        let entry = self.entry(slot, Capability::Read)?;
        if offset > 0 {
            return entry
                .value
                .get(offset..)
                .map(<[u8]>::to_vec)
                .ok_or(ServiceError::InvalidOffset { offset, len: entry.value.len() });
        }

        let Some(read) = entry.handlers.read else {
            return Err(ServiceError::MissingHandler { slot, capability: Capability::Read });
        };
        let value = read(&mut self.state).await?;
        debug!(%slot, len = value.len(), "read");
        if let Some(entry) = self.characteristics.get_mut(&slot) {
            entry.value.clone_from(&value);
        }
        Ok(value)
    }

    pub async fn write(&mut self, slot: Slot, value: Vec<u8>) -> Result<(), ServiceError> {
        let entry = self.entry(slot, Capability::Write)?;
        let Some(write) = entry.handlers.write else {
            return Err(ServiceError::MissingHandler { slot, capability: Capability::Write });
        };
        debug!(%slot, len = value.len(), "write");
        write(&mut self.state, value).await;
        Ok(())
    }

    /// Record the subscriber flag and hand the delivery target to the handler.
    pub fn subscribe(&mut self, slot: Slot, target: Option<Notifier>) -> Result<(), ServiceError> {
        let entry = self.entry(slot, Capability::Notify)?;
        let Some(subscribe) = entry.handlers.subscribe else {
            return Err(ServiceError::MissingHandler { slot, capability: Capability::Notify });
        };
        entry.subscriber = target.as_ref().map(Notifier::id);
        debug!(%slot, subscriber = ?entry.subscriber, "subscription changed");
        subscribe(&mut self.state, target);
        Ok(())
    }

    /// End the session `id`, if it is still the registered subscriber.
    ///
    /// A session that has already been replaced leaves the newer one alone.
    pub fn unsubscribe(&mut self, slot: Slot, id: NotifierId) -> Result<bool, ServiceError> {
        let entry = self.entry(slot, Capability::Notify)?;
        if entry.subscriber != Some(id) {
            debug!(%slot, session = %id, "ignoring unsubscribe of a replaced session");
            return Ok(false);
        }
        self.subscribe(slot, None)?;
        Ok(true)
    }
}
