//! Status Tracker: the one current operation status
//!
//! `publish` is the only way the status changes. Each publish replaces the
//! record (no history) and pushes it to the Status subscriber when there is
//! one.

use netcfg_proto::{ChunkCodec, OperationStatus};
use tracing::{info, warn};

use crate::notify::{Notifier, Subscription};

#[derive(Debug, Default)]
pub struct StatusTracker {
    current: OperationStatus,
    subscription: Subscription,
}

impl StatusTracker {
    pub fn current(&self) -> &OperationStatus {
        &self.current
    }

    pub fn subscribe(&mut self, target: Option<Notifier>) {
        self.subscription.set(target);
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_active()
    }

    pub async fn publish(&mut self, codec: &ChunkCodec, status: OperationStatus) {
        if status.ok {
            info!(op = ?status.op, stage = ?status.stage, "status");
        } else {
            warn!(op = ?status.op, stage = ?status.stage, err = ?status.err, "status");
        }
        self.current = status;
        if let Err(e) = self.subscription.push(codec, &self.current).await {
            warn!("failed to notify status: {e}");
        }
    }
}
