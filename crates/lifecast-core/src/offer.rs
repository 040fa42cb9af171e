//! Bounded-wait-then-drop delivery onto a queue.
//!
//! Every cross-task queue in Lifecast is bounded. A producer facing a full
//! queue waits a short, fixed time for space and then abandons the item.
//! Losing a message this way is normal operation, not an error: a stale
//! snapshot or a dropped cell injection costs far less than a stalled loop.
//!
//! The waits used by the workspace:
//!
//! | queue                       | capacity | wait                     |
//! |-----------------------------|----------|--------------------------|
//! | command stream              | 256      | `timing.command_offer_ms`  (50) |
//! | session inbound point-lists | 1        | `timing.inbound_offer_ms`  (100) |
//! | session outbound snapshots  | 1        | `timing.snapshot_offer_ms` (50) |

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;

/// Outcome of an [`offer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// The item is on the queue.
    Delivered,
    /// The queue stayed full for the whole wait; the item was discarded.
    Dropped,
    /// The consumer is gone; the item was discarded.
    Closed,
}

impl Offer {
    /// Whether the item reached the queue.
    pub const fn is_delivered(self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Put `item` on `tx`, waiting at most `wait` for space.
pub async fn offer<T>(tx: &mpsc::Sender<T>, item: T, wait: Duration) -> Offer {
    match tx.send_timeout(item, wait).await {
        Ok(()) => Offer::Delivered,
        Err(SendTimeoutError::Timeout(_)) => Offer::Dropped,
        Err(SendTimeoutError::Closed(_)) => Offer::Closed,
    }
}
