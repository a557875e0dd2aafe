//! Notification dispatch boundary.
//!
//! Events are emitted strictly after a transition's transaction has
//! committed. Delivery failures are logged and never propagate: a
//! broken mail relay must not roll back an approval.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::info;

use crate::authz::{CustomerId, OrganizationId};
use crate::store::{ConnectionId, RequestedBy, StackId};

// ═══════════════════════════════════════════════════════════════════════════════
// Events
// ═══════════════════════════════════════════════════════════════════════════════

/// One variant per post-commit notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationEvent {
    ConnectionRequested {
        connection_id: ConnectionId,
        customer_id: CustomerId,
        organization_id: OrganizationId,
        requested_by: RequestedBy,
    },
    ConnectionApproved {
        connection_id: ConnectionId,
        customer_id: CustomerId,
        organization_id: OrganizationId,
    },
    ConnectionRejected {
        connection_id: ConnectionId,
        customer_id: CustomerId,
        organization_id: OrganizationId,
    },
    ConnectionDisconnected {
        connection_id: ConnectionId,
        customer_id: CustomerId,
        organization_id: OrganizationId,
    },
    /// Sent to the customer when an approval converts staged drafts.
    StacksAwaitingReview {
        customer_id: CustomerId,
        organization_id: OrganizationId,
        count: usize,
    },
    StackConfirmed {
        stack_id: StackId,
        customer_id: CustomerId,
    },
    StackVerified {
        stack_id: StackId,
        customer_id: CustomerId,
    },
}

impl NotificationEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ConnectionRequested { .. } => "connection.requested",
            Self::ConnectionApproved { .. } => "connection.approved",
            Self::ConnectionRejected { .. } => "connection.rejected",
            Self::ConnectionDisconnected { .. } => "connection.disconnected",
            Self::StacksAwaitingReview { .. } => "stacks.awaiting_review",
            Self::StackConfirmed { .. } => "stack.confirmed",
            Self::StackVerified { .. } => "stack.verified",
        }
    }
}

/// Errors from a notification transport.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Unavailable(String),
}

/// Transport boundary. Implementations deliver (or enqueue) the event.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: NotificationEvent) -> Result<(), NotifyError>;
}

/// Notifier that only logs the event.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, event: NotificationEvent) -> Result<(), NotifyError> {
        info!(target: "notify", event = event.name(), "NOTIFY");
        Ok(())
    }
}

/// In-memory notifier for tests, optionally failing every delivery.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    events: Mutex<Vec<NotificationEvent>>,
    fail: AtomicBool,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent delivery fail.
    pub fn fail_deliveries(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().clone()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, event: NotificationEvent) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Unavailable("simulated outage".into()));
        }
        self.events.lock().push(event);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
