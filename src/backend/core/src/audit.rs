//! Append-only audit log of state-changing actions.
//!
//! Every mutating engine operation appends exactly one entry after its
//! transaction commits. Appending is fire-and-forget: a slow or failed
//! sink must never roll back a committed transition.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::authz::{CustomerId, OrganizationId, UserId};
use crate::store::{ConnectionId, RequestedBy, StackId};

// ═══════════════════════════════════════════════════════════════════════════════
// Actions
// ═══════════════════════════════════════════════════════════════════════════════

/// One variant per audited action kind, with explicit fields. The
/// payload is serialized only at the sink boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditAction {
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
        draft_stacks_converted: usize,
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
    StackDraftCreated {
        stack_id: StackId,
        customer_id: CustomerId,
        organization_id: OrganizationId,
    },
    StackConfirmed {
        stack_id: StackId,
        customer_id: CustomerId,
        fields_changed: usize,
    },
    StackVerified {
        stack_id: StackId,
        customer_id: CustomerId,
    },
    StackRegistered {
        stack_id: StackId,
        customer_id: CustomerId,
    },
}

impl AuditAction {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ConnectionRequested { .. } => "connection.requested",
            Self::ConnectionApproved { .. } => "connection.approved",
            Self::ConnectionRejected { .. } => "connection.rejected",
            Self::ConnectionDisconnected { .. } => "connection.disconnected",
            Self::StackDraftCreated { .. } => "stack.draft_created",
            Self::StackConfirmed { .. } => "stack.confirmed",
            Self::StackVerified { .. } => "stack.verified",
            Self::StackRegistered { .. } => "stack.registered",
        }
    }

    pub const fn target_type(&self) -> &'static str {
        match self {
            Self::ConnectionRequested { .. }
            | Self::ConnectionApproved { .. }
            | Self::ConnectionRejected { .. }
            | Self::ConnectionDisconnected { .. } => "connection",
            Self::StackDraftCreated { .. }
            | Self::StackConfirmed { .. }
            | Self::StackVerified { .. }
            | Self::StackRegistered { .. } => "stack",
        }
    }

    pub fn target_id(&self) -> String {
        match self {
            Self::ConnectionRequested { connection_id, .. }
            | Self::ConnectionApproved { connection_id, .. }
            | Self::ConnectionRejected { connection_id, .. }
            | Self::ConnectionDisconnected { connection_id, .. } => connection_id.to_string(),
            Self::StackDraftCreated { stack_id, .. }
            | Self::StackConfirmed { stack_id, .. }
            | Self::StackVerified { stack_id, .. }
            | Self::StackRegistered { stack_id, .. } => stack_id.to_string(),
        }
    }
}

/// One appended, never-mutated audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub actor_id: UserId,
    pub action: AuditAction,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(actor_id: UserId, action: AuditAction) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            actor_id,
            action,
            timestamp: Utc::now(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Sinks
// ═══════════════════════════════════════════════════════════════════════════════

/// Consumer of audit entries. Fire-and-forget.
pub trait AuditSink: Send + Sync {
    fn append(&self, entry: AuditEntry);
}

/// Sink that emits one structured log line per entry.
#[derive(Debug, Clone, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn append(&self, entry: AuditEntry) {
        info!(
            target: "audit",
            actor = %entry.actor_id,
            action = entry.action.name(),
            target_type = entry.action.target_type(),
            target_id = %entry.action.target_id(),
            "AUDIT"
        );
    }
}

/// Buffered sink: entries go through a bounded channel drained by a
/// spawned task, keeping the append path non-blocking. Entries are
/// dropped with a warning when the buffer is full.
///
/// Must be constructed inside a tokio runtime.
#[derive(Debug, Clone)]
pub struct ChannelAuditSink {
    sender: mpsc::Sender<AuditEntry>,
}

impl ChannelAuditSink {
    pub fn new(buffer: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<AuditEntry>(buffer);
        tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                match serde_json::to_string(&entry) {
                    Ok(payload) => info!(target: "audit", %payload, "AUDIT"),
                    Err(e) => warn!("failed to serialize audit entry: {e}"),
                }
            }
        });
        Self { sender: tx }
    }
}

impl AuditSink for ChannelAuditSink {
    fn append(&self, entry: AuditEntry) {
        if let Err(e) = self.sender.try_send(entry) {
            warn!("audit entry dropped: {e}");
        }
    }
}

/// In-memory sink for tests.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&self, entry: AuditEntry) {
        self.entries.lock().push(entry);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_action() -> AuditAction {
        AuditAction::ConnectionApproved {
            connection_id: "conn-1".into(),
            customer_id: "cust-1".into(),
            organization_id: "org-1".into(),
            draft_stacks_converted: 2,
        }
    }

    #[test]
    fn test_action_targets() {
        let action = sample_action();
        assert_eq!(action.name(), "connection.approved");
        assert_eq!(action.target_type(), "connection");
        assert_eq!(action.target_id(), "conn-1");
    }

    #[test]
    fn test_entry_serializes_tagged() {
        let entry = AuditEntry::new("u1".into(), sample_action());
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"kind\":\"connection_approved\""));
        assert!(json.contains("\"draft_stacks_converted\":2"));
    }

    #[test]
    fn test_memory_sink_collects() {
        let sink = MemoryAuditSink::new();
        sink.append(AuditEntry::new("u1".into(), sample_action()));
        assert_eq!(sink.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_channel_sink_accepts_entries() {
        let sink = ChannelAuditSink::new(8);
        for _ in 0..4 {
            sink.append(AuditEntry::new("u1".into(), sample_action()));
        }
        // Drain task runs in the background; append never blocks.
    }
}
