//! In-memory transactional store.
//!
//! Every lifecycle transition re-reads its precondition and writes
//! under one exclusive transaction, so the loser of a race on the same
//! row observes the changed status and fails with Conflict instead of
//! double-applying. The store handle is passed explicitly into the
//! engine and calculators; there are no module-level singletons.

pub mod entities;

pub use entities::{
    Connection, ConnectionId, ConnectionStatus, ContractTerms, Customer, CustomerStatus,
    ProposedCustomerData, RequestedBy, Stack, StackAttrs, StackEdits, StackFieldChange, StackId,
    StackStatus,
};

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::authz::{CustomRole, CustomerAssignment, PermissionCode, RoleId, UserId};
use crate::error::Result;

// ═══════════════════════════════════════════════════════════════════════════════
// Tables
// ═══════════════════════════════════════════════════════════════════════════════

/// The full table set. Cloneable so a transaction can work against a
/// private copy and commit it atomically.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub customers: HashMap<crate::authz::CustomerId, Customer>,
    pub connections: HashMap<ConnectionId, Connection>,
    pub stacks: HashMap<StackId, Stack>,
    /// Append-only per-field edit history.
    pub stack_history: Vec<StackFieldChange>,
    pub custom_roles: HashMap<RoleId, CustomRole>,
    /// Per-actor permission exceptions, highest precedence below the
    /// system bypass.
    pub user_overrides: HashMap<UserId, HashMap<PermissionCode, bool>>,
    pub assignments: Vec<CustomerAssignment>,
}

impl Tables {
    /// Non-terminal connection for a (customer, organization) pair, if
    /// one exists. At most one such row is permitted.
    pub fn active_connection(
        &self,
        customer_id: &crate::authz::CustomerId,
        organization_id: &crate::authz::OrganizationId,
    ) -> Option<&Connection> {
        self.connections.values().find(|c| {
            &c.customer_id == customer_id
                && &c.organization_id == organization_id
                && !c.status.is_terminal()
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MemoryStore
// ═══════════════════════════════════════════════════════════════════════════════

/// All tables behind one lock. `transaction` clones the table set,
/// runs the closure against the clone, and commits the clone only on
/// `Ok` — all-or-nothing, with preconditions re-read under the
/// exclusive lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a read-only closure under the shared lock.
    pub fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        f(&self.tables.read())
    }

    /// Run a mutating closure as one atomic transaction. On `Err` no
    /// row changes.
    pub fn transaction<T>(&self, f: impl FnOnce(&mut Tables) -> Result<T>) -> Result<T> {
        let mut guard = self.tables.write();
        let mut working = guard.clone();
        let out = f(&mut working)?;
        *guard = working;
        Ok(out)
    }

    /// Direct mutation for seeding fixtures and reference data.
    pub fn seed(&self, f: impl FnOnce(&mut Tables)) {
        f(&mut self.tables.write());
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
