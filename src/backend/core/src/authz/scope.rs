//! Tenant-scope resolution.
//!
//! [`AccessScopeCalculator::visible_customers`] is the single place
//! deciding which customer records an actor may read or mutate.
//! Callers test membership of the target id against the returned set
//! rather than re-deriving scope logic ad hoc.

use std::collections::HashSet;
use std::sync::Arc;

use super::models::{AccessScope, Actor, CustomerId, SystemRole};
use crate::store::{ConnectionStatus, MemoryStore};

/// Computes the set of customers an actor may see. Cheap to clone.
#[derive(Clone)]
pub struct AccessScopeCalculator {
    store: Arc<MemoryStore>,
}

impl AccessScopeCalculator {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// The customer ids visible to this actor.
    ///
    /// - SYSTEM: every customer.
    /// - ORGANIZATION: an operator with at least one assignment sees
    ///   exactly the assigned subset; otherwise the organization's
    ///   APPROVED-connection customers plus the ones it created
    ///   internally. Non-APPROVED connections grant nothing, which is
    ///   what makes disconnected data read-only to the organization.
    /// - SITE: the actor's own customer.
    ///
    /// An actor with an inconsistent role/scope combination resolves
    /// to the empty set.
    pub fn visible_customers(&self, actor: &Actor) -> HashSet<CustomerId> {
        self.store.read(|t| match actor.access_scope {
            AccessScope::System => t.customers.keys().cloned().collect(),

            AccessScope::Organization => {
                let Some(org_id) = &actor.organization_id else {
                    return HashSet::new();
                };

                if actor.role == SystemRole::OrgOperator {
                    let assigned: HashSet<CustomerId> = t
                        .assignments
                        .iter()
                        .filter(|a| a.user_id == actor.id)
                        .map(|a| a.customer_id.clone())
                        .collect();
                    if !assigned.is_empty() {
                        return assigned;
                    }
                    // No assignment rows: fall back to the whole
                    // organization view.
                }

                let mut visible: HashSet<CustomerId> = t
                    .connections
                    .values()
                    .filter(|c| {
                        &c.organization_id == org_id && c.status == ConnectionStatus::Approved
                    })
                    .map(|c| c.customer_id.clone())
                    .collect();

                visible.extend(
                    t.customers
                        .values()
                        .filter(|c| c.created_by_org.as_ref() == Some(org_id))
                        .map(|c| c.id.clone()),
                );

                visible
            }

            AccessScope::Site => actor.customer_id.iter().cloned().collect(),
        })
    }

    /// Membership test for one target customer.
    pub fn can_access(&self, actor: &Actor, customer_id: &CustomerId) -> bool {
        self.visible_customers(actor).contains(customer_id)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
