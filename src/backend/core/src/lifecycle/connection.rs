//! Organization-customer connection lifecycle.
//!
//! `PENDING -> {APPROVED, REJECTED}`, `APPROVED -> DISCONNECTED`.
//! REJECTED and DISCONNECTED are terminal; a re-request inserts a new
//! row. Approval carries the cross-entity cascade: the approving
//! organization's draft stacks for the customer move to
//! PENDING_REVIEW inside the same transaction as the status flip.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use super::require_status;
use crate::authz::{Actor, CustomerId, OrganizationId, SystemRole};
use crate::error::{EngineError, Result};
use crate::store::{
    Connection, ConnectionId, ConnectionStatus, ContractTerms, Customer, CustomerStatus,
    MemoryStore, ProposedCustomerData, RequestedBy, StackId, StackStatus,
};

/// Result of an approval: the updated row plus the draft stacks the
/// cascade converted.
#[derive(Debug, Clone)]
pub struct ApprovalOutcome {
    pub connection: Connection,
    pub converted_stacks: Vec<StackId>,
}

/// State machine over connection rows. Cheap to clone.
#[derive(Clone)]
pub struct ConnectionLifecycle {
    store: Arc<MemoryStore>,
}

impl ConnectionLifecycle {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// Insert a PENDING row for the pair. Conflict when a PENDING or
    /// APPROVED row already exists; terminal rows stay behind and a
    /// fresh row is inserted instead.
    pub fn request(
        &self,
        initiator: &Actor,
        customer_id: &CustomerId,
        organization_id: &OrganizationId,
        proposed_data: Option<ProposedCustomerData>,
    ) -> Result<Connection> {
        let requested_by = if initiator.role.is_customer_side() {
            RequestedBy::Customer
        } else if initiator.role.is_organization_side() {
            RequestedBy::Organization
        } else {
            return Err(EngineError::validation(
                "connection requests are initiated by an organization or customer actor",
            ));
        };

        match requested_by {
            RequestedBy::Customer => {
                if initiator.customer_id.as_ref() != Some(customer_id) {
                    return Err(EngineError::forbidden(
                        "customer actors may only request connections for their own site",
                    ));
                }
            }
            RequestedBy::Organization => {
                if initiator.organization_id.as_ref() != Some(organization_id) {
                    return Err(EngineError::forbidden(
                        "organization actors may only request connections for their own organization",
                    ));
                }
            }
        }

        self.store.transaction(|t| {
            if !t.customers.contains_key(customer_id) {
                return Err(EngineError::not_found("customer", customer_id.as_str()));
            }
            if let Some(existing) = t.active_connection(customer_id, organization_id) {
                return Err(EngineError::conflict(format!(
                    "connection between {customer_id} and {organization_id} already exists ({})",
                    existing.status
                )));
            }

            let conn = Connection::pending(
                customer_id.clone(),
                organization_id.clone(),
                requested_by,
                proposed_data,
            );
            t.connections.insert(conn.id.clone(), conn.clone());
            info!(
                connection = %conn.id,
                customer = %customer_id,
                organization = %organization_id,
                requested_by = ?requested_by,
                "connection requested"
            );
            Ok(conn)
        })
    }

    /// Approve a PENDING row. In the same transaction: merge proposed
    /// data into empty customer fields, promote a DRAFT customer to
    /// CONNECTED and public, and convert this organization's DRAFT
    /// stacks for the customer to PENDING_REVIEW.
    pub fn approve(
        &self,
        approver: &Actor,
        connection_id: &ConnectionId,
        terms: Option<ContractTerms>,
    ) -> Result<ApprovalOutcome> {
        self.store.transaction(|t| {
            let conn = t
                .connections
                .get(connection_id)
                .cloned()
                .ok_or_else(|| EngineError::not_found("connection", connection_id.as_str()))?;
            require_status(
                "connection",
                connection_id.as_str(),
                conn.status,
                ConnectionStatus::Pending,
            )?;
            require_approving_side(approver, &conn)?;

            let now = Utc::now();
            let mut updated = conn.clone();
            updated.status = ConnectionStatus::Approved;
            updated.approved_by = Some(approver.id.clone());
            updated.approved_at = Some(now);
            if let Some(terms) = terms {
                if terms.start.is_some() {
                    updated.contract_start = terms.start;
                }
                if terms.end.is_some() {
                    updated.contract_end = terms.end;
                }
            }

            if let Some(customer) = t.customers.get_mut(&conn.customer_id) {
                if let Some(proposed) = &conn.proposed_data {
                    merge_proposed(customer, proposed);
                }
                if customer.status == CustomerStatus::Draft {
                    customer.status = CustomerStatus::Connected;
                    customer.is_public = true;
                }
                customer.updated_at = now;
            }

            let mut converted = Vec::new();
            for stack in t.stacks.values_mut() {
                if stack.customer_id == conn.customer_id
                    && stack.draft_created_by.as_ref() == Some(&conn.organization_id)
                    && stack.status == StackStatus::Draft
                {
                    stack.status = StackStatus::PendingReview;
                    stack.updated_at = now;
                    converted.push(stack.id.clone());
                }
            }

            t.connections.insert(connection_id.clone(), updated.clone());
            info!(
                connection = %connection_id,
                customer = %updated.customer_id,
                organization = %updated.organization_id,
                drafts_converted = converted.len(),
                "connection approved"
            );
            Ok(ApprovalOutcome {
                connection: updated,
                converted_stacks: converted,
            })
        })
    }

    /// Reject a PENDING row. Same side rule as approve, no cascade.
    pub fn reject(&self, approver: &Actor, connection_id: &ConnectionId) -> Result<Connection> {
        self.store.transaction(|t| {
            let conn = t
                .connections
                .get(connection_id)
                .cloned()
                .ok_or_else(|| EngineError::not_found("connection", connection_id.as_str()))?;
            require_status(
                "connection",
                connection_id.as_str(),
                conn.status,
                ConnectionStatus::Pending,
            )?;
            require_approving_side(approver, &conn)?;

            let mut updated = conn;
            updated.status = ConnectionStatus::Rejected;
            t.connections.insert(connection_id.clone(), updated.clone());
            info!(connection = %connection_id, "connection rejected");
            Ok(updated)
        })
    }

    /// Sever an APPROVED connection. Customer side (or system admin)
    /// only. Existing measurement data stays but drops out of the
    /// organization's visible set.
    pub fn disconnect(&self, actor: &Actor, connection_id: &ConnectionId) -> Result<Connection> {
        self.store.transaction(|t| {
            let conn = t
                .connections
                .get(connection_id)
                .cloned()
                .ok_or_else(|| EngineError::not_found("connection", connection_id.as_str()))?;
            require_status(
                "connection",
                connection_id.as_str(),
                conn.status,
                ConnectionStatus::Approved,
            )?;

            let customer_side = actor.role.is_customer_side()
                && actor.customer_id.as_ref() == Some(&conn.customer_id);
            if actor.role != SystemRole::SystemAdmin && !customer_side {
                return Err(EngineError::forbidden(
                    "only the customer side may sever an approved connection",
                ));
            }

            let mut updated = conn;
            updated.status = ConnectionStatus::Disconnected;
            t.connections.insert(connection_id.clone(), updated.clone());
            info!(connection = %connection_id, "connection disconnected");
            Ok(updated)
        })
    }
}

/// The approver is always the counter-party of the requester.
fn require_approving_side(approver: &Actor, conn: &Connection) -> Result<()> {
    if approver.role == SystemRole::SystemAdmin {
        return Ok(());
    }
    match conn.requested_by {
        RequestedBy::Customer => {
            if approver.role.is_organization_side()
                && approver.organization_id.as_ref() == Some(&conn.organization_id)
            {
                Ok(())
            } else {
                Err(EngineError::forbidden(
                    "a customer-initiated request is processed by the organization side",
                ))
            }
        }
        RequestedBy::Organization => {
            if approver.role.is_customer_side()
                && approver.customer_id.as_ref() == Some(&conn.customer_id)
            {
                Ok(())
            } else {
                Err(EngineError::forbidden(
                    "an organization-initiated request is processed by the customer side",
                ))
            }
        }
    }
}

/// First-write-wins field merge: proposed values fill fields that are
/// currently null or empty, and never overwrite populated ones.
fn merge_proposed(customer: &mut Customer, proposed: &ProposedCustomerData) {
    fn fill(slot: &mut Option<String>, value: &Option<String>) {
        let empty = slot.as_deref().map_or(true, |s| s.is_empty());
        if empty {
            if let Some(v) = value {
                *slot = Some(v.clone());
            }
        }
    }

    fill(&mut customer.code, &proposed.code);
    fill(&mut customer.full_name, &proposed.full_name);
    fill(&mut customer.representative, &proposed.representative);
    fill(&mut customer.address, &proposed.address);
    fill(&mut customer.business_type, &proposed.business_type);
    fill(&mut customer.industry, &proposed.industry);
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
