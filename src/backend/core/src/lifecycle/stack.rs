//! Measurement-site (stack) record lifecycle.
//!
//! Two entry paths: organizations stage DRAFT records ahead of a
//! connection approval (the approval cascade moves them to
//! PENDING_REVIEW), and customers register their own records directly
//! as CONFIRMED. Confirmation edits are diffed field by field into an
//! append-only history log.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use super::require_status;
use crate::authz::{Actor, CustomerId, SystemRole};
use crate::error::{EngineError, Result};
use crate::store::{
    MemoryStore, Stack, StackAttrs, StackEdits, StackFieldChange, StackId, StackStatus,
};

/// State machine over stack rows. Cheap to clone.
#[derive(Clone)]
pub struct StackLifecycle {
    store: Arc<MemoryStore>,
}

impl StackLifecycle {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// Stage a DRAFT record for a customer on behalf of the actor's
    /// organization. Permitted while the organization has a live
    /// connection row (PENDING or APPROVED) with the customer, or
    /// created the customer record internally.
    pub fn create_draft(
        &self,
        actor: &Actor,
        customer_id: &CustomerId,
        attrs: StackAttrs,
    ) -> Result<Stack> {
        let org_id = actor
            .organization_id
            .clone()
            .filter(|_| actor.role.is_organization_side())
            .ok_or_else(|| {
                EngineError::forbidden("draft stacks are staged by organization actors")
            })?;

        self.store.transaction(|t| {
            let customer = t
                .customers
                .get(customer_id)
                .ok_or_else(|| EngineError::not_found("customer", customer_id.as_str()))?;

            let internally_created = customer.created_by_org.as_ref() == Some(&org_id);
            if !internally_created && t.active_connection(customer_id, &org_id).is_none() {
                return Err(EngineError::forbidden(
                    "no live connection between the organization and this customer",
                ));
            }

            let stack = Stack::draft(customer_id.clone(), org_id.clone(), attrs);
            t.stacks.insert(stack.id.clone(), stack.clone());
            info!(stack = %stack.id, customer = %customer_id, organization = %org_id, "draft stack staged");
            Ok(stack)
        })
    }

    /// Create a record directly for the actor's own customer site. The
    /// customer is both creator and would-be reviewer, so the record is
    /// born CONFIRMED and verified.
    pub fn create_direct(
        &self,
        actor: &Actor,
        customer_id: &CustomerId,
        attrs: StackAttrs,
    ) -> Result<Stack> {
        let own_site = actor.role.is_customer_side()
            && actor.customer_id.as_ref() == Some(customer_id);
        if !own_site {
            return Err(EngineError::forbidden(
                "stacks are registered by the owning customer site",
            ));
        }

        self.store.transaction(|t| {
            if !t.customers.contains_key(customer_id) {
                return Err(EngineError::not_found("customer", customer_id.as_str()));
            }
            let stack = Stack::registered(customer_id.clone(), actor.id.clone(), attrs);
            t.stacks.insert(stack.id.clone(), stack.clone());
            info!(stack = %stack.id, customer = %customer_id, "stack registered");
            Ok(stack)
        })
    }

    /// Confirm a PENDING_REVIEW record as the owning customer,
    /// optionally editing fields. Each changed field appends one
    /// before/after entry to the history log in the same transaction.
    /// Returns the updated row and the number of fields changed.
    pub fn confirm(
        &self,
        actor: &Actor,
        stack_id: &StackId,
        edits: StackEdits,
    ) -> Result<(Stack, usize)> {
        self.store.transaction(|t| {
            let mut stack = t
                .stacks
                .get(stack_id)
                .cloned()
                .ok_or_else(|| EngineError::not_found("stack", stack_id.as_str()))?;
            require_status(
                "stack",
                stack_id.as_str(),
                stack.status,
                StackStatus::PendingReview,
            )?;
            require_owning_customer(actor, &stack)?;

            let now = Utc::now();
            let changes = apply_edits(&mut stack, &edits, &actor.id);
            let changed = changes.len();

            stack.status = StackStatus::Confirmed;
            stack.confirmed_by = Some(actor.id.clone());
            stack.confirmed_at = Some(now);
            stack.updated_at = now;

            t.stack_history.extend(changes);
            t.stacks.insert(stack_id.clone(), stack.clone());
            info!(stack = %stack_id, fields_changed = changed, "stack confirmed");
            Ok((stack, changed))
        })
    }

    /// Acknowledge a record as the owning customer. Verification is a
    /// separate fact from confirmation, independent of the record's
    /// status, and flips exactly once.
    pub fn verify(&self, actor: &Actor, stack_id: &StackId) -> Result<Stack> {
        self.store.transaction(|t| {
            let mut stack = t
                .stacks
                .get(stack_id)
                .cloned()
                .ok_or_else(|| EngineError::not_found("stack", stack_id.as_str()))?;
            require_owning_customer(actor, &stack)?;

            if stack.is_verified {
                return Err(EngineError::conflict(format!(
                    "stack {stack_id} is already verified"
                )));
            }

            let now = Utc::now();
            stack.is_verified = true;
            stack.verified_by = Some(actor.id.clone());
            stack.verified_at = Some(now);
            stack.updated_at = now;

            t.stacks.insert(stack_id.clone(), stack.clone());
            info!(stack = %stack_id, "stack verified");
            Ok(stack)
        })
    }
}

/// Review actions belong to the owning customer's users (or a system
/// admin).
fn require_owning_customer(actor: &Actor, stack: &Stack) -> Result<()> {
    if actor.role == SystemRole::SystemAdmin {
        return Ok(());
    }
    if actor.role.is_customer_side() && actor.customer_id.as_ref() == Some(&stack.customer_id) {
        return Ok(());
    }
    Err(EngineError::forbidden(
        "stack review actions belong to the owning customer",
    ))
}

/// Apply non-empty edits to the row, returning one change record per
/// field whose value actually changed.
fn apply_edits(stack: &mut Stack, edits: &StackEdits, changed_by: &crate::authz::UserId) -> Vec<StackFieldChange> {
    let now = Utc::now();
    let mut changes = Vec::new();

    let mut record = |field: &'static str, previous: String, new_value: String| {
        changes.push(StackFieldChange {
            stack_id: stack.id.clone(),
            field,
            previous,
            new_value,
            changed_by: changed_by.clone(),
            changed_at: now,
        });
    };

    if let Some(v) = &edits.site_code {
        if *v != stack.site_code {
            record("site_code", stack.site_code.clone(), v.clone());
            stack.site_code = v.clone();
        }
    }
    if let Some(v) = &edits.site_name {
        if *v != stack.site_name {
            record("site_name", stack.site_name.clone(), v.clone());
            stack.site_name = v.clone();
        }
    }
    if let Some(v) = &edits.location {
        if stack.location.as_deref() != Some(v.as_str()) {
            record(
                "location",
                stack.location.clone().unwrap_or_default(),
                v.clone(),
            );
            stack.location = Some(v.clone());
        }
    }
    if let Some(v) = edits.height_m {
        if stack.height_m != Some(v) {
            record(
                "height_m",
                stack.height_m.map(|h| h.to_string()).unwrap_or_default(),
                v.to_string(),
            );
            stack.height_m = Some(v);
        }
    }
    if let Some(v) = edits.diameter_m {
        if stack.diameter_m != Some(v) {
            record(
                "diameter_m",
                stack.diameter_m.map(|d| d.to_string()).unwrap_or_default(),
                v.to_string(),
            );
            stack.diameter_m = Some(v);
        }
    }

    changes
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
