//! Engine facade: permission-gated entry points over the lifecycle
//! state machines.
//!
//! Every mutating operation follows the same shape: resolve the
//! actor's permission, run the transition inside a store transaction,
//! then append an audit entry and dispatch notifications. Audit and
//! notification run strictly after commit and never roll a committed
//! transition back.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

use crate::audit::{AuditAction, AuditEntry, AuditSink, TracingAuditSink};
use crate::authz::{
    codes, AccessScopeCalculator, Actor, CustomerId, OrganizationId, PermissionCode,
    PermissionResolver, RoleTemplateCatalog, SystemRole,
};
use crate::error::{EngineError, Result};
use crate::lifecycle::{ApprovalOutcome, ConnectionLifecycle, StackLifecycle};
use crate::notify::{NotificationEvent, Notifier, TracingNotifier};
use crate::store::{
    Connection, ConnectionId, ContractTerms, MemoryStore, ProposedCustomerData, Stack, StackAttrs,
    StackEdits, StackFieldChange, StackId, StackStatus,
};

/// The authorization and lifecycle engine. Construct one per store;
/// cheap to clone and share across tasks.
#[derive(Clone)]
pub struct Engine {
    store: Arc<MemoryStore>,
    resolver: PermissionResolver,
    scope: AccessScopeCalculator,
    connections: ConnectionLifecycle,
    stacks: StackLifecycle,
    audit: Arc<dyn AuditSink>,
    notifier: Arc<dyn Notifier>,
}

impl Engine {
    /// Engine with the seeded template catalog and log-only audit and
    /// notification sinks.
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self::with_sinks(
            store,
            Arc::new(TracingAuditSink),
            Arc::new(TracingNotifier),
        )
    }

    pub fn with_sinks(
        store: Arc<MemoryStore>,
        audit: Arc<dyn AuditSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let catalog = Arc::new(RoleTemplateCatalog::seeded());
        Self {
            resolver: PermissionResolver::new(store.clone(), catalog),
            scope: AccessScopeCalculator::new(store.clone()),
            connections: ConnectionLifecycle::new(store.clone()),
            stacks: StackLifecycle::new(store.clone()),
            store,
            audit,
            notifier,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Authorization queries
    // ═══════════════════════════════════════════════════════════════════════════

    /// Resolve one permission for an actor.
    pub fn check_permission(&self, actor: &Actor, code: &PermissionCode) -> bool {
        self.resolver.check(actor, code)
    }

    /// The customer ids this actor may see.
    pub fn visible_customers(&self, actor: &Actor) -> HashSet<CustomerId> {
        self.scope.visible_customers(actor)
    }

    fn require(&self, actor: &Actor, code: &str) -> Result<()> {
        let code = PermissionCode::new(code);
        if self.resolver.check(actor, &code) {
            Ok(())
        } else {
            Err(EngineError::forbidden(format!(
                "actor {} lacks permission {code}",
                actor.id
            )))
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Connection operations
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn request_connection(
        &self,
        actor: &Actor,
        customer_id: &CustomerId,
        organization_id: &OrganizationId,
        proposed_data: Option<ProposedCustomerData>,
    ) -> Result<Connection> {
        self.require(actor, codes::CONNECTION_REQUEST)?;
        let conn = self
            .connections
            .request(actor, customer_id, organization_id, proposed_data)?;

        self.record(
            actor,
            AuditAction::ConnectionRequested {
                connection_id: conn.id.clone(),
                customer_id: conn.customer_id.clone(),
                organization_id: conn.organization_id.clone(),
                requested_by: conn.requested_by,
            },
        );
        self.dispatch(NotificationEvent::ConnectionRequested {
            connection_id: conn.id.clone(),
            customer_id: conn.customer_id.clone(),
            organization_id: conn.organization_id.clone(),
            requested_by: conn.requested_by,
        });
        Ok(conn)
    }

    pub fn approve_connection(
        &self,
        actor: &Actor,
        connection_id: &ConnectionId,
        terms: Option<ContractTerms>,
    ) -> Result<ApprovalOutcome> {
        self.require(actor, codes::CONNECTION_APPROVE)?;
        let outcome = self.connections.approve(actor, connection_id, terms)?;
        let conn = &outcome.connection;

        self.record(
            actor,
            AuditAction::ConnectionApproved {
                connection_id: conn.id.clone(),
                customer_id: conn.customer_id.clone(),
                organization_id: conn.organization_id.clone(),
                draft_stacks_converted: outcome.converted_stacks.len(),
            },
        );
        self.dispatch(NotificationEvent::ConnectionApproved {
            connection_id: conn.id.clone(),
            customer_id: conn.customer_id.clone(),
            organization_id: conn.organization_id.clone(),
        });
        if !outcome.converted_stacks.is_empty() {
            self.dispatch(NotificationEvent::StacksAwaitingReview {
                customer_id: conn.customer_id.clone(),
                organization_id: conn.organization_id.clone(),
                count: outcome.converted_stacks.len(),
            });
        }
        Ok(outcome)
    }

    pub fn reject_connection(
        &self,
        actor: &Actor,
        connection_id: &ConnectionId,
    ) -> Result<Connection> {
        self.require(actor, codes::CONNECTION_REJECT)?;
        let conn = self.connections.reject(actor, connection_id)?;

        self.record(
            actor,
            AuditAction::ConnectionRejected {
                connection_id: conn.id.clone(),
                customer_id: conn.customer_id.clone(),
                organization_id: conn.organization_id.clone(),
            },
        );
        self.dispatch(NotificationEvent::ConnectionRejected {
            connection_id: conn.id.clone(),
            customer_id: conn.customer_id.clone(),
            organization_id: conn.organization_id.clone(),
        });
        Ok(conn)
    }

    pub fn disconnect_connection(
        &self,
        actor: &Actor,
        connection_id: &ConnectionId,
    ) -> Result<Connection> {
        self.require(actor, codes::CONNECTION_DISCONNECT)?;
        let conn = self.connections.disconnect(actor, connection_id)?;

        self.record(
            actor,
            AuditAction::ConnectionDisconnected {
                connection_id: conn.id.clone(),
                customer_id: conn.customer_id.clone(),
                organization_id: conn.organization_id.clone(),
            },
        );
        self.dispatch(NotificationEvent::ConnectionDisconnected {
            connection_id: conn.id.clone(),
            customer_id: conn.customer_id.clone(),
            organization_id: conn.organization_id.clone(),
        });
        Ok(conn)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Stack operations
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn create_draft_stack(
        &self,
        actor: &Actor,
        customer_id: &CustomerId,
        attrs: StackAttrs,
    ) -> Result<Stack> {
        self.require(actor, codes::STACK_CREATE)?;
        let stack = self.stacks.create_draft(actor, customer_id, attrs)?;

        if let Some(org_id) = &stack.draft_created_by {
            self.record(
                actor,
                AuditAction::StackDraftCreated {
                    stack_id: stack.id.clone(),
                    customer_id: stack.customer_id.clone(),
                    organization_id: org_id.clone(),
                },
            );
        }
        Ok(stack)
    }

    pub fn create_direct_stack(
        &self,
        actor: &Actor,
        customer_id: &CustomerId,
        attrs: StackAttrs,
    ) -> Result<Stack> {
        self.require(actor, codes::STACK_CREATE)?;
        let stack = self.stacks.create_direct(actor, customer_id, attrs)?;

        self.record(
            actor,
            AuditAction::StackRegistered {
                stack_id: stack.id.clone(),
                customer_id: stack.customer_id.clone(),
            },
        );
        Ok(stack)
    }

    pub fn confirm_stack(
        &self,
        actor: &Actor,
        stack_id: &StackId,
        edits: StackEdits,
    ) -> Result<Stack> {
        self.require(actor, codes::STACK_UPDATE)?;
        let (stack, fields_changed) = self.stacks.confirm(actor, stack_id, edits)?;

        self.record(
            actor,
            AuditAction::StackConfirmed {
                stack_id: stack.id.clone(),
                customer_id: stack.customer_id.clone(),
                fields_changed,
            },
        );
        self.dispatch(NotificationEvent::StackConfirmed {
            stack_id: stack.id.clone(),
            customer_id: stack.customer_id.clone(),
        });
        Ok(stack)
    }

    pub fn verify_stack(&self, actor: &Actor, stack_id: &StackId) -> Result<Stack> {
        self.require(actor, codes::STACK_UPDATE)?;
        let stack = self.stacks.verify(actor, stack_id)?;

        self.record(
            actor,
            AuditAction::StackVerified {
                stack_id: stack.id.clone(),
                customer_id: stack.customer_id.clone(),
            },
        );
        self.dispatch(NotificationEvent::StackVerified {
            stack_id: stack.id.clone(),
            customer_id: stack.customer_id.clone(),
        });
        Ok(stack)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Scoped reads
    // ═══════════════════════════════════════════════════════════════════════════

    /// Stacks within the actor's visible customer set. DRAFT rows stay
    /// private to the staging organization until the approval cascade
    /// surfaces them.
    pub fn visible_stacks(&self, actor: &Actor) -> Vec<Stack> {
        let visible = self.scope.visible_customers(actor);
        self.store.read(|t| {
            let mut stacks: Vec<Stack> = t
                .stacks
                .values()
                .filter(|s| visible.contains(&s.customer_id))
                .filter(|s| {
                    s.status != StackStatus::Draft
                        || actor.role == SystemRole::SystemAdmin
                        || s.draft_created_by == actor.organization_id
                })
                .cloned()
                .collect();
            stacks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            stacks
        })
    }

    /// One stack by id, subject to the same visibility rule.
    pub fn get_stack(&self, actor: &Actor, stack_id: &StackId) -> Result<Stack> {
        self.visible_stacks(actor)
            .into_iter()
            .find(|s| &s.id == stack_id)
            .ok_or_else(|| EngineError::not_found("stack", stack_id.as_str()))
    }

    /// Edit history for one visible stack, oldest first.
    pub fn stack_history(&self, actor: &Actor, stack_id: &StackId) -> Result<Vec<StackFieldChange>> {
        self.get_stack(actor, stack_id)?;
        Ok(self.store.read(|t| {
            t.stack_history
                .iter()
                .filter(|c| &c.stack_id == stack_id)
                .cloned()
                .collect()
        }))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Post-commit effects
    // ═══════════════════════════════════════════════════════════════════════════

    fn record(&self, actor: &Actor, action: AuditAction) {
        self.audit.append(AuditEntry::new(actor.id.clone(), action));
    }

    fn dispatch(&self, event: NotificationEvent) {
        if let Err(e) = self.notifier.notify(event) {
            warn!("notification delivery failed: {e}");
        }
    }
}
