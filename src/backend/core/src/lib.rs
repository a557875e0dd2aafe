//! # EnvLink Core
//!
//! Authorization and tenant-scope resolution engine for a multi-tenant
//! environmental-measurement platform. Measurement organizations and
//! their customer sites share one system; this crate decides who may
//! do what (a four-tier permission cascade), which customer data each
//! actor may see (scope calculation), and drives the approval-gated
//! lifecycles that connect the two sides:
//!
//! - **authz** — actors, roles, permission codes, the seeded template
//!   catalog, the permission resolver, and the visible-customer
//!   calculator
//! - **lifecycle** — connection and measurement-site (stack) state
//!   machines, including the approval cascade
//! - **store** — the in-memory transactional table set backing the
//!   engine
//! - **engine** — the permission-gated facade tying it all together
//! - **audit** / **notify** — post-commit effect sinks
//!
//! # Example
//!
//! ```rust,ignore
//! use envlink_core::prelude::*;
//!
//! let store = Arc::new(MemoryStore::new());
//! let engine = Engine::new(store);
//!
//! let requester = Actor::organization("u1", SystemRole::OrgAdmin, "org-1")?;
//! let conn = engine.request_connection(&requester, &customer_id, &org_id, None)?;
//!
//! let approver = Actor::site("u2", SystemRole::CustomerAdmin, "cust-1")?;
//! engine.approve_connection(&approver, &conn.id, None)?;
//! ```

pub mod audit;
pub mod authz;
pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod notify;
pub mod store;
pub mod telemetry;

pub use engine::Engine;
pub use error::{EngineError, ErrorCode, Result};

/// Common imports for engine users.
pub mod prelude {
    pub use crate::audit::{AuditAction, AuditEntry, AuditSink};
    pub use crate::authz::{
        AccessScope, AccessScopeCalculator, Actor, CustomRole, CustomerId, OrganizationId,
        PermissionCode, PermissionResolver, RoleTemplateCatalog, SystemRole, TemplateCode,
    };
    pub use crate::engine::Engine;
    pub use crate::error::{EngineError, ErrorCode, Result};
    pub use crate::lifecycle::{ApprovalOutcome, ConnectionLifecycle, StackLifecycle};
    pub use crate::notify::{NotificationEvent, Notifier};
    pub use crate::store::{
        Connection, ConnectionId, ConnectionStatus, ContractTerms, Customer, CustomerStatus,
        MemoryStore, ProposedCustomerData, Stack, StackAttrs, StackEdits, StackId, StackStatus,
    };
}
