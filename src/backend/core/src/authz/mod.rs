//! Authorization and tenant-scope resolution.
//!
//! This module provides:
//! - **Models**: actors, roles, scopes, permission codes, custom roles
//! - **Templates**: the seeded role-template catalog and the per-role
//!   system baseline table
//! - **Resolver**: the four-tier permission cascade
//! - **Scope**: the visible-customer calculator for tenant isolation
//!
//! # Usage
//!
//! ```rust,ignore
//! use envlink_core::authz::{
//!     Actor, PermissionCode, PermissionResolver, RoleTemplateCatalog, SystemRole,
//! };
//!
//! let resolver = PermissionResolver::new(store, catalog);
//! let actor = Actor::organization("u1", SystemRole::OrgAdmin, "org-1")?;
//! let allowed = resolver.check(&actor, &PermissionCode::new("customer.read"));
//! ```

pub mod models;
pub mod resolver;
pub mod scope;
pub mod templates;

pub use models::{
    AccessScope, Actor, BaselinePattern, CustomRole, CustomerAssignment, CustomerId,
    OrganizationId, PermissionCode, RoleId, RoleOwner, SystemRole, UserId,
};
pub use resolver::PermissionResolver;
pub use scope::AccessScopeCalculator;
pub use templates::{baseline_patterns, codes, RoleTemplateCatalog, TemplateCode};
