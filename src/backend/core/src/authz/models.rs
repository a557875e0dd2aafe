//! Authorization data models: identities, roles, scopes, permission
//! codes, custom roles, and per-actor overrides.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use chrono::{DateTime, Utc};

use super::templates::TemplateCode;
use crate::error::{EngineError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ═══════════════════════════════════════════════════════════════════════════════

/// Strongly-typed user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Strongly-typed organization identifier (a measurement-service firm).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganizationId(pub String);

impl OrganizationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrganizationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrganizationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Strongly-typed customer identifier (an industrial site being measured).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CustomerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CustomerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Strongly-typed custom-role identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleId(pub String);

impl RoleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RoleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Permission codes
// ═══════════════════════════════════════════════════════════════════════════════

/// A dot-separated permission code, e.g. `"measurement.read"` or
/// `"connection.approve"`.
///
/// Codes are always exact: wildcards are legal only in the per-role
/// baseline table, never in overrides or template defaults.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionCode(pub String);

impl PermissionCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first dot-separated segment, e.g. `"measurement"` for
    /// `"measurement.read"`.
    pub fn resource(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PermissionCode {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A baseline grant pattern. The coarse per-role baseline is the only
/// tier that understands wildcards; every finer-grained tier works on
/// exact codes to avoid surprising over-grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaselinePattern {
    /// `"*"` — grants every code.
    Any,
    /// `"foo.*"` — grants every code whose first segment is `foo`.
    Prefix(String),
    /// An exact code.
    Exact(PermissionCode),
}

impl BaselinePattern {
    pub fn parse(s: &str) -> Self {
        if s == "*" {
            Self::Any
        } else if let Some(prefix) = s.strip_suffix(".*") {
            Self::Prefix(prefix.to_string())
        } else {
            Self::Exact(PermissionCode::new(s))
        }
    }

    pub fn matches(&self, code: &PermissionCode) -> bool {
        match self {
            Self::Any => true,
            Self::Prefix(prefix) => code.resource() == prefix,
            Self::Exact(exact) => exact == code,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Roles and scopes
// ═══════════════════════════════════════════════════════════════════════════════

/// The five system-defined roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemRole {
    SystemAdmin,
    OrgAdmin,
    OrgOperator,
    CustomerAdmin,
    CustomerUser,
}

impl SystemRole {
    /// The data-visibility scope implied by this role.
    pub const fn default_scope(&self) -> AccessScope {
        match self {
            Self::SystemAdmin => AccessScope::System,
            Self::OrgAdmin | Self::OrgOperator => AccessScope::Organization,
            Self::CustomerAdmin | Self::CustomerUser => AccessScope::Site,
        }
    }

    pub const fn is_organization_side(&self) -> bool {
        matches!(self, Self::OrgAdmin | Self::OrgOperator)
    }

    pub const fn is_customer_side(&self) -> bool {
        matches!(self, Self::CustomerAdmin | Self::CustomerUser)
    }
}

impl fmt::Display for SystemRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SystemAdmin => "SYSTEM_ADMIN",
            Self::OrgAdmin => "ORG_ADMIN",
            Self::OrgOperator => "ORG_OPERATOR",
            Self::CustomerAdmin => "CUSTOMER_ADMIN",
            Self::CustomerUser => "CUSTOMER_USER",
        };
        write!(f, "{s}")
    }
}

/// Data-visibility scope of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessScope {
    /// All customer data (system administrators).
    System,
    /// An organization's connected customers.
    Organization,
    /// A single customer site.
    Site,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Actor
// ═══════════════════════════════════════════════════════════════════════════════

/// The authenticated party performing an operation.
///
/// Constructed only through the validating constructors, which reject
/// inconsistent role/scope/id combinations at the boundary. Invariant:
/// organization-side roles carry `organization_id` and no
/// `customer_id`; customer-side roles the reverse; system admins carry
/// neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: SystemRole,
    pub access_scope: AccessScope,
    pub organization_id: Option<OrganizationId>,
    pub customer_id: Option<CustomerId>,
    pub custom_role_id: Option<RoleId>,
}

impl Actor {
    /// Validating constructor covering all role families.
    pub fn new(
        id: UserId,
        role: SystemRole,
        organization_id: Option<OrganizationId>,
        customer_id: Option<CustomerId>,
    ) -> Result<Self> {
        match role {
            SystemRole::SystemAdmin => {
                if organization_id.is_some() || customer_id.is_some() {
                    return Err(EngineError::validation(
                        "system administrators carry no organization or customer id",
                    ));
                }
            }
            SystemRole::OrgAdmin | SystemRole::OrgOperator => {
                if organization_id.is_none() {
                    return Err(EngineError::validation(format!(
                        "{role} requires an organization id"
                    )));
                }
                if customer_id.is_some() {
                    return Err(EngineError::validation(format!(
                        "{role} must not carry a customer id"
                    )));
                }
            }
            SystemRole::CustomerAdmin | SystemRole::CustomerUser => {
                if customer_id.is_none() {
                    return Err(EngineError::validation(format!(
                        "{role} requires a customer id"
                    )));
                }
                if organization_id.is_some() {
                    return Err(EngineError::validation(format!(
                        "{role} must not carry an organization id"
                    )));
                }
            }
        }

        Ok(Self {
            id,
            access_scope: role.default_scope(),
            role,
            organization_id,
            customer_id,
            custom_role_id: None,
        })
    }

    /// A system administrator.
    pub fn system(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            role: SystemRole::SystemAdmin,
            access_scope: AccessScope::System,
            organization_id: None,
            customer_id: None,
            custom_role_id: None,
        }
    }

    /// An organization-side actor.
    pub fn organization(
        id: impl Into<UserId>,
        role: SystemRole,
        organization_id: impl Into<OrganizationId>,
    ) -> Result<Self> {
        if !role.is_organization_side() {
            return Err(EngineError::validation(format!(
                "{role} is not an organization-side role"
            )));
        }
        Self::new(id.into(), role, Some(organization_id.into()), None)
    }

    /// A customer-side actor.
    pub fn site(
        id: impl Into<UserId>,
        role: SystemRole,
        customer_id: impl Into<CustomerId>,
    ) -> Result<Self> {
        if !role.is_customer_side() {
            return Err(EngineError::validation(format!(
                "{role} is not a customer-side role"
            )));
        }
        Self::new(id.into(), role, None, Some(customer_id.into()))
    }

    /// Attach a custom role.
    pub fn with_custom_role(mut self, role_id: RoleId) -> Self {
        self.custom_role_id = Some(role_id);
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Custom roles and overrides
// ═══════════════════════════════════════════════════════════════════════════════

/// A custom role belongs to exactly one organization or one customer,
/// never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleOwner {
    Organization(OrganizationId),
    Customer(CustomerId),
}

/// An organization- or customer-defined role, optionally derived from a
/// seeded template, with exact-code permission overrides layered on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomRole {
    pub id: RoleId,
    pub name: String,
    pub owner: RoleOwner,
    /// Template the role was derived from, if any. Templates are
    /// seeded data and immutable once referenced.
    pub template: Option<TemplateCode>,
    /// Exact-code overrides: `true` grants, `false` revokes.
    pub overrides: HashMap<PermissionCode, bool>,
    pub created_at: DateTime<Utc>,
}

impl CustomRole {
    pub fn new(name: impl Into<String>, owner: RoleOwner, template: Option<TemplateCode>) -> Self {
        Self {
            id: RoleId::generate(),
            name: name.into(),
            owner,
            template,
            overrides: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Layer an override on top of the template defaults.
    pub fn with_override(mut self, code: impl Into<PermissionCode>, granted: bool) -> Self {
        self.overrides.insert(code.into(), granted);
        self
    }
}

/// Explicit customer grant for scope-restricted operators whose
/// visibility is "my assigned subset" rather than the whole
/// organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerAssignment {
    pub user_id: UserId,
    pub customer_id: CustomerId,
    pub is_primary: bool,
    pub assigned_at: DateTime<Utc>,
}

impl CustomerAssignment {
    pub fn new(user_id: impl Into<UserId>, customer_id: impl Into<CustomerId>) -> Self {
        Self {
            user_id: user_id.into(),
            customer_id: customer_id.into(),
            is_primary: false,
            assigned_at: Utc::now(),
        }
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_code_resource() {
        assert_eq!(PermissionCode::new("measurement.read").resource(), "measurement");
        assert_eq!(PermissionCode::new("flat").resource(), "flat");
    }

    #[test]
    fn test_baseline_pattern_parse() {
        assert_eq!(BaselinePattern::parse("*"), BaselinePattern::Any);
        assert_eq!(
            BaselinePattern::parse("customer.*"),
            BaselinePattern::Prefix("customer".to_string())
        );
        assert_eq!(
            BaselinePattern::parse("stack.read"),
            BaselinePattern::Exact(PermissionCode::new("stack.read"))
        );
    }

    #[test]
    fn test_baseline_pattern_matches() {
        let any = BaselinePattern::Any;
        assert!(any.matches(&PermissionCode::new("anything.goes")));

        let prefix = BaselinePattern::parse("customer.*");
        assert!(prefix.matches(&PermissionCode::new("customer.create")));
        assert!(prefix.matches(&PermissionCode::new("customer.delete")));
        assert!(!prefix.matches(&PermissionCode::new("customers.create")));
        assert!(!prefix.matches(&PermissionCode::new("stack.read")));

        let exact = BaselinePattern::parse("stack.read");
        assert!(exact.matches(&PermissionCode::new("stack.read")));
        assert!(!exact.matches(&PermissionCode::new("stack.update")));
    }

    #[test]
    fn test_actor_family_validation() {
        assert!(Actor::organization("u1", SystemRole::OrgAdmin, "org-1").is_ok());
        assert!(Actor::site("u2", SystemRole::CustomerAdmin, "cust-1").is_ok());

        // Role family mismatch.
        assert!(Actor::organization("u3", SystemRole::CustomerAdmin, "org-1").is_err());
        assert!(Actor::site("u4", SystemRole::OrgOperator, "cust-1").is_err());
    }

    #[test]
    fn test_actor_rejects_inconsistent_ids() {
        let err = Actor::new(
            UserId::new("u1"),
            SystemRole::CustomerAdmin,
            Some(OrganizationId::new("org-1")),
            Some(CustomerId::new("cust-1")),
        )
        .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::ValidationError);

        assert!(Actor::new(
            UserId::new("u2"),
            SystemRole::OrgAdmin,
            None,
            None,
        )
        .is_err());

        assert!(Actor::new(
            UserId::new("u3"),
            SystemRole::SystemAdmin,
            Some(OrganizationId::new("org-1")),
            None,
        )
        .is_err());
    }

    #[test]
    fn test_scope_follows_role() {
        let admin = Actor::system("root");
        assert_eq!(admin.access_scope, AccessScope::System);

        let op = Actor::organization("u1", SystemRole::OrgOperator, "org-1").unwrap();
        assert_eq!(op.access_scope, AccessScope::Organization);

        let viewer = Actor::site("u2", SystemRole::CustomerUser, "cust-1").unwrap();
        assert_eq!(viewer.access_scope, AccessScope::Site);
    }
}
