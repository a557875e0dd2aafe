//! Seeded role templates and the per-role baseline permission table.
//!
//! Six templates ship with the system:
//!
//! | Template              | Side         | Description                                    |
//! |-----------------------|--------------|------------------------------------------------|
//! | org_admin             | Organization | Customer and staff management, full data read  |
//! | org_operator          | Organization | Measurement entry for assigned customers       |
//! | org_viewer            | Organization | Read-only (sales, support)                     |
//! | customer_group_admin  | Customer     | Group-wide read, user management, approvals    |
//! | customer_site_admin   | Customer     | Site data management and connection approval   |
//! | customer_user         | Customer     | Site data read only                            |

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::models::{BaselinePattern, PermissionCode, SystemRole};

// ═══════════════════════════════════════════════════════════════════════════════
// Permission code constants
// ═══════════════════════════════════════════════════════════════════════════════

/// The enumerable permission-code space.
pub mod codes {
    pub const CUSTOMER_CREATE: &str = "customer.create";
    pub const CUSTOMER_READ: &str = "customer.read";
    pub const CUSTOMER_UPDATE: &str = "customer.update";
    pub const CUSTOMER_DELETE: &str = "customer.delete";

    pub const USER_CREATE: &str = "user.create";
    pub const USER_READ: &str = "user.read";
    pub const USER_UPDATE: &str = "user.update";
    pub const USER_DELETE: &str = "user.delete";

    pub const MEASUREMENT_CREATE: &str = "measurement.create";
    pub const MEASUREMENT_READ: &str = "measurement.read";
    pub const MEASUREMENT_UPDATE: &str = "measurement.update";
    pub const MEASUREMENT_COMMENT: &str = "measurement.comment";

    pub const REPORT_CREATE: &str = "report.create";
    pub const REPORT_READ: &str = "report.read";

    pub const STACK_CREATE: &str = "stack.create";
    pub const STACK_READ: &str = "stack.read";
    pub const STACK_UPDATE: &str = "stack.update";

    pub const CONNECTION_REQUEST: &str = "connection.request";
    pub const CONNECTION_APPROVE: &str = "connection.approve";
    pub const CONNECTION_REJECT: &str = "connection.reject";
    pub const CONNECTION_DISCONNECT: &str = "connection.disconnect";

    pub const ORGANIZATION_UPDATE: &str = "organization.update";
    pub const ORGANIZATION_SETTINGS: &str = "organization.settings";

    pub const GROUP_READ: &str = "group.read";
    pub const ALERT_MANAGE: &str = "alert.manage";
}

// ═══════════════════════════════════════════════════════════════════════════════
// Template codes
// ═══════════════════════════════════════════════════════════════════════════════

/// The seeded role templates. Immutable once referenced by a custom
/// role; not user-editable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateCode {
    OrgAdmin,
    OrgOperator,
    OrgViewer,
    CustomerGroupAdmin,
    CustomerSiteAdmin,
    CustomerUser,
}

impl TemplateCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::OrgAdmin => "org_admin",
            Self::OrgOperator => "org_operator",
            Self::OrgViewer => "org_viewer",
            Self::CustomerGroupAdmin => "customer_group_admin",
            Self::CustomerSiteAdmin => "customer_site_admin",
            Self::CustomerUser => "customer_user",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "org_admin" => Some(Self::OrgAdmin),
            "org_operator" => Some(Self::OrgOperator),
            "org_viewer" => Some(Self::OrgViewer),
            "customer_group_admin" => Some(Self::CustomerGroupAdmin),
            "customer_site_admin" => Some(Self::CustomerSiteAdmin),
            "customer_user" => Some(Self::CustomerUser),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::OrgAdmin => "Organization Admin",
            Self::OrgOperator => "Organization Operator",
            Self::OrgViewer => "Organization Viewer",
            Self::CustomerGroupAdmin => "Customer Group Admin",
            Self::CustomerSiteAdmin => "Customer Site Admin",
            Self::CustomerUser => "Customer User",
        }
    }

    /// Default permission codes for this template. Exact codes only.
    pub fn default_permissions(&self) -> HashSet<PermissionCode> {
        use codes::*;
        let codes: &[&str] = match self {
            Self::OrgAdmin => &[
                CUSTOMER_CREATE,
                CUSTOMER_READ,
                CUSTOMER_UPDATE,
                CUSTOMER_DELETE,
                USER_CREATE,
                USER_READ,
                USER_UPDATE,
                USER_DELETE,
                MEASUREMENT_READ,
                REPORT_READ,
                REPORT_CREATE,
                STACK_READ,
                CONNECTION_APPROVE,
                CONNECTION_REJECT,
                CONNECTION_DISCONNECT,
                ORGANIZATION_UPDATE,
                ORGANIZATION_SETTINGS,
            ],
            Self::OrgOperator => &[
                CUSTOMER_READ,
                MEASUREMENT_CREATE,
                MEASUREMENT_UPDATE,
                MEASUREMENT_READ,
                STACK_READ,
                REPORT_READ,
            ],
            Self::OrgViewer => &[CUSTOMER_READ, MEASUREMENT_READ, REPORT_READ, STACK_READ],
            Self::CustomerGroupAdmin => &[
                MEASUREMENT_READ,
                REPORT_READ,
                STACK_READ,
                USER_CREATE,
                USER_READ,
                USER_UPDATE,
                GROUP_READ,
                CONNECTION_APPROVE,
            ],
            Self::CustomerSiteAdmin => &[
                MEASUREMENT_READ,
                REPORT_READ,
                STACK_READ,
                STACK_UPDATE,
                USER_CREATE,
                USER_READ,
                USER_UPDATE,
                CONNECTION_APPROVE,
            ],
            Self::CustomerUser => &[MEASUREMENT_READ, REPORT_READ, STACK_READ],
        };
        codes.iter().map(|c| PermissionCode::new(*c)).collect()
    }

    pub fn all() -> Vec<TemplateCode> {
        vec![
            Self::OrgAdmin,
            Self::OrgOperator,
            Self::OrgViewer,
            Self::CustomerGroupAdmin,
            Self::CustomerSiteAdmin,
            Self::CustomerUser,
        ]
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Catalog
// ═══════════════════════════════════════════════════════════════════════════════

/// Static catalog mapping a template code to its default permission
/// set. Seeded at construction; lookups are exact-code membership
/// tests.
#[derive(Debug, Clone)]
pub struct RoleTemplateCatalog {
    templates: HashMap<TemplateCode, HashSet<PermissionCode>>,
}

impl RoleTemplateCatalog {
    /// Build the catalog from the seeded templates.
    pub fn seeded() -> Self {
        let templates = TemplateCode::all()
            .into_iter()
            .map(|t| (t, t.default_permissions()))
            .collect();
        Self { templates }
    }

    pub fn default_permissions(&self, template: TemplateCode) -> Option<&HashSet<PermissionCode>> {
        self.templates.get(&template)
    }

    /// Exact-code membership test against a template's defaults.
    pub fn contains(&self, template: TemplateCode, code: &PermissionCode) -> bool {
        self.templates
            .get(&template)
            .is_some_and(|perms| perms.contains(code))
    }
}

impl Default for RoleTemplateCatalog {
    fn default() -> Self {
        Self::seeded()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// System baseline
// ═══════════════════════════════════════════════════════════════════════════════

/// The fixed per-role baseline permission table. This is the only tier
/// where wildcard patterns are meaningful.
pub fn baseline_patterns(role: SystemRole) -> Vec<BaselinePattern> {
    let patterns: &[&str] = match role {
        SystemRole::SystemAdmin => &["*"],
        SystemRole::OrgAdmin => &[
            "customer.*",
            "user.*",
            "measurement.*",
            "report.*",
            "stack.*",
            "item.*",
            "limit.*",
            "connection.*",
            "organization.*",
            "assignment.*",
        ],
        SystemRole::OrgOperator => &[
            "customer.read",
            "measurement.create",
            "measurement.update",
            "measurement.read",
            "stack.read",
            "item.read",
            "limit.read",
            "report.read",
        ],
        SystemRole::CustomerAdmin => &[
            "measurement.read",
            "measurement.comment",
            "report.read",
            "stack.read",
            "stack.update",
            "stack.create",
            "user.create",
            "user.read",
            "user.update",
            "connection.request",
            "connection.approve",
            "connection.reject",
            "connection.disconnect",
            "alert.manage",
        ],
        SystemRole::CustomerUser => &["measurement.read", "report.read", "stack.read"],
    };
    patterns.iter().map(|p| BaselinePattern::parse(p)).collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
