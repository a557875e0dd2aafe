//! Permission resolution.
//!
//! The resolver answers "may this actor perform capability C" with a
//! fixed four-tier cascade, first match wins:
//!
//! 1. system bypass (SYSTEM_ADMIN)
//! 2. actor-level override (exact code)
//! 3. custom-role override (exact code)
//! 4. role-template default (exact code)
//! 5. per-role system baseline (wildcard matching)
//!
//! Overrides must be able to both grant exceptions and revoke
//! defaults, so they are trusted before any wildcard-based default.
//! The check is a pure read and never errors: a lookup miss falls
//! through and ends in deny.

use std::sync::Arc;
use tracing::debug;

use super::models::{Actor, PermissionCode, SystemRole};
use super::templates::{baseline_patterns, RoleTemplateCatalog};
use crate::store::MemoryStore;

/// Four-tier permission resolver. Cheap to clone.
#[derive(Clone)]
pub struct PermissionResolver {
    store: Arc<MemoryStore>,
    catalog: Arc<RoleTemplateCatalog>,
}

impl PermissionResolver {
    pub fn new(store: Arc<MemoryStore>, catalog: Arc<RoleTemplateCatalog>) -> Self {
        Self { store, catalog }
    }

    /// Decide allow/deny for one capability. Closed by default.
    pub fn check(&self, actor: &Actor, code: &PermissionCode) -> bool {
        // Tier 1: system bypass.
        if actor.role == SystemRole::SystemAdmin {
            return true;
        }

        let allowed = self.store.read(|t| {
            // Tier 2: actor-level override, highest precedence.
            if let Some(overrides) = t.user_overrides.get(&actor.id) {
                if let Some(&granted) = overrides.get(code) {
                    debug!(actor = %actor.id, %code, granted, "user override matched");
                    return granted;
                }
            }

            // Tiers 3 and 4: custom role override, then template default.
            if let Some(role_id) = &actor.custom_role_id {
                if let Some(role) = t.custom_roles.get(role_id) {
                    if let Some(&granted) = role.overrides.get(code) {
                        debug!(actor = %actor.id, %code, granted, "role override matched");
                        return granted;
                    }
                    if let Some(template) = role.template {
                        if self.catalog.contains(template, code) {
                            return true;
                        }
                    }
                }
            }

            // Tier 5: system baseline, the only wildcard tier.
            baseline_patterns(actor.role)
                .iter()
                .any(|pattern| pattern.matches(code))
        });

        if !allowed {
            debug!(actor = %actor.id, role = %actor.role, %code, "permission denied");
        }
        allowed
    }

    /// True if the actor holds at least one of the given capabilities.
    pub fn check_any(&self, actor: &Actor, codes: &[PermissionCode]) -> bool {
        codes.iter().any(|code| self.check(actor, code))
    }

    /// True only if the actor holds every one of the given capabilities.
    pub fn check_all(&self, actor: &Actor, codes: &[PermissionCode]) -> bool {
        codes.iter().all(|code| self.check(actor, code))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::{CustomRole, CustomerId, RoleOwner, UserId};
    use crate::authz::templates::TemplateCode;
    use std::collections::HashMap;

    fn resolver(store: Arc<MemoryStore>) -> PermissionResolver {
        PermissionResolver::new(store, Arc::new(RoleTemplateCatalog::seeded()))
    }

    fn code(s: &str) -> PermissionCode {
        PermissionCode::new(s)
    }

    #[test]
    fn test_system_admin_bypasses_everything() {
        let r = resolver(Arc::new(MemoryStore::new()));
        let admin = Actor::system("root");
        assert!(r.check(&admin, &code("customer.delete")));
        assert!(r.check(&admin, &code("unknown.capability")));
    }

    #[test]
    fn test_baseline_wildcard_law() {
        let r = resolver(Arc::new(MemoryStore::new()));
        let org_admin = Actor::organization("u1", SystemRole::OrgAdmin, "org-1").unwrap();
        // "customer.*" grants every customer.<action> uniformly.
        assert!(r.check(&org_admin, &code("customer.create")));
        assert!(r.check(&org_admin, &code("customer.delete")));
        // Closed by default outside baseline resources.
        assert!(!r.check(&org_admin, &code("alert.manage")));
    }

    #[test]
    fn test_user_override_revokes_wildcard_grant() {
        let store = Arc::new(MemoryStore::new());
        store.seed(|t| {
            t.user_overrides
                .entry(UserId::new("u1"))
                .or_insert_with(HashMap::new)
                .insert(code("customer.delete"), false);
        });
        let r = resolver(store);
        let org_admin = Actor::organization("u1", SystemRole::OrgAdmin, "org-1").unwrap();

        // Baseline customer.* would grant it, but the per-user revoke wins.
        assert!(!r.check(&org_admin, &code("customer.delete")));
        // Sibling codes are untouched: overrides are exact, no wildcard.
        assert!(r.check(&org_admin, &code("customer.create")));
    }

    #[test]
    fn test_user_override_grants_exception() {
        let store = Arc::new(MemoryStore::new());
        store.seed(|t| {
            t.user_overrides
                .entry(UserId::new("u2"))
                .or_insert_with(HashMap::new)
                .insert(code("report.create"), true);
        });
        let r = resolver(store);
        let viewer = Actor::site("u2", SystemRole::CustomerUser, "cust-1").unwrap();

        assert!(r.check(&viewer, &code("report.create")));
        assert!(!r.check(&viewer, &code("report.delete")));
    }

    #[test]
    fn test_custom_role_override_beats_template_default() {
        let store = Arc::new(MemoryStore::new());
        let role = CustomRole::new(
            "restricted site admin",
            RoleOwner::Customer(CustomerId::new("cust-1")),
            Some(TemplateCode::CustomerSiteAdmin),
        )
        .with_override("connection.approve", false);
        let role_id = role.id.clone();
        store.seed(|t| {
            t.custom_roles.insert(role_id.clone(), role);
        });
        let r = resolver(store);

        let actor = Actor::site("u3", SystemRole::CustomerUser, "cust-1")
            .unwrap()
            .with_custom_role(role_id);

        // Template default would grant connection.approve; the role
        // override revokes it.
        assert!(!r.check(&actor, &code("connection.approve")));
        // Other template defaults still apply.
        assert!(r.check(&actor, &code("stack.update")));
    }

    #[test]
    fn test_template_default_grants_beyond_baseline() {
        let store = Arc::new(MemoryStore::new());
        let role = CustomRole::new(
            "site admin",
            RoleOwner::Customer(CustomerId::new("cust-1")),
            Some(TemplateCode::CustomerSiteAdmin),
        );
        let role_id = role.id.clone();
        store.seed(|t| {
            t.custom_roles.insert(role_id.clone(), role);
        });
        let r = resolver(store);

        // CUSTOMER_USER baseline has no stack.update; the template does.
        let actor = Actor::site("u4", SystemRole::CustomerUser, "cust-1")
            .unwrap()
            .with_custom_role(role_id);
        assert!(r.check(&actor, &code("stack.update")));
    }

    #[test]
    fn test_missing_custom_role_falls_through_closed() {
        let r = resolver(Arc::new(MemoryStore::new()));
        // Actor references a role that does not exist: deny, never allow.
        let actor = Actor::site("u5", SystemRole::CustomerUser, "cust-1")
            .unwrap()
            .with_custom_role("dangling-role".into());
        assert!(!r.check(&actor, &code("stack.update")));
        // Baseline still applies underneath.
        assert!(r.check(&actor, &code("stack.read")));
    }

    #[test]
    fn test_unknown_code_denied() {
        let r = resolver(Arc::new(MemoryStore::new()));
        let actor = Actor::site("u6", SystemRole::CustomerAdmin, "cust-1").unwrap();
        assert!(!r.check(&actor, &code("totally.unknown")));
    }

    #[test]
    fn test_check_any_and_all() {
        let r = resolver(Arc::new(MemoryStore::new()));
        let actor = Actor::site("u7", SystemRole::CustomerUser, "cust-1").unwrap();
        let read = code("stack.read");
        let update = code("stack.update");

        assert!(r.check_any(&actor, &[update.clone(), read.clone()]));
        assert!(!r.check_all(&actor, &[update, read]));
    }
}
