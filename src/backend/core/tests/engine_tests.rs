//! End-to-end engine tests: permission gating, the approval cascade,
//! scope changes, and post-commit audit/notification effects.

use std::sync::Arc;

use envlink_core::audit::MemoryAuditSink;
use envlink_core::notify::{MemoryNotifier, NotificationEvent};
use envlink_core::prelude::*;

struct Harness {
    engine: Engine,
    store: Arc<MemoryStore>,
    audit: Arc<MemoryAuditSink>,
    notifier: Arc<MemoryNotifier>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    store.seed(|t| {
        t.customers
            .insert(CustomerId::new("c1"), Customer::new("c1", "Acme Steel"));
        t.customers
            .insert(CustomerId::new("c2"), Customer::new("c2", "Globex Cement"));
    });
    let audit = Arc::new(MemoryAuditSink::new());
    let notifier = Arc::new(MemoryNotifier::new());
    let engine = Engine::with_sinks(store.clone(), audit.clone(), notifier.clone());
    Harness {
        engine,
        store,
        audit,
        notifier,
    }
}

fn org_admin(org: &str) -> Actor {
    Actor::organization("admin@org", SystemRole::OrgAdmin, org).unwrap()
}

fn org_operator(org: &str) -> Actor {
    Actor::organization("op@org", SystemRole::OrgOperator, org).unwrap()
}

fn customer_admin(cust: &str) -> Actor {
    Actor::site("admin@site", SystemRole::CustomerAdmin, cust).unwrap()
}

fn customer_user(cust: &str) -> Actor {
    Actor::site("user@site", SystemRole::CustomerUser, cust).unwrap()
}

fn attrs(code: &str) -> StackAttrs {
    StackAttrs {
        site_code: code.into(),
        site_name: format!("{code} stack"),
        location: None,
        height_m: Some(30.0),
        diameter_m: Some(1.5),
    }
}

#[test]
fn approval_flow_end_to_end() {
    let h = harness();
    let requester = org_admin("o1");
    let approver = customer_admin("c1");

    let proposed = ProposedCustomerData {
        industry: Some("Steelmaking".into()),
        ..Default::default()
    };
    let conn = h
        .engine
        .request_connection(&requester, &"c1".into(), &"o1".into(), Some(proposed))
        .unwrap();
    assert_eq!(conn.status, ConnectionStatus::Pending);

    // The pending connection lets the organization stage drafts.
    h.engine
        .create_draft_stack(&requester, &"c1".into(), attrs("ST-01"))
        .unwrap();
    h.engine
        .create_draft_stack(&requester, &"c1".into(), attrs("ST-02"))
        .unwrap();

    // But grants no data visibility yet.
    assert!(!h
        .engine
        .visible_customers(&requester)
        .contains(&CustomerId::new("c1")));

    let outcome = h
        .engine
        .approve_connection(&approver, &conn.id, None)
        .unwrap();
    assert_eq!(outcome.connection.status, ConnectionStatus::Approved);
    assert_eq!(outcome.converted_stacks.len(), 2);

    // Now the customer is visible and the proposed data landed.
    assert!(h
        .engine
        .visible_customers(&requester)
        .contains(&CustomerId::new("c1")));
    let customer = h
        .store
        .read(|t| t.customers.get(&CustomerId::new("c1")).cloned().unwrap());
    assert_eq!(customer.industry.as_deref(), Some("Steelmaking"));

    // The converted stacks await the customer's review.
    let pending: Vec<_> = h
        .engine
        .visible_stacks(&approver)
        .into_iter()
        .filter(|s| s.status == StackStatus::PendingReview)
        .collect();
    assert_eq!(pending.len(), 2);
}

#[test]
fn cascade_converts_only_the_approved_organizations_drafts() {
    let h = harness();
    let org1 = org_admin("o1");
    let org2 = Actor::organization("admin2@org", SystemRole::OrgAdmin, "o2").unwrap();
    let approver = customer_admin("c1");

    let conn1 = h
        .engine
        .request_connection(&org1, &"c1".into(), &"o1".into(), None)
        .unwrap();
    h.engine
        .request_connection(&org2, &"c1".into(), &"o2".into(), None)
        .unwrap();

    let s1 = h
        .engine
        .create_draft_stack(&org1, &"c1".into(), attrs("ST-01"))
        .unwrap();
    let s2 = h
        .engine
        .create_draft_stack(&org1, &"c1".into(), attrs("ST-02"))
        .unwrap();
    let s3 = h
        .engine
        .create_draft_stack(&org2, &"c1".into(), attrs("ST-03"))
        .unwrap();

    let outcome = h
        .engine
        .approve_connection(&approver, &conn1.id, None)
        .unwrap();
    let converted: std::collections::HashSet<_> =
        outcome.converted_stacks.into_iter().collect();
    assert!(converted.contains(&s1.id));
    assert!(converted.contains(&s2.id));
    assert!(!converted.contains(&s3.id));

    // The other organization's draft is untouched.
    let s3_after = h.store.read(|t| t.stacks.get(&s3.id).cloned().unwrap());
    assert_eq!(s3_after.status, StackStatus::Draft);
}

#[test]
fn approve_is_not_repeatable() {
    let h = harness();
    let conn = h
        .engine
        .request_connection(&org_admin("o1"), &"c1".into(), &"o1".into(), None)
        .unwrap();
    let approver = customer_admin("c1");

    h.engine.approve_connection(&approver, &conn.id, None).unwrap();
    let err = h
        .engine
        .approve_connection(&approver, &conn.id, None)
        .unwrap_err();
    assert!(err.is_conflict());

    // Exactly one approval was audited.
    let approvals = h
        .audit
        .entries()
        .iter()
        .filter(|e| e.action.name() == "connection.approved")
        .count();
    assert_eq!(approvals, 1);
}

#[test]
fn permission_gate_rejects_unprivileged_roles() {
    let h = harness();

    // Operators enter measurements; they do not manage connections.
    let err = h
        .engine
        .request_connection(&org_operator("o1"), &"c1".into(), &"o1".into(), None)
        .unwrap_err();
    assert!(err.is_forbidden());

    // Customer users read data; they do not approve connections.
    let conn = h
        .engine
        .request_connection(&org_admin("o1"), &"c1".into(), &"o1".into(), None)
        .unwrap();
    let err = h
        .engine
        .approve_connection(&customer_user("c1"), &conn.id, None)
        .unwrap_err();
    assert!(err.is_forbidden());

    // Denied operations leave no audit trace.
    let names: Vec<_> = h
        .audit
        .entries()
        .iter()
        .map(|e| e.action.name())
        .collect();
    assert_eq!(names, vec!["connection.requested"]);
}

#[test]
fn notification_outage_does_not_roll_back() {
    let h = harness();
    let conn = h
        .engine
        .request_connection(&org_admin("o1"), &"c1".into(), &"o1".into(), None)
        .unwrap();

    h.notifier.fail_deliveries();
    let outcome = h
        .engine
        .approve_connection(&customer_admin("c1"), &conn.id, None)
        .unwrap();
    assert_eq!(outcome.connection.status, ConnectionStatus::Approved);

    // Committed despite zero deliveries.
    let stored = h
        .store
        .read(|t| t.connections.get(&conn.id).cloned().unwrap());
    assert_eq!(stored.status, ConnectionStatus::Approved);
}

#[test]
fn draft_stacks_stay_private_until_approval() {
    let h = harness();
    let org = org_admin("o1");
    let reviewer = customer_admin("c1");

    let conn = h
        .engine
        .request_connection(&org, &"c1".into(), &"o1".into(), None)
        .unwrap();
    let draft = h
        .engine
        .create_draft_stack(&org, &"c1".into(), attrs("ST-01"))
        .unwrap();

    // The customer cannot see or confirm the draft yet.
    assert!(h.engine.get_stack(&reviewer, &draft.id).is_err());
    let err = h
        .engine
        .confirm_stack(&reviewer, &draft.id, StackEdits::default())
        .unwrap_err();
    assert!(err.is_conflict());

    h.engine
        .approve_connection(&reviewer, &conn.id, None)
        .unwrap();
    let stack = h.engine.get_stack(&reviewer, &draft.id).unwrap();
    assert_eq!(stack.status, StackStatus::PendingReview);
}

#[test]
fn confirm_edits_are_recorded_in_history() {
    let h = harness();
    let org = org_admin("o1");
    let reviewer = customer_admin("c1");

    let conn = h
        .engine
        .request_connection(&org, &"c1".into(), &"o1".into(), None)
        .unwrap();
    let draft = h
        .engine
        .create_draft_stack(&org, &"c1".into(), attrs("ST-01"))
        .unwrap();
    h.engine
        .approve_connection(&reviewer, &conn.id, None)
        .unwrap();

    let edits = StackEdits {
        site_name: Some("Main kiln stack".into()),
        height_m: Some(42.0),
        ..Default::default()
    };
    let confirmed = h.engine.confirm_stack(&reviewer, &draft.id, edits).unwrap();
    assert_eq!(confirmed.status, StackStatus::Confirmed);
    assert_eq!(confirmed.site_name, "Main kiln stack");

    let history = h.engine.stack_history(&reviewer, &draft.id).unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().any(|c| c.field == "site_name"));
    assert!(history.iter().any(|c| c.field == "height_m"));
}

#[test]
fn directly_created_stack_skips_review() {
    let h = harness();
    let reviewer = customer_admin("c1");

    let stack = h
        .engine
        .create_direct_stack(&reviewer, &"c1".into(), attrs("ST-09"))
        .unwrap();
    assert_eq!(stack.status, StackStatus::Confirmed);
    assert!(stack.is_verified);

    // Verification already happened at creation.
    let err = h.engine.verify_stack(&reviewer, &stack.id).unwrap_err();
    assert!(err.is_conflict());
}

#[test]
fn disconnect_revokes_organization_visibility() {
    let h = harness();
    let org = org_admin("o1");
    let reviewer = customer_admin("c1");

    let conn = h
        .engine
        .request_connection(&org, &"c1".into(), &"o1".into(), None)
        .unwrap();
    h.engine
        .approve_connection(&reviewer, &conn.id, None)
        .unwrap();
    assert!(h
        .engine
        .visible_customers(&org)
        .contains(&CustomerId::new("c1")));

    // The organization side cannot sever.
    let err = h.engine.disconnect_connection(&org, &conn.id).unwrap_err();
    assert!(err.is_forbidden());

    h.engine.disconnect_connection(&reviewer, &conn.id).unwrap();
    assert!(!h
        .engine
        .visible_customers(&org)
        .contains(&CustomerId::new("c1")));

    // A fresh request starts a new row rather than reviving the old one.
    let again = h
        .engine
        .request_connection(&org, &"c1".into(), &"o1".into(), None)
        .unwrap();
    assert_ne!(again.id, conn.id);
    assert_eq!(again.status, ConnectionStatus::Pending);
}

#[test]
fn every_mutation_appends_one_audit_entry() {
    let h = harness();
    let org = org_admin("o1");
    let reviewer = customer_admin("c1");

    let conn = h
        .engine
        .request_connection(&org, &"c1".into(), &"o1".into(), None)
        .unwrap();
    let draft = h
        .engine
        .create_draft_stack(&org, &"c1".into(), attrs("ST-01"))
        .unwrap();
    h.engine
        .approve_connection(&reviewer, &conn.id, None)
        .unwrap();
    h.engine
        .confirm_stack(&reviewer, &draft.id, StackEdits::default())
        .unwrap();
    h.engine.verify_stack(&reviewer, &draft.id).unwrap();

    let names: Vec<_> = h
        .audit
        .entries()
        .iter()
        .map(|e| e.action.name())
        .collect();
    assert_eq!(
        names,
        vec![
            "connection.requested",
            "stack.draft_created",
            "connection.approved",
            "stack.confirmed",
            "stack.verified",
        ]
    );
}

#[test]
fn notifications_follow_the_approval_cascade() {
    let h = harness();
    let org = org_admin("o1");
    let reviewer = customer_admin("c1");

    let conn = h
        .engine
        .request_connection(&org, &"c1".into(), &"o1".into(), None)
        .unwrap();
    h.engine
        .create_draft_stack(&org, &"c1".into(), attrs("ST-01"))
        .unwrap();
    h.engine
        .approve_connection(&reviewer, &conn.id, None)
        .unwrap();

    let events = h.notifier.events();
    assert!(events
        .iter()
        .any(|e| matches!(e, NotificationEvent::ConnectionApproved { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, NotificationEvent::StacksAwaitingReview { count: 1, .. })));
}

#[test]
fn system_admin_bypasses_side_rules_but_not_preconditions() {
    let h = harness();
    let root = Actor::system("root");
    let conn = h
        .engine
        .request_connection(&org_admin("o1"), &"c1".into(), &"o1".into(), None)
        .unwrap();

    // Side rule bypassed.
    h.engine.approve_connection(&root, &conn.id, None).unwrap();

    // Status precondition still holds.
    let err = h.engine.approve_connection(&root, &conn.id, None).unwrap_err();
    assert!(err.is_conflict());
}
