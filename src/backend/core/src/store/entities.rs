//! Persisted entities: customers, connections, and measurement-site
//! (stack) records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::authz::{CustomerId, OrganizationId, UserId};

// ═══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ═══════════════════════════════════════════════════════════════════════════════

/// Strongly-typed connection identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub String);

impl ConnectionId {
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

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Strongly-typed stack identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StackId(pub String);

impl StackId {
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

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StackId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Customer
// ═══════════════════════════════════════════════════════════════════════════════

/// Customer record lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerStatus {
    /// Staged by an organization, not yet visible as a connected site.
    Draft,
    /// Promoted on first connection approval.
    Connected,
}

/// An industrial site being measured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub status: CustomerStatus,
    pub is_public: bool,
    /// Set when an organization created this record internally;
    /// grants that organization visibility independent of any
    /// connection.
    pub created_by_org: Option<OrganizationId>,

    // Profile fields fillable by a proposed-data merge.
    pub code: Option<String>,
    pub full_name: Option<String>,
    pub representative: Option<String>,
    pub address: Option<String>,
    pub business_type: Option<String>,
    pub industry: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(id: impl Into<CustomerId>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            status: CustomerStatus::Connected,
            is_public: true,
            created_by_org: None,
            code: None,
            full_name: None,
            representative: None,
            address: None,
            business_type: None,
            industry: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A draft customer staged internally by an organization.
    pub fn draft(
        id: impl Into<CustomerId>,
        name: impl Into<String>,
        created_by_org: impl Into<OrganizationId>,
    ) -> Self {
        let mut customer = Self::new(id, name);
        customer.status = CustomerStatus::Draft;
        customer.is_public = false;
        customer.created_by_org = Some(created_by_org.into());
        customer
    }
}

/// Partial customer-record patch carried on a connection request.
/// Merged field-by-field at approval, never overwriting populated
/// fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedCustomerData {
    pub code: Option<String>,
    pub full_name: Option<String>,
    pub representative: Option<String>,
    pub address: Option<String>,
    pub business_type: Option<String>,
    pub industry: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Connection
// ═══════════════════════════════════════════════════════════════════════════════

/// Connection lifecycle status. REJECTED and DISCONNECTED are
/// terminal; re-requesting inserts a fresh row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Pending,
    Approved,
    Rejected,
    Disconnected,
}

impl ConnectionStatus {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Disconnected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Disconnected => "DISCONNECTED",
        };
        write!(f, "{s}")
    }
}

/// Which side initiated the request. The approver is always the
/// counter-party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestedBy {
    Customer,
    Organization,
}

/// The approval-gated relationship record between one organization and
/// one customer. Unique per (customer, organization) among
/// non-terminal rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub customer_id: CustomerId,
    pub organization_id: OrganizationId,
    pub status: ConnectionStatus,
    pub requested_by: RequestedBy,
    pub proposed_data: Option<ProposedCustomerData>,
    pub contract_start: Option<NaiveDate>,
    pub contract_end: Option<NaiveDate>,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Connection {
    pub fn pending(
        customer_id: CustomerId,
        organization_id: OrganizationId,
        requested_by: RequestedBy,
        proposed_data: Option<ProposedCustomerData>,
    ) -> Self {
        Self {
            id: ConnectionId::generate(),
            customer_id,
            organization_id,
            status: ConnectionStatus::Pending,
            requested_by,
            proposed_data,
            contract_start: None,
            contract_end: None,
            approved_by: None,
            approved_at: None,
            created_at: Utc::now(),
        }
    }
}

/// Contract dates settable at approval time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractTerms {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Stack
// ═══════════════════════════════════════════════════════════════════════════════

/// Measurement-site record status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StackStatus {
    /// Staged by an organization ahead of connection approval.
    Draft,
    /// Awaiting the owning customer's review.
    PendingReview,
    /// Reviewed (or customer-registered directly).
    Confirmed,
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "DRAFT",
            Self::PendingReview => "PENDING_REVIEW",
            Self::Confirmed => "CONFIRMED",
        };
        write!(f, "{s}")
    }
}

/// A measurement site (stack) belonging to a customer.
///
/// `status` tracks whether the content has been reviewed; `is_verified`
/// tracks whether the customer has acknowledged the record. The two
/// are orthogonal facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    pub id: StackId,
    pub customer_id: CustomerId,
    pub site_code: String,
    pub site_name: String,
    pub location: Option<String>,
    pub height_m: Option<f64>,
    pub diameter_m: Option<f64>,
    pub status: StackStatus,
    /// Organization that staged this record, when it began as a draft.
    pub draft_created_by: Option<OrganizationId>,
    pub is_verified: bool,
    pub verified_by: Option<UserId>,
    pub verified_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<UserId>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Attributes supplied when creating a stack record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackAttrs {
    pub site_code: String,
    pub site_name: String,
    pub location: Option<String>,
    pub height_m: Option<f64>,
    pub diameter_m: Option<f64>,
}

impl Stack {
    /// An organization-staged draft.
    pub fn draft(
        customer_id: CustomerId,
        created_by: OrganizationId,
        attrs: StackAttrs,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: StackId::generate(),
            customer_id,
            site_code: attrs.site_code,
            site_name: attrs.site_name,
            location: attrs.location,
            height_m: attrs.height_m,
            diameter_m: attrs.diameter_m,
            status: StackStatus::Draft,
            draft_created_by: Some(created_by),
            is_verified: false,
            verified_by: None,
            verified_at: None,
            confirmed_by: None,
            confirmed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A customer self-registered stack: confirmed and verified
    /// immediately, since the customer is both creator and would-be
    /// reviewer.
    pub fn registered(customer_id: CustomerId, registered_by: UserId, attrs: StackAttrs) -> Self {
        let now = Utc::now();
        Self {
            id: StackId::generate(),
            customer_id,
            site_code: attrs.site_code,
            site_name: attrs.site_name,
            location: attrs.location,
            height_m: attrs.height_m,
            diameter_m: attrs.diameter_m,
            status: StackStatus::Confirmed,
            draft_created_by: None,
            is_verified: true,
            verified_by: Some(registered_by.clone()),
            verified_at: Some(now),
            confirmed_by: Some(registered_by),
            confirmed_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Optional per-field edits applied while confirming a stack.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StackEdits {
    pub site_code: Option<String>,
    pub site_name: Option<String>,
    pub location: Option<String>,
    pub height_m: Option<f64>,
    pub diameter_m: Option<f64>,
}

/// Before/after diff of one stack field, appended to the history log
/// whenever a confirm edit changes a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackFieldChange {
    pub stack_id: StackId,
    pub field: &'static str,
    pub previous: String,
    pub new_value: String,
    pub changed_by: UserId,
    pub changed_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
