//! Organization invites.

use super::object_marker;
use crate::{InviteId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Days an invite stays acceptable after it is sent.
pub const INVITE_TTL_DAYS: i64 = 21;

object_marker!(
    /// `"invite"`
    InviteObject::Invite = "invite"
);

object_marker!(
    /// `"invite_deleted"`
    InviteDeletedObject::InviteDeleted = "invite_deleted"
);

/// Organization role granted by an invite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteRole {
    User,
    Developer,
    Billing,
    Admin,
}

impl InviteRole {
    /// Every documented role.
    pub const ALL: [InviteRole; 4] = [
        InviteRole::User,
        InviteRole::Developer,
        InviteRole::Billing,
        InviteRole::Admin,
    ];

    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Developer => "developer",
            Self::Billing => "billing",
            Self::Admin => "admin",
        }
    }

    /// Look up a role by its wire name.
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == name)
    }
}

impl fmt::Display for InviteRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of an invite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    Accepted,
    Expired,
    Deleted,
    Pending,
}

impl InviteStatus {
    /// Every documented status.
    pub const ALL: [InviteStatus; 4] = [
        InviteStatus::Accepted,
        InviteStatus::Expired,
        InviteStatus::Deleted,
        InviteStatus::Pending,
    ];

    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Expired => "expired",
            Self::Deleted => "deleted",
            Self::Pending => "pending",
        }
    }
}

impl fmt::Display for InviteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An invitation to join the organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    pub id: InviteId,
    #[serde(rename = "type")]
    pub object: InviteObject,
    pub email: String,
    pub role: InviteRole,
    pub invited_at: Timestamp,
    pub expires_at: Timestamp,
    pub status: InviteStatus,
}

impl Invite {
    /// A fresh pending invite sent at `now`.
    #[must_use]
    pub fn pending(id: InviteId, email: String, role: InviteRole, now: Timestamp) -> Self {
        Self {
            id,
            object: InviteObject::Invite,
            email,
            role,
            invited_at: now,
            expires_at: now.plus_days(INVITE_TTL_DAYS),
            status: InviteStatus::Pending,
        }
    }

    /// Status as observed at `now`.
    ///
    /// A pending invite whose `expires_at` has passed reads as expired.
    #[must_use]
    pub fn status_at(&self, now: Timestamp) -> InviteStatus {
        match self.status {
            InviteStatus::Pending if self.expires_at <= now => InviteStatus::Expired,
            other => other,
        }
    }

    /// Copy of this invite with its status resolved at `now`.
    #[must_use]
    pub fn observed_at(&self, now: Timestamp) -> Self {
        Self {
            status: self.status_at(now),
            ..self.clone()
        }
    }
}

/// Body of `POST /v1/organizations/invites`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateInviteRequest {
    pub email: String,
    pub role: InviteRole,
}

/// Response of `DELETE /v1/organizations/invites/{invite_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteDeleted {
    pub id: InviteId,
    #[serde(rename = "type")]
    pub object: InviteDeletedObject,
}

impl InviteDeleted {
    #[must_use]
    pub fn new(id: InviteId) -> Self {
        Self {
            id,
            object: InviteDeletedObject::InviteDeleted,
        }
    }
}
