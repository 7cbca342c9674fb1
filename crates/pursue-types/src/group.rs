//! Group and membership types

use serde::{Deserialize, Serialize};

/// Who can discover and join a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Listed; joining is auto-approved subject to the group limit
    Public,
    /// Invite only; joins wait for admin approval
    Private,
}

string_enum!(Visibility, "visibility", {
    Public => "public",
    Private => "private",
});

/// Role of a member within a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Member,
    Admin,
    Creator,
}

string_enum!(MemberRole, "member role", {
    Member => "member",
    Admin => "admin",
    Creator => "creator",
});

impl MemberRole {
    /// Whether the role may manage goals and members
    pub const fn can_manage(&self) -> bool {
        matches!(self, Self::Admin | Self::Creator)
    }
}

/// Approval status of a membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    /// Requested, waiting for an admin
    Pending,
    /// Approved member
    Active,
}

string_enum!(MembershipStatus, "membership status", {
    Pending => "pending",
    Active => "active",
});
