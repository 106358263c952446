use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Plain `{"message": ...}` acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub mod user {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserView {
        pub id: Uuid,
        pub username: String,
        pub email: String,
        pub is_guest: bool,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Register {
        pub username: String,
        pub email: String,
        pub password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Login {
        /// Username or email.
        pub username: String,
        pub password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Token {
        pub access_token: String,
        pub token_type: String,
        /// Seconds until the token expires.
        pub expires_in: i64,
    }
}

pub mod membership {
    use super::*;

    /// Role of a member inside a group, highest privilege first.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum MemberRole {
        Owner,
        Admin,
        Editor,
        Contributor,
        Viewer,
        Guest,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberView {
        pub user_id: Uuid,
        pub username: String,
        pub role: MemberRole,
        pub joined_at: DateTime<Utc>,
    }

    /// Request body for `POST /groups/{id}/members`.
    ///
    /// `identifier` is an email, or a display name when `role` is `GUEST`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberAdd {
        pub identifier: String,
        pub role: MemberRole,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RoleUpdate {
        pub role: MemberRole,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberAdded {
        pub group: super::group::GroupView,
        pub invitation: Option<super::invitation::InvitationView>,
    }
}

pub mod group {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupNew {
        pub name: String,
        pub description: Option<String>,
    }

    /// Absent fields are left untouched; an empty description clears it.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct GroupUpdate {
        pub name: Option<String>,
        pub description: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupView {
        pub id: Uuid,
        pub name: String,
        pub description: Option<String>,
        pub created_by: Uuid,
        pub created_at: DateTime<Utc>,
        pub members: Vec<super::membership::MemberView>,
    }
}

pub mod invitation {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum InvitationStatus {
        Pending,
        Accepted,
        Rejected,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvitationView {
        pub id: Uuid,
        pub group_id: Uuid,
        pub group_name: String,
        pub inviter_id: Uuid,
        pub inviter_name: String,
        pub invitee_id: Option<Uuid>,
        pub invitee_email: String,
        pub role: super::membership::MemberRole,
        pub status: InvitationStatus,
        pub created_at: DateTime<Utc>,
        pub responded_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvitationResponse {
        pub accept: bool,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum TransactionKind {
        Debit,
        Credit,
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum SplitMode {
        #[default]
        Equal,
        Percentage,
        Amount,
    }

    /// One participant's share. `amount_minor` is read under `AMOUNT`,
    /// `percentage` under `PERCENTAGE`; `EQUAL` only needs `user_id`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SplitNew {
        pub user_id: Uuid,
        #[serde(default)]
        pub amount_minor: i64,
        pub percentage: Option<f64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub kind: TransactionKind,
        /// Must be > 0, in cents.
        pub amount_minor: i64,
        pub description: String,
        pub category: Option<String>,
        /// Defaults to now.
        pub occurred_at: Option<DateTime<Utc>>,
        /// Defaults to the author.
        pub payer_id: Option<Uuid>,
        #[serde(default)]
        pub split_mode: SplitMode,
        pub splits: Vec<SplitNew>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SplitView {
        pub user_id: Uuid,
        pub amount_minor: i64,
        pub percentage: Option<f64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub group_id: Uuid,
        pub kind: TransactionKind,
        pub amount_minor: i64,
        pub description: String,
        pub category: Option<String>,
        pub occurred_at: DateTime<Utc>,
        pub created_by: String,
        pub created_by_id: Uuid,
        pub payer_id: Option<Uuid>,
        pub split_mode: SplitMode,
        pub updated_at: DateTime<Utc>,
        pub splits: Vec<SplitView>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionList {
        pub limit: Option<u64>,
        /// Opaque pagination cursor, from `next_cursor`.
        pub cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
        /// Cursor for the next (older) page.
        pub next_cursor: Option<String>,
    }
}

pub mod balance {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceView {
        pub user_id: Uuid,
        pub username: String,
        pub role: super::membership::MemberRole,
        pub paid_minor: i64,
        pub received_minor: i64,
        pub balance_minor: i64,
    }
}
