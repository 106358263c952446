//! Conversions between engine types and their wire representation.

use api_types::{
    balance::BalanceView,
    group::GroupView,
    invitation::{InvitationStatus as ApiStatus, InvitationView},
    membership::{MemberRole as ApiRole, MemberView},
    transaction::{SplitMode as ApiSplitMode, SplitView, TransactionKind as ApiKind, TransactionView},
    user::UserView,
};
use engine::{
    Group, Invitation, InvitationStatus, Member, MemberBalance, MemberRole, SplitMode, Transaction,
    TransactionKind, User,
};

pub fn role_to_api(role: MemberRole) -> ApiRole {
    match role {
        MemberRole::Owner => ApiRole::Owner,
        MemberRole::Admin => ApiRole::Admin,
        MemberRole::Editor => ApiRole::Editor,
        MemberRole::Contributor => ApiRole::Contributor,
        MemberRole::Viewer => ApiRole::Viewer,
        MemberRole::Guest => ApiRole::Guest,
    }
}

pub fn role_from_api(role: ApiRole) -> MemberRole {
    match role {
        ApiRole::Owner => MemberRole::Owner,
        ApiRole::Admin => MemberRole::Admin,
        ApiRole::Editor => MemberRole::Editor,
        ApiRole::Contributor => MemberRole::Contributor,
        ApiRole::Viewer => MemberRole::Viewer,
        ApiRole::Guest => MemberRole::Guest,
    }
}

pub fn kind_from_api(kind: ApiKind) -> TransactionKind {
    match kind {
        ApiKind::Debit => TransactionKind::Debit,
        ApiKind::Credit => TransactionKind::Credit,
    }
}

pub fn split_mode_from_api(mode: ApiSplitMode) -> SplitMode {
    match mode {
        ApiSplitMode::Equal => SplitMode::Equal,
        ApiSplitMode::Percentage => SplitMode::Percentage,
        ApiSplitMode::Amount => SplitMode::Amount,
    }
}

pub fn user(user: User) -> UserView {
    UserView {
        id: user.id,
        username: user.username,
        email: user.email,
        is_guest: user.is_guest,
        created_at: user.created_at,
    }
}

pub fn member(member: Member) -> MemberView {
    MemberView {
        user_id: member.user_id,
        username: member.username,
        role: role_to_api(member.role),
        joined_at: member.joined_at,
    }
}

pub fn group(group: Group) -> GroupView {
    GroupView {
        id: group.id,
        name: group.name,
        description: group.description,
        created_by: group.created_by,
        created_at: group.created_at,
        members: group.members.into_iter().map(member).collect(),
    }
}

pub fn invitation(invitation: Invitation) -> InvitationView {
    InvitationView {
        id: invitation.id,
        group_id: invitation.group_id,
        group_name: invitation.group_name,
        inviter_id: invitation.inviter_id,
        inviter_name: invitation.inviter_name,
        invitee_id: invitation.invitee_id,
        invitee_email: invitation.invitee_email,
        role: role_to_api(invitation.role),
        status: match invitation.status {
            InvitationStatus::Pending => ApiStatus::Pending,
            InvitationStatus::Accepted => ApiStatus::Accepted,
            InvitationStatus::Rejected => ApiStatus::Rejected,
        },
        created_at: invitation.created_at,
        responded_at: invitation.responded_at,
    }
}

pub fn transaction(tx: Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        group_id: tx.group_id,
        kind: match tx.kind {
            TransactionKind::Debit => ApiKind::Debit,
            TransactionKind::Credit => ApiKind::Credit,
        },
        amount_minor: tx.amount_minor,
        description: tx.description,
        category: tx.category,
        occurred_at: tx.occurred_at,
        created_by: tx.created_by,
        created_by_id: tx.created_by_id,
        payer_id: tx.payer_id,
        split_mode: match tx.split_mode {
            SplitMode::Equal => ApiSplitMode::Equal,
            SplitMode::Percentage => ApiSplitMode::Percentage,
            SplitMode::Amount => ApiSplitMode::Amount,
        },
        updated_at: tx.updated_at,
        splits: tx
            .splits
            .into_iter()
            .map(|s| SplitView {
                user_id: s.user_id,
                amount_minor: s.amount_minor,
                percentage: s.percentage,
            })
            .collect(),
    }
}

pub fn balance(balance: MemberBalance) -> BalanceView {
    BalanceView {
        user_id: balance.user_id,
        username: balance.username,
        role: role_to_api(balance.role),
        paid_minor: balance.paid_minor,
        received_minor: balance.received_minor,
        balance_minor: balance.balance_minor,
    }
}
