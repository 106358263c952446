//! Group expense ledger.
//!
//! Users form groups, invite each other with roles and record shared
//! transactions whose amount is split among members. Every operation goes
//! through [`Engine`], which checks the caller's role and runs each write in a
//! single database transaction.

pub use commands::TransactionCmd;
pub use error::EngineError;
pub use groups::Group;
pub use invitations::{Invitation, InvitationStatus};
pub use members::{Member, MemberRole};
pub use ops::{AddMemberOutcome, Engine, EngineBuilder, ExternalClaims, MemberBalance, TransactionPage};
pub use split::{MAX_AMOUNT_MINOR, PERCENTAGE_TOLERANCE, SplitInput, SplitMode, materialize_splits, validate_splits};
pub use transaction_splits::TransactionSplit;
pub use transactions::{Transaction, TransactionKind};
pub use users::{GUEST_EMAIL_DOMAIN, User};

mod commands;
mod error;
mod groups;
mod invitations;
mod members;
mod ops;
mod split;
mod transaction_splits;
mod transactions;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
