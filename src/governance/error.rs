//! Governance failure codes
//!
//! Every public operation reports failures through this flat enumeration.
//! Each variant carries a stable numeric code that hosts can match on.

use thiserror::Error;

/// Failure taxonomy for governance operations
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GovernanceError {
    /// Operation is restricted to the contract owner
    #[error("owner-only operation")]
    OwnerOnly,

    /// Referenced member does not exist
    #[error("member not found")]
    MemberNotFound,

    /// Caller is not permitted to perform this operation
    #[error("caller is not authorized")]
    Unauthorized,

    /// Referenced proposal does not exist
    #[error("proposal not found")]
    ProposalNotFound,

    /// Treasury balance cannot cover the requested amount
    #[error("insufficient treasury funds")]
    InsufficientFunds,

    /// Caller already cast a vote on this proposal
    #[error("already voted on this proposal")]
    AlreadyVoted,

    /// Voting deadline has passed or the proposal is no longer open
    #[error("voting is closed for this proposal")]
    VotingClosed,

    /// Voting deadline has not yet been reached
    #[error("voting period is still open")]
    VotingStillOpen,

    /// Proposal was already finalized
    #[error("proposal already finalized")]
    AlreadyFinalized,

    /// Amount is zero or not representable
    #[error("invalid amount")]
    InvalidAmount,

    /// Referenced task does not exist
    #[error("task not found")]
    TaskNotFound,

    /// Task is not in a legal source state for this transition
    #[error("invalid task state for this operation")]
    InvalidTaskState,

    /// Caller is not the current task assignee
    #[error("caller is not the task assignee")]
    NotAssignee,

    /// Input does not match the expected format
    #[error("invalid input")]
    InvalidInput,
}

impl GovernanceError {
    /// Stable numeric code reported on the wire
    pub fn code(&self) -> u32 {
        match self {
            GovernanceError::OwnerOnly => 100,
            GovernanceError::MemberNotFound => 101,
            GovernanceError::Unauthorized => 102,
            GovernanceError::ProposalNotFound => 103,
            GovernanceError::InsufficientFunds => 104,
            GovernanceError::AlreadyVoted => 105,
            GovernanceError::VotingClosed => 106,
            GovernanceError::VotingStillOpen => 107,
            GovernanceError::AlreadyFinalized => 108,
            GovernanceError::InvalidAmount => 109,
            GovernanceError::TaskNotFound => 110,
            GovernanceError::InvalidTaskState => 111,
            GovernanceError::NotAssignee => 112,
            GovernanceError::InvalidInput => 113,
        }
    }
}

/// Result type for governance operations
pub type GovernanceResult<T> = Result<T, GovernanceError>;
