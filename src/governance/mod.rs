//! Weighted-vote governance over a shared treasury with bounty tracking
//!
//! This module implements the contract core: a closed membership of weighted
//! voters proposes work funded from a shared treasury, votes against
//! configurable quorum/approval thresholds, and tracks approved work through
//! assignment, delivery, and paid completion.

pub mod config;
pub mod engine;
pub mod error;
pub mod member;
pub mod proposal;
pub mod task;
pub mod treasury;

pub use config::GovernanceConfig;
pub use engine::{GovernanceEngine, GovernanceEvent, GovernanceState, GovernanceSummary};
pub use error::{GovernanceError, GovernanceResult};
pub use member::{AccountId, MemberRegistry};
pub use proposal::{Proposal, ProposalStatus, VoteChoice, VoteRecord};
pub use task::{Deliverable, Task, TaskStatus};
pub use treasury::Treasury;
