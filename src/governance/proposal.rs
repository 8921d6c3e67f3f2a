//! Proposals and stake-weighted votes
//!
//! A proposal is a funded work request submitted for a vote. Weight
//! accumulates on the proposal as members vote; the tally rules live here so
//! they can be exercised directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{GovernanceError, GovernanceResult};
use super::member::AccountId;

/// Longest accepted proposal title
pub const MAX_TITLE_LEN: usize = 100;

/// Longest accepted proposal description
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Status of a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Accepting votes until the deadline
    Open,
    /// Finalized with quorum and approval met; a task exists for it
    Approved,
    /// Finalized without quorum or approval
    Rejected,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Open => "open",
            ProposalStatus::Approved => "approved",
            ProposalStatus::Rejected => "rejected",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, ProposalStatus::Open)
    }
}

impl std::str::FromStr for ProposalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(ProposalStatus::Open),
            "approved" => Ok(ProposalStatus::Approved),
            "rejected" => Ok(ProposalStatus::Rejected),
            _ => Err(format!("Invalid proposal status: {}", s)),
        }
    }
}

/// A member's vote choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteChoice {
    Yes,
    No,
}

impl VoteChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteChoice::Yes => "yes",
            VoteChoice::No => "no",
        }
    }
}

impl std::str::FromStr for VoteChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yes" => Ok(VoteChoice::Yes),
            "no" => Ok(VoteChoice::No),
            _ => Err(format!("Invalid vote choice: {}", s)),
        }
    }
}

/// A recorded vote. Weight is read at cast time; later membership changes do
/// not retroactively alter it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub voter: AccountId,
    pub choice: VoteChoice,
    pub weight: u64,
    pub cast_at_height: u64,
}

/// A funded work request submitted for a vote
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    /// Sequential id, assigned at creation, never reused
    pub id: u64,
    pub title: String,
    pub description: String,
    pub proposer: AccountId,
    /// Reward in the smallest currency unit, checked against the treasury
    /// at creation time (not escrowed)
    pub reward: u64,
    pub created_at_height: u64,
    pub voting_deadline_height: u64,
    pub yes_weight: u64,
    pub no_weight: u64,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
}

impl Proposal {
    pub fn new(
        id: u64,
        title: impl Into<String>,
        description: impl Into<String>,
        proposer: AccountId,
        reward: u64,
        current_height: u64,
        voting_period_blocks: u64,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            proposer,
            reward,
            created_at_height: current_height,
            voting_deadline_height: current_height.saturating_add(voting_period_blocks),
            yes_weight: 0,
            no_weight: 0,
            status: ProposalStatus::Open,
            created_at: Utc::now(),
        }
    }

    /// Validate title/description against the fixed wire limits
    pub fn validate_inputs(title: &str, description: &str) -> GovernanceResult<()> {
        if title.len() > MAX_TITLE_LEN || description.len() > MAX_DESCRIPTION_LEN {
            return Err(GovernanceError::InvalidInput);
        }
        Ok(())
    }

    /// Whether votes are still accepted at the given height
    pub fn voting_open(&self, current_height: u64) -> bool {
        self.status.is_open() && current_height < self.voting_deadline_height
    }

    /// Accumulate a vote's weight
    pub fn record_vote(&mut self, choice: VoteChoice, weight: u64) {
        match choice {
            VoteChoice::Yes => self.yes_weight = self.yes_weight.saturating_add(weight),
            VoteChoice::No => self.no_weight = self.no_weight.saturating_add(weight),
        }
    }

    /// Total weight cast so far
    pub fn total_cast(&self) -> u64 {
        self.yes_weight.saturating_add(self.no_weight)
    }

    /// Quorum holds iff cast weight reaches the threshold share of total
    /// eligible power. Widened to avoid overflow in the cross products.
    pub fn meets_quorum(&self, total_power: u64, quorum_pct: u64) -> bool {
        (self.total_cast() as u128) * 100 >= (total_power as u128) * (quorum_pct as u128)
    }

    /// Approval holds iff yes weight reaches the threshold share of cast
    /// weight
    pub fn meets_approval(&self, approval_pct: u64) -> bool {
        (self.yes_weight as u128) * 100 >= (self.total_cast() as u128) * (approval_pct as u128)
    }

    /// Outcome of finalization under the given thresholds
    pub fn tally(&self, total_power: u64, quorum_pct: u64, approval_pct: u64) -> ProposalStatus {
        if self.meets_quorum(total_power, quorum_pct) && self.meets_approval(approval_pct) {
            ProposalStatus::Approved
        } else {
            ProposalStatus::Rejected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_proposal() -> Proposal {
        Proposal::new(
            1,
            "Bug Fix",
            "Fix critical security vulnerability",
            AccountId::from("alice"),
            500_000,
            10,
            1008,
        )
    }

    #[test]
    fn test_proposal_status_as_str() {
        assert_eq!(ProposalStatus::Open.as_str(), "open");
        assert_eq!(ProposalStatus::Approved.as_str(), "approved");
        assert_eq!(ProposalStatus::Rejected.as_str(), "rejected");
    }

    #[test]
    fn test_proposal_status_from_str() {
        assert_eq!(
            "open".parse::<ProposalStatus>().unwrap(),
            ProposalStatus::Open
        );
        assert_eq!(
            "approved".parse::<ProposalStatus>().unwrap(),
            ProposalStatus::Approved
        );
        assert!("passed".parse::<ProposalStatus>().is_err());
    }

    #[test]
    fn test_vote_choice_round_trip() {
        assert_eq!("yes".parse::<VoteChoice>().unwrap(), VoteChoice::Yes);
        assert_eq!("no".parse::<VoteChoice>().unwrap(), VoteChoice::No);
        assert_eq!(VoteChoice::Yes.as_str(), "yes");
        assert!("abstain".parse::<VoteChoice>().is_err());
    }

    #[test]
    fn test_new_proposal_fields() {
        let p = make_proposal();
        assert_eq!(p.status, ProposalStatus::Open);
        assert_eq!(p.created_at_height, 10);
        assert_eq!(p.voting_deadline_height, 1018);
        assert_eq!(p.yes_weight, 0);
        assert_eq!(p.no_weight, 0);
    }

    #[test]
    fn test_voting_open_window() {
        let p = make_proposal();
        assert!(p.voting_open(10));
        assert!(p.voting_open(1017));
        // Closed exactly at the deadline
        assert!(!p.voting_open(1018));
        assert!(!p.voting_open(2000));
    }

    #[test]
    fn test_voting_closed_after_finalize() {
        let mut p = make_proposal();
        p.status = ProposalStatus::Rejected;
        assert!(!p.voting_open(10));
    }

    #[test]
    fn test_record_vote_accumulates() {
        let mut p = make_proposal();
        p.record_vote(VoteChoice::Yes, 60);
        p.record_vote(VoteChoice::No, 40);

        assert_eq!(p.yes_weight, 60);
        assert_eq!(p.no_weight, 40);
        assert_eq!(p.total_cast(), 100);
    }

    #[test]
    fn test_tally_approved() {
        let mut p = make_proposal();
        p.record_vote(VoteChoice::Yes, 60);
        p.record_vote(VoteChoice::Yes, 40);

        // 100% cast, 100% yes against 50/60 thresholds
        assert_eq!(p.tally(100, 50, 60), ProposalStatus::Approved);
    }

    #[test]
    fn test_tally_quorum_failure() {
        let mut p = make_proposal();
        p.record_vote(VoteChoice::Yes, 40);

        // 40 of 100 cast against a 50% quorum
        assert!(!p.meets_quorum(100, 50));
        assert_eq!(p.tally(100, 50, 60), ProposalStatus::Rejected);
    }

    #[test]
    fn test_tally_approval_failure() {
        let mut p = make_proposal();
        p.record_vote(VoteChoice::Yes, 40);
        p.record_vote(VoteChoice::No, 60);

        // Quorum met (100%) but only 40% yes against a 60% approval threshold
        assert!(p.meets_quorum(100, 50));
        assert!(!p.meets_approval(60));
        assert_eq!(p.tally(100, 50, 60), ProposalStatus::Rejected);
    }

    #[test]
    fn test_tally_exact_thresholds() {
        let mut p = make_proposal();
        p.record_vote(VoteChoice::Yes, 30);
        p.record_vote(VoteChoice::No, 20);

        // Exactly 50% cast of 100 power, exactly 60% yes of cast
        assert_eq!(p.tally(100, 50, 60), ProposalStatus::Approved);
    }

    #[test]
    fn test_zero_cast_fails_quorum() {
        let p = make_proposal();
        assert!(!p.meets_quorum(100, 50));
        assert_eq!(p.tally(100, 50, 60), ProposalStatus::Rejected);
    }

    #[test]
    fn test_zero_cast_with_zero_quorum_threshold() {
        let p = make_proposal();
        // 0 >= total_power * 0 holds, and 0 >= 0 * approval holds
        assert!(p.meets_quorum(100, 0));
        assert_eq!(p.tally(100, 0, 60), ProposalStatus::Approved);
    }

    #[test]
    fn test_tally_large_weights_do_not_overflow() {
        let mut p = make_proposal();
        p.record_vote(VoteChoice::Yes, u64::MAX / 2);
        p.record_vote(VoteChoice::No, u64::MAX / 2);

        // Should not panic
        let _ = p.tally(u64::MAX, 50, 60);
    }

    #[test]
    fn test_validate_inputs() {
        assert!(Proposal::validate_inputs("Bug Fix", "Description").is_ok());
        assert!(Proposal::validate_inputs("", "").is_ok());
        assert_eq!(
            Proposal::validate_inputs(&"t".repeat(MAX_TITLE_LEN + 1), "d"),
            Err(GovernanceError::InvalidInput)
        );
        assert_eq!(
            Proposal::validate_inputs("t", &"d".repeat(MAX_DESCRIPTION_LEN + 1)),
            Err(GovernanceError::InvalidInput)
        );
    }

    #[test]
    fn test_serialization() {
        let p = make_proposal();
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"status\":\"open\""));
        assert!(json.contains("\"proposer\":\"alice\""));
    }
}
