//! Admin configuration
//!
//! The owner identity is fixed at deployment; the three voting parameters
//! are tunable through owner-only operations.

use serde::{Deserialize, Serialize};

use super::member::AccountId;

/// Default voting window, roughly one week of blocks
pub const DEFAULT_VOTING_PERIOD_BLOCKS: u64 = 1008;

/// Default minimum share of total voting power that must be cast
pub const DEFAULT_QUORUM_THRESHOLD_PCT: u64 = 50;

/// Default minimum share of cast weight that must be "yes"
pub const DEFAULT_APPROVAL_THRESHOLD_PCT: u64 = 60;

/// Tunable governance parameters plus the fixed owner identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// Contract owner, immutable after deployment
    pub owner: AccountId,
    /// Length of the voting window in blocks
    pub voting_period_blocks: u64,
    /// Quorum threshold as a percentage of total voting power
    pub quorum_threshold_pct: u64,
    /// Approval threshold as a percentage of cast weight
    pub approval_threshold_pct: u64,
}

impl GovernanceConfig {
    pub fn new(owner: AccountId) -> Self {
        Self {
            owner,
            voting_period_blocks: DEFAULT_VOTING_PERIOD_BLOCKS,
            quorum_threshold_pct: DEFAULT_QUORUM_THRESHOLD_PCT,
            approval_threshold_pct: DEFAULT_APPROVAL_THRESHOLD_PCT,
        }
    }

    pub fn is_owner(&self, account: &AccountId) -> bool {
        self.owner == *account
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GovernanceConfig::new(AccountId::from("deployer"));
        assert_eq!(config.voting_period_blocks, 1008);
        assert_eq!(config.quorum_threshold_pct, 50);
        assert_eq!(config.approval_threshold_pct, 60);
    }

    #[test]
    fn test_is_owner() {
        let config = GovernanceConfig::new(AccountId::from("deployer"));
        assert!(config.is_owner(&AccountId::from("deployer")));
        assert!(!config.is_owner(&AccountId::from("alice")));
    }

    #[test]
    fn test_serialization() {
        let config = GovernanceConfig::new(AccountId::from("deployer"));
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"owner\":\"deployer\""));
        assert!(json.contains("voting_period_blocks"));
    }
}
