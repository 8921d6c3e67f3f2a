//! Treasury balance
//!
//! A single counter in the smallest currency unit. Funding increases it,
//! task payouts decrease it; the balance can never go negative. Actual value
//! custody lives on the host ledger.

use serde::{Deserialize, Serialize};

use super::error::{GovernanceError, GovernanceResult};

/// Pooled balance from which approved task rewards are disbursed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Treasury {
    balance: u64,
}

impl Treasury {
    pub fn new() -> Self {
        Self { balance: 0 }
    }

    pub fn with_balance(balance: u64) -> Self {
        Self { balance }
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    /// Deposit into the treasury. Zero (or unrepresentable) amounts are
    /// rejected before any state changes. Returns the new balance.
    pub fn fund(&mut self, amount: u64) -> GovernanceResult<u64> {
        if amount == 0 {
            return Err(GovernanceError::InvalidAmount);
        }
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(GovernanceError::InvalidAmount)?;
        Ok(self.balance)
    }

    /// Whether the balance covers the given amount
    pub fn check_funds(&self, amount: u64) -> bool {
        amount <= self.balance
    }

    /// Pay out from the treasury. Atomic: either the full amount is
    /// deducted or nothing changes.
    pub fn disburse(&mut self, amount: u64) -> GovernanceResult<()> {
        if amount > self.balance {
            return Err(GovernanceError::InsufficientFunds);
        }
        self.balance -= amount;
        Ok(())
    }
}
