//! Membership registry
//!
//! Maps account identities to voting power. Only the contract owner mutates
//! the registry; the checks live in the engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque principal identifying an account on the host ledger.
///
/// The host authenticates callers; the governance core only compares
/// identities, so this is a plain ordered string key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Registry of members and their voting power
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberRegistry {
    members: BTreeMap<AccountId, u64>,
}

impl MemberRegistry {
    pub fn new() -> Self {
        Self {
            members: BTreeMap::new(),
        }
    }

    /// Grant (or overwrite) voting power for an account
    pub fn grant(&mut self, account: AccountId, power: u64) {
        self.members.insert(account, power);
    }

    /// Remove an account from the registry. Returns whether it was present;
    /// removal of an absent account is not an error.
    pub fn revoke(&mut self, account: &AccountId) -> bool {
        self.members.remove(account).is_some()
    }

    pub fn is_member(&self, account: &AccountId) -> bool {
        self.members.contains_key(account)
    }

    /// Voting power of an account; zero for non-members
    pub fn power_of(&self, account: &AccountId) -> u64 {
        self.members.get(account).copied().unwrap_or(0)
    }

    /// Voting power of an account, or None if not a member
    pub fn get(&self, account: &AccountId) -> Option<u64> {
        self.members.get(account).copied()
    }

    /// Sum of all current member powers (the quorum denominator)
    pub fn total_power(&self) -> u64 {
        self.members
            .values()
            .fold(0u64, |acc, p| acc.saturating_add(*p))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, u64)> {
        self.members.iter().map(|(a, p)| (a, *p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acct(s: &str) -> AccountId {
        AccountId::from(s)
    }

    #[test]
    fn test_account_id_display() {
        let a = acct("alice");
        assert_eq!(a.to_string(), "alice");
        assert_eq!(a.as_str(), "alice");
    }

    #[test]
    fn test_account_id_serialization() {
        let a = acct("alice");
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, "\"alice\"");

        let back: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn test_grant_and_lookup() {
        let mut registry = MemberRegistry::new();
        assert!(!registry.is_member(&acct("alice")));
        assert_eq!(registry.power_of(&acct("alice")), 0);

        registry.grant(acct("alice"), 100);
        assert!(registry.is_member(&acct("alice")));
        assert_eq!(registry.power_of(&acct("alice")), 100);
        assert_eq!(registry.get(&acct("alice")), Some(100));
    }

    #[test]
    fn test_grant_overwrites_power() {
        let mut registry = MemberRegistry::new();
        registry.grant(acct("alice"), 100);
        registry.grant(acct("alice"), 40);

        assert_eq!(registry.power_of(&acct("alice")), 40);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_revoke() {
        let mut registry = MemberRegistry::new();
        registry.grant(acct("alice"), 100);

        assert!(registry.revoke(&acct("alice")));
        assert!(!registry.is_member(&acct("alice")));

        // Revoking a non-member is not an error
        assert!(!registry.revoke(&acct("alice")));
    }

    #[test]
    fn test_total_power() {
        let mut registry = MemberRegistry::new();
        assert_eq!(registry.total_power(), 0);

        registry.grant(acct("alice"), 60);
        registry.grant(acct("bob"), 40);
        assert_eq!(registry.total_power(), 100);

        registry.revoke(&acct("bob"));
        assert_eq!(registry.total_power(), 60);
    }

    #[test]
    fn test_zero_power_member() {
        let mut registry = MemberRegistry::new();
        registry.grant(acct("alice"), 0);

        assert!(registry.is_member(&acct("alice")));
        assert_eq!(registry.power_of(&acct("alice")), 0);
    }

    #[test]
    fn test_iter_is_ordered() {
        let mut registry = MemberRegistry::new();
        registry.grant(acct("charlie"), 1);
        registry.grant(acct("alice"), 2);
        registry.grant(acct("bob"), 3);

        let names: Vec<&str> = registry.iter().map(|(a, _)| a.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob", "charlie"]);
    }
}
