//! Bounty task lifecycle
//!
//! A task is the execution record created when a proposal is approved. It
//! moves strictly forward: Unassigned -> Assigned -> Submitted -> Completed.
//! No transition skips a state and none reverses.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::{GovernanceError, GovernanceResult};
use super::member::AccountId;

/// Size of a deliverable content reference in bytes
pub const DELIVERABLE_LEN: usize = 32;

/// Opaque fixed-size content reference submitted as proof of completed work.
/// Travels as a hex string on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deliverable([u8; DELIVERABLE_LEN]);

impl Deliverable {
    /// Build from raw bytes; anything but exactly 32 bytes is invalid input.
    pub fn from_bytes(bytes: &[u8]) -> GovernanceResult<Self> {
        let array: [u8; DELIVERABLE_LEN] = bytes
            .try_into()
            .map_err(|_| GovernanceError::InvalidInput)?;
        Ok(Self(array))
    }

    /// Parse the wire form (64 hex characters)
    pub fn from_hex(s: &str) -> GovernanceResult<Self> {
        let bytes = hex::decode(s).map_err(|_| GovernanceError::InvalidInput)?;
        Self::from_bytes(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DELIVERABLE_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for Deliverable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Deliverable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Deliverable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Deliverable::from_hex(&s).map_err(D::Error::custom)
    }
}

/// Status of a bounty task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created on proposal approval, waiting for an assignee
    Unassigned,
    /// Assignee set, work underway
    Assigned,
    /// Deliverable submitted, awaiting completion approval
    Submitted,
    /// Approved and paid out
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Unassigned => "unassigned",
            TaskStatus::Assigned => "assigned",
            TaskStatus::Submitted => "submitted",
            TaskStatus::Completed => "completed",
        }
    }

    /// Check if this is a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unassigned" => Ok(TaskStatus::Unassigned),
            "assigned" => Ok(TaskStatus::Assigned),
            "submitted" => Ok(TaskStatus::Submitted),
            "completed" => Ok(TaskStatus::Completed),
            _ => Err(format!("Invalid task status: {}", s)),
        }
    }
}

/// Execution record for an approved proposal, keyed by the proposal id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// The approved proposal this task fulfills (1:1)
    pub proposal_id: u64,
    /// Original proposer, retained for task authorization
    pub proposer: AccountId,
    /// Reward copied from the proposal at creation
    pub reward: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<AccountId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deliverable: Option<Deliverable>,
    pub status: TaskStatus,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a task for a freshly approved proposal
    pub fn new(proposal_id: u64, proposer: AccountId, reward: u64) -> Self {
        Self {
            proposal_id,
            proposer,
            reward,
            assignee: None,
            deliverable: None,
            status: TaskStatus::Unassigned,
            updated_at: Utc::now(),
        }
    }

    /// Set the assignee (Unassigned -> Assigned)
    pub fn assign(&mut self, assignee: AccountId) -> GovernanceResult<()> {
        if self.status != TaskStatus::Unassigned {
            return Err(GovernanceError::InvalidTaskState);
        }
        self.assignee = Some(assignee);
        self.status = TaskStatus::Assigned;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record the deliverable (Assigned -> Submitted)
    pub fn submit(&mut self, deliverable: Deliverable) -> GovernanceResult<()> {
        if self.status != TaskStatus::Assigned {
            return Err(GovernanceError::InvalidTaskState);
        }
        self.deliverable = Some(deliverable);
        self.status = TaskStatus::Submitted;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Mark the task paid out (Submitted -> Completed)
    pub fn complete(&mut self) -> GovernanceResult<()> {
        if self.status != TaskStatus::Submitted {
            return Err(GovernanceError::InvalidTaskState);
        }
        self.status = TaskStatus::Completed;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_task() -> Task {
        Task::new(1, AccountId::from("alice"), 500_000)
    }

    fn make_deliverable() -> Deliverable {
        Deliverable::from_bytes(&[1u8; 32]).unwrap()
    }

    #[test]
    fn test_task_status_as_str() {
        assert_eq!(TaskStatus::Unassigned.as_str(), "unassigned");
        assert_eq!(TaskStatus::Assigned.as_str(), "assigned");
        assert_eq!(TaskStatus::Submitted.as_str(), "submitted");
        assert_eq!(TaskStatus::Completed.as_str(), "completed");
    }

    #[test]
    fn test_task_status_from_str() {
        assert_eq!(
            "unassigned".parse::<TaskStatus>().unwrap(),
            TaskStatus::Unassigned
        );
        assert_eq!(
            "completed".parse::<TaskStatus>().unwrap(),
            TaskStatus::Completed
        );
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_task_status_is_terminal() {
        assert!(!TaskStatus::Unassigned.is_terminal());
        assert!(!TaskStatus::Assigned.is_terminal());
        assert!(!TaskStatus::Submitted.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
    }

    #[test]
    fn test_new_task() {
        let task = make_task();
        assert_eq!(task.status, TaskStatus::Unassigned);
        assert!(task.assignee.is_none());
        assert!(task.deliverable.is_none());
        assert_eq!(task.reward, 500_000);
    }

    #[test]
    fn test_full_lifecycle() {
        let mut task = make_task();

        task.assign(AccountId::from("charlie")).unwrap();
        assert_eq!(task.status, TaskStatus::Assigned);
        assert_eq!(task.assignee, Some(AccountId::from("charlie")));

        task.submit(make_deliverable()).unwrap();
        assert_eq!(task.status, TaskStatus::Submitted);
        assert!(task.deliverable.is_some());

        task.complete().unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[test]
    fn test_no_transition_skips_a_state() {
        let mut task = make_task();
        assert_eq!(
            task.submit(make_deliverable()),
            Err(GovernanceError::InvalidTaskState)
        );
        assert_eq!(task.complete(), Err(GovernanceError::InvalidTaskState));
    }

    #[test]
    fn test_no_transition_reverses() {
        let mut task = make_task();
        task.assign(AccountId::from("charlie")).unwrap();
        assert_eq!(
            task.assign(AccountId::from("dave")),
            Err(GovernanceError::InvalidTaskState)
        );

        task.submit(make_deliverable()).unwrap();
        task.complete().unwrap();
        assert_eq!(
            task.submit(make_deliverable()),
            Err(GovernanceError::InvalidTaskState)
        );
        assert_eq!(task.complete(), Err(GovernanceError::InvalidTaskState));
    }

    #[test]
    fn test_deliverable_from_bytes_length() {
        assert!(Deliverable::from_bytes(&[0u8; 32]).is_ok());
        assert_eq!(
            Deliverable::from_bytes(&[0u8; 31]),
            Err(GovernanceError::InvalidInput)
        );
        assert_eq!(
            Deliverable::from_bytes(&[0u8; 33]),
            Err(GovernanceError::InvalidInput)
        );
    }

    #[test]
    fn test_deliverable_hex_round_trip() {
        let d = make_deliverable();
        let hex = d.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(Deliverable::from_hex(&hex).unwrap(), d);
    }

    #[test]
    fn test_deliverable_from_hex_invalid() {
        assert_eq!(
            Deliverable::from_hex("zz"),
            Err(GovernanceError::InvalidInput)
        );
        assert_eq!(
            Deliverable::from_hex("0102"),
            Err(GovernanceError::InvalidInput)
        );
    }

    #[test]
    fn test_deliverable_serialization() {
        let d = make_deliverable();
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(32)));

        let back: Deliverable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn test_task_serialization() {
        let mut task = make_task();
        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains("\"status\":\"unassigned\""));
        // Absent assignee is omitted entirely
        assert!(!json.contains("assignee"));

        task.assign(AccountId::from("charlie")).unwrap();
        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains("\"assignee\":\"charlie\""));
    }
}
