//! Governance engine coordinating membership, treasury, proposals, votes,
//! and bounty tasks
//!
//! The engine handles:
//! - Owner-administered membership and voting parameters
//! - Open treasury deposits and payout disbursement
//! - Proposal creation, stake-weighted voting, and deadline finalization
//! - Task assignment, deliverable submission, and paid completion
//! - Event broadcasting for host integrations
//!
//! The whole contract state lives in one aggregate behind a single lock.
//! Every mutating operation takes the write guard exactly once and performs
//! the caller check before any other validation, so each precondition stays
//! atomic with its effect.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};

use super::config::GovernanceConfig;
use super::error::{GovernanceError, GovernanceResult};
use super::member::{AccountId, MemberRegistry};
use super::proposal::{Proposal, ProposalStatus, VoteChoice, VoteRecord};
use super::task::{Deliverable, Task, TaskStatus};
use super::treasury::Treasury;

/// Events emitted by the governance engine
///
/// `TaskCompleted` doubles as the payout signal: the host performs the
/// actual value transfer to the assignee when it observes one.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GovernanceEvent {
    /// A member was granted voting power (or had it overwritten)
    MemberGranted { account: AccountId, power: u64 },
    /// A member was removed
    MemberRevoked { account: AccountId },
    /// The treasury received a deposit
    TreasuryFunded {
        from: AccountId,
        amount: u64,
        balance: u64,
    },
    /// A proposal was created
    ProposalCreated {
        proposal_id: u64,
        proposer: AccountId,
        reward: u64,
    },
    /// A vote was recorded
    VoteCast {
        proposal_id: u64,
        voter: AccountId,
        choice: VoteChoice,
        weight: u64,
    },
    /// A proposal was finalized
    ProposalFinalized {
        proposal_id: u64,
        status: ProposalStatus,
    },
    /// A task was assigned
    TaskAssigned {
        proposal_id: u64,
        assignee: AccountId,
    },
    /// A deliverable was submitted for a task
    DeliverableSubmitted {
        proposal_id: u64,
        assignee: AccountId,
    },
    /// A task was approved and its reward disbursed
    TaskCompleted {
        proposal_id: u64,
        assignee: AccountId,
        reward: u64,
        balance: u64,
    },
    /// The voting period parameter changed
    VotingPeriodUpdated { blocks: u64 },
    /// The quorum threshold parameter changed
    QuorumThresholdUpdated { pct: u64 },
    /// The approval threshold parameter changed
    ApprovalThresholdUpdated { pct: u64 },
    /// The host advanced the chain height
    HeightAdvanced { height: u64 },
}

/// Complete contract state aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceState {
    pub config: GovernanceConfig,
    pub members: MemberRegistry,
    pub treasury: Treasury,
    /// Next proposal id to issue; ids start at 1 and are never reused
    pub next_proposal_id: u64,
    pub proposals: BTreeMap<u64, Proposal>,
    /// Vote records per proposal, keyed by voter
    pub votes: BTreeMap<u64, BTreeMap<AccountId, VoteRecord>>,
    /// Tasks keyed by the approved proposal's id
    pub tasks: BTreeMap<u64, Task>,
    /// Current chain height as reported by the host
    pub height: u64,
}

impl GovernanceState {
    pub fn new(owner: AccountId) -> Self {
        Self {
            config: GovernanceConfig::new(owner),
            members: MemberRegistry::new(),
            treasury: Treasury::new(),
            next_proposal_id: 1,
            proposals: BTreeMap::new(),
            votes: BTreeMap::new(),
            tasks: BTreeMap::new(),
            height: 0,
        }
    }
}

/// Read model for operator dashboards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceSummary {
    pub member_count: u64,
    pub total_voting_power: u64,
    pub treasury_balance: u64,
    pub proposal_count: u64,
    pub task_count: u64,
    pub height: u64,
}

/// Engine owning the governance state and its operation surface
pub struct GovernanceEngine {
    state: RwLock<GovernanceState>,
    event_tx: broadcast::Sender<GovernanceEvent>,
}

impl GovernanceEngine {
    /// Create an engine with a fresh state owned by the given account
    pub fn new(owner: AccountId) -> Self {
        Self::from_state(GovernanceState::new(owner))
    }

    /// Create an engine from a previously persisted state
    pub fn from_state(state: GovernanceState) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            state: RwLock::new(state),
            event_tx,
        }
    }

    /// Subscribe to governance events
    pub fn subscribe(&self) -> broadcast::Receiver<GovernanceEvent> {
        self.event_tx.subscribe()
    }

    /// Clone the full state for persistence
    pub async fn snapshot(&self) -> GovernanceState {
        self.state.read().await.clone()
    }

    // ── Membership administration ──

    /// Grant voting power to an account, overwriting any existing power
    pub async fn grant_member(
        &self,
        caller: &AccountId,
        account: AccountId,
        power: u64,
    ) -> GovernanceResult<bool> {
        {
            let mut state = self.state.write().await;
            if !state.config.is_owner(caller) {
                return Err(GovernanceError::OwnerOnly);
            }
            state.members.grant(account.clone(), power);
        }

        let _ = self
            .event_tx
            .send(GovernanceEvent::MemberGranted { account, power });

        Ok(true)
    }

    /// Remove an account from the membership. Removing a non-member also
    /// reports success.
    pub async fn revoke_member(
        &self,
        caller: &AccountId,
        account: AccountId,
    ) -> GovernanceResult<bool> {
        {
            let mut state = self.state.write().await;
            if !state.config.is_owner(caller) {
                return Err(GovernanceError::OwnerOnly);
            }
            state.members.revoke(&account);
        }

        let _ = self
            .event_tx
            .send(GovernanceEvent::MemberRevoked { account });

        Ok(true)
    }

    pub async fn is_member(&self, account: &AccountId) -> bool {
        self.state.read().await.members.is_member(account)
    }

    /// Voting power of an account; zero for non-members
    pub async fn power_of(&self, account: &AccountId) -> u64 {
        self.state.read().await.members.power_of(account)
    }

    /// Voting power of an account, or None if not a member
    pub async fn get_member(&self, account: &AccountId) -> Option<u64> {
        self.state.read().await.members.get(account)
    }

    // ── Voting parameters ──

    pub async fn set_voting_period(
        &self,
        caller: &AccountId,
        blocks: u64,
    ) -> GovernanceResult<bool> {
        {
            let mut state = self.state.write().await;
            if !state.config.is_owner(caller) {
                return Err(GovernanceError::OwnerOnly);
            }
            state.config.voting_period_blocks = blocks;
        }

        let _ = self
            .event_tx
            .send(GovernanceEvent::VotingPeriodUpdated { blocks });

        Ok(true)
    }

    pub async fn set_quorum_threshold(
        &self,
        caller: &AccountId,
        pct: u64,
    ) -> GovernanceResult<bool> {
        {
            let mut state = self.state.write().await;
            if !state.config.is_owner(caller) {
                return Err(GovernanceError::OwnerOnly);
            }
            state.config.quorum_threshold_pct = pct;
        }

        let _ = self
            .event_tx
            .send(GovernanceEvent::QuorumThresholdUpdated { pct });

        Ok(true)
    }

    pub async fn set_approval_threshold(
        &self,
        caller: &AccountId,
        pct: u64,
    ) -> GovernanceResult<bool> {
        {
            let mut state = self.state.write().await;
            if !state.config.is_owner(caller) {
                return Err(GovernanceError::OwnerOnly);
            }
            state.config.approval_threshold_pct = pct;
        }

        let _ = self
            .event_tx
            .send(GovernanceEvent::ApprovalThresholdUpdated { pct });

        Ok(true)
    }

    pub async fn config(&self) -> GovernanceConfig {
        self.state.read().await.config.clone()
    }

    // ── Treasury ──

    /// Deposit into the treasury. Open to any caller. Returns the amount
    /// funded.
    pub async fn fund_treasury(&self, caller: &AccountId, amount: u64) -> GovernanceResult<u64> {
        let balance = {
            let mut state = self.state.write().await;
            state.treasury.fund(amount)?
        };

        let _ = self.event_tx.send(GovernanceEvent::TreasuryFunded {
            from: caller.clone(),
            amount,
            balance,
        });

        Ok(amount)
    }

    pub async fn treasury_balance(&self) -> u64 {
        self.state.read().await.treasury.balance()
    }

    // ── Proposals ──

    /// Create a proposal. The reward is checked against the current treasury
    /// balance but not reserved; payout re-checks at completion time.
    pub async fn create_proposal(
        &self,
        caller: &AccountId,
        title: impl Into<String>,
        description: impl Into<String>,
        reward: u64,
    ) -> GovernanceResult<u64> {
        let title = title.into();
        let description = description.into();

        let id = {
            let mut state = self.state.write().await;
            if !state.members.is_member(caller) {
                return Err(GovernanceError::Unauthorized);
            }
            Proposal::validate_inputs(&title, &description)?;
            if reward == 0 {
                return Err(GovernanceError::InvalidAmount);
            }
            if !state.treasury.check_funds(reward) {
                return Err(GovernanceError::InsufficientFunds);
            }

            let id = state.next_proposal_id;
            let proposal = Proposal::new(
                id,
                title,
                description,
                caller.clone(),
                reward,
                state.height,
                state.config.voting_period_blocks,
            );
            state.proposals.insert(id, proposal);
            state.votes.insert(id, BTreeMap::new());
            state.next_proposal_id += 1;
            id
        };

        let _ = self.event_tx.send(GovernanceEvent::ProposalCreated {
            proposal_id: id,
            proposer: caller.clone(),
            reward,
        });

        Ok(id)
    }

    pub async fn get_proposal(&self, id: u64) -> Option<Proposal> {
        self.state.read().await.proposals.get(&id).cloned()
    }

    pub async fn list_proposals(&self) -> Vec<Proposal> {
        self.state.read().await.proposals.values().cloned().collect()
    }

    // ── Voting ──

    /// Cast a stake-weighted vote. The voter's current power is read at cast
    /// time and fixed into the record.
    pub async fn vote_on_proposal(
        &self,
        caller: &AccountId,
        proposal_id: u64,
        choice: VoteChoice,
    ) -> GovernanceResult<bool> {
        let weight = {
            let mut state = self.state.write().await;
            if !state.members.is_member(caller) {
                return Err(GovernanceError::Unauthorized);
            }

            let height = state.height;
            {
                let proposal = state
                    .proposals
                    .get(&proposal_id)
                    .ok_or(GovernanceError::ProposalNotFound)?;
                if !proposal.voting_open(height) {
                    return Err(GovernanceError::VotingClosed);
                }
            }

            let already_voted = state
                .votes
                .get(&proposal_id)
                .map(|records| records.contains_key(caller))
                .unwrap_or(false);
            if already_voted {
                return Err(GovernanceError::AlreadyVoted);
            }

            let weight = state.members.power_of(caller);
            let record = VoteRecord {
                voter: caller.clone(),
                choice,
                weight,
                cast_at_height: height,
            };
            state
                .votes
                .entry(proposal_id)
                .or_default()
                .insert(caller.clone(), record);
            if let Some(proposal) = state.proposals.get_mut(&proposal_id) {
                proposal.record_vote(choice, weight);
            }
            weight
        };

        let _ = self.event_tx.send(GovernanceEvent::VoteCast {
            proposal_id,
            voter: caller.clone(),
            choice,
            weight,
        });

        Ok(true)
    }

    pub async fn has_voted(&self, proposal_id: u64, account: &AccountId) -> bool {
        self.state
            .read()
            .await
            .votes
            .get(&proposal_id)
            .map(|records| records.contains_key(account))
            .unwrap_or(false)
    }

    pub async fn get_vote(&self, proposal_id: u64, account: &AccountId) -> Option<VoteRecord> {
        self.state
            .read()
            .await
            .votes
            .get(&proposal_id)
            .and_then(|records| records.get(account))
            .cloned()
    }

    /// Finalize a proposal after its deadline. Any caller may trigger this;
    /// the tally alone decides the outcome. Approval materializes a task.
    pub async fn finalize_proposal(
        &self,
        _caller: &AccountId,
        proposal_id: u64,
    ) -> GovernanceResult<ProposalStatus> {
        let outcome = {
            let mut state = self.state.write().await;
            let height = state.height;
            let total_power = state.members.total_power();
            let quorum_pct = state.config.quorum_threshold_pct;
            let approval_pct = state.config.approval_threshold_pct;

            let proposal = state
                .proposals
                .get_mut(&proposal_id)
                .ok_or(GovernanceError::ProposalNotFound)?;
            if height < proposal.voting_deadline_height {
                return Err(GovernanceError::VotingStillOpen);
            }
            if !proposal.status.is_open() {
                return Err(GovernanceError::AlreadyFinalized);
            }

            let outcome = proposal.tally(total_power, quorum_pct, approval_pct);
            proposal.status = outcome;
            let proposer = proposal.proposer.clone();
            let reward = proposal.reward;

            if outcome == ProposalStatus::Approved {
                state
                    .tasks
                    .insert(proposal_id, Task::new(proposal_id, proposer, reward));
            }
            outcome
        };

        let _ = self.event_tx.send(GovernanceEvent::ProposalFinalized {
            proposal_id,
            status: outcome,
        });

        Ok(outcome)
    }

    // ── Tasks ──

    /// Assign an approved proposal's task. Only the contract owner or the
    /// original proposer may assign.
    pub async fn assign_task(
        &self,
        caller: &AccountId,
        proposal_id: u64,
        assignee: AccountId,
    ) -> GovernanceResult<bool> {
        {
            let mut state = self.state.write().await;
            let is_owner = state.config.is_owner(caller);
            let task = state
                .tasks
                .get_mut(&proposal_id)
                .ok_or(GovernanceError::TaskNotFound)?;
            if !is_owner && task.proposer != *caller {
                return Err(GovernanceError::Unauthorized);
            }
            task.assign(assignee.clone())?;
        }

        let _ = self.event_tx.send(GovernanceEvent::TaskAssigned {
            proposal_id,
            assignee,
        });

        Ok(true)
    }

    /// Submit the deliverable for an assigned task. Only the current
    /// assignee may submit.
    pub async fn submit_deliverable(
        &self,
        caller: &AccountId,
        proposal_id: u64,
        deliverable: Deliverable,
    ) -> GovernanceResult<bool> {
        {
            let mut state = self.state.write().await;
            let task = state
                .tasks
                .get_mut(&proposal_id)
                .ok_or(GovernanceError::TaskNotFound)?;
            if task.assignee.is_some() && task.assignee.as_ref() != Some(caller) {
                return Err(GovernanceError::NotAssignee);
            }
            task.submit(deliverable)?;
        }

        let _ = self.event_tx.send(GovernanceEvent::DeliverableSubmitted {
            proposal_id,
            assignee: caller.clone(),
        });

        Ok(true)
    }

    /// Approve a submitted task and disburse its reward. The treasury is
    /// re-checked here: creation-time checks do not reserve funds, so a
    /// payout can still fail if other tasks drained the balance since.
    /// Returns the disbursed amount.
    pub async fn approve_task_completion(
        &self,
        caller: &AccountId,
        proposal_id: u64,
    ) -> GovernanceResult<u64> {
        let (assignee, reward, balance) = {
            let mut state = self.state.write().await;
            let is_owner = state.config.is_owner(caller);

            let (reward, assignee) = {
                let task = state
                    .tasks
                    .get(&proposal_id)
                    .ok_or(GovernanceError::TaskNotFound)?;
                if !is_owner && task.proposer != *caller {
                    return Err(GovernanceError::Unauthorized);
                }
                if task.status != TaskStatus::Submitted {
                    return Err(GovernanceError::InvalidTaskState);
                }
                let assignee = task
                    .assignee
                    .clone()
                    .ok_or(GovernanceError::InvalidTaskState)?;
                (task.reward, assignee)
            };

            state.treasury.disburse(reward)?;
            if let Some(task) = state.tasks.get_mut(&proposal_id) {
                task.complete()?;
            }
            (assignee, reward, state.treasury.balance())
        };

        let _ = self.event_tx.send(GovernanceEvent::TaskCompleted {
            proposal_id,
            assignee,
            reward,
            balance,
        });

        Ok(reward)
    }

    pub async fn get_task(&self, proposal_id: u64) -> Option<Task> {
        self.state.read().await.tasks.get(&proposal_id).cloned()
    }

    pub async fn list_tasks(&self) -> Vec<Task> {
        self.state.read().await.tasks.values().cloned().collect()
    }

    // ── Host primitives and reads ──

    /// Advance the chain height. Called by the host adapter as blocks are
    /// produced. Returns the new height.
    pub async fn advance_height(&self, blocks: u64) -> u64 {
        let height = {
            let mut state = self.state.write().await;
            state.height = state.height.saturating_add(blocks);
            state.height
        };

        let _ = self
            .event_tx
            .send(GovernanceEvent::HeightAdvanced { height });

        height
    }

    pub async fn current_height(&self) -> u64 {
        self.state.read().await.height
    }

    pub async fn summary(&self) -> GovernanceSummary {
        let state = self.state.read().await;
        GovernanceSummary {
            member_count: state.members.len() as u64,
            total_voting_power: state.members.total_power(),
            treasury_balance: state.treasury.balance(),
            proposal_count: state.proposals.len() as u64,
            task_count: state.tasks.len() as u64,
            height: state.height,
        }
    }
}
