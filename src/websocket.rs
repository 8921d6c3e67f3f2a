//! WebSocket host adapter
//!
//! Translates the host's operation stream onto the governance engine, one
//! message per public operation. The host supplies verified caller
//! identities, so every operation message carries an explicit `caller`
//! field and this adapter performs no authentication of its own.
//! Successful mutations are snapshotted to the store; governance events are
//! forwarded to every connected client as `event` frames.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::governance::{
    AccountId, Deliverable, GovernanceError, GovernanceEvent, ProposalStatus, VoteChoice,
};
use crate::AppState;

/// WebSocket handler
pub async fn handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.engine.subscribe();

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                let Some(incoming) = incoming else { break };
                let text = match incoming {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                };

                // Parse client message
                let client_msg: ClientMessage = match serde_json::from_str(&text) {
                    Ok(m) => m,
                    Err(e) => {
                        let error = ServerMessage::Error {
                            code: None,
                            message: format!("Invalid message: {}", e),
                        };
                        if send_msg(&mut sender, &error).await.is_err() {
                            break;
                        }
                        continue;
                    }
                };

                let mutating = client_msg.is_mutating();
                let (reply, committed) = match dispatch(&state, client_msg).await {
                    Ok(msg) => (msg, mutating),
                    Err(e) => (
                        ServerMessage::Error {
                            code: e.code(),
                            message: e.to_string(),
                        },
                        false,
                    ),
                };

                if committed {
                    let snapshot = state.engine.snapshot().await;
                    if let Err(e) = state.store.save_snapshot(&snapshot).await {
                        tracing::error!("Failed to persist snapshot: {}", e);
                    }
                }

                if send_msg(&mut sender, &reply).await.is_err() {
                    break;
                }
            }
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        let msg = ServerMessage::Event { event };
                        if send_msg(&mut sender, &msg).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Client lagged behind event stream, skipped {}", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

async fn send_msg(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), ()> {
    let text = match serde_json::to_string(msg) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("Failed to encode message: {}", e);
            return Err(());
        }
    };
    sender.send(Message::Text(text.into())).await.map_err(|e| {
        tracing::error!("Failed to send message: {}", e);
    })
}

/// Route one client message to the engine
async fn dispatch(state: &Arc<AppState>, msg: ClientMessage) -> crate::error::Result<ServerMessage> {
    let engine = &state.engine;

    match msg {
        ClientMessage::GrantMember {
            caller,
            account,
            power,
        } => {
            engine.grant_member(&caller, account.clone(), power).await?;
            tracing::info!("member {} granted power {}", account, power);
            Ok(ServerMessage::MemberGranted { account })
        }
        ClientMessage::RevokeMember { caller, account } => {
            engine.revoke_member(&caller, account.clone()).await?;
            tracing::info!("member {} revoked", account);
            Ok(ServerMessage::MemberRevoked { account })
        }
        ClientMessage::FundTreasury { caller, amount } => {
            let funded = engine.fund_treasury(&caller, amount).await?;
            Ok(ServerMessage::TreasuryFunded {
                amount: funded,
                balance: engine.treasury_balance().await,
            })
        }
        ClientMessage::CreateProposal {
            caller,
            title,
            description,
            reward,
        } => {
            let proposal_id = engine
                .create_proposal(&caller, title, description, reward)
                .await?;
            tracing::info!("proposal {} created by {}", proposal_id, caller);
            Ok(ServerMessage::ProposalCreated { proposal_id })
        }
        ClientMessage::VoteOnProposal {
            caller,
            proposal_id,
            choice,
        } => {
            engine.vote_on_proposal(&caller, proposal_id, choice).await?;
            Ok(ServerMessage::VoteRecorded {
                proposal_id,
                voter: caller,
            })
        }
        ClientMessage::FinalizeProposal {
            caller,
            proposal_id,
        } => {
            let outcome = engine.finalize_proposal(&caller, proposal_id).await?;
            tracing::info!("proposal {} finalized: {}", proposal_id, outcome.as_str());
            Ok(ServerMessage::ProposalFinalized {
                proposal_id,
                outcome,
            })
        }
        ClientMessage::AssignTask {
            caller,
            proposal_id,
            assignee,
        } => {
            engine
                .assign_task(&caller, proposal_id, assignee.clone())
                .await?;
            Ok(ServerMessage::TaskAssigned {
                proposal_id,
                assignee,
            })
        }
        ClientMessage::SubmitDeliverable {
            caller,
            proposal_id,
            deliverable,
        } => {
            let deliverable = Deliverable::from_hex(&deliverable)?;
            engine
                .submit_deliverable(&caller, proposal_id, deliverable)
                .await?;
            Ok(ServerMessage::DeliverableSubmitted { proposal_id })
        }
        ClientMessage::ApproveTaskCompletion {
            caller,
            proposal_id,
        } => {
            let reward = engine.approve_task_completion(&caller, proposal_id).await?;
            tracing::info!("task {} completed, {} disbursed", proposal_id, reward);
            Ok(ServerMessage::TaskCompleted {
                proposal_id,
                reward,
            })
        }
        ClientMessage::SetVotingPeriod { caller, blocks } => {
            engine.set_voting_period(&caller, blocks).await?;
            Ok(ServerMessage::ConfigUpdated {
                config: engine.config().await,
            })
        }
        ClientMessage::SetQuorumThreshold { caller, pct } => {
            engine.set_quorum_threshold(&caller, pct).await?;
            Ok(ServerMessage::ConfigUpdated {
                config: engine.config().await,
            })
        }
        ClientMessage::SetApprovalThreshold { caller, pct } => {
            engine.set_approval_threshold(&caller, pct).await?;
            Ok(ServerMessage::ConfigUpdated {
                config: engine.config().await,
            })
        }
        ClientMessage::AdvanceHeight { blocks } => {
            let height = engine.advance_height(blocks).await;
            Ok(ServerMessage::HeightAdvanced { height })
        }
        ClientMessage::GetMember { account } => {
            let power = engine
                .get_member(&account)
                .await
                .ok_or(GovernanceError::MemberNotFound)?;
            Ok(ServerMessage::Member { account, power })
        }
        ClientMessage::GetTreasuryBalance => Ok(ServerMessage::TreasuryBalance {
            balance: engine.treasury_balance().await,
        }),
        ClientMessage::GetProposal { proposal_id } => {
            let proposal = engine
                .get_proposal(proposal_id)
                .await
                .ok_or(GovernanceError::ProposalNotFound)?;
            Ok(ServerMessage::Proposal { proposal })
        }
        ClientMessage::HasVoted {
            proposal_id,
            account,
        } => {
            let voted = engine.has_voted(proposal_id, &account).await;
            Ok(ServerMessage::Voted {
                proposal_id,
                account,
                voted,
            })
        }
        ClientMessage::GetTask { proposal_id } => {
            let task = engine
                .get_task(proposal_id)
                .await
                .ok_or(GovernanceError::TaskNotFound)?;
            Ok(ServerMessage::Task { task })
        }
        ClientMessage::GetConfig => Ok(ServerMessage::Config {
            config: engine.config().await,
        }),
        ClientMessage::GetSummary => Ok(ServerMessage::Summary {
            summary: engine.summary().await,
        }),
        ClientMessage::ListProposals => Ok(ServerMessage::Proposals {
            proposals: engine.list_proposals().await,
        }),
        ClientMessage::ListTasks => Ok(ServerMessage::Tasks {
            tasks: engine.list_tasks().await,
        }),
    }
}

/// Messages from client to server
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Grant (or overwrite) voting power for an account
    GrantMember {
        caller: AccountId,
        account: AccountId,
        power: u64,
    },
    /// Remove an account from the membership
    RevokeMember {
        caller: AccountId,
        account: AccountId,
    },
    /// Deposit into the treasury
    FundTreasury { caller: AccountId, amount: u64 },
    /// Create a proposal
    CreateProposal {
        caller: AccountId,
        title: String,
        description: String,
        reward: u64,
    },
    /// Cast a stake-weighted vote
    VoteOnProposal {
        caller: AccountId,
        proposal_id: u64,
        choice: VoteChoice,
    },
    /// Finalize a proposal after its deadline
    FinalizeProposal {
        caller: AccountId,
        proposal_id: u64,
    },
    /// Assign an approved proposal's task
    AssignTask {
        caller: AccountId,
        proposal_id: u64,
        assignee: AccountId,
    },
    /// Submit the deliverable (64 hex characters) for an assigned task
    SubmitDeliverable {
        caller: AccountId,
        proposal_id: u64,
        deliverable: String,
    },
    /// Approve a submitted task and disburse its reward
    ApproveTaskCompletion {
        caller: AccountId,
        proposal_id: u64,
    },
    /// Set the voting window length in blocks
    SetVotingPeriod { caller: AccountId, blocks: u64 },
    /// Set the quorum threshold percentage
    SetQuorumThreshold { caller: AccountId, pct: u64 },
    /// Set the approval threshold percentage
    SetApprovalThreshold { caller: AccountId, pct: u64 },
    /// Host primitive: advance the chain height
    AdvanceHeight { blocks: u64 },
    /// Look up a member's voting power
    GetMember { account: AccountId },
    /// Read the treasury balance
    GetTreasuryBalance,
    /// Look up a proposal by id
    GetProposal { proposal_id: u64 },
    /// Check whether an account voted on a proposal
    HasVoted {
        proposal_id: u64,
        account: AccountId,
    },
    /// Look up a task by proposal id
    GetTask { proposal_id: u64 },
    /// Read the governance configuration
    GetConfig,
    /// Read the governance summary
    GetSummary,
    /// List all proposals
    ListProposals,
    /// List all tasks
    ListTasks,
}

impl ClientMessage {
    /// Whether this operation mutates governance state and therefore needs
    /// a fresh snapshot persisted
    fn is_mutating(&self) -> bool {
        matches!(
            self,
            ClientMessage::GrantMember { .. }
                | ClientMessage::RevokeMember { .. }
                | ClientMessage::FundTreasury { .. }
                | ClientMessage::CreateProposal { .. }
                | ClientMessage::VoteOnProposal { .. }
                | ClientMessage::FinalizeProposal { .. }
                | ClientMessage::AssignTask { .. }
                | ClientMessage::SubmitDeliverable { .. }
                | ClientMessage::ApproveTaskCompletion { .. }
                | ClientMessage::SetVotingPeriod { .. }
                | ClientMessage::SetQuorumThreshold { .. }
                | ClientMessage::SetApprovalThreshold { .. }
                | ClientMessage::AdvanceHeight { .. }
        )
    }
}

/// Messages from server to client
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Member was granted power
    MemberGranted { account: AccountId },
    /// Member was revoked
    MemberRevoked { account: AccountId },
    /// Treasury received a deposit
    TreasuryFunded { amount: u64, balance: u64 },
    /// Proposal was created
    ProposalCreated { proposal_id: u64 },
    /// Vote was recorded
    VoteRecorded { proposal_id: u64, voter: AccountId },
    /// Proposal was finalized
    ProposalFinalized {
        proposal_id: u64,
        outcome: ProposalStatus,
    },
    /// Task was assigned
    TaskAssigned {
        proposal_id: u64,
        assignee: AccountId,
    },
    /// Deliverable was recorded
    DeliverableSubmitted { proposal_id: u64 },
    /// Task was completed and its reward disbursed
    TaskCompleted { proposal_id: u64, reward: u64 },
    /// A voting parameter changed
    ConfigUpdated {
        config: crate::governance::GovernanceConfig,
    },
    /// Chain height advanced
    HeightAdvanced { height: u64 },
    /// Member lookup result
    Member { account: AccountId, power: u64 },
    /// Treasury balance
    TreasuryBalance { balance: u64 },
    /// Proposal lookup result
    Proposal {
        proposal: crate::governance::Proposal,
    },
    /// Vote-cast lookup result
    Voted {
        proposal_id: u64,
        account: AccountId,
        voted: bool,
    },
    /// Task lookup result
    Task { task: crate::governance::Task },
    /// Governance configuration
    Config {
        config: crate::governance::GovernanceConfig,
    },
    /// Governance summary
    Summary {
        summary: crate::governance::GovernanceSummary,
    },
    /// All proposals
    Proposals {
        proposals: Vec<crate::governance::Proposal>,
    },
    /// All tasks
    Tasks { tasks: Vec<crate::governance::Task> },
    /// Broadcast governance event
    Event { event: GovernanceEvent },
    /// Error occurred
    Error { code: Option<u32>, message: String },
}
