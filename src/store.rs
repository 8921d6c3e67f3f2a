//! Database store for governance state snapshots
//!
//! The engine owns the live state; the store writes a consistent snapshot of
//! the whole aggregate after each successful mutating operation and reloads
//! it at startup. All tables are replaced inside one transaction, so a crash
//! mid-write never leaves a torn snapshot.

use sqlx::SqlitePool;

use crate::error::{AppError, Result};
use crate::governance::{
    AccountId, Deliverable, GovernanceConfig, GovernanceState, MemberRegistry, Proposal, Task,
    Treasury, VoteRecord,
};

/// Database store
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a full snapshot of the governance state
    pub async fn save_snapshot(&self, state: &GovernanceState) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Children first so foreign keys stay satisfied
        sqlx::query("DELETE FROM votes").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM tasks").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM proposals")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM members").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM governance_meta")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO governance_meta
                (id, owner, voting_period_blocks, quorum_threshold_pct,
                 approval_threshold_pct, treasury_balance, next_proposal_id, height)
            VALUES (1, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(state.config.owner.as_str())
        .bind(state.config.voting_period_blocks as i64)
        .bind(state.config.quorum_threshold_pct as i64)
        .bind(state.config.approval_threshold_pct as i64)
        .bind(state.treasury.balance() as i64)
        .bind(state.next_proposal_id as i64)
        .bind(state.height as i64)
        .execute(&mut *tx)
        .await?;

        for (account, power) in state.members.iter() {
            sqlx::query("INSERT INTO members (account, power) VALUES (?, ?)")
                .bind(account.as_str())
                .bind(power as i64)
                .execute(&mut *tx)
                .await?;
        }

        for proposal in state.proposals.values() {
            sqlx::query(
                r#"
                INSERT INTO proposals
                    (id, title, description, proposer, reward, created_at_height,
                     voting_deadline_height, yes_weight, no_weight, status, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(proposal.id as i64)
            .bind(&proposal.title)
            .bind(&proposal.description)
            .bind(proposal.proposer.as_str())
            .bind(proposal.reward as i64)
            .bind(proposal.created_at_height as i64)
            .bind(proposal.voting_deadline_height as i64)
            .bind(proposal.yes_weight as i64)
            .bind(proposal.no_weight as i64)
            .bind(proposal.status.as_str())
            .bind(proposal.created_at)
            .execute(&mut *tx)
            .await?;
        }

        for (proposal_id, records) in &state.votes {
            for record in records.values() {
                sqlx::query(
                    r#"
                    INSERT INTO votes (proposal_id, voter, choice, weight, cast_at_height)
                    VALUES (?, ?, ?, ?, ?)
                    "#,
                )
                .bind(*proposal_id as i64)
                .bind(record.voter.as_str())
                .bind(record.choice.as_str())
                .bind(record.weight as i64)
                .bind(record.cast_at_height as i64)
                .execute(&mut *tx)
                .await?;
            }
        }

        for task in state.tasks.values() {
            sqlx::query(
                r#"
                INSERT INTO tasks
                    (proposal_id, proposer, reward, assignee, deliverable, status, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(task.proposal_id as i64)
            .bind(task.proposer.as_str())
            .bind(task.reward as i64)
            .bind(task.assignee.as_ref().map(|a| a.as_str().to_string()))
            .bind(task.deliverable.as_ref().map(|d| d.to_hex()))
            .bind(task.status.as_str())
            .bind(task.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Load the persisted snapshot, or None for a fresh database
    pub async fn load_snapshot(&self) -> Result<Option<GovernanceState>> {
        let meta = sqlx::query_as::<_, MetaRow>(
            r#"
            SELECT owner, voting_period_blocks, quorum_threshold_pct,
                   approval_threshold_pct, treasury_balance, next_proposal_id, height
            FROM governance_meta
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(meta) = meta else {
            return Ok(None);
        };

        let mut members = MemberRegistry::new();
        let member_rows =
            sqlx::query_as::<_, MemberRow>("SELECT account, power FROM members ORDER BY account")
                .fetch_all(&self.pool)
                .await?;
        for row in member_rows {
            members.grant(AccountId::from(row.account), row.power as u64);
        }

        let mut proposals = std::collections::BTreeMap::new();
        let proposal_rows = sqlx::query_as::<_, ProposalRow>(
            r#"
            SELECT id, title, description, proposer, reward, created_at_height,
                   voting_deadline_height, yes_weight, no_weight, status, created_at
            FROM proposals
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        for row in proposal_rows {
            let proposal: Proposal = row.try_into()?;
            proposals.insert(proposal.id, proposal);
        }

        let mut votes: std::collections::BTreeMap<
            u64,
            std::collections::BTreeMap<AccountId, VoteRecord>,
        > = std::collections::BTreeMap::new();
        // Every proposal owns a vote table, even an empty one
        for id in proposals.keys() {
            votes.insert(*id, std::collections::BTreeMap::new());
        }
        let vote_rows = sqlx::query_as::<_, VoteRow>(
            r#"
            SELECT proposal_id, voter, choice, weight, cast_at_height
            FROM votes
            ORDER BY proposal_id ASC, voter ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        for row in vote_rows {
            let proposal_id = row.proposal_id as u64;
            let record: VoteRecord = row.try_into()?;
            votes
                .entry(proposal_id)
                .or_default()
                .insert(record.voter.clone(), record);
        }

        let mut tasks = std::collections::BTreeMap::new();
        let task_rows = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT proposal_id, proposer, reward, assignee, deliverable, status, updated_at
            FROM tasks
            ORDER BY proposal_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        for row in task_rows {
            let task: Task = row.try_into()?;
            tasks.insert(task.proposal_id, task);
        }

        Ok(Some(GovernanceState {
            config: GovernanceConfig {
                owner: AccountId::from(meta.owner),
                voting_period_blocks: meta.voting_period_blocks as u64,
                quorum_threshold_pct: meta.quorum_threshold_pct as u64,
                approval_threshold_pct: meta.approval_threshold_pct as u64,
            },
            members,
            treasury: Treasury::with_balance(meta.treasury_balance as u64),
            next_proposal_id: meta.next_proposal_id as u64,
            proposals,
            votes,
            tasks,
            height: meta.height as u64,
        }))
    }
}

// Internal row types for sqlx

#[derive(sqlx::FromRow)]
struct MetaRow {
    owner: String,
    voting_period_blocks: i64,
    quorum_threshold_pct: i64,
    approval_threshold_pct: i64,
    treasury_balance: i64,
    next_proposal_id: i64,
    height: i64,
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    account: String,
    power: i64,
}

#[derive(sqlx::FromRow)]
struct ProposalRow {
    id: i64,
    title: String,
    description: String,
    proposer: String,
    reward: i64,
    created_at_height: i64,
    voting_deadline_height: i64,
    yes_weight: i64,
    no_weight: i64,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<ProposalRow> for Proposal {
    type Error = AppError;

    fn try_from(row: ProposalRow) -> Result<Self> {
        Ok(Proposal {
            id: row.id as u64,
            title: row.title,
            description: row.description,
            proposer: AccountId::from(row.proposer),
            reward: row.reward as u64,
            created_at_height: row.created_at_height as u64,
            voting_deadline_height: row.voting_deadline_height as u64,
            yes_weight: row.yes_weight as u64,
            no_weight: row.no_weight as u64,
            status: row
                .status
                .parse()
                .map_err(|e| AppError::Internal(format!("Invalid proposal status: {}", e)))?,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct VoteRow {
    proposal_id: i64,
    voter: String,
    choice: String,
    weight: i64,
    cast_at_height: i64,
}

impl TryFrom<VoteRow> for VoteRecord {
    type Error = AppError;

    fn try_from(row: VoteRow) -> Result<Self> {
        Ok(VoteRecord {
            voter: AccountId::from(row.voter),
            choice: row
                .choice
                .parse()
                .map_err(|e| AppError::Internal(format!("Invalid vote choice: {}", e)))?,
            weight: row.weight as u64,
            cast_at_height: row.cast_at_height as u64,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    proposal_id: i64,
    proposer: String,
    reward: i64,
    assignee: Option<String>,
    deliverable: Option<String>,
    status: String,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = AppError;

    fn try_from(row: TaskRow) -> Result<Self> {
        let deliverable = row
            .deliverable
            .map(|s| Deliverable::from_hex(&s))
            .transpose()
            .map_err(|e| AppError::Internal(format!("Invalid deliverable: {}", e)))?;

        Ok(Task {
            proposal_id: row.proposal_id as u64,
            proposer: AccountId::from(row.proposer),
            reward: row.reward as u64,
            assignee: row.assignee.map(AccountId::from),
            deliverable,
            status: row
                .status
                .parse()
                .map_err(|e| AppError::Internal(format!("Invalid task status: {}", e)))?,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::governance::{GovernanceEngine, VoteChoice};

    async fn setup_store() -> Store {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        Store::new(pool)
    }

    fn acct(s: &str) -> AccountId {
        AccountId::from(s)
    }

    #[tokio::test]
    async fn test_load_empty_database() {
        let store = setup_store().await;
        assert!(store.load_snapshot().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let store = setup_store().await;

        let engine = GovernanceEngine::new(acct("deployer"));
        engine
            .grant_member(&acct("deployer"), acct("alice"), 60)
            .await
            .unwrap();
        engine
            .grant_member(&acct("deployer"), acct("bob"), 40)
            .await
            .unwrap();
        engine
            .fund_treasury(&acct("deployer"), 2_000_000)
            .await
            .unwrap();
        engine
            .create_proposal(&acct("alice"), "Bug Fix", "Fix it", 500_000)
            .await
            .unwrap();
        engine
            .vote_on_proposal(&acct("alice"), 1, VoteChoice::Yes)
            .await
            .unwrap();
        engine.advance_height(42).await;

        store.save_snapshot(&engine.snapshot().await).await.unwrap();

        let loaded = store.load_snapshot().await.unwrap().unwrap();
        assert_eq!(loaded.config.owner, acct("deployer"));
        assert_eq!(loaded.treasury.balance(), 2_000_000);
        assert_eq!(loaded.next_proposal_id, 2);
        assert_eq!(loaded.height, 42);
        assert_eq!(loaded.members.power_of(&acct("alice")), 60);
        assert_eq!(loaded.members.total_power(), 100);

        let proposal = loaded.proposals.get(&1).unwrap();
        assert_eq!(proposal.title, "Bug Fix");
        assert_eq!(proposal.yes_weight, 60);

        let records = loaded.votes.get(&1).unwrap();
        assert!(records.contains_key(&acct("alice")));
        assert_eq!(records.get(&acct("alice")).unwrap().weight, 60);
    }

    #[tokio::test]
    async fn test_snapshot_preserves_tasks() {
        let store = setup_store().await;

        let engine = GovernanceEngine::new(acct("deployer"));
        engine
            .grant_member(&acct("deployer"), acct("alice"), 100)
            .await
            .unwrap();
        engine
            .fund_treasury(&acct("deployer"), 2_000_000)
            .await
            .unwrap();
        engine
            .create_proposal(&acct("alice"), "Task", "Description", 500_000)
            .await
            .unwrap();
        engine
            .vote_on_proposal(&acct("alice"), 1, VoteChoice::Yes)
            .await
            .unwrap();
        engine.advance_height(1009).await;
        engine
            .finalize_proposal(&acct("alice"), 1)
            .await
            .unwrap();
        engine
            .assign_task(&acct("alice"), 1, acct("charlie"))
            .await
            .unwrap();
        engine
            .submit_deliverable(
                &acct("charlie"),
                1,
                Deliverable::from_bytes(&[7u8; 32]).unwrap(),
            )
            .await
            .unwrap();

        store.save_snapshot(&engine.snapshot().await).await.unwrap();

        let loaded = store.load_snapshot().await.unwrap().unwrap();
        let task = loaded.tasks.get(&1).unwrap();
        assert_eq!(task.assignee, Some(acct("charlie")));
        assert_eq!(
            task.deliverable,
            Some(Deliverable::from_bytes(&[7u8; 32]).unwrap())
        );
        assert_eq!(task.status.as_str(), "submitted");
    }

    #[tokio::test]
    async fn test_save_replaces_previous_snapshot() {
        let store = setup_store().await;

        let engine = GovernanceEngine::new(acct("deployer"));
        engine
            .fund_treasury(&acct("deployer"), 100)
            .await
            .unwrap();
        store.save_snapshot(&engine.snapshot().await).await.unwrap();

        engine
            .fund_treasury(&acct("deployer"), 900)
            .await
            .unwrap();
        store.save_snapshot(&engine.snapshot().await).await.unwrap();

        let loaded = store.load_snapshot().await.unwrap().unwrap();
        assert_eq!(loaded.treasury.balance(), 1_000);
    }

    #[tokio::test]
    async fn test_restored_engine_continues_id_sequence() {
        let store = setup_store().await;

        let engine = GovernanceEngine::new(acct("deployer"));
        engine
            .grant_member(&acct("deployer"), acct("alice"), 100)
            .await
            .unwrap();
        engine
            .fund_treasury(&acct("deployer"), 1_000)
            .await
            .unwrap();
        engine
            .create_proposal(&acct("alice"), "First", "Description", 100)
            .await
            .unwrap();
        store.save_snapshot(&engine.snapshot().await).await.unwrap();

        let restored =
            GovernanceEngine::from_state(store.load_snapshot().await.unwrap().unwrap());
        let id = restored
            .create_proposal(&acct("alice"), "Second", "Description", 100)
            .await
            .unwrap();
        assert_eq!(id, 2);
    }
}
