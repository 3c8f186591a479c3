//! `GovernanceStore` over sea-orm

use async_trait::async_trait;
use chrono::Utc;
use governance_sync::{GovernanceStore, Orchestrator, Proposal, SyncError, Vote, VoteSupport};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, ConnectOptions, ConnectionTrait, Database,
    DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Schema, Set, TransactionTrait,
};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

use crate::entity::{metadata, orchestrators, proposals, votes};
use crate::error::{DbError, Result, store_err};

/// Rows per multi-row INSERT, well under SQLite's bound-parameter limit
const INSERT_CHUNK: usize = 500;

pub struct SqlStore {
    connection: DatabaseConnection,
}

impl SqlStore {
    /// Connect to `database_url` and create any missing tables and indices
    pub async fn connect(database_url: &str) -> Result<Self> {
        info!("Connecting to governance database...");

        let mut opt = ConnectOptions::new(database_url.to_string());
        // every connection to an in-memory SQLite database is a separate database
        let max_connections = if database_url.contains(":memory:") { 1 } else { 10 };
        opt.max_connections(max_connections)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(30))
            .sqlx_logging(false);

        let connection = Database::connect(opt).await?;
        let store = Self { connection };
        store.create_schema().await?;

        info!(
            "Connected to governance database ({:?}, max connections: {})",
            store.connection.get_database_backend(),
            max_connections
        );
        Ok(store)
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    async fn create_schema(&self) -> Result<()> {
        let backend = self.connection.get_database_backend();
        let schema = Schema::new(backend);

        let mut tables = [
            schema.create_table_from_entity(orchestrators::Entity),
            schema.create_table_from_entity(proposals::Entity),
            schema.create_table_from_entity(votes::Entity),
            schema.create_table_from_entity(metadata::Entity),
        ];
        for table in tables.iter_mut() {
            table.if_not_exists();
            self.connection.execute(backend.build(&*table)).await?;
        }

        for mut index in schema.create_index_from_entity(votes::Entity) {
            index.if_not_exists();
            self.connection.execute(backend.build(&index)).await?;
        }

        debug!("Governance schema is in place");
        Ok(())
    }
}

impl From<orchestrators::Model> for Orchestrator {
    fn from(model: orchestrators::Model) -> Self {
        Self {
            address: model.address,
            name: model.name,
            avatar: model.avatar,
            total_stake: model.total_stake,
            reward_cut: model.reward_cut,
            fee_cut: model.fee_cut,
            active: model.active,
            service_uri: model.service_uri,
        }
    }
}

impl From<proposals::Model> for Proposal {
    fn from(model: proposals::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            proposer: model.proposer,
            proposer_name: model.proposer_name,
            proposer_avatar: model.proposer_avatar,
            created_at: model.created_at,
            total_stake_voted: model.total_stake_voted,
        }
    }
}

impl TryFrom<votes::Model> for Vote {
    type Error = DbError;

    fn try_from(model: votes::Model) -> Result<Self> {
        let support = VoteSupport::parse(&model.support).ok_or_else(|| {
            DbError::InvalidValue(format!(
                "vote {} has unknown support '{}'",
                model.id, model.support
            ))
        })?;

        Ok(Self {
            proposal_id: model.proposal_id,
            voter: model.voter,
            voter_name: model.voter_name,
            voter_avatar: model.voter_avatar,
            support,
            stake_amount: model.stake_amount,
            cast_at: model.cast_at,
        })
    }
}

fn to_votes(models: Vec<votes::Model>) -> governance_sync::Result<Vec<Vote>> {
    models
        .into_iter()
        .map(|model| Vote::try_from(model).map_err(SyncError::from))
        .collect()
}

#[async_trait]
impl GovernanceStore for SqlStore {
    async fn upsert_orchestrators(
        &self,
        orchestrators: Vec<Orchestrator>,
    ) -> governance_sync::Result<()> {
        if orchestrators.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let txn = self.connection.begin().await.map_err(store_err)?;
        for chunk in orchestrators.chunks(INSERT_CHUNK) {
            let models = chunk.iter().map(|o| orchestrators::ActiveModel {
                address: Set(o.address.clone()),
                name: Set(o.name.clone()),
                avatar: Set(o.avatar.clone()),
                total_stake: Set(o.total_stake),
                reward_cut: Set(o.reward_cut),
                fee_cut: Set(o.fee_cut),
                active: Set(o.active),
                service_uri: Set(o.service_uri.clone()),
                updated_at: Set(now),
            });

            orchestrators::Entity::insert_many(models)
                .on_conflict(
                    OnConflict::column(orchestrators::Column::Address)
                        .update_columns([
                            orchestrators::Column::Name,
                            orchestrators::Column::Avatar,
                            orchestrators::Column::TotalStake,
                            orchestrators::Column::RewardCut,
                            orchestrators::Column::FeeCut,
                            orchestrators::Column::Active,
                            orchestrators::Column::ServiceUri,
                            orchestrators::Column::UpdatedAt,
                        ])
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await
                .map_err(store_err)?;
        }
        txn.commit().await.map_err(store_err)?;

        debug!("Upserted {} orchestrators", orchestrators.len());
        Ok(())
    }

    async fn get_orchestrator(
        &self,
        address: &str,
    ) -> governance_sync::Result<Option<Orchestrator>> {
        Ok(orchestrators::Entity::find_by_id(address.to_string())
            .one(&self.connection)
            .await
            .map_err(store_err)?
            .map(Orchestrator::from))
    }

    async fn get_orchestrators(
        &self,
        addresses: &[String],
    ) -> governance_sync::Result<HashMap<String, Orchestrator>> {
        let mut found = HashMap::with_capacity(addresses.len());
        for chunk in addresses.chunks(INSERT_CHUNK) {
            let models = orchestrators::Entity::find()
                .filter(orchestrators::Column::Address.is_in(chunk.iter().cloned()))
                .all(&self.connection)
                .await
                .map_err(store_err)?;
            for model in models {
                found.insert(model.address.clone(), Orchestrator::from(model));
            }
        }
        Ok(found)
    }

    async fn list_orchestrators(&self) -> governance_sync::Result<Vec<Orchestrator>> {
        Ok(orchestrators::Entity::find()
            .order_by_asc(orchestrators::Column::Address)
            .all(&self.connection)
            .await
            .map_err(store_err)?
            .into_iter()
            .map(Orchestrator::from)
            .collect())
    }

    async fn get_proposal(&self, id: &str) -> governance_sync::Result<Option<Proposal>> {
        Ok(proposals::Entity::find_by_id(id.to_string())
            .one(&self.connection)
            .await
            .map_err(store_err)?
            .map(Proposal::from))
    }

    async fn add_proposal(&self, proposal: Proposal) -> governance_sync::Result<()> {
        let model = proposals::ActiveModel {
            id: Set(proposal.id),
            title: Set(proposal.title),
            description: Set(proposal.description),
            proposer: Set(proposal.proposer),
            proposer_name: Set(proposal.proposer_name),
            proposer_avatar: Set(proposal.proposer_avatar),
            created_at: Set(proposal.created_at),
            total_stake_voted: Set(proposal.total_stake_voted),
        };

        proposals::Entity::insert(model)
            .exec_without_returning(&self.connection)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn update_proposal_stake(
        &self,
        id: &str,
        total_stake_voted: f64,
    ) -> governance_sync::Result<()> {
        let result = proposals::Entity::update_many()
            .col_expr(
                proposals::Column::TotalStakeVoted,
                Expr::value(total_stake_voted),
            )
            .filter(proposals::Column::Id.eq(id))
            .exec(&self.connection)
            .await
            .map_err(store_err)?;

        if result.rows_affected == 0 {
            return Err(SyncError::Store(format!("proposal {} not found", id)));
        }
        Ok(())
    }

    async fn list_proposals(&self) -> governance_sync::Result<Vec<Proposal>> {
        Ok(proposals::Entity::find()
            .order_by_asc(proposals::Column::Id)
            .all(&self.connection)
            .await
            .map_err(store_err)?
            .into_iter()
            .map(Proposal::from)
            .collect())
    }

    async fn add_votes(&self, votes: Vec<Vote>) -> governance_sync::Result<()> {
        if votes.is_empty() {
            return Ok(());
        }

        // dropping the transaction on an early return rolls the whole batch back
        let txn = self.connection.begin().await.map_err(store_err)?;
        for chunk in votes.chunks(INSERT_CHUNK) {
            let models = chunk.iter().map(|v| votes::ActiveModel {
                id: NotSet,
                proposal_id: Set(v.proposal_id.clone()),
                voter: Set(v.voter.clone()),
                voter_name: Set(v.voter_name.clone()),
                voter_avatar: Set(v.voter_avatar.clone()),
                support: Set(v.support.as_str().to_string()),
                stake_amount: Set(v.stake_amount),
                cast_at: Set(v.cast_at),
            });

            votes::Entity::insert_many(models)
                .exec_without_returning(&txn)
                .await
                .map_err(store_err)?;
        }
        txn.commit().await.map_err(store_err)?;

        debug!("Inserted {} votes", votes.len());
        Ok(())
    }

    async fn votes_for_proposal(&self, proposal_id: &str) -> governance_sync::Result<Vec<Vote>> {
        let models = votes::Entity::find()
            .filter(votes::Column::ProposalId.eq(proposal_id))
            .order_by_asc(votes::Column::Id)
            .all(&self.connection)
            .await
            .map_err(store_err)?;
        to_votes(models)
    }

    async fn list_votes(&self) -> governance_sync::Result<Vec<Vote>> {
        let models = votes::Entity::find()
            .order_by_asc(votes::Column::Id)
            .all(&self.connection)
            .await
            .map_err(store_err)?;
        to_votes(models)
    }

    async fn get_metadata(&self, key: &str) -> governance_sync::Result<Option<u64>> {
        let Some(model) = metadata::Entity::find_by_id(key.to_string())
            .one(&self.connection)
            .await
            .map_err(store_err)?
        else {
            return Ok(None);
        };

        let value = u64::try_from(model.value).map_err(|_| {
            DbError::InvalidValue(format!("metadata {} is negative: {}", key, model.value))
        })?;
        Ok(Some(value))
    }

    async fn put_metadata(&self, key: &str, value: u64) -> governance_sync::Result<()> {
        let stored = i64::try_from(value).map_err(|_| {
            SyncError::Conversion(format!("metadata {} value {} exceeds i64", key, value))
        })?;

        metadata::Entity::insert(metadata::ActiveModel {
            key: Set(key.to_string()),
            value: Set(stored),
        })
        .on_conflict(
            OnConflict::column(metadata::Column::Key)
                .update_column(metadata::Column::Value)
                .to_owned(),
        )
        .exec_without_returning(&self.connection)
        .await
        .map_err(store_err)?;
        Ok(())
    }
}
