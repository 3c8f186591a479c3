//! orchestrators entity
//! Directory snapshot keyed by lowercase address

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orchestrators")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub address: String,
    pub name: String,
    pub avatar: String,
    pub total_stake: f64,
    pub reward_cut: f64,
    pub fee_cut: f64,
    pub active: bool,
    pub service_uri: String,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
