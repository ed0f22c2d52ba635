use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Ledger entry kinds. Amounts are stored as positive magnitudes; the
/// aggregator applies the sign by kind: earned/bonus add, the rest
/// subtract. `Clawback` reverses part of a prior earn after a refund.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(
    rs_type = "String",
    db_type = "Enum",
    enum_name = "point_transaction_kind"
)]
#[serde(rename_all = "snake_case")]
pub enum PointTransactionKind {
    #[sea_orm(string_value = "earned")]
    Earned,
    #[sea_orm(string_value = "bonus")]
    Bonus,
    #[sea_orm(string_value = "used")]
    Used,
    #[sea_orm(string_value = "expired")]
    Expired,
    #[sea_orm(string_value = "clawback")]
    Clawback,
}

impl PointTransactionKind {
    /// Kinds that add to the balance.
    pub fn is_credit(&self) -> bool {
        matches!(self, Self::Earned | Self::Bonus)
    }
}

impl std::fmt::Display for PointTransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointTransactionKind::Earned => write!(f, "earned"),
            PointTransactionKind::Bonus => write!(f, "bonus"),
            PointTransactionKind::Used => write!(f, "used"),
            PointTransactionKind::Expired => write!(f, "expired"),
            PointTransactionKind::Clawback => write!(f, "clawback"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "point_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub order_id: Option<String>,
    pub kind: PointTransactionKind,
    pub amount: i64,
    pub description: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub source_transaction_id: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
