use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// A user's claim on a catalog coupon. `used_order_id` is set iff
/// `is_used`; the transition to used happens exactly once, through a
/// conditional update keyed by id.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "user_coupons")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub coupon_id: i64,
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub used_order_id: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
