use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "coupon_discount_type")]
#[serde(rename_all = "snake_case")]
pub enum CouponDiscountType {
    /// `discount_value` is a percentage of the order amount (0-100),
    /// optionally capped by `max_discount_amount`.
    #[sea_orm(string_value = "percentage")]
    Percentage,
    /// `discount_value` is an absolute amount in minor currency units.
    #[sea_orm(string_value = "fixed_amount")]
    FixedAmount,
}

impl std::fmt::Display for CouponDiscountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CouponDiscountType::Percentage => write!(f, "percentage"),
            CouponDiscountType::FixedAmount => write!(f, "fixed_amount"),
        }
    }
}

/// Catalog coupon template. Immutable apart from the usage counter.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub code: String,
    pub name: String,
    pub discount_type: CouponDiscountType,
    pub discount_value: i64,
    pub min_order_amount: i64,
    pub max_discount_amount: Option<i64>,
    pub is_active: bool,
    pub usage_limit: Option<i64>,
    pub used_count: i64,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
