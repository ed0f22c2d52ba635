use crate::entities::{point_transaction_entity as point_transactions, PointTransactionKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Order-completion accrual request. The order subsystem supplies the
/// order total; the accrual rate is service configuration.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct EarnPointsRequest {
    pub user_id: i64,
    pub order_id: String,
    /// Order total in minor currency units.
    pub order_amount: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EarnPointsResponse {
    /// None when the order total was too small to accrue any points.
    pub transaction_id: Option<i64>,
    pub points_earned: i64,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Manual/administrative grant; not tied to an order.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct GrantBonusRequest {
    pub user_id: i64,
    pub amount: i64,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct SpendPointsRequest {
    pub user_id: i64,
    pub order_id: String,
    pub amount: i64,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SpendPointsResponse {
    pub transaction_id: i64,
    pub points_spent: i64,
    pub balance: i64,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct RefundPointsRequest {
    pub user_id: i64,
    pub order_id: String,
    /// Amount actually refunded, in minor currency units.
    pub refund_amount: i64,
    /// Original order total the earn was based on.
    pub original_order_amount: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefundPointsResponse {
    /// None when the proportional clawback rounded down to zero.
    pub transaction_id: Option<i64>,
    pub points_clawed_back: i64,
    pub balance: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    pub user_id: i64,
    pub balance: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PointStatisticsResponse {
    pub total_earned: i64,
    pub total_used: i64,
    pub total_expired: i64,
    pub current_balance: i64,
    /// Points from grants whose expiry falls within the configured
    /// expiring-soon window.
    pub expiring_soon: i64,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct PointTransactionQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PointTransactionResponse {
    pub id: i64,
    pub order_id: Option<String>,
    pub kind: PointTransactionKind,
    pub amount: i64,
    pub description: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<point_transactions::Model> for PointTransactionResponse {
    fn from(t: point_transactions::Model) -> Self {
        Self {
            id: t.id,
            order_id: t.order_id,
            kind: t.kind,
            amount: t.amount,
            description: t.description,
            expires_at: t.expires_at,
            created_at: t.created_at,
        }
    }
}
