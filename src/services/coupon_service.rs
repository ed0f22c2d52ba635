use crate::entities::{
    coupon_entity as coupons, user_coupon_entity as user_coupons, CouponDiscountType,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    GrantCouponRequest, PaginatedResponse, PaginationParams, RedeemCouponRequest,
    RedeemCouponResponse, UserCouponQuery, UserCouponResponse, UserCouponStatus,
};
use chrono::{Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait, UpdateMany, UpdateResult,
};
use std::collections::HashMap;

/// Discount granted by a coupon template against an order total.
/// Percentage values are capped by `max_discount_amount` when set, and
/// no discount ever exceeds the order amount itself.
pub fn compute_discount(template: &coupons::Model, order_amount: i64) -> AppResult<i64> {
    if order_amount < template.min_order_amount {
        return Err(AppError::ValidationError(format!(
            "Order amount {} below coupon minimum {}",
            order_amount, template.min_order_amount
        )));
    }
    let raw = match template.discount_type {
        CouponDiscountType::Percentage => order_amount * template.discount_value / 100,
        CouponDiscountType::FixedAmount => template.discount_value,
    };
    let capped = match template.max_discount_amount {
        Some(cap) => raw.min(cap),
        None => raw,
    };
    Ok(capped.clamp(0, order_amount))
}

/// Catalog counter move for one redemption. When the template carries a
/// usage limit the increment only matches while `used_count` is below
/// it, so concurrent redemptions of different claims cannot push the
/// template past its limit.
fn used_count_increment(template: &coupons::Model) -> UpdateMany<coupons::Entity> {
    let mut update = coupons::Entity::update_many()
        .col_expr(
            coupons::Column::UsedCount,
            Expr::col(coupons::Column::UsedCount).add(1),
        )
        .filter(coupons::Column::Id.eq(template.id));
    if template.usage_limit.is_some() {
        update = update.filter(
            Expr::col(coupons::Column::UsedCount).lt(Expr::col(coupons::Column::UsageLimit)),
        );
    }
    update
}

/// Coordinates the `available -> used` transition of user coupon
/// claims. The transition is one conditional UPDATE keyed directly by
/// claim id, so concurrent redemption attempts on the same claim
/// produce exactly one winner.
#[derive(Clone)]
pub struct CouponService {
    pool: DatabaseConnection,
}

impl CouponService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// Create a claim on an active catalog template for a user.
    pub async fn grant(&self, request: GrantCouponRequest) -> AppResult<UserCouponResponse> {
        let valid_days = request.valid_days.unwrap_or(30);
        if valid_days <= 0 {
            return Err(AppError::ValidationError(
                "Coupon validity must be positive".to_string(),
            ));
        }

        let template = coupons::Entity::find()
            .filter(coupons::Column::Code.eq(&request.coupon_code))
            .filter(coupons::Column::IsActive.eq(true))
            .one(&self.pool)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No active coupon with code {}", request.coupon_code))
            })?;

        let claim = user_coupons::ActiveModel {
            user_id: Set(request.user_id),
            coupon_id: Set(template.id),
            is_used: Set(false),
            expires_at: Set(Utc::now() + Duration::days(valid_days)),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        Ok(UserCouponResponse::from_claim(claim, &template))
    }

    /// Redeem a claim against an order. At-most-once: the conditional
    /// update succeeds for exactly one caller; everyone else observes
    /// AlreadyRedeemed.
    pub async fn redeem(&self, request: RedeemCouponRequest) -> AppResult<RedeemCouponResponse> {
        let now = Utc::now();

        let claim = user_coupons::Entity::find_by_id(request.user_coupon_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("User coupon {} not found", request.user_coupon_id))
            })?;

        let template = coupons::Entity::find_by_id(claim.coupon_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| {
                AppError::InternalError(format!(
                    "Coupon template {} missing for claim {}",
                    claim.coupon_id, claim.id
                ))
            })?;

        if !template.is_active {
            return Err(AppError::ValidationError(format!(
                "Coupon {} is no longer active",
                template.code
            )));
        }
        if let Some(limit) = template.usage_limit
            && template.used_count >= limit
        {
            return Err(AppError::ValidationError(format!(
                "Coupon {} has reached its usage limit",
                template.code
            )));
        }
        match UserCouponStatus::of(&claim, now) {
            UserCouponStatus::Used => {
                return Err(AppError::AlreadyRedeemed(format!(
                    "User coupon {} was already used",
                    claim.id
                )));
            }
            UserCouponStatus::Expired => {
                return Err(AppError::AlreadyRedeemed(format!(
                    "User coupon {} has expired",
                    claim.id
                )));
            }
            UserCouponStatus::Available => {}
        }

        let discount_amount = compute_discount(&template, request.order_amount)?;

        // Claim transition and catalog counter commit together or not at
        // all; an early return drops the transaction and rolls both back.
        let txn = self.pool.begin().await?;

        // The atomic transition; the pre-checks above only produce
        // precise error messages, this is what prevents double spending.
        let update_result: UpdateResult = user_coupons::Entity::update_many()
            .col_expr(user_coupons::Column::IsUsed, Expr::value(true))
            .col_expr(user_coupons::Column::UsedAt, Expr::value(now))
            .col_expr(
                user_coupons::Column::UsedOrderId,
                Expr::value(request.order_id.clone()),
            )
            .filter(user_coupons::Column::Id.eq(claim.id))
            .filter(user_coupons::Column::IsUsed.eq(false))
            .filter(user_coupons::Column::ExpiresAt.gt(now))
            .exec(&txn)
            .await?;

        if update_result.rows_affected == 0 {
            return Err(AppError::AlreadyRedeemed(format!(
                "User coupon {} was redeemed concurrently",
                claim.id
            )));
        }

        let counter_result = used_count_increment(&template).exec(&txn).await?;
        if template.usage_limit.is_some() && counter_result.rows_affected == 0 {
            // Another redemption took the last slot after the pre-check.
            return Err(AppError::ValidationError(format!(
                "Coupon {} has reached its usage limit",
                template.code
            )));
        }

        txn.commit().await?;

        log::info!(
            "User coupon {} redeemed against order {} for {}",
            claim.id,
            request.order_id,
            discount_amount
        );

        Ok(RedeemCouponResponse {
            user_coupon_id: claim.id,
            order_id: request.order_id,
            discount_amount,
        })
    }

    /// Paginated claims for a user, optionally filtered by derived
    /// status.
    pub async fn list_user_coupons(
        &self,
        user_id: i64,
        query: &UserCouponQuery,
    ) -> AppResult<PaginatedResponse<UserCouponResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);
        let now = Utc::now();

        let mut base_query =
            user_coupons::Entity::find().filter(user_coupons::Column::UserId.eq(user_id));

        if let Some(status) = &query.status {
            base_query = match status.as_str() {
                "available" => base_query
                    .filter(user_coupons::Column::IsUsed.eq(false))
                    .filter(user_coupons::Column::ExpiresAt.gt(now)),
                "used" => base_query.filter(user_coupons::Column::IsUsed.eq(true)),
                "expired" => base_query
                    .filter(user_coupons::Column::IsUsed.eq(false))
                    .filter(user_coupons::Column::ExpiresAt.lte(now)),
                other => {
                    return Err(AppError::ValidationError(format!(
                        "Unknown coupon status filter: {other}"
                    )));
                }
            };
        }

        let total = base_query.clone().count(&self.pool).await? as i64;

        let claims = base_query
            .order_by_desc(user_coupons::Column::CreatedAt)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.pool)
            .await?;

        let coupon_ids: Vec<i64> = claims.iter().map(|c| c.coupon_id).collect();
        let templates: HashMap<i64, coupons::Model> = coupons::Entity::find()
            .filter(coupons::Column::Id.is_in(coupon_ids))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();

        let mut items = Vec::with_capacity(claims.len());
        for claim in claims {
            let template = templates.get(&claim.coupon_id).ok_or_else(|| {
                AppError::InternalError(format!(
                    "Coupon template {} missing for claim {}",
                    claim.coupon_id, claim.id
                ))
            })?;
            items.push(UserCouponResponse::from_claim(claim, template));
        }

        Ok(PaginatedResponse::new(
            items,
            params.get_page(),
            params.get_limit(),
            total,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    fn template(
        discount_type: CouponDiscountType,
        discount_value: i64,
        min_order_amount: i64,
        max_discount_amount: Option<i64>,
    ) -> coupons::Model {
        coupons::Model {
            id: 1,
            code: "WELCOME10".to_string(),
            name: "Welcome".to_string(),
            discount_type,
            discount_value,
            min_order_amount,
            max_discount_amount,
            is_active: true,
            usage_limit: None,
            used_count: 0,
            created_at: None,
        }
    }

    #[test]
    fn test_percentage_discount() {
        let t = template(CouponDiscountType::Percentage, 10, 0, None);
        assert_eq!(compute_discount(&t, 20_000).unwrap(), 2_000);
    }

    #[test]
    fn test_percentage_discount_capped() {
        let t = template(CouponDiscountType::Percentage, 10, 0, Some(1_500));
        assert_eq!(compute_discount(&t, 20_000).unwrap(), 1_500);
    }

    #[test]
    fn test_fixed_discount_never_exceeds_order_amount() {
        let t = template(CouponDiscountType::FixedAmount, 5_000, 0, None);
        assert_eq!(compute_discount(&t, 3_000).unwrap(), 3_000);
    }

    #[test]
    fn test_used_count_increment_stops_at_usage_limit() {
        let mut limited = template(CouponDiscountType::FixedAmount, 500, 0, None);
        limited.usage_limit = Some(10);
        let sql = used_count_increment(&limited)
            .build(DbBackend::Postgres)
            .to_string();
        assert!(
            sql.contains("\"used_count\" < \"usage_limit\""),
            "limited templates must guard the increment: {sql}"
        );

        let unlimited = template(CouponDiscountType::FixedAmount, 500, 0, None);
        let sql = used_count_increment(&unlimited)
            .build(DbBackend::Postgres)
            .to_string();
        assert!(!sql.contains("usage_limit"), "{sql}");
    }

    #[test]
    fn test_min_order_amount_enforced() {
        let t = template(CouponDiscountType::FixedAmount, 500, 10_000, None);
        assert!(matches!(
            compute_discount(&t, 9_999),
            Err(AppError::ValidationError(_))
        ));
        assert_eq!(compute_discount(&t, 10_000).unwrap(), 500);
    }
}
