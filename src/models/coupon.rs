use crate::entities::{
    coupon_entity as coupons, user_coupon_entity as user_coupons, CouponDiscountType,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Derived claim state; never stored. Expiry is time-driven, so the
/// same row reads as available before its deadline and expired after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserCouponStatus {
    Available,
    Used,
    Expired,
}

impl UserCouponStatus {
    pub fn of(claim: &user_coupons::Model, now: DateTime<Utc>) -> Self {
        if claim.is_used {
            UserCouponStatus::Used
        } else if claim.expires_at <= now {
            UserCouponStatus::Expired
        } else {
            UserCouponStatus::Available
        }
    }
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct GrantCouponRequest {
    pub user_id: i64,
    pub coupon_code: String,
    /// Claim lifetime in days; defaults to 30.
    pub valid_days: Option<i64>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct RedeemCouponRequest {
    pub user_coupon_id: i64,
    pub order_id: String,
    /// Order total the discount is applied to, in minor currency units.
    pub order_amount: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RedeemCouponResponse {
    pub user_coupon_id: i64,
    pub order_id: String,
    pub discount_amount: i64,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UserCouponQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// available / used / expired
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserCouponResponse {
    pub id: i64,
    pub coupon_id: i64,
    pub code: String,
    pub name: String,
    pub discount_type: CouponDiscountType,
    pub discount_value: i64,
    pub min_order_amount: i64,
    pub max_discount_amount: Option<i64>,
    pub status: UserCouponStatus,
    pub used_at: Option<DateTime<Utc>>,
    pub used_order_id: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: Option<DateTime<Utc>>,
}

impl UserCouponResponse {
    pub fn from_claim(claim: user_coupons::Model, template: &coupons::Model) -> Self {
        let status = UserCouponStatus::of(&claim, Utc::now());
        Self {
            id: claim.id,
            coupon_id: claim.coupon_id,
            code: template.code.clone(),
            name: template.name.clone(),
            discount_type: template.discount_type,
            discount_value: template.discount_value,
            min_order_amount: template.min_order_amount,
            max_discount_amount: template.max_discount_amount,
            status,
            used_at: claim.used_at,
            used_order_id: claim.used_order_id,
            expires_at: claim.expires_at,
            created_at: claim.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claim(is_used: bool, expires_in: Duration) -> user_coupons::Model {
        user_coupons::Model {
            id: 1,
            user_id: 7,
            coupon_id: 3,
            is_used,
            used_at: None,
            used_order_id: None,
            expires_at: Utc::now() + expires_in,
            created_at: None,
        }
    }

    #[test]
    fn test_status_available() {
        let c = claim(false, Duration::days(5));
        assert_eq!(UserCouponStatus::of(&c, Utc::now()), UserCouponStatus::Available);
    }

    #[test]
    fn test_status_used_wins_over_expired() {
        let c = claim(true, Duration::days(-5));
        assert_eq!(UserCouponStatus::of(&c, Utc::now()), UserCouponStatus::Used);
    }

    #[test]
    fn test_status_expired() {
        let c = claim(false, Duration::days(-1));
        assert_eq!(UserCouponStatus::of(&c, Utc::now()), UserCouponStatus::Expired);
    }
}
