pub mod coupons;
pub mod point_accounts;
pub mod point_transactions;
pub mod user_coupons;

pub use coupons as coupon_entity;
pub use point_accounts as point_account_entity;
pub use point_transactions as point_transaction_entity;
pub use user_coupons as user_coupon_entity;

pub use coupons::CouponDiscountType;
pub use point_transactions::PointTransactionKind;
