pub mod coupon_service;
pub mod point_service;

pub use coupon_service::*;
pub use point_service::*;
