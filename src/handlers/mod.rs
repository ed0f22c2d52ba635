pub mod coupon;
pub mod point;

pub use coupon::coupon_config;
pub use point::point_config;
