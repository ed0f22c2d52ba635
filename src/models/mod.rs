pub mod common;
pub mod coupon;
pub mod pagination;
pub mod point;

pub use common::*;
pub use coupon::*;
pub use pagination::*;
pub use point::*;
