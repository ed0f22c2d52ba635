pub mod clawback;

pub use clawback::{points_for_order, proportional_clawback};
