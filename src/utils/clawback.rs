use crate::error::{AppError, AppResult};

/// Points to claw back when `refund_amount` out of `order_amount` is
/// returned on an order that earned `total_earned` points.
///
/// `floor(total_earned * refund_amount / order_amount)`. Rounding is
/// always down, so a partial refund never claws back more than the
/// proportional share. A zero or negative order amount makes the ratio
/// undefined and is rejected; the caller logs the inconsistency and
/// claws back nothing.
pub fn proportional_clawback(
    total_earned: i64,
    refund_amount: i64,
    order_amount: i64,
) -> AppResult<i64> {
    if order_amount <= 0 {
        return Err(AppError::InvalidRatio(format!(
            "order amount must be positive, got {order_amount}"
        )));
    }
    if total_earned <= 0 || refund_amount <= 0 {
        return Ok(0);
    }

    // i128 intermediate: total_earned * refund_amount can exceed i64.
    let scaled = (total_earned as i128) * (refund_amount as i128) / (order_amount as i128);
    Ok(scaled as i64)
}

/// Accrued points for an order total at a basis-point rate.
/// 100 bp = 1 point per 100 minor currency units.
pub fn points_for_order(order_amount: i64, accrual_rate_bp: i64) -> i64 {
    if order_amount <= 0 || accrual_rate_bp <= 0 {
        return 0;
    }
    ((order_amount as i128) * (accrual_rate_bp as i128) / 10_000) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_refund_claws_back_everything() {
        assert_eq!(proportional_clawback(500, 50_000, 50_000).unwrap(), 500);
    }

    #[test]
    fn test_partial_refund_is_proportional() {
        assert_eq!(proportional_clawback(500, 20_000, 50_000).unwrap(), 200);
    }

    #[test]
    fn test_rounds_down_in_favor_of_user() {
        // 100 * 1 / 3 = 33.33... -> 33
        assert_eq!(proportional_clawback(100, 1, 3).unwrap(), 33);
    }

    #[test]
    fn test_never_exceeds_total_earned() {
        for refund in [0, 1, 100, 25_000, 49_999, 50_000] {
            let clawback = proportional_clawback(500, refund, 50_000).unwrap();
            assert!(clawback <= 500, "refund {refund} clawed back {clawback}");
        }
    }

    #[test]
    fn test_monotonic_in_refund_amount() {
        let mut prev = 0;
        for refund in (0..=50_000).step_by(1_000) {
            let clawback = proportional_clawback(500, refund, 50_000).unwrap();
            assert!(clawback >= prev);
            prev = clawback;
        }
    }

    #[test]
    fn test_zero_order_amount_is_rejected() {
        assert!(matches!(
            proportional_clawback(500, 100, 0),
            Err(AppError::InvalidRatio(_))
        ));
        assert!(matches!(
            proportional_clawback(500, 100, -10),
            Err(AppError::InvalidRatio(_))
        ));
    }

    #[test]
    fn test_non_positive_inputs_claw_back_nothing() {
        assert_eq!(proportional_clawback(0, 100, 1_000).unwrap(), 0);
        assert_eq!(proportional_clawback(-5, 100, 1_000).unwrap(), 0);
        assert_eq!(proportional_clawback(500, 0, 1_000).unwrap(), 0);
    }

    #[test]
    fn test_large_values_do_not_overflow() {
        let earned = i64::MAX / 2;
        let clawback = proportional_clawback(earned, i64::MAX / 2, i64::MAX / 2).unwrap();
        assert_eq!(clawback, earned);
    }

    #[test]
    fn test_points_for_order() {
        // 100 bp: one point per 100 minor units
        assert_eq!(points_for_order(50_000, 100), 500);
        assert_eq!(points_for_order(99, 100), 0);
        assert_eq!(points_for_order(0, 100), 0);
        assert_eq!(points_for_order(10_000, 0), 0);
    }
}
