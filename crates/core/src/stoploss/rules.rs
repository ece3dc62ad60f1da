use super::{StopLossConfig, ViolationKind};

/// Rules broken by a campaign with this net revenue after `active_hours` live.
///
/// Each rule is checked on its own, so a deep loss past the horizon breaks both.
pub fn evaluate(config: &StopLossConfig, net_revenue: f64, active_hours: f64) -> Vec<ViolationKind> {
    let mut kinds = Vec::new();

    if net_revenue <= config.immediate_loss_threshold {
        kinds.push(ViolationKind::ImmediateLoss);
    }
    if active_hours >= config.time_based_horizon_hours as f64
        && net_revenue <= config.time_based_loss_threshold
    {
        kinds.push(ViolationKind::TimeBasedLoss);
    }

    kinds
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> StopLossConfig {
        StopLossConfig::default()
    }

    #[test]
    fn test_immediate_loss() {
        assert_eq!(evaluate(&defaults(), -40.0, 2.0), vec![ViolationKind::ImmediateLoss]);
        assert_eq!(evaluate(&defaults(), -35.0, 0.0), vec![ViolationKind::ImmediateLoss]);
        assert!(evaluate(&defaults(), -34.99, 2.0).is_empty());
    }

    #[test]
    fn test_time_based_loss() {
        assert_eq!(evaluate(&defaults(), -12.0, 50.0), vec![ViolationKind::TimeBasedLoss]);
        assert_eq!(evaluate(&defaults(), -10.0, 48.0), vec![ViolationKind::TimeBasedLoss]);
        assert!(evaluate(&defaults(), -12.0, 47.9).is_empty());
    }

    #[test]
    fn test_small_loss_is_fine() {
        assert!(evaluate(&defaults(), -5.0, 50.0).is_empty());
        assert!(evaluate(&defaults(), 120.0, 500.0).is_empty());
    }

    #[test]
    fn test_both_rules() {
        assert_eq!(
            evaluate(&defaults(), -60.0, 72.0),
            vec![ViolationKind::ImmediateLoss, ViolationKind::TimeBasedLoss]
        );
    }
}
