//! Campaign Estimator - best-case send-time projection

use serde::Serialize;
use wadispatch_storage::models::SendingConfigurationForm;

/// Derived statistics of a campaign draft.
///
/// Allowed-hours windows and daily limits do not shorten or lengthen
/// `total_seconds`; the estimate is a lower bound on real dispatch time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignEstimate {
    pub total_sends: u64,
    pub average_delay_seconds: f64,
    pub base_seconds: f64,
    pub pause_count: u64,
    pub pause_seconds: u64,
    pub total_seconds: f64,
    /// Calendar days needed when a daily limit is set
    pub daily_limit_days: Option<u64>,
}

impl CampaignEstimate {
    pub fn compute(contacts: usize, messages: usize, config: &SendingConfigurationForm) -> Self {
        let total_sends = contacts as u64 * messages as u64;
        let average_delay_seconds =
            (f64::from(config.min_delay_seconds) + f64::from(config.max_delay_seconds)) / 2.0;

        let daily_limit_days = config
            .daily_limit
            .filter(|limit| *limit > 0)
            .map(|limit| total_sends.div_ceil(u64::from(limit)));

        if contacts == 0 {
            return Self {
                total_sends,
                average_delay_seconds,
                base_seconds: 0.0,
                pause_count: 0,
                pause_seconds: 0,
                total_seconds: 0.0,
                daily_limit_days,
            };
        }

        let base_seconds = total_sends as f64 * average_delay_seconds;
        let pause_count = match config.pause_after_messages {
            0 => 0,
            after => total_sends / u64::from(after),
        };
        let pause_seconds = pause_count * u64::from(config.pause_duration_seconds);

        Self {
            total_sends,
            average_delay_seconds,
            base_seconds,
            pause_count,
            pause_seconds,
            total_seconds: base_seconds + pause_seconds as f64,
            daily_limit_days,
        }
    }

    /// `"{h}h {m}min"` or `"{m}min"`
    pub fn formatted(&self) -> String {
        format_duration(self.total_seconds)
    }
}

/// Render seconds as hours and whole minutes (truncated)
pub fn format_duration(total_seconds: f64) -> String {
    let total = if total_seconds.is_finite() && total_seconds > 0.0 {
        total_seconds.floor() as u64
    } else {
        0
    };

    let hours = total / 3600;
    let minutes = (total % 3600) / 60;

    if hours > 0 {
        format!("{}h {}min", hours, minutes)
    } else {
        format!("{}min", minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config(min: u32, max: u32, pause_after: u32, pause_duration: u32) -> SendingConfigurationForm {
        SendingConfigurationForm {
            min_delay_seconds: min,
            max_delay_seconds: max,
            pause_after_messages: pause_after,
            pause_duration_seconds: pause_duration,
            ..Default::default()
        }
    }

    #[test]
    fn test_reference_projection() {
        let estimate = CampaignEstimate::compute(100, 2, &config(5, 15, 50, 300));

        assert_eq!(estimate.total_sends, 200);
        assert_eq!(estimate.average_delay_seconds, 10.0);
        assert_eq!(estimate.base_seconds, 2000.0);
        assert_eq!(estimate.pause_count, 4);
        assert_eq!(estimate.pause_seconds, 1200);
        assert_eq!(estimate.total_seconds, 3200.0);
        assert_eq!(estimate.formatted(), "53min");
        assert_eq!(estimate.daily_limit_days, None);
    }

    #[test]
    fn test_zero_contacts() {
        let estimate = CampaignEstimate::compute(0, 3, &config(5, 10, 50, 300));
        assert_eq!(estimate.total_sends, 0);
        assert_eq!(estimate.total_seconds, 0.0);
        assert_eq!(estimate.formatted(), "0min");
    }

    #[test]
    fn test_fractional_average_and_hours() {
        // 1000 sends * 7.5s = 7500s, plus 10 pauses of 300s = 10500s
        let estimate = CampaignEstimate::compute(500, 2, &config(5, 10, 100, 300));
        assert_eq!(estimate.average_delay_seconds, 7.5);
        assert_eq!(estimate.total_seconds, 10500.0);
        assert_eq!(estimate.formatted(), "2h 55min");
    }

    #[test]
    fn test_no_pauses_when_pause_after_is_zero() {
        let estimate = CampaignEstimate::compute(10, 1, &config(5, 5, 0, 300));
        assert_eq!(estimate.pause_count, 0);
        assert_eq!(estimate.total_seconds, 50.0);
    }

    #[test]
    fn test_daily_limit_days() {
        let mut cfg = config(5, 10, 50, 300);
        cfg.daily_limit = Some(150);
        let estimate = CampaignEstimate::compute(100, 2, &cfg);
        assert_eq!(estimate.daily_limit_days, Some(2));

        let plain = CampaignEstimate::compute(100, 2, &config(5, 10, 50, 300));
        assert_eq!(estimate.total_seconds, plain.total_seconds);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(59.9), "0min");
        assert_eq!(format_duration(3599.0), "59min");
        assert_eq!(format_duration(3600.0), "1h 0min");
        assert_eq!(format_duration(f64::NAN), "0min");
    }
}
