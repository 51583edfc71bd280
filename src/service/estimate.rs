//! Synthetic engagement figures
//!
//! No metrics pipeline feeds the dashboard yet, so the figures it shows
//! beyond stored counts come from an [`EngagementEstimator`]. Every response
//! carrying them is flagged `synthetic`.

use chrono::{Duration, NaiveDate};
use rand::Rng;
use serde::Serialize;

/// Dashboard engagement totals
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EngagementTotals {
    pub total_engagement: i64,
    pub avg_engagement_rate: f64,
    pub total_reach: i64,
    pub total_impressions: i64,
}

/// One day of platform activity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyMetrics {
    pub date: String,
    pub posts: i64,
    pub engagement: i64,
    pub reach: i64,
    pub impressions: i64,
    pub followers: i64,
}

pub trait EngagementEstimator: Send + Sync {
    fn totals(&self) -> EngagementTotals;

    /// `days` entries ending at `today`, oldest first
    fn daily_metrics(&self, today: NaiveDate, days: u32) -> Vec<DailyMetrics>;
}

/// Uniform random figures in fixed ranges
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntheticEngagement;

impl EngagementEstimator for SyntheticEngagement {
    fn totals(&self) -> EngagementTotals {
        let mut rng = rand::thread_rng();
        let rate: f64 = rng.gen_range(1.0..6.0);

        EngagementTotals {
            total_engagement: rng.gen_range(1_000..11_000),
            avg_engagement_rate: (rate * 100.0).round() / 100.0,
            total_reach: rng.gen_range(10_000..110_000),
            total_impressions: rng.gen_range(50_000..550_000),
        }
    }

    fn daily_metrics(&self, today: NaiveDate, days: u32) -> Vec<DailyMetrics> {
        let mut rng = rand::thread_rng();

        (0..i64::from(days))
            .rev()
            .map(|offset| DailyMetrics {
                date: (today - Duration::days(offset)).format("%Y-%m-%d").to_string(),
                posts: rng.gen_range(0..5),
                engagement: rng.gen_range(0..500),
                reach: rng.gen_range(0..5_000),
                impressions: rng.gen_range(0..15_000),
                followers: rng.gen_range(0..50),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_stay_in_range() {
        for _ in 0..50 {
            let totals = SyntheticEngagement.totals();
            assert!((1_000..11_000).contains(&totals.total_engagement));
            assert!((1.0..=6.0).contains(&totals.avg_engagement_rate));
            assert!((10_000..110_000).contains(&totals.total_reach));
            assert!((50_000..550_000).contains(&totals.total_impressions));
        }
    }

    #[test]
    fn daily_metrics_run_oldest_to_today() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let metrics = SyntheticEngagement.daily_metrics(today, 30);

        assert_eq!(metrics.len(), 30);
        assert_eq!(metrics[0].date, "2025-01-31");
        assert_eq!(metrics[29].date, "2025-03-01");
    }
}
