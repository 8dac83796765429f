use chrono::NaiveDate;
use serde::Serialize;

use super::daily::{tomorrow_summary, TomorrowSummary};
use super::kpi::{booking_trend, kpi_comparison, KpiComparison, TrendPoint};
use super::leaderboards::{leaderboard, Dimension, Leaderboard, RankBy};
use crate::domains::bookings::{Booking, DateWindow};

const TREND_DAYS: u32 = 7;
const TOP_BRANCHES: usize = 5;

/// Landing-page bundle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub date: NaiveDate,
    pub kpi: KpiComparison,
    pub trend: Vec<TrendPoint>,
    pub top_branches_today: Leaderboard,
    pub tomorrow: TomorrowSummary,
}

pub fn dashboard(bookings: &[Booking], window: &DateWindow) -> Dashboard {
    Dashboard {
        date: window.today(),
        kpi: kpi_comparison(bookings, window),
        trend: booking_trend(bookings, window, TREND_DAYS),
        top_branches_today: leaderboard(
            bookings,
            &window.last_n_days(1),
            Dimension::Branch,
            RankBy::Count,
            TOP_BRANCHES,
        ),
        tomorrow: tomorrow_summary(bookings, window),
    }
}
