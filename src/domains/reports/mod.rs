//! Report folds over a parsed booking collection.
//!
//! Every function here is pure: it takes the bookings and the calendar
//! anchor explicitly and returns a fresh, deterministic value.

pub mod daily;
pub mod dashboard;
pub mod demographics;
pub mod kpi;
pub mod leaderboards;
pub mod numeric;
pub mod sales;
pub mod timeseries;

pub use daily::{daily_report, DailyReport, ReportSection};
pub use dashboard::{dashboard, Dashboard};
pub use demographics::{demographics, Demographics};
pub use kpi::{booking_trend, kpi_comparison, KpiComparison, TrendPoint};
pub use leaderboards::{breakdowns, leaderboard, Breakdowns, Dimension, Leaderboard, RankBy};
pub use sales::{sales_report, SalesRange, SalesRangeError, SalesReport};
pub use timeseries::{time_series, Granularity, TimeSeries};
