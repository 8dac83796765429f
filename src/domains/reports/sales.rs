//! Sales report over a preset or custom range, compared against the
//! preceding range of equal length.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use super::leaderboards::in_range;
use super::numeric::{counts_as_booking, counts_as_sale, group_key, rate, round2, Change, UNASSIGNED};
use crate::domains::bookings::{Booking, DateRange, DateRangeError, DateWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SalesRange {
    #[default]
    #[serde(rename = "30d")]
    Last30Days,
    #[serde(rename = "60d")]
    Last60Days,
    #[serde(rename = "90d")]
    Last90Days,
    #[serde(rename = "this_month")]
    ThisMonth,
    #[serde(rename = "6m")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "custom")]
    Custom,
}

impl FromStr for SalesRange {
    type Err = SalesRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "30d" => Ok(SalesRange::Last30Days),
            "60d" => Ok(SalesRange::Last60Days),
            "90d" => Ok(SalesRange::Last90Days),
            "this_month" | "month" => Ok(SalesRange::ThisMonth),
            "6m" => Ok(SalesRange::SixMonths),
            "1y" => Ok(SalesRange::OneYear),
            "custom" => Ok(SalesRange::Custom),
            other => Err(SalesRangeError::UnknownPreset(other.to_string())),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SalesRangeError {
    #[error("unknown range '{0}', expected 30d, 60d, 90d, this_month, 6m, 1y or custom")]
    UnknownPreset(String),

    #[error("custom range requires start_date and end_date")]
    MissingBounds,

    #[error(transparent)]
    Range(#[from] DateRangeError),
}

impl SalesRange {
    pub fn resolve(
        &self,
        window: &DateWindow,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<DateRange, SalesRangeError> {
        let today = window.today();
        Ok(match self {
            SalesRange::Last30Days => window.last_n_days(30),
            SalesRange::Last60Days => window.last_n_days(60),
            SalesRange::Last90Days => window.last_n_days(90),
            SalesRange::ThisMonth => DateRange::month_to_date(today),
            SalesRange::SixMonths => DateRange::last_months(today, 6),
            SalesRange::OneYear => DateRange::last_months(today, 12),
            SalesRange::Custom => match (start, end) {
                (Some(start), Some(end)) => DateRange::custom(start, end)?,
                _ => return Err(SalesRangeError::MissingBounds),
            },
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SalesMetrics {
    pub total_bookings: usize,
    pub active_bookings: usize,
    pub cancellations: usize,
    pub sales: usize,
    pub revenue: f64,
    pub arrivals: usize,
    /// Arrivals over all bookings in range, as a percentage.
    pub arrival_rate: f64,
    pub average_sale: f64,
}

impl SalesMetrics {
    pub fn collect<'a>(bookings: impl IntoIterator<Item = &'a Booking>) -> Self {
        let mut m = SalesMetrics::default();
        for b in bookings {
            m.total_bookings += 1;
            if counts_as_booking(b) {
                m.active_bookings += 1;
            } else {
                m.cancellations += 1;
            }
            if counts_as_sale(b) {
                m.sales += 1;
                m.revenue += b.total_price;
            }
            if b.status_class.arrived {
                m.arrivals += 1;
            }
        }
        m.arrival_rate = rate(m.arrivals, m.total_bookings);
        m.average_sale = if m.sales == 0 {
            0.0
        } else {
            round2(m.revenue / m.sales as f64)
        };
        m.revenue = round2(m.revenue);
        m
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodMetrics {
    pub range: DateRange,
    pub metrics: SalesMetrics,
}

impl PeriodMetrics {
    fn over(bookings: &[Booking], range: DateRange) -> Self {
        Self {
            metrics: SalesMetrics::collect(in_range(bookings, &range)),
            range,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchSales {
    pub branch: String,
    pub metrics: SalesMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesReport {
    pub preset: SalesRange,
    pub current: PeriodMetrics,
    /// Absent when the preceding range would fall before the calendar start.
    pub previous: Option<PeriodMetrics>,
    pub revenue_change: Change,
    pub sales_change: Change,
    pub bookings_change: Change,
    pub first_half: PeriodMetrics,
    pub second_half: Option<PeriodMetrics>,
    /// Largest revenue first; ties keep first-seen order.
    pub by_branch: Vec<BranchSales>,
}

pub fn sales_report(bookings: &[Booking], preset: SalesRange, range: DateRange) -> SalesReport {
    let current = PeriodMetrics::over(bookings, range);
    let previous = range.previous().map(|r| PeriodMetrics::over(bookings, r));
    let baseline = previous
        .as_ref()
        .map(|p| p.metrics.clone())
        .unwrap_or_default();
    let (first, second) = range.split_halves();

    let mut branches: Vec<String> = Vec::new();
    for b in in_range(bookings, &range) {
        let key = group_key(&b.branch, UNASSIGNED);
        if !branches.iter().any(|k| k == key) {
            branches.push(key.to_string());
        }
    }
    let mut by_branch: Vec<BranchSales> = branches
        .into_iter()
        .map(|branch| {
            let metrics = SalesMetrics::collect(
                in_range(bookings, &range).filter(|b| group_key(&b.branch, UNASSIGNED) == branch),
            );
            BranchSales { branch, metrics }
        })
        .collect();
    by_branch.sort_by(|a, b| b.metrics.revenue.total_cmp(&a.metrics.revenue));

    SalesReport {
        preset,
        revenue_change: Change::new(current.metrics.revenue, baseline.revenue),
        sales_change: Change::counts(current.metrics.sales, baseline.sales),
        bookings_change: Change::counts(current.metrics.active_bookings, baseline.active_bookings),
        first_half: PeriodMetrics::over(bookings, first),
        second_half: second.map(|r| PeriodMetrics::over(bookings, r)),
        current,
        previous,
        by_branch,
    }
}
