//! End-of-day operational report.

use chrono::NaiveDate;
use serde::Serialize;

use super::numeric::{counts_as_booking, group_key, round2, Tally, UNASSIGNED};
use crate::domains::bookings::{Booking, DateWindow};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchLine {
    pub branch: String,
    pub count: usize,
    pub total_price: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportSection {
    pub total: usize,
    pub total_price: f64,
    pub by_branch: Vec<BranchLine>,
}

impl ReportSection {
    /// Folds the bookings accepted by `include`, grouped by branch in
    /// first-seen order.
    pub fn collect<'a, F>(bookings: impl IntoIterator<Item = &'a Booking>, include: F) -> Self
    where
        F: Fn(&Booking) -> bool,
    {
        let mut tally = Tally::new();
        for b in bookings.into_iter().filter(|b| include(*b)) {
            tally.add(group_key(&b.branch, UNASSIGNED), b.total_price);
        }

        let by_branch: Vec<BranchLine> = tally
            .entries()
            .into_iter()
            .map(|(branch, count, total)| BranchLine {
                branch,
                count,
                total_price: round2(total),
            })
            .collect();

        ReportSection {
            total: by_branch.iter().map(|l| l.count).sum(),
            total_price: round2(by_branch.iter().map(|l| l.total_price).sum()),
            by_branch,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TomorrowSummary {
    pub date: NaiveDate,
    pub total: usize,
    pub total_price: f64,
}

pub fn tomorrow_summary(bookings: &[Booking], window: &DateWindow) -> TomorrowSummary {
    let (total, sum) = bookings
        .iter()
        .filter(|b| counts_as_booking(b) && b.appointment.is_some_and(|d| window.is_tomorrow(d)))
        .fold((0, 0.0), |(n, sum), b| (n + 1, sum + b.total_price));
    TomorrowSummary {
        date: window.tomorrow(),
        total,
        total_price: round2(sum),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    /// Booked today for today.
    pub ots: ReportSection,
    /// Booked today for a day in the coming week.
    pub overall: ReportSection,
    pub booked_tomorrow: ReportSection,
    /// Everything on the books for today through a week out.
    pub booked_next_7_days: ReportSection,
    pub cancellations: ReportSection,
    pub tomorrow_summary: TomorrowSummary,
}

pub fn daily_report(bookings: &[Booking], window: &DateWindow) -> DailyReport {
    let created_today = |b: &Booking| b.created_on().is_some_and(|d| window.is_today(d));
    let scheduled = |b: &Booking, pred: &dyn Fn(NaiveDate) -> bool| b.appointment.is_some_and(pred);

    DailyReport {
        date: window.today(),
        ots: ReportSection::collect(bookings, |b| {
            created_today(b) && counts_as_booking(b) && scheduled(b, &|d| window.is_today(d))
        }),
        overall: ReportSection::collect(bookings, |b| {
            created_today(b)
                && counts_as_booking(b)
                && scheduled(b, &|d| window.is_strictly_next_7_days(d))
        }),
        booked_tomorrow: ReportSection::collect(bookings, |b| {
            created_today(b) && counts_as_booking(b) && scheduled(b, &|d| window.is_tomorrow(d))
        }),
        booked_next_7_days: ReportSection::collect(bookings, |b| {
            counts_as_booking(b) && scheduled(b, &|d| window.is_in_next_7_days(d))
        }),
        cancellations: ReportSection::collect(bookings, |b| {
            created_today(b)
                && b.is_cancelled()
                && b.cancelled_on().is_some_and(|d| window.is_today(d))
        }),
        tomorrow_summary: tomorrow_summary(bookings, window),
    }
}
