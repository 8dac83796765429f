use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::Serialize;

use super::leaderboards::in_range;
use super::numeric::{counts_as_booking, counts_as_sale, round2};
use crate::domains::bookings::{Booking, DateRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
}

impl Granularity {
    /// Daily up to a month, weekly up to a quarter, monthly beyond.
    pub fn for_range(range: &DateRange) -> Self {
        match range.days() {
            d if d <= 31 => Granularity::Daily,
            d if d <= 90 => Granularity::Weekly,
            _ => Granularity::Monthly,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesBucket {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub bookings: usize,
    pub sales: usize,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    pub range: DateRange,
    pub granularity: Granularity,
    pub buckets: Vec<SeriesBucket>,
}

fn bucket_end(start: NaiveDate, granularity: Granularity) -> NaiveDate {
    match granularity {
        Granularity::Daily => start,
        Granularity::Weekly => {
            // weeks run Sunday..Saturday
            let to_saturday = 6 - start.weekday().num_days_from_sunday() as i64;
            start
                .checked_add_signed(Duration::days(to_saturday))
                .unwrap_or(NaiveDate::MAX)
        }
        Granularity::Monthly => {
            let first = start.with_day(1).unwrap_or(start);
            first
                .checked_add_months(Months::new(1))
                .and_then(|next| next.pred_opt())
                .unwrap_or(NaiveDate::MAX)
        }
    }
}

/// Consecutive buckets covering `range`; the first and last are clipped to
/// the range edges.
fn enumerate_buckets(range: &DateRange, granularity: Granularity) -> Vec<SeriesBucket> {
    let mut buckets = Vec::new();
    let mut start = range.start_date();
    while start <= range.end_date() {
        let end = bucket_end(start, granularity).min(range.end_date());
        buckets.push(SeriesBucket {
            start,
            end,
            bookings: 0,
            sales: 0,
            revenue: 0.0,
        });
        match end.succ_opt() {
            Some(next) => start = next,
            None => break,
        }
    }
    buckets
}

pub fn time_series(bookings: &[Booking], range: &DateRange) -> TimeSeries {
    let granularity = Granularity::for_range(range);
    let mut buckets = enumerate_buckets(range, granularity);

    for b in in_range(bookings, range) {
        let Some(day) = b.appointment else { continue };
        // buckets are sorted and contiguous
        let index = buckets.partition_point(|bucket| bucket.end < day);
        let Some(bucket) = buckets.get_mut(index) else { continue };
        if counts_as_booking(b) {
            bucket.bookings += 1;
        }
        if counts_as_sale(b) {
            bucket.sales += 1;
            bucket.revenue += b.total_price;
        }
    }
    for bucket in &mut buckets {
        bucket.revenue = round2(bucket.revenue);
    }

    TimeSeries {
        range: *range,
        granularity,
        buckets,
    }
}
