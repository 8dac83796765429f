use chrono::{Duration, NaiveDate};
use serde::Serialize;

use super::numeric::{counts_as_booking, counts_as_sale, round2, Change};
use crate::domains::bookings::{Booking, DateWindow};

/// Totals for one calendar day of appointments.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KpiSnapshot {
    pub date: Option<NaiveDate>,
    pub bookings: usize,
    pub booking_value: f64,
    pub sales: usize,
    pub revenue: f64,
    pub arrivals: usize,
    pub cancellations: usize,
    pub promo_hunters: usize,
}

impl KpiSnapshot {
    pub fn for_day(bookings: &[Booking], day: NaiveDate) -> Self {
        let mut snap = KpiSnapshot {
            date: Some(day),
            ..Default::default()
        };
        for b in bookings.iter().filter(|b| b.appointment == Some(day)) {
            if counts_as_booking(b) {
                snap.bookings += 1;
                snap.booking_value += b.total_price;
            } else {
                snap.cancellations += 1;
            }
            if counts_as_sale(b) {
                snap.sales += 1;
                snap.revenue += b.total_price;
            }
            if b.status_class.arrived {
                snap.arrivals += 1;
            }
            if b.status_class.category == crate::domains::bookings::StatusCategory::PromoHunter {
                snap.promo_hunters += 1;
            }
        }
        snap.booking_value = round2(snap.booking_value);
        snap.revenue = round2(snap.revenue);
        snap
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiComparison {
    pub today: KpiSnapshot,
    pub yesterday: KpiSnapshot,
    pub bookings: Change,
    pub revenue: Change,
    pub sales: Change,
    pub arrivals: Change,
}

pub fn kpi_comparison(bookings: &[Booking], window: &DateWindow) -> KpiComparison {
    let today = KpiSnapshot::for_day(bookings, window.today());
    let yesterday = KpiSnapshot::for_day(bookings, window.yesterday());
    KpiComparison {
        bookings: Change::counts(today.bookings, yesterday.bookings),
        revenue: Change::new(today.revenue, yesterday.revenue),
        sales: Change::counts(today.sales, yesterday.sales),
        arrivals: Change::counts(today.arrivals, yesterday.arrivals),
        today,
        yesterday,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub bookings: usize,
    pub revenue: f64,
}

/// One point per day for the last `days` days, oldest first. Days without
/// appointments are present with zeros.
pub fn booking_trend(bookings: &[Booking], window: &DateWindow, days: u32) -> Vec<TrendPoint> {
    let range = window.last_n_days(days);
    let start = range.start_date();
    let mut points: Vec<TrendPoint> = (0..range.days())
        .map(|offset| TrendPoint {
            date: start + Duration::days(offset),
            bookings: 0,
            revenue: 0.0,
        })
        .collect();

    for b in bookings {
        let Some(day) = b.appointment else { continue };
        if !range.contains_date(day) {
            continue;
        }
        let slot = &mut points[(day - start).num_days() as usize];
        if counts_as_booking(b) {
            slot.bookings += 1;
        }
        slot.revenue += b.sales_amount();
    }
    for p in &mut points {
        p.revenue = round2(p.revenue);
    }
    points
}
