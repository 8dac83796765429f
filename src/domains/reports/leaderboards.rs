//! Rankings and categorical breakdowns over a date range.

use serde::{Deserialize, Serialize};

use super::numeric::{counts_as_booking, counts_as_sale, group_key, round2, Tally, UNASSIGNED};
use crate::domains::bookings::{Booking, DateRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    #[default]
    Branch,
    Agent,
    Treatment,
}

impl Dimension {
    fn key<'a>(&self, b: &'a Booking) -> &'a str {
        match self {
            Dimension::Branch => &b.branch,
            Dimension::Agent => &b.agent,
            Dimension::Treatment => &b.treatment,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankBy {
    #[default]
    Count,
    Revenue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub name: String,
    /// Bookings under the booking rule.
    pub bookings: usize,
    /// Purchases under the sales rule.
    pub sales: usize,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard {
    pub dimension: Dimension,
    pub metric: RankBy,
    pub entries: Vec<LeaderboardEntry>,
}

pub fn in_range<'a>(bookings: &'a [Booking], range: &'a DateRange) -> impl Iterator<Item = &'a Booking> + 'a {
    bookings
        .iter()
        .filter(move |b| b.appointment.is_some_and(|d| range.contains_date(d)))
}

/// Top `limit` keys of `dimension`. Ties keep first-seen order.
pub fn leaderboard(
    bookings: &[Booking],
    range: &DateRange,
    dimension: Dimension,
    metric: RankBy,
    limit: usize,
) -> Leaderboard {
    let mut order: Vec<String> = Vec::new();
    let mut rows: std::collections::HashMap<String, (usize, usize, f64)> = Default::default();

    for b in in_range(bookings, range) {
        let key = group_key(dimension.key(b), UNASSIGNED);
        let counts_booking = counts_as_booking(b);
        let counts_sale = counts_as_sale(b);
        if !counts_booking && !counts_sale {
            continue;
        }
        let slot = rows.entry(key.to_string()).or_insert_with(|| {
            order.push(key.to_string());
            (0, 0, 0.0)
        });
        if counts_booking {
            slot.0 += 1;
        }
        if counts_sale {
            slot.1 += 1;
            slot.2 += b.total_price;
        }
    }

    let mut entries: Vec<LeaderboardEntry> = order
        .into_iter()
        .filter_map(|name| {
            rows.get(&name).map(|&(bookings, sales, revenue)| LeaderboardEntry {
                rank: 0,
                name,
                bookings,
                sales,
                revenue: round2(revenue),
            })
        })
        .collect();

    // sort_by is stable
    match metric {
        RankBy::Count => entries.sort_by(|a, b| b.bookings.cmp(&a.bookings)),
        RankBy::Revenue => entries.sort_by(|a, b| b.revenue.total_cmp(&a.revenue)),
    }
    entries.truncate(limit);
    for (i, e) in entries.iter_mut().enumerate() {
        e.rank = i + 1;
    }

    Leaderboard {
        dimension,
        metric,
        entries,
    }
}

// ============================================================================
// BREAKDOWNS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentModeLine {
    pub payment_mode: String,
    pub count: usize,
    pub revenue: f64,
}

/// Purchases grouped by payment mode, largest revenue first.
pub fn payment_breakdown(bookings: &[Booking], range: &DateRange) -> Vec<PaymentModeLine> {
    let mut tally = Tally::new();
    for b in in_range(bookings, range).filter(|b| counts_as_sale(b)) {
        tally.add(group_key(&b.payment_mode, "Unspecified"), b.total_price);
    }
    let mut lines: Vec<PaymentModeLine> = tally
        .entries()
        .into_iter()
        .map(|(payment_mode, count, revenue)| PaymentModeLine {
            payment_mode,
            count,
            revenue: round2(revenue),
        })
        .collect();
    lines.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
    lines
}

/// Upper bounds (exclusive) of the price buckets; the last bucket is open.
const PRICE_BUCKETS: &[(&str, Option<f64>)] = &[
    ("0-999", Some(1_000.0)),
    ("1,000-4,999", Some(5_000.0)),
    ("5,000-9,999", Some(10_000.0)),
    ("10,000-19,999", Some(20_000.0)),
    ("20,000+", None),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBucket {
    pub label: String,
    pub count: usize,
    pub total_price: f64,
}

/// Non-cancelled bookings by price band. Every band is present.
pub fn price_buckets(bookings: &[Booking], range: &DateRange) -> Vec<PriceBucket> {
    let mut buckets: Vec<PriceBucket> = PRICE_BUCKETS
        .iter()
        .map(|(label, _)| PriceBucket {
            label: label.to_string(),
            count: 0,
            total_price: 0.0,
        })
        .collect();

    for b in in_range(bookings, range).filter(|b| counts_as_booking(b)) {
        let index = PRICE_BUCKETS
            .iter()
            .position(|(_, upper)| upper.map_or(true, |u| b.total_price < u))
            .unwrap_or(PRICE_BUCKETS.len() - 1);
        buckets[index].count += 1;
        buckets[index].total_price += b.total_price;
    }
    for bucket in &mut buckets {
        bucket.total_price = round2(bucket.total_price);
    }
    buckets
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdowns {
    pub range: DateRange,
    pub payment_modes: Vec<PaymentModeLine>,
    pub price_buckets: Vec<PriceBucket>,
}

pub fn breakdowns(bookings: &[Booking], range: &DateRange) -> Breakdowns {
    Breakdowns {
        range: *range,
        payment_modes: payment_breakdown(bookings, range),
        price_buckets: price_buckets(bookings, range),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::bookings::StatusClassifier;
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    fn range() -> DateRange {
        DateRange::custom(day(), day()).unwrap()
    }

    fn booking(branch: &str, agent: &str, status: &str, mode: &str, price: f64) -> Booking {
        Booking {
            branch: branch.to_string(),
            agent: agent.to_string(),
            payment_mode: mode.to_string(),
            appointment: Some(day()),
            status: status.to_string(),
            status_class: StatusClassifier::default().classify(status),
            total_price: price,
            ..Default::default()
        }
    }

    fn data() -> Vec<Booking> {
        vec![
            booking("Makati", "ana", "Scheduled", "", 500.0),
            booking("BGC", "ben", "Arrived & Bought", "Cash", 5_000.0),
            booking("BGC", "ben", "Scheduled", "", 100.0),
            booking("Ortigas", "ana", "Comeback & Bought", "GCash", 20_000.0),
            booking("Makati", "ana", "Cancelled", "Cash", 9_999.0),
            booking("Makati", "cy", "Scheduled", "", 999.99),
        ]
    }

    #[test]
    fn test_branch_leaderboard_by_count_is_stable() {
        let board = leaderboard(&data(), &range(), Dimension::Branch, RankBy::Count, 10);
        let names: Vec<&str> = board.entries.iter().map(|e| e.name.as_str()).collect();
        // Makati and BGC tie on 2; Makati was seen first
        assert_eq!(names, vec!["Makati", "BGC", "Ortigas"]);
        assert_eq!(board.entries[0].rank, 1);
        assert_eq!(board.entries[0].bookings, 2);
    }

    #[test]
    fn test_revenue_leaderboard_uses_sales_rule() {
        let board = leaderboard(&data(), &range(), Dimension::Agent, RankBy::Revenue, 1);
        assert_eq!(board.entries.len(), 1);
        assert_eq!(board.entries[0].name, "ana");
        assert_eq!(board.entries[0].revenue, 20_000.0);
        assert_eq!(board.entries[0].sales, 1);
    }

    #[test]
    fn test_payment_breakdown_counts_purchases_only() {
        let lines = payment_breakdown(&data(), &range());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].payment_mode, "GCash");
        assert_eq!(lines[1].payment_mode, "Cash");
        assert_eq!(lines[1].count, 1);
    }

    #[test]
    fn test_price_buckets() {
        let buckets = price_buckets(&data(), &range());
        let counts: Vec<usize> = buckets.iter().map(|b| b.count).collect();
        // the cancelled 9,999 is excluded
        assert_eq!(counts, vec![3, 0, 1, 0, 1]);
        assert_eq!(buckets[0].total_price, 1_599.99);

        let empty = price_buckets(&[], &range());
        assert_eq!(empty.len(), 5);
        assert!(empty.iter().all(|b| b.count == 0));
    }

    #[test]
    fn test_outside_range_is_ignored() {
        let other = DateRange::custom(day().succ_opt().unwrap(), day().succ_opt().unwrap()).unwrap();
        assert!(leaderboard(&data(), &other, Dimension::Branch, RankBy::Count, 5).entries.is_empty());
    }
}
