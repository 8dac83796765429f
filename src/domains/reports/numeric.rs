//! Shared arithmetic for the report folds.

use serde::Serialize;

use crate::domains::bookings::Booking;

pub const UNASSIGNED: &str = "Unassigned";

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `(current - previous) / previous * 100`, rounded to 2 decimals.
/// A rise from zero is reported as 100; zero to zero is 0.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return if current > 0.0 { 100.0 } else { 0.0 };
    }
    round2((current - previous) / previous * 100.0)
}

/// `part / whole * 100`, rounded to 2 decimals; 0 for an empty whole.
pub fn rate(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round2(part as f64 / whole as f64 * 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn of(change: f64) -> Self {
        if change > 0.0 {
            Trend::Up
        } else if change < 0.0 {
            Trend::Down
        } else {
            Trend::Flat
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub current: f64,
    pub previous: f64,
    pub change_pct: f64,
    pub trend: Trend,
}

impl Change {
    pub fn new(current: f64, previous: f64) -> Self {
        let change_pct = percent_change(current, previous);
        Self {
            current: round2(current),
            previous: round2(previous),
            change_pct,
            trend: Trend::of(change_pct),
        }
    }

    pub fn counts(current: usize, previous: usize) -> Self {
        Self::new(current as f64, previous as f64)
    }
}

/// Booking rule: everything not in the cancelled class.
pub fn counts_as_booking(b: &Booking) -> bool {
    !b.is_cancelled()
}

/// Sales rule: allow-listed purchase statuses only.
pub fn counts_as_sale(b: &Booking) -> bool {
    b.status_class.purchase
}

/// Grouping key for free-text fields; blank values collapse to `fallback`.
pub fn group_key<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    let value = value.trim();
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

/// Count-and-sum tally that remembers first-seen order, so equal inputs
/// always produce the same output order.
#[derive(Debug, Default, Clone)]
pub struct Tally {
    keys: Vec<String>,
    slots: std::collections::HashMap<String, (usize, f64)>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str, amount: f64) {
        if let Some(slot) = self.slots.get_mut(key) {
            slot.0 += 1;
            slot.1 += amount;
            return;
        }
        self.keys.push(key.to_string());
        self.slots.insert(key.to_string(), (1, amount));
    }

    /// (key, count, amount) in first-seen order.
    pub fn entries(&self) -> Vec<(String, usize, f64)> {
        self.keys
            .iter()
            .filter_map(|k| self.slots.get(k).map(|(count, amount)| (k.clone(), *count, *amount)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_change_boundaries() {
        assert_eq!(percent_change(5.0, 0.0), 100.0);
        assert_eq!(percent_change(0.0, 0.0), 0.0);
        assert_eq!(percent_change(0.0, 4.0), -100.0);
        assert_eq!(percent_change(3.0, 2.0), 50.0);
        assert_eq!(percent_change(1.0, 3.0), -66.67);
    }

    #[test]
    fn test_change_trend() {
        assert_eq!(Change::counts(3, 2).trend, Trend::Up);
        assert_eq!(Change::counts(1, 2).trend, Trend::Down);
        assert_eq!(Change::counts(0, 0).trend, Trend::Flat);
        assert_eq!(Change::counts(2, 0).change_pct, 100.0);
    }

    #[test]
    fn test_rate_and_rounding() {
        assert_eq!(rate(1, 3), 33.33);
        assert_eq!(rate(0, 0), 0.0);
        assert_eq!(round2(10.0 / 3.0), 3.33);
    }

    #[test]
    fn test_tally_keeps_first_seen_order() {
        let mut t = Tally::new();
        t.add("BGC", 100.0);
        t.add("Makati", 50.0);
        t.add("BGC", 25.5);
        assert_eq!(
            t.entries(),
            vec![("BGC".to_string(), 2, 125.5), ("Makati".to_string(), 1, 50.0)]
        );
        assert_eq!(group_key("  ", UNASSIGNED), UNASSIGNED);
    }
}
