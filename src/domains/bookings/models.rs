use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::parser::{normalize_email, normalize_name, normalize_phone, normalize_social, parse_price};
use super::status::{StatusCategory, StatusClass};

// ============================================================================
// BOOKING
// ============================================================================

/// Companion booked alongside the main customer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Companion {
    #[validate(length(max = 200, message = "companion full_name is too long"))]
    pub full_name: String,
    #[validate(range(max = 120, message = "companion age must be at most 120"))]
    pub age: u32,
    pub gender: String,
    pub phone: String,
    pub email: String,
    pub social_media: String,
    pub treatment: String,
    pub area: String,
    pub freebie: String,
}

impl Companion {
    pub fn is_empty(&self) -> bool {
        self.full_name.trim().is_empty()
    }
}

/// One booking row, typed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Booking {
    /// 1-based row in the master table; the header is row 1.
    pub row_number: usize,
    pub record_id: String,

    pub timestamp: String,
    pub created_at: Option<NaiveDateTime>,

    pub full_name: String,
    pub age: u32,
    pub gender: String,
    pub phone: String,
    pub email: String,
    pub social_media: String,

    pub branch: String,
    pub status: String,
    pub treatment: String,
    pub area: String,
    pub freebie: String,
    pub payment_mode: String,
    pub total_price: f64,
    pub agent: String,
    pub remarks: String,
    pub lead_source: String,

    pub companion: Option<Companion>,

    pub appointment_date: String,
    pub appointment_time: String,
    pub appointment: Option<NaiveDate>,

    pub cancellation_time: String,
    pub cancelled_at: Option<NaiveDateTime>,

    pub match_reason: String,
    pub matched_source: String,
    pub matched_row: String,

    pub updated_at: String,
    pub updated_by: String,

    pub status_class: StatusClass,

    #[serde(skip_serializing)]
    pub email_norm: String,
    #[serde(skip_serializing)]
    pub phone_norm: String,
    #[serde(skip_serializing)]
    pub social_norm: String,
    #[serde(skip_serializing)]
    pub full_name_norm: String,
    #[serde(skip_serializing)]
    pub companion_full_name_norm: String,
}

impl Booking {
    /// Recomputes the matching keys from the identity fields.
    pub fn refresh_norms(&mut self) {
        self.email_norm = normalize_email(&self.email);
        self.phone_norm = normalize_phone(&self.phone);
        self.social_norm = normalize_social(&self.social_media);
        self.full_name_norm = normalize_name(&self.full_name);
        self.companion_full_name_norm = self
            .companion
            .as_ref()
            .map(|c| normalize_name(&c.full_name))
            .unwrap_or_default();
    }

    pub fn is_cancelled(&self) -> bool {
        self.status_class.is_cancelled()
    }

    pub fn created_on(&self) -> Option<NaiveDate> {
        self.created_at.map(|dt| dt.date())
    }

    pub fn cancelled_on(&self) -> Option<NaiveDate> {
        self.cancelled_at.map(|dt| dt.date())
    }

    /// Price counted by the sales rule: allow-listed purchases only.
    pub fn sales_amount(&self) -> f64 {
        if self.status_class.purchase {
            self.total_price
        } else {
            0.0
        }
    }
}

// ============================================================================
// REQUESTS
// ============================================================================

/// Price as sent by clients: a number, or text such as "₱1,500.00".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Amount(f64),
    Text(String),
}

impl PriceInput {
    pub fn amount(&self) -> f64 {
        match self {
            PriceInput::Amount(value) if value.is_finite() && *value > 0.0 => *value,
            PriceInput::Amount(_) => 0.0,
            PriceInput::Text(text) => parse_price(text),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewBooking {
    #[validate(length(min = 1, max = 200, message = "full_name is required"))]
    pub full_name: String,
    #[validate(range(max = 120, message = "age must be at most 120"))]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    #[validate(length(max = 40, message = "phone is too long"))]
    pub phone: String,
    #[validate(email(message = "email is not a valid address"))]
    pub email: Option<String>,
    #[serde(default)]
    pub social_media: String,
    #[validate(length(min = 1, max = 100, message = "branch is required"))]
    pub branch: String,
    #[validate(length(min = 1, message = "appointment_date is required"))]
    pub appointment_date: String,
    #[serde(default)]
    pub appointment_time: String,
    #[serde(default)]
    pub treatment: String,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub freebie: String,
    #[serde(default)]
    pub payment_mode: String,
    pub total_price: Option<PriceInput>,
    /// Defaults to the authenticated user's email.
    pub agent: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub remarks: String,
    #[serde(default)]
    pub lead_source: String,
    #[validate(nested)]
    pub companion: Option<Companion>,
}

/// Partial update. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct BookingPatch {
    #[validate(length(min = 1, max = 200, message = "full_name cannot be blank"))]
    pub full_name: Option<String>,
    #[validate(range(max = 120, message = "age must be at most 120"))]
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    #[validate(email(message = "email is not a valid address"))]
    pub email: Option<String>,
    pub social_media: Option<String>,
    #[validate(length(min = 1, max = 100, message = "branch cannot be blank"))]
    pub branch: Option<String>,
    pub status: Option<String>,
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
    pub treatment: Option<String>,
    pub area: Option<String>,
    pub freebie: Option<String>,
    pub payment_mode: Option<String>,
    pub total_price: Option<PriceInput>,
    pub agent: Option<String>,
    pub remarks: Option<String>,
    pub lead_source: Option<String>,
    #[validate(nested)]
    pub companion: Option<Companion>,
}

impl BookingPatch {
    /// Copies present fields onto `booking`. Date parsing, status
    /// classification and normalization are left to the caller.
    pub fn apply_to(self, booking: &mut Booking) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *slot = value;
            }
        }

        set(&mut booking.full_name, self.full_name);
        set(&mut booking.age, self.age);
        set(&mut booking.gender, self.gender);
        set(&mut booking.phone, self.phone);
        set(&mut booking.email, self.email);
        set(&mut booking.social_media, self.social_media);
        set(&mut booking.branch, self.branch);
        set(&mut booking.status, self.status);
        set(&mut booking.appointment_date, self.appointment_date);
        set(&mut booking.appointment_time, self.appointment_time);
        set(&mut booking.treatment, self.treatment);
        set(&mut booking.area, self.area);
        set(&mut booking.freebie, self.freebie);
        set(&mut booking.payment_mode, self.payment_mode);
        set(&mut booking.agent, self.agent);
        set(&mut booking.remarks, self.remarks);
        set(&mut booking.lead_source, self.lead_source);
        if let Some(price) = self.total_price {
            booking.total_price = price.amount();
        }
        if let Some(companion) = self.companion {
            booking.companion = if companion.is_empty() { None } else { Some(companion) };
        }
    }
}

// ============================================================================
// LIST FILTER
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFilter {
    pub branch: Option<String>,
    pub status: Option<StatusCategory>,
    pub agent: Option<String>,
    /// Substring over name, email and phone.
    pub search: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        if let Some(branch) = non_blank(&self.branch) {
            if !booking.branch.trim().eq_ignore_ascii_case(branch) {
                return false;
            }
        }
        if let Some(agent) = non_blank(&self.agent) {
            if !booking.agent.trim().eq_ignore_ascii_case(agent) {
                return false;
            }
        }
        if let Some(category) = self.status {
            if booking.status_class.category != category {
                return false;
            }
        }
        if self.start_date.is_some() || self.end_date.is_some() {
            let Some(day) = booking.appointment else {
                return false;
            };
            if self.start_date.is_some_and(|start| day < start)
                || self.end_date.is_some_and(|end| day > end)
            {
                return false;
            }
        }
        if let Some(needle) = non_blank(&self.search) {
            let needle = needle.to_lowercase();
            let digits = normalize_phone(&needle);
            let hit = booking.full_name_norm.contains(&needle)
                || booking.email_norm.contains(&needle)
                || (!digits.is_empty() && booking.phone_norm.contains(&digits));
            if !hit {
                return false;
            }
        }
        true
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking(name: &str, branch: &str, phone: &str) -> Booking {
        let mut b = Booking {
            full_name: name.to_string(),
            branch: branch.to_string(),
            phone: phone.to_string(),
            appointment: NaiveDate::from_ymd_opt(2024, 3, 10),
            ..Default::default()
        };
        b.refresh_norms();
        b
    }

    #[test]
    fn test_price_input_variants() {
        assert_eq!(PriceInput::Amount(1500.0).amount(), 1500.0);
        assert_eq!(PriceInput::Amount(-3.0).amount(), 0.0);
        assert_eq!(PriceInput::Text("₱1,500.50".into()).amount(), 1500.5);
        assert_eq!(PriceInput::Text("free".into()).amount(), 0.0);
    }

    #[test]
    fn test_new_booking_validation() {
        let json = serde_json::json!({
            "full_name": "",
            "branch": "Makati",
            "appointment_date": "2024-03-10",
            "email": "not-an-email"
        });
        let req: NewBooking = serde_json::from_value(json).unwrap();
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("full_name"));
        assert!(fields.contains_key("email"));
    }

    #[test]
    fn test_patch_keeps_absent_fields() {
        let mut b = booking("Ana Cruz", "Makati", "0917 111 2222");
        let patch = BookingPatch {
            branch: Some("BGC".into()),
            total_price: Some(PriceInput::Text("2,000".into())),
            ..Default::default()
        };
        patch.apply_to(&mut b);
        assert_eq!(b.branch, "BGC");
        assert_eq!(b.full_name, "Ana Cruz");
        assert_eq!(b.total_price, 2000.0);
    }

    #[test]
    fn test_filter_by_branch_search_and_dates() {
        let b = booking("Ana Cruz", "Makati", "0917-111-2222");

        let by_branch = BookingFilter {
            branch: Some("makati".into()),
            ..Default::default()
        };
        assert!(by_branch.matches(&b));

        let by_phone = BookingFilter {
            search: Some("1112222".into()),
            ..Default::default()
        };
        assert!(by_phone.matches(&b));

        let outside = BookingFilter {
            start_date: NaiveDate::from_ymd_opt(2024, 3, 11),
            ..Default::default()
        };
        assert!(!outside.matches(&b));

        let other_name = BookingFilter {
            search: Some("maria".into()),
            ..Default::default()
        };
        assert!(!other_name.matches(&b));
    }
}
