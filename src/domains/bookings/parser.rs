//! Row <-> [`Booking`] conversion.
//!
//! Sheet data is edited by hand, so parsing is total: any cell may be
//! missing, blank, the wrong type or garbage, and the row still produces a
//! booking with neutral defaults.

use chrono_tz::Tz;
use serde_json::{json, Value};

use super::dates::parse_date;
use super::models::{Booking, Companion};
use super::schema::{Column, ColumnMap};
use super::status::StatusClassifier;
use crate::db::Row;

// ============================================================================
// CELL HELPERS
// ============================================================================

/// Cell as trimmed text. Numbers are rendered without a trailing `.0`.
pub fn cell_text(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Strips every character that is not a digit or `.`, then parses.
/// Anything unparsable, negative or non-finite is 0; a `-` ahead of the
/// first digit marks the amount negative.
pub fn parse_price(text: &str) -> f64 {
    if text
        .chars()
        .take_while(|c| !c.is_ascii_digit())
        .any(|c| c == '-')
    {
        return 0.0;
    }
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

pub fn parse_age(text: &str) -> u32 {
    let text = text.trim();
    text.parse::<u32>()
        .ok()
        .or_else(|| {
            text.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0 && *v < u32::MAX as f64)
                .map(|v| v as u32)
        })
        .unwrap_or(0)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Digits only.
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Lowercased, inner whitespace collapsed to single spaces.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Lowercased handle without a leading `@`.
pub fn normalize_social(handle: &str) -> String {
    handle.trim().trim_start_matches('@').trim().to_lowercase()
}

fn is_blank_row(row: &[Value]) -> bool {
    row.iter().all(|cell| cell_text(cell).is_empty())
}

// ============================================================================
// PARSER
// ============================================================================

#[derive(Debug, Clone)]
pub struct RecordParser {
    map: ColumnMap,
    classifier: StatusClassifier,
    tz: Tz,
}

impl RecordParser {
    pub fn new(map: ColumnMap, classifier: StatusClassifier, tz: Tz) -> Self {
        Self { map, classifier, tz }
    }

    pub fn map(&self) -> &ColumnMap {
        &self.map
    }

    pub fn classifier(&self) -> &StatusClassifier {
        &self.classifier
    }

    fn text(&self, row: &[Value], column: Column) -> String {
        self.map
            .index_of(column)
            .and_then(|i| row.get(i))
            .map(cell_text)
            .unwrap_or_default()
    }

    fn price(&self, row: &[Value], column: Column) -> f64 {
        match self.map.index_of(column).and_then(|i| row.get(i)) {
            Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite() && *v > 0.0).unwrap_or(0.0),
            Some(cell) => parse_price(&cell_text(cell)),
            None => 0.0,
        }
    }

    /// Parses one data row. `row_number` is the 1-based store row.
    pub fn parse_row(&self, row: &[Value], row_number: usize) -> Booking {
        use Column::*;
        let t = |column| self.text(row, column);

        let companion = Companion {
            full_name: t(CompanionFullName),
            age: parse_age(&t(CompanionAge)),
            gender: t(CompanionGender),
            phone: t(CompanionPhone),
            email: t(CompanionEmail),
            social_media: t(CompanionSocialMedia),
            treatment: t(CompanionTreatment),
            area: t(CompanionArea),
            freebie: t(CompanionFreebie),
        };

        let timestamp = t(Timestamp);
        let appointment_date = t(AppointmentDate);
        let cancellation_time = t(CancellationTime);
        let status = t(Status);

        let mut booking = Booking {
            row_number,
            record_id: t(RecordId),
            created_at: parse_date(&timestamp, self.tz),
            timestamp,
            full_name: t(FullName),
            age: parse_age(&t(Age)),
            gender: t(Gender),
            phone: t(Phone),
            email: t(Email),
            social_media: t(SocialMedia),
            branch: t(Branch),
            status_class: self.classifier.classify(&status),
            status,
            treatment: t(Treatment),
            area: t(Area),
            freebie: t(Freebie),
            payment_mode: t(PaymentMode),
            total_price: self.price(row, TotalPrice),
            agent: t(Agent),
            remarks: t(Remarks),
            lead_source: t(LeadSource),
            companion: if companion.is_empty() { None } else { Some(companion) },
            appointment: parse_date(&appointment_date, self.tz).map(|dt| dt.date()),
            appointment_date,
            appointment_time: t(AppointmentTime),
            cancelled_at: parse_date(&cancellation_time, self.tz),
            cancellation_time,
            match_reason: t(MatchReason),
            matched_source: t(MatchedSource),
            matched_row: t(MatchedRow),
            updated_at: t(UpdatedAt),
            updated_by: t(UpdatedBy),
            ..Default::default()
        };
        booking.refresh_norms();
        booking
    }

    /// Parses every data row of a table read. Row 0 is the header; blank
    /// rows are skipped but still count toward row numbers.
    pub fn parse_table(&self, rows: &[Row]) -> Vec<Booking> {
        rows.iter()
            .enumerate()
            .skip(1)
            .filter(|(_, row)| !is_blank_row(row))
            .map(|(i, row)| self.parse_row(row, i + 1))
            .collect()
    }

    /// Renders a booking into a row of exactly `column_count` cells.
    /// Cells of uninterpreted columns are copied from `base` when given.
    pub fn to_row(&self, booking: &Booking, base: Option<&[Value]>) -> Row {
        let width = self.map.column_count();
        let mut row: Row = base
            .map(|b| b.iter().take(width).cloned().collect())
            .unwrap_or_default();
        row.resize(width, Value::String(String::new()));

        let companion = booking.companion.clone().unwrap_or_default();
        let age_cell = |age: u32| if age > 0 { json!(age) } else { json!("") };

        for (column, index) in self.map.columns() {
            use Column::*;
            let cell = match column {
                Timestamp => json!(booking.timestamp),
                RecordId => json!(booking.record_id),
                FullName => json!(booking.full_name),
                Age => age_cell(booking.age),
                Gender => json!(booking.gender),
                Phone => json!(booking.phone),
                Email => json!(booking.email),
                SocialMedia => json!(booking.social_media),
                Branch => json!(booking.branch),
                AppointmentDate => json!(booking.appointment_date),
                AppointmentTime => json!(booking.appointment_time),
                Treatment => json!(booking.treatment),
                Area => json!(booking.area),
                Freebie => json!(booking.freebie),
                PaymentMode => json!(booking.payment_mode),
                TotalPrice => json!(booking.total_price),
                Agent => json!(booking.agent),
                Status => json!(booking.status),
                CompanionFullName => json!(companion.full_name),
                CompanionAge => age_cell(companion.age),
                CompanionGender => json!(companion.gender),
                CompanionPhone => json!(companion.phone),
                CompanionEmail => json!(companion.email),
                CompanionSocialMedia => json!(companion.social_media),
                CompanionTreatment => json!(companion.treatment),
                CompanionArea => json!(companion.area),
                CompanionFreebie => json!(companion.freebie),
                Remarks => json!(booking.remarks),
                MatchReason => json!(booking.match_reason),
                MatchedSource => json!(booking.matched_source),
                MatchedRow => json!(booking.matched_row),
                EmailNorm => json!(booking.email_norm),
                PhoneNorm => json!(booking.phone_norm),
                SocialNorm => json!(booking.social_norm),
                FullNameNorm => json!(booking.full_name_norm),
                CompanionFullNameNorm => json!(booking.companion_full_name_norm),
                CancellationTime => json!(booking.cancellation_time),
                UpdatedAt => json!(booking.updated_at),
                UpdatedBy => json!(booking.updated_by),
                LeadSource => json!(booking.lead_source),
                Extra(_) => continue,
            };
            row[index] = cell;
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn parser() -> RecordParser {
        RecordParser::new(
            ColumnMap::master_v37().unwrap(),
            StatusClassifier::default(),
            chrono_tz::Asia::Manila,
        )
    }

    fn sample_row(p: &RecordParser) -> Row {
        let mut row = vec![json!(""); p.map().column_count()];
        let mut put = |column, value: Value| row[p.map().index_of(column).unwrap()] = value;
        put(Column::Timestamp, json!("03/10/2024 09:15:00"));
        put(Column::RecordId, json!("rec-1"));
        put(Column::FullName, json!("  Ana   Cruz "));
        put(Column::Age, json!(29));
        put(Column::Phone, json!("+63 917-111-2222"));
        put(Column::Email, json!(" Ana@Example.COM"));
        put(Column::SocialMedia, json!("@ana.cruz"));
        put(Column::Branch, json!("Makati"));
        put(Column::AppointmentDate, json!("Mar 12 2024"));
        put(Column::TotalPrice, json!("₱1,500.00"));
        put(Column::Status, json!("Arrived & Bought"));
        put(Column::CompanionFullName, json!("Ben Cruz"));
        row
    }

    #[test]
    fn test_parse_price_strips_non_numeric() {
        assert_eq!(parse_price("₱1,500.00"), 1500.0);
        assert_eq!(parse_price("PHP 2,000"), 2000.0);
        assert_eq!(parse_price("1.2.3"), 0.0);
        assert_eq!(parse_price(""), 0.0);
        assert_eq!(parse_price("-500"), 0.0);
        assert_eq!(parse_price("₱ -1,200.00"), 0.0);
        assert_eq!(parse_price("1,500 - promo"), 1500.0);
    }

    #[test]
    fn test_negative_prices_count_as_zero_in_any_cell_type() {
        let p = parser();
        let mut row = sample_row(&p);
        let at = p.map().index_of(Column::TotalPrice).unwrap();

        row[at] = json!(-500);
        assert_eq!(p.parse_row(&row, 2).total_price, 0.0);
        row[at] = json!("-500");
        assert_eq!(p.parse_row(&row, 2).total_price, 0.0);
        row[at] = json!(500);
        assert_eq!(p.parse_row(&row, 2).total_price, 500.0);
    }

    #[test]
    fn test_parse_age_defaults_to_zero() {
        assert_eq!(parse_age("31"), 31);
        assert_eq!(parse_age("31.0"), 31);
        assert_eq!(parse_age("thirty"), 0);
        assert_eq!(parse_age(""), 0);
        assert_eq!(parse_age("-4"), 0);
    }

    #[test]
    fn test_normalizers() {
        assert_eq!(normalize_email("  A@B.Com "), "a@b.com");
        assert_eq!(normalize_phone("+63 (917) 111-2222"), "639171112222");
        assert_eq!(normalize_name(" Ana \t Maria  CRUZ "), "ana maria cruz");
        assert_eq!(normalize_social(" @Ana.Cruz"), "ana.cruz");
    }

    #[test]
    fn test_cell_text_renders_numbers() {
        assert_eq!(cell_text(&json!(29)), "29");
        assert_eq!(cell_text(&json!(29.0)), "29");
        assert_eq!(cell_text(&json!(1500.5)), "1500.5");
        assert_eq!(cell_text(&Value::Null), "");
        assert_eq!(cell_text(&json!(true)), "true");
    }

    #[test]
    fn test_parse_row_full() {
        let p = parser();
        let b = p.parse_row(&sample_row(&p), 2);

        assert_eq!(b.row_number, 2);
        assert_eq!(b.record_id, "rec-1");
        assert_eq!(b.age, 29);
        assert_eq!(b.total_price, 1500.0);
        assert_eq!(b.appointment, NaiveDate::from_ymd_opt(2024, 3, 12));
        assert_eq!(b.created_on(), NaiveDate::from_ymd_opt(2024, 3, 10));
        assert!(b.status_class.purchase);
        assert_eq!(b.full_name_norm, "ana cruz");
        assert_eq!(b.email_norm, "ana@example.com");
        assert_eq!(b.phone_norm, "639171112222");
        assert_eq!(b.social_norm, "ana.cruz");
        assert_eq!(b.companion_full_name_norm, "ben cruz");
    }

    #[test]
    fn test_parse_row_is_total_on_short_and_garbage_rows() {
        let p = parser();
        let b = p.parse_row(&[json!("not a date"), json!(null), json!({"x": 1})], 5);
        assert_eq!(b.row_number, 5);
        assert!(b.created_at.is_none());
        assert!(b.appointment.is_none());
        assert_eq!(b.total_price, 0.0);
        assert_eq!(b.age, 0);
        assert!(b.companion.is_none());
    }

    #[test]
    fn test_parse_table_skips_header_and_blank_rows() {
        let p = parser();
        let rows = vec![
            p.map().header_row(),
            sample_row(&p),
            vec![json!(""); 3],
            sample_row(&p),
        ];
        let bookings = p.parse_table(&rows);
        assert_eq!(bookings.len(), 2);
        assert_eq!(bookings[0].row_number, 2);
        assert_eq!(bookings[1].row_number, 4);

        assert!(p.parse_table(&[]).is_empty());
        assert!(p.parse_table(&[p.map().header_row()]).is_empty());
    }

    #[test]
    fn test_to_row_preserves_extra_cells() {
        let p = RecordParser::new(
            ColumnMap::master_v44().unwrap(),
            StatusClassifier::default(),
            chrono_tz::Asia::Manila,
        );
        let mut base = vec![json!(""); 44];
        base[43] = json!("Dr. Reyes");
        base[p.map().index_of(Column::FullName).unwrap()] = json!("Old Name");

        let mut b = p.parse_row(&base, 2);
        b.full_name = "New Name".into();
        let row = p.to_row(&b, Some(&base));

        assert_eq!(row.len(), 44);
        assert_eq!(row[43], json!("Dr. Reyes"));
        assert_eq!(row[p.map().index_of(Column::FullName).unwrap()], json!("New Name"));
        assert_eq!(p.parse_row(&row, 2).full_name, "New Name");
    }
}
