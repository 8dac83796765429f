use chrono::NaiveDateTime;
use chrono_tz::Tz;
use shared::AppError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use super::dates::{format_timestamp, now_in, parse_date, DateWindow};
use super::matcher::{DuplicateMatcher, MatchCandidate, MatchResult};
use super::models::{Booking, BookingFilter, BookingPatch, NewBooking};
use super::parser::RecordParser;
use crate::cache::KeyValueCache;
use crate::cache_key;
use crate::db::{Row, StoreError, TabularStore};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Booking {0} not found")]
    NotFound(String),

    #[error("Invalid booking: {0}")]
    Invalid(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::NotFound(record_id) => AppError::not_found(format!("booking {}", record_id)),
            BookingError::Invalid(message) => AppError::validation(message),
            BookingError::Validation(errors) => AppError::validation(errors.to_string()),
            BookingError::Store(err) => err.into(),
        }
    }
}

pub type BookingResult<T> = Result<T, BookingError>;

// ============================================================================
// SERVICE
// ============================================================================

/// Where bookings are stored and how their rows are laid out.
#[derive(Debug, Clone)]
pub struct BookingTables {
    pub master_table: String,
    pub master: RecordParser,
    /// Staging table that receives a copy of every new booking.
    pub intake: Option<(String, RecordParser)>,
}

/// Reads and writes bookings through the row store, with the parsed
/// master table memoized in the cache.
#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn TabularStore>,
    cache: Arc<dyn KeyValueCache<Arc<Vec<Booking>>>>,
    tables: BookingTables,
    matcher: DuplicateMatcher,
    snapshot_ttl: Duration,
    tz: Tz,
    /// Bumped by every write; a snapshot read under an older generation is
    /// never cached.
    generation: Arc<AtomicU64>,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn TabularStore>,
        cache: Arc<dyn KeyValueCache<Arc<Vec<Booking>>>>,
        tables: BookingTables,
        matcher: DuplicateMatcher,
        snapshot_ttl: Duration,
        tz: Tz,
    ) -> Self {
        Self {
            store,
            cache,
            tables,
            matcher,
            snapshot_ttl,
            tz,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// Calendar windows anchored at the current day in the report zone.
    pub fn window(&self) -> DateWindow {
        DateWindow::now(self.tz)
    }

    fn now(&self) -> NaiveDateTime {
        now_in(self.tz)
    }

    fn cache_key(&self) -> String {
        cache_key::bookings_snapshot(&self.tables.master_table)
    }

    fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if self.cache.invalidate(&self.cache_key()) {
            debug!("Invalidated booking snapshot for {}", self.tables.master_table);
        }
    }

    /// Parsed master table, served from the cache while fresh.
    pub async fn load_all(&self) -> BookingResult<Arc<Vec<Booking>>> {
        let key = self.cache_key();
        if let Some(snapshot) = self.cache.get(&key) {
            debug!("Cache HIT for {}", key);
            return Ok(snapshot);
        }
        debug!("Cache MISS for {}", key);

        let generation = self.generation.load(Ordering::SeqCst);
        let (_, bookings) = self.read_fresh().await?;
        let snapshot = Arc::new(bookings);

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Write landed during refresh of {}, not caching", key);
            return Ok(snapshot);
        }
        self.cache.set(&key, snapshot.clone(), self.snapshot_ttl);
        // a write between the check and the set must not leave this behind
        if self.generation.load(Ordering::SeqCst) != generation {
            self.cache.invalidate(&key);
        }
        Ok(snapshot)
    }

    /// Raw rows plus parsed bookings, bypassing the cache.
    async fn read_fresh(&self) -> BookingResult<(Vec<Row>, Vec<Booking>)> {
        let rows = self.store.read_all(&self.tables.master_table).await?;
        let bookings = self.tables.master.parse_table(&rows);
        Ok((rows, bookings))
    }

    pub async fn find(&self, record_id: &str) -> BookingResult<Booking> {
        self.load_all()
            .await?
            .iter()
            .find(|b| b.record_id == record_id)
            .cloned()
            .ok_or_else(|| BookingError::NotFound(record_id.to_string()))
    }

    /// Matching bookings, newest row first.
    pub async fn list(&self, filter: &BookingFilter) -> BookingResult<Vec<Booking>> {
        let all = self.load_all().await?;
        Ok(all.iter().rev().filter(|b| filter.matches(b)).cloned().collect())
    }

    /// Runs the promo-hunter matcher without writing anything.
    pub async fn check_duplicate(&self, req: &NewBooking) -> BookingResult<MatchResult> {
        let history = self.load_all().await?;
        let candidate = MatchCandidate::from_request(req);
        Ok(self.matcher.evaluate(&candidate, &history, req.status.as_deref()))
    }

    pub async fn create(&self, req: NewBooking, user_email: &str) -> BookingResult<Booking> {
        req.validate()?;
        let appointment = parse_date(&req.appointment_date, self.tz).ok_or_else(|| {
            BookingError::Invalid(format!(
                "appointment_date '{}' is not a recognized date",
                req.appointment_date
            ))
        })?;

        // Match against the live table, not the snapshot
        let (rows, history) = self.read_fresh().await?;
        let candidate = MatchCandidate::from_request(&req);
        let result = self.matcher.evaluate(&candidate, &history, req.status.as_deref());
        if result.is_match() {
            info!(
                "Promo hunter detected for {}: {} ({})",
                req.full_name, result.match_reason, result.matched_row
            );
        }

        let now = self.now();
        let classifier = self.tables.master.classifier();
        let mut booking = Booking {
            row_number: rows.len().max(1) + 1,
            record_id: Uuid::new_v4().to_string(),
            timestamp: format_timestamp(now),
            created_at: Some(now),
            full_name: req.full_name.trim().to_string(),
            age: req.age.unwrap_or(0),
            gender: req.gender,
            phone: req.phone,
            email: req.email.unwrap_or_default(),
            social_media: req.social_media,
            branch: req.branch.trim().to_string(),
            status_class: classifier.classify(&result.status),
            status: result.status,
            treatment: req.treatment,
            area: req.area,
            freebie: req.freebie,
            payment_mode: req.payment_mode,
            total_price: req.total_price.map(|p| p.amount()).unwrap_or(0.0),
            agent: req
                .agent
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| user_email.to_string()),
            remarks: req.remarks,
            lead_source: req.lead_source,
            companion: req.companion.filter(|c| !c.is_empty()),
            appointment_date: req.appointment_date,
            appointment_time: req.appointment_time,
            appointment: Some(appointment.date()),
            match_reason: result.match_reason,
            matched_source: result.matched_source,
            matched_row: result.matched_row,
            ..Default::default()
        };
        if booking.is_cancelled() {
            stamp_cancellation(&mut booking, now);
        }
        booking.refresh_norms();

        // master is the source of truth; intake only ever mirrors it
        let row = self.tables.master.to_row(&booking, None);
        self.store.append(&self.tables.master_table, row).await?;
        self.invalidate();

        if let Some((intake_table, intake)) = &self.tables.intake {
            if let Err(e) = self
                .store
                .append(intake_table, intake.to_row(&booking, None))
                .await
            {
                warn!(
                    "Booking {} stored in {} row {} but not copied to {}: {}",
                    booking.record_id, self.tables.master_table, booking.row_number, intake_table, e
                );
            }
        }

        info!(
            "Created booking {} for {} at {} (status: {})",
            booking.record_id, booking.full_name, booking.branch, booking.status
        );
        Ok(booking)
    }

    pub async fn update(
        &self,
        record_id: &str,
        patch: BookingPatch,
        user_email: &str,
    ) -> BookingResult<Booking> {
        patch.validate()?;

        let (rows, bookings) = self.read_fresh().await?;
        let mut booking = bookings
            .into_iter()
            .find(|b| b.record_id == record_id)
            .ok_or_else(|| BookingError::NotFound(record_id.to_string()))?;
        let was_cancelled = booking.is_cancelled();

        patch.apply_to(&mut booking);

        booking.appointment = parse_date(&booking.appointment_date, self.tz).map(|dt| dt.date());
        if booking.appointment.is_none() && !booking.appointment_date.is_empty() {
            return Err(BookingError::Invalid(format!(
                "appointment_date '{}' is not a recognized date",
                booking.appointment_date
            )));
        }

        let now = self.now();
        booking.status_class = self.tables.master.classifier().classify(&booking.status);
        if booking.is_cancelled() && !was_cancelled && booking.cancellation_time.is_empty() {
            stamp_cancellation(&mut booking, now);
        }
        booking.updated_at = format_timestamp(now);
        booking.updated_by = user_email.to_string();
        booking.refresh_norms();

        let base = rows.get(booking.row_number - 1).map(Vec::as_slice);
        let row = self.tables.master.to_row(&booking, base);
        self.store
            .update_row(&self.tables.master_table, booking.row_number, row)
            .await?;
        self.invalidate();

        info!("Updated booking {} (row {})", booking.record_id, booking.row_number);
        Ok(booking)
    }

    pub async fn delete(&self, record_id: &str) -> BookingResult<Booking> {
        let (_, bookings) = self.read_fresh().await?;
        let booking = bookings
            .into_iter()
            .find(|b| b.record_id == record_id)
            .ok_or_else(|| BookingError::NotFound(record_id.to_string()))?;

        if let Err(e) = self
            .store
            .delete_row(&self.tables.master_table, booking.row_number)
            .await
        {
            warn!("Failed to delete booking {}: {}", record_id, e);
            return Err(e.into());
        }
        self.invalidate();

        info!("Deleted booking {} (row {})", booking.record_id, booking.row_number);
        Ok(booking)
    }
}

fn stamp_cancellation(booking: &mut Booking, now: NaiveDateTime) {
    booking.cancellation_time = format_timestamp(now);
    booking.cancelled_at = Some(now);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::BookingCache;
    use crate::db::MemoryStore;
    use crate::domains::bookings::matcher::{MatchPolicy, STATUS_PROMO_HUNTER, STATUS_SCHEDULED};
    use crate::domains::bookings::models::PriceInput;
    use crate::domains::bookings::schema::ColumnMap;
    use crate::domains::bookings::status::{StatusCategory, StatusClassifier};
    use chrono_tz::Asia::Manila;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::Notify;

    struct Fixture {
        service: BookingService,
        store: Arc<MemoryStore>,
        cache: Arc<BookingCache>,
    }

    fn master_parser() -> RecordParser {
        RecordParser::new(ColumnMap::master_v44().unwrap(), StatusClassifier::default(), Manila)
    }

    fn intake_parser() -> RecordParser {
        RecordParser::new(ColumnMap::intake().unwrap(), StatusClassifier::default(), Manila)
    }

    fn master_only_store() -> MemoryStore {
        MemoryStore::new().with_table("DB", master_parser().map().header_row())
    }

    fn service_over(
        store: Arc<dyn TabularStore>,
        cache: Arc<BookingCache>,
        with_intake: bool,
    ) -> BookingService {
        BookingService::new(
            store,
            cache,
            BookingTables {
                master_table: "DB".to_string(),
                master: master_parser(),
                intake: with_intake.then(|| ("Intake".to_string(), intake_parser())),
            },
            DuplicateMatcher::new(MatchPolicy::AllMatches, "DB"),
            Duration::from_secs(60),
            Manila,
        )
    }

    fn fixture(with_intake: bool) -> Fixture {
        let mut store = master_only_store();
        if with_intake {
            store = store.with_table("Intake", intake_parser().map().header_row());
        }
        let store = Arc::new(store);
        let cache = Arc::new(BookingCache::new());
        let service = service_over(store.clone(), cache.clone(), with_intake);
        Fixture { service, store, cache }
    }

    /// Memory store whose next `read_all` holds its result until released.
    struct GatedStore {
        inner: MemoryStore,
        hold_next_read: AtomicBool,
        holding: Notify,
        release: Notify,
    }

    #[async_trait::async_trait]
    impl TabularStore for GatedStore {
        async fn read_all(&self, table: &str) -> Result<Vec<Row>, StoreError> {
            let rows = self.inner.read_all(table).await?;
            if self.hold_next_read.swap(false, Ordering::SeqCst) {
                self.holding.notify_one();
                self.release.notified().await;
            }
            Ok(rows)
        }

        async fn append(&self, table: &str, row: Row) -> Result<(), StoreError> {
            self.inner.append(table, row).await
        }

        async fn update_row(&self, table: &str, row_number: usize, row: Row) -> Result<(), StoreError> {
            self.inner.update_row(table, row_number, row).await
        }

        async fn delete_row(&self, table: &str, row_number: usize) -> Result<(), StoreError> {
            self.inner.delete_row(table, row_number).await
        }
    }

    fn request(name: &str, email: &str) -> NewBooking {
        serde_json::from_value(serde_json::json!({
            "full_name": name,
            "email": email,
            "phone": "0917 000 0000",
            "branch": "Makati",
            "appointment_date": "2024-03-12",
            "total_price": "₱1,500",
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_appends_to_intake_and_master() {
        let f = fixture(true);
        let booking = f.service.create(request("Ana Cruz", "ana@example.com"), "agent@clinic.ph").await.unwrap();

        assert_eq!(booking.status, STATUS_SCHEDULED);
        assert_eq!(booking.agent, "agent@clinic.ph");
        assert_eq!(booking.total_price, 1500.0);
        assert_eq!(booking.row_number, 2);
        assert_eq!(f.store.row_count("DB"), 2);
        assert_eq!(f.store.row_count("Intake"), 2);

        let found = f.service.find(&booking.record_id).await.unwrap();
        assert_eq!(found.full_name, "Ana Cruz");
        assert_eq!(found.email_norm, "ana@example.com");
    }

    #[tokio::test]
    async fn test_second_booking_by_same_email_is_promo_hunter() {
        let f = fixture(false);
        f.service.create(request("Ana Cruz", "ana@example.com"), "a@clinic.ph").await.unwrap();

        let mut second = request("A. Cruz", "ANA@example.com");
        second.phone = String::new();
        second.status = Some("Confirmed".into());
        let booking = f.service.create(second, "a@clinic.ph").await.unwrap();

        assert_eq!(booking.status, STATUS_PROMO_HUNTER);
        assert_eq!(booking.status_class.category, StatusCategory::PromoHunter);
        assert_eq!(booking.match_reason, "Email Match");
        assert_eq!(booking.matched_row, "2");
        assert_eq!(booking.matched_source, "DB: Ana Cruz");
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let f = fixture(false);
        let mut req = request("Ana Cruz", "ana@example.com");
        req.appointment_date = "someday".into();
        assert!(matches!(
            f.service.create(req, "a@clinic.ph").await,
            Err(BookingError::Invalid(_))
        ));

        let req = request("", "ana@example.com");
        assert!(matches!(
            f.service.create(req, "a@clinic.ph").await,
            Err(BookingError::Validation(_))
        ));
        assert_eq!(f.store.row_count("DB"), 1);
    }

    #[tokio::test]
    async fn test_writes_invalidate_snapshot() {
        let f = fixture(false);
        assert!(f.service.load_all().await.unwrap().is_empty());

        f.service.create(request("Ana Cruz", "ana@example.com"), "a@clinic.ph").await.unwrap();
        assert_eq!(f.service.load_all().await.unwrap().len(), 1);

        let stats = f.cache.stats();
        assert_eq!(stats.entries, 1);
        assert!(stats.misses >= 2);
    }

    #[tokio::test]
    async fn test_refresh_started_before_a_write_is_not_cached() {
        let store = Arc::new(GatedStore {
            inner: master_only_store(),
            hold_next_read: AtomicBool::new(true),
            holding: Notify::new(),
            release: Notify::new(),
        });
        let service = service_over(store.clone(), Arc::new(BookingCache::new()), false);

        let reader = {
            let service = service.clone();
            tokio::spawn(async move { service.load_all().await.map(|all| all.len()) })
        };
        store.holding.notified().await;

        service.create(request("Ana Cruz", "ana@example.com"), "a@clinic.ph").await.unwrap();
        store.release.notify_one();

        // the reader still returns what it read, but must not cache it
        assert_eq!(reader.await.unwrap().unwrap(), 0);
        assert_eq!(service.load_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_with_cancelled_status_is_stamped() {
        let f = fixture(false);
        let mut req = request("Ana Cruz", "ana@example.com");
        req.status = Some("Cancelled".into());

        let booking = f.service.create(req, "a@clinic.ph").await.unwrap();
        assert!(booking.is_cancelled());
        assert!(booking.cancelled_at.is_some());
        assert_eq!(booking.cancellation_time, booking.timestamp);

        let stored = f.service.find(&booking.record_id).await.unwrap();
        assert_eq!(stored.cancellation_time, booking.cancellation_time);
        assert_eq!(stored.cancelled_on(), booking.created_on());
    }

    #[tokio::test]
    async fn test_failed_intake_copy_keeps_master_row() {
        // intake configured but the table does not exist
        let store = Arc::new(master_only_store());
        let service = service_over(store.clone(), Arc::new(BookingCache::new()), true);

        let booking = service.create(request("Ana Cruz", "ana@example.com"), "a@clinic.ph").await.unwrap();
        assert_eq!(store.row_count("DB"), 2);
        assert_eq!(service.find(&booking.record_id).await.unwrap().full_name, "Ana Cruz");
    }

    #[tokio::test]
    async fn test_update_sets_cancellation_once_and_keeps_match_fields() {
        let f = fixture(false);
        f.service.create(request("Ana Cruz", "ana@example.com"), "a@clinic.ph").await.unwrap();
        let dup = f.service.create(request("Ana Cruz", "other@example.com"), "a@clinic.ph").await.unwrap();

        let patch = BookingPatch {
            status: Some("Cancelled".into()),
            total_price: Some(PriceInput::Amount(900.0)),
            ..Default::default()
        };
        let updated = f.service.update(&dup.record_id, patch, "admin@clinic.ph").await.unwrap();
        assert!(updated.is_cancelled());
        assert!(updated.cancelled_at.is_some());
        assert_eq!(updated.match_reason, "Name Match");
        assert_eq!(updated.updated_by, "admin@clinic.ph");
        assert_eq!(updated.total_price, 900.0);
        let first_cancel = updated.cancellation_time.clone();

        let patch = BookingPatch {
            status: Some("Cancelled - refunded".into()),
            ..Default::default()
        };
        let again = f.service.update(&dup.record_id, patch, "admin@clinic.ph").await.unwrap();
        assert_eq!(again.cancellation_time, first_cancel);

        // reviving does not clear the cancellation stamp
        let patch = BookingPatch {
            status: Some("Scheduled".into()),
            ..Default::default()
        };
        let revived = f.service.update(&dup.record_id, patch, "admin@clinic.ph").await.unwrap();
        assert_eq!(revived.cancellation_time, first_cancel);
    }

    #[tokio::test]
    async fn test_update_recomputes_norms() {
        let f = fixture(false);
        let b = f.service.create(request("Ana Cruz", "ana@example.com"), "a@clinic.ph").await.unwrap();
        let patch = BookingPatch {
            email: Some("Ana.New@Example.com".into()),
            ..Default::default()
        };
        let updated = f.service.update(&b.record_id, patch, "a@clinic.ph").await.unwrap();
        assert_eq!(updated.email_norm, "ana.new@example.com");
        assert_eq!(f.service.find(&b.record_id).await.unwrap().email, "Ana.New@Example.com");
    }

    #[tokio::test]
    async fn test_delete_and_missing_records() {
        let f = fixture(false);
        let b = f.service.create(request("Ana Cruz", "ana@example.com"), "a@clinic.ph").await.unwrap();

        f.service.delete(&b.record_id).await.unwrap();
        assert_eq!(f.store.row_count("DB"), 1);
        assert!(matches!(f.service.find(&b.record_id).await, Err(BookingError::NotFound(_))));
        assert!(matches!(f.service.delete(&b.record_id).await, Err(BookingError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_check_duplicate_does_not_write() {
        let f = fixture(false);
        f.service.create(request("Ana Cruz", "ana@example.com"), "a@clinic.ph").await.unwrap();

        let result = f.service.check_duplicate(&request("Ana Cruz", "x@example.com")).await.unwrap();
        assert!(result.is_match());
        assert_eq!(f.store.row_count("DB"), 2);
    }
}
