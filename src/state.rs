use anyhow::Context;
use chrono_tz::Tz;
use shared::config::Config;
use shared::database::DatabaseService;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::cache::BookingCache;
use crate::cache_ttl::{get_bookings_ttl, get_cleanup_interval};
use crate::db::{MemoryStore, PgSheetStore, TabularStore};
use crate::domains::bookings::{
    BookingService, BookingTables, ColumnMap, DuplicateMatcher, MatchPolicy, RecordParser,
    StatusClassifier,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub bookings: BookingService,
    pub booking_cache: Arc<BookingCache>,
    pub jwt_secret: String,
    pub tz: Tz,
}

impl AppState {
    /// Builds the state from configuration. Uses PostgreSQL when
    /// `DATABASE_URL` is set, the in-memory store otherwise.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let tables = booking_tables(&config)?;

        let store: Arc<dyn TabularStore> = match &config.database.url {
            Some(_) => {
                let database = DatabaseService::new(&config.database).await?;
                let store = PgSheetStore::new(database.pool().clone());
                store
                    .ensure_table(&tables.master_table, tables.master.map().header_row())
                    .await?;
                if let Some((name, intake)) = &tables.intake {
                    store.ensure_table(name, intake.map().header_row()).await?;
                }
                info!("Using PostgreSQL row store");
                Arc::new(store)
            }
            None => {
                info!("DATABASE_URL not set, using in-memory row store");
                Arc::new(seeded_memory_store(&tables))
            }
        };

        let cache = Arc::new(BookingCache::new());
        BookingCache::start_background_cleanup(cache.clone(), get_cleanup_interval());

        Self::with_store(config, store, cache, tables, get_bookings_ttl())
    }

    /// Wires the state around an existing store and cache.
    pub fn with_store(
        config: Config,
        store: Arc<dyn TabularStore>,
        cache: Arc<BookingCache>,
        tables: BookingTables,
        snapshot_ttl: Duration,
    ) -> anyhow::Result<Self> {
        let tz = report_timezone(&config)?;
        let policy: MatchPolicy = config
            .reports
            .match_policy
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;
        let matcher = DuplicateMatcher::new(policy, tables.master_table.clone());

        let bookings = BookingService::new(store, cache.clone(), tables, matcher, snapshot_ttl, tz);

        Ok(Self {
            jwt_secret: config.auth.jwt_secret.clone(),
            config,
            bookings,
            booking_cache: cache,
            tz,
        })
    }
}

fn report_timezone(config: &Config) -> anyhow::Result<Tz> {
    config
        .reports
        .timezone
        .parse::<Tz>()
        .map_err(|e| anyhow::anyhow!("invalid REPORT_TIMEZONE '{}': {}", config.reports.timezone, e))
}

/// Column layouts and parsers for the configured tables.
pub fn booking_tables(config: &Config) -> anyhow::Result<BookingTables> {
    let tz = report_timezone(config)?;
    let classifier = StatusClassifier::new(&config.reports.purchase_statuses);

    let master_map = ColumnMap::for_schema_version(config.store.schema_version)
        .with_context(|| format!("DB_SCHEMA_VERSION={}", config.store.schema_version))?;
    let intake = match &config.store.intake_table {
        Some(name) => Some((
            name.clone(),
            RecordParser::new(ColumnMap::intake()?, classifier.clone(), tz),
        )),
        None => None,
    };

    Ok(BookingTables {
        master_table: config.store.master_table.clone(),
        master: RecordParser::new(master_map, classifier, tz),
        intake,
    })
}

/// Memory store with a header row for every configured table.
pub fn seeded_memory_store(tables: &BookingTables) -> MemoryStore {
    let store = MemoryStore::new().with_table(&tables.master_table, tables.master.map().header_row());
    match &tables.intake {
        Some((name, intake)) => store.with_table(name, intake.map().header_row()),
        None => store,
    }
}
