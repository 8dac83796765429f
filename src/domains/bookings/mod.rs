//! Booking records: parsing, classification, duplicate detection and
//! read/write access through the row store.

pub mod dates;
pub mod matcher;
pub mod models;
pub mod parser;
pub mod schema;
pub mod service;
pub mod status;

pub use dates::{DateRange, DateRangeError, DateWindow};
pub use matcher::{DuplicateMatcher, MatchPolicy, MatchResult};
pub use models::{Booking, BookingFilter, BookingPatch, Companion, NewBooking};
pub use parser::RecordParser;
pub use schema::{Column, ColumnMap, SchemaError};
pub use service::{BookingError, BookingService, BookingTables};
pub use status::{StatusCategory, StatusClass, StatusClassifier};
