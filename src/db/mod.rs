//! Row store seam.
//!
//! Bookings live in spreadsheet-like tables: row 1 is the header, data rows
//! follow in append order (oldest first). Row numbers are 1-based and count
//! the header, so the first data row is 2.

pub mod memory;
pub mod sheet_pool;

use async_trait::async_trait;
use shared::AppError;
use thiserror::Error;

pub use memory::MemoryStore;
pub use sheet_pool::PgSheetStore;

/// One positional row of heterogeneous cells.
pub type Row = Vec<serde_json::Value>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Row {row_number} not found in table {table}")]
    RowNotFound { table: String, row_number: usize },

    #[error("Row 1 of table {0} is the header and cannot be modified")]
    HeaderRow(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::TableNotFound(table) => {
                AppError::service_unavailable(format!("table {} is not available", table))
            }
            StoreError::RowNotFound { table, row_number } => {
                AppError::not_found(format!("row {} in {}", row_number, table))
            }
            StoreError::HeaderRow(table) => {
                AppError::bad_request(format!("the header row of {} is read-only", table))
            }
            StoreError::Backend(message) => AppError::store(message),
        }
    }
}

#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Every row of the table, header first, in insertion order.
    async fn read_all(&self, table: &str) -> Result<Vec<Row>, StoreError>;

    async fn append(&self, table: &str, row: Row) -> Result<(), StoreError>;

    async fn update_row(&self, table: &str, row_number: usize, row: Row) -> Result<(), StoreError>;

    async fn delete_row(&self, table: &str, row_number: usize) -> Result<(), StoreError>;
}

/// Rejects row numbers that point at the header or before it.
pub(crate) fn check_data_row(table: &str, row_number: usize) -> Result<(), StoreError> {
    match row_number {
        0 => Err(StoreError::RowNotFound {
            table: table.to_string(),
            row_number,
        }),
        1 => Err(StoreError::HeaderRow(table.to_string())),
        _ => Ok(()),
    }
}
