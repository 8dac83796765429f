use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use tracing::{debug, error};

use super::{check_data_row, Row, StoreError, TabularStore};

/// Row store backed by the `sheet_rows` table: one JSONB array of cells per
/// row, ordered by the serial id so append order is preserved.
#[derive(Clone)]
pub struct PgSheetStore {
    pool: PgPool,
}

impl PgSheetStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Seeds the header row when the table has no rows yet.
    pub async fn ensure_table(&self, table: &str, header: Row) -> Result<(), StoreError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sheet_rows WHERE table_name = $1")
                .bind(table)
                .fetch_one(&self.pool)
                .await?;

        if count == 0 {
            self.append(table, header).await?;
            debug!("Seeded header row for table {}", table);
        }
        Ok(())
    }
}

#[async_trait]
impl TabularStore for PgSheetStore {
    async fn read_all(&self, table: &str) -> Result<Vec<Row>, StoreError> {
        let rows: Vec<(Json<Row>,)> =
            sqlx::query_as("SELECT cells FROM sheet_rows WHERE table_name = $1 ORDER BY id")
                .bind(table)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    error!("Failed to read table {}: {}", table, e);
                    StoreError::from(e)
                })?;

        if rows.is_empty() {
            return Err(StoreError::TableNotFound(table.to_string()));
        }

        Ok(rows.into_iter().map(|(cells,)| cells.0).collect())
    }

    async fn append(&self, table: &str, row: Row) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO sheet_rows (table_name, cells) VALUES ($1, $2)")
            .bind(table)
            .bind(Json(row))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_row(&self, table: &str, row_number: usize, row: Row) -> Result<(), StoreError> {
        check_data_row(table, row_number)?;

        let result = sqlx::query(
            r#"
            UPDATE sheet_rows SET cells = $3
            WHERE id = (
                SELECT id FROM sheet_rows
                WHERE table_name = $1
                ORDER BY id
                OFFSET $2 LIMIT 1
            )
            "#,
        )
        .bind(table)
        .bind((row_number - 1) as i64)
        .bind(Json(row))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RowNotFound {
                table: table.to_string(),
                row_number,
            });
        }
        Ok(())
    }

    async fn delete_row(&self, table: &str, row_number: usize) -> Result<(), StoreError> {
        check_data_row(table, row_number)?;

        let result = sqlx::query(
            r#"
            DELETE FROM sheet_rows
            WHERE id = (
                SELECT id FROM sheet_rows
                WHERE table_name = $1
                ORDER BY id
                OFFSET $2 LIMIT 1
            )
            "#,
        )
        .bind(table)
        .bind((row_number - 1) as i64)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RowNotFound {
                table: table.to_string(),
                row_number,
            });
        }
        Ok(())
    }
}
