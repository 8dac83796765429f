use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

use super::{check_data_row, Row, StoreError, TabularStore};

/// In-process table store used for local development and tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates (or resets) a table holding only the given header row.
    pub fn create_table(&self, table: &str, header: Row) {
        self.tables.write().insert(table.to_string(), vec![header]);
        debug!("Created in-memory table {}", table);
    }

    pub fn with_table(self, table: &str, header: Row) -> Self {
        self.create_table(table, header);
        self
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables.read().get(table).map(Vec::len).unwrap_or(0)
    }
}

#[async_trait]
impl TabularStore for MemoryStore {
    async fn read_all(&self, table: &str) -> Result<Vec<Row>, StoreError> {
        self.tables
            .read()
            .get(table)
            .cloned()
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))
    }

    async fn append(&self, table: &str, row: Row) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        rows.push(row);
        Ok(())
    }

    async fn update_row(&self, table: &str, row_number: usize, row: Row) -> Result<(), StoreError> {
        check_data_row(table, row_number)?;
        let mut tables = self.tables.write();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        let slot = rows.get_mut(row_number - 1).ok_or_else(|| StoreError::RowNotFound {
            table: table.to_string(),
            row_number,
        })?;
        *slot = row;
        Ok(())
    }

    async fn delete_row(&self, table: &str, row_number: usize) -> Result<(), StoreError> {
        check_data_row(table, row_number)?;
        let mut tables = self.tables.write();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        if row_number > rows.len() {
            return Err(StoreError::RowNotFound {
                table: table.to_string(),
                row_number,
            });
        }
        rows.remove(row_number - 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> MemoryStore {
        MemoryStore::new().with_table("DB", vec![json!("Timestamp"), json!("Name")])
    }

    #[tokio::test]
    async fn test_append_keeps_insertion_order() {
        let store = store();
        store.append("DB", vec![json!("t1"), json!("Ana")]).await.unwrap();
        store.append("DB", vec![json!("t2"), json!("Ben")]).await.unwrap();

        let rows = store.read_all("DB").await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][1], json!("Ana"));
        assert_eq!(rows[2][1], json!("Ben"));
    }

    #[tokio::test]
    async fn test_update_and_delete_use_one_based_rows() {
        let store = store();
        store.append("DB", vec![json!("t1"), json!("Ana")]).await.unwrap();
        store.append("DB", vec![json!("t2"), json!("Ben")]).await.unwrap();

        store.update_row("DB", 2, vec![json!("t1"), json!("Ana Cruz")]).await.unwrap();
        store.delete_row("DB", 3).await.unwrap();

        let rows = store.read_all("DB").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][1], json!("Ana Cruz"));
    }

    #[tokio::test]
    async fn test_out_of_range_and_header_rows_are_rejected() {
        let store = store();
        assert!(matches!(
            store.delete_row("DB", 5).await,
            Err(StoreError::RowNotFound { row_number: 5, .. })
        ));
        assert!(matches!(
            store.update_row("DB", 1, vec![]).await,
            Err(StoreError::HeaderRow(_))
        ));
        assert!(matches!(
            store.read_all("Intake").await,
            Err(StoreError::TableNotFound(_))
        ));
    }
}
