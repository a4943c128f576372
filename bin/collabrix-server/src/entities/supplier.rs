use crate::entities::{SqliteStore, sql_limit};

use chrono::Utc;
use collabrix_types::Supplier;
use std::future::Future;

pub trait SupplierStore: Send + Sync + 'static {
    /// Suppliers in insertion order, at most `limit` of them; `0` lists all.
    fn list_suppliers(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Supplier>, sqlx::Error>> + Send;
    fn insert_supplier(
        &self,
        supplier: Supplier,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
}

impl SupplierStore for SqliteStore {
    async fn list_suppliers(&self, limit: usize) -> Result<Vec<Supplier>, sqlx::Error> {
        let rows: Vec<(String, String, String, String)> = sqlx::query_as(
            "SELECT id, name, location, supplies FROM suppliers ORDER BY rowid ASC LIMIT ?1",
        )
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, name, location, supplies)| {
                let supplies = serde_json::from_str(&supplies).unwrap_or_else(|e| {
                    tracing::warn!(
                        supplier = %id,
                        error = %e,
                        "failed to parse supplies; treating as empty"
                    );
                    Vec::new()
                });
                Supplier {
                    id,
                    name,
                    location,
                    supplies,
                }
            })
            .collect())
    }

    async fn insert_supplier(&self, supplier: Supplier) -> Result<(), sqlx::Error> {
        let supplies = serde_json::to_string(&supplier.supplies)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        let created_at = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO suppliers (id, name, location, supplies, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.location)
        .bind(&supplies)
        .bind(&created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn supplies_survive_storage() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        assert!(store.list_suppliers(10).await.unwrap().is_empty());

        store
            .insert_supplier(Supplier {
                id: "s1".into(),
                name: "Green Seeds".into(),
                location: "Kano".into(),
                supplies: vec!["seeds".into(), "fertilizer".into()],
            })
            .await
            .unwrap();

        let suppliers = store.list_suppliers(10).await.unwrap();
        assert_eq!(suppliers.len(), 1);
        assert_eq!(suppliers[0].supplies, vec!["seeds", "fertilizer"]);
    }
}
