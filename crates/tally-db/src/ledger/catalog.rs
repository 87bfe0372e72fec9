//! Creation of categories, products and clients.
//!
//! A product's opening stock is booked as an `in` movement, so stock equals
//! the sum of movements from the first row on.

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use tally_core::request::{NewCategory, NewClient, NewProduct};
use tally_core::stock::{plan_change, StockFloor};
use tally_core::validation::{validate_new_category, validate_new_client, validate_new_product};
use tally_core::{Category, Client, Product, StockDirection};

use super::stock::{write_stock_change, MovementSource};
use super::{Ledger, LedgerError, LedgerResult};
use crate::repository::{category, client, product};

const OPENING_STOCK_REASON: &str = "Initial stock";

impl Ledger {
    #[instrument(skip_all, fields(instance_id = %self.config.instance_id, name = %new.name))]
    pub async fn create_category(&self, new: &NewCategory) -> LedgerResult<Category> {
        validate_new_category(new)?;

        let now = Utc::now();
        let created = Category {
            id: Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            description: new.description.clone(),
            created_at: now,
            updated_at: now,
        };
        category::insert(&self.pool, &created).await?;

        info!(category_id = %created.id, "Category created");
        Ok(created)
    }

    /// Creates a product and books its opening stock.
    ///
    /// ## Errors
    /// * `NotFound` - the category doesn't exist
    /// * `Store(UniqueViolation)` - the SKU is taken
    #[instrument(skip_all, fields(instance_id = %self.config.instance_id, sku = %new.sku))]
    pub async fn create_product(&self, new: &NewProduct) -> LedgerResult<Product> {
        if let Err(err) = validate_new_product(new) {
            warn!(error = %err, "Rejected product");
            return Err(err.into());
        }

        let mut tx = self.pool.begin().await?;

        // Lock first: a read at the start of a deferred transaction pins a
        // snapshot the first write can no longer upgrade under WAL.
        category::lock(&mut *tx, &new.category_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Category", new.category_id.as_str()))?;
        let now = Utc::now();

        let created = Product {
            id: Uuid::new_v4().to_string(),
            category_id: new.category_id.clone(),
            name: new.name.trim().to_string(),
            sku: new.sku.trim().to_string(),
            price_cents: new.price.cents(),
            cost_cents: new.cost.cents(),
            stock_quantity: 0,
            min_stock_level: new.min_stock_level,
            created_at: now,
            updated_at: now,
        };
        product::insert(&mut *tx, &created).await?;

        if new.stock_quantity > 0 {
            let opening = plan_change(
                &created.sku,
                0,
                StockDirection::In,
                new.stock_quantity,
                StockFloor::Allow,
            )?;
            if let Some(change) = opening {
                let source = MovementSource {
                    reason: OPENING_STOCK_REASON,
                    reference: None,
                };
                write_stock_change(&mut *tx, &created.id, change, source, now).await?;
            }
        }

        let stored = product::find(&mut *tx, &created.id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Product", created.id.as_str()))?;

        tx.commit().await?;

        info!(product_id = %stored.id, stock = stored.stock_quantity, "Product created");
        Ok(stored)
    }

    /// Creates a client with its opening balance.
    #[instrument(skip_all, fields(instance_id = %self.config.instance_id, name = %new.name))]
    pub async fn create_client(&self, new: &NewClient) -> LedgerResult<Client> {
        validate_new_client(new)?;

        let now = Utc::now();
        let created = Client {
            id: Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            email: new.email.clone(),
            phone: new.phone.clone(),
            address: new.address.clone(),
            credit_limit_cents: new.credit_limit.cents(),
            current_balance_cents: new.current_balance.cents(),
            created_at: now,
            updated_at: now,
        };
        client::insert(&self.pool, &created).await?;

        info!(client_id = %created.id, "Client created");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{ledger, seed_category, seed_product};
    use super::super::{ErrorCode, LedgerConfig};
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use tally_core::Money;

    #[tokio::test]
    async fn test_opening_stock_is_a_movement() {
        let (db, ledger) = ledger().await;
        let category = seed_category(&ledger).await;
        let rice = seed_product(&ledger, &category.id, "RICE-5KG", 1000, 700, 25).await;
        assert_eq!(rice.stock_quantity, 25);

        let history = db.movements().history(&rice.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].direction, StockDirection::In);
        assert_eq!(history[0].delta, 25);
        assert_eq!(history[0].reason, OPENING_STOCK_REASON);
        assert_eq!(history[0].reference_type, None);

        let empty = seed_product(&ledger, &category.id, "OIL-1L", 500, 300, 0).await;
        assert!(db.movements().history(&empty.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_sku() {
        let (db, ledger) = ledger().await;
        let category = seed_category(&ledger).await;
        seed_product(&ledger, &category.id, "RICE-5KG", 1000, 700, 5).await;

        let err = ledger
            .create_product(&NewProduct {
                category_id: category.id.clone(),
                name: "Other rice".to_string(),
                sku: "RICE-5KG".to_string(),
                price: Money::from_cents(900),
                cost: Money::from_cents(600),
                stock_quantity: 3,
                min_stock_level: 0,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::Store(DbError::UniqueViolation { .. })));
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(db.products().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_category() {
        let (_db, ledger) = ledger().await;

        let err = ledger
            .create_product(&NewProduct {
                category_id: Uuid::new_v4().to_string(),
                name: "Rice".to_string(),
                sku: "RICE-5KG".to_string(),
                price: Money::from_cents(1000),
                cost: Money::from_cents(700),
                stock_quantity: 0,
                min_stock_level: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { ref entity, .. } if entity == "Category"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_products_in_one_category() {
        let dir = tempfile::TempDir::new().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("tally.db")).max_connections(5))
            .await
            .unwrap();
        let ledger = db.ledger(LedgerConfig::new("test"));
        let category = seed_category(&ledger).await;

        let mut handles = Vec::new();
        for n in 0..20 {
            let ledger = ledger.clone();
            let new = NewProduct {
                category_id: category.id.clone(),
                name: format!("Product {n}"),
                sku: format!("SKU-{n}"),
                price: Money::from_cents(1000),
                cost: Money::from_cents(700),
                stock_quantity: 10,
                min_stock_level: 0,
            };
            handles.push(tokio::spawn(async move { ledger.create_product(&new).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(db.products().count().await.unwrap(), 20);
        assert_eq!(db.movements().count().await.unwrap(), 20);

        db.close().await;
    }

    #[tokio::test]
    async fn test_duplicate_category_name() {
        let (_db, ledger) = ledger().await;
        seed_category(&ledger).await;

        let err = ledger
            .create_category(&NewCategory {
                name: "Groceries".to_string(),
                description: Some("again".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Store(DbError::UniqueViolation { .. })));
    }

    #[tokio::test]
    async fn test_client_validation() {
        let (db, ledger) = ledger().await;

        let err = ledger
            .create_client(&NewClient {
                email: Some("not-an-email".to_string()),
                ..NewClient::named("Ahmed Traders")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        let client = ledger
            .create_client(&NewClient {
                credit_limit: Money::from_cents(100_000),
                ..NewClient::named("Ahmed Traders")
            })
            .await
            .unwrap();
        assert_eq!(client.credit_limit_cents, 100_000);
        assert_eq!(db.clients().list().await.unwrap().len(), 1);
    }
}
