use crate::domain::ports::SharedProductTypeStore;
use crate::domain::product::{ProductType, TermOption};
use crate::error::{Entity, LedgerError, Result};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

/// Named products (loan types or deposit types) and their term options.
pub struct Catalogue {
    store: SharedProductTypeStore,
    entity: Entity,
    /// Held across the uniqueness check and the write.
    registration: Mutex<()>,
}

impl Catalogue {
    pub fn new(store: SharedProductTypeStore, entity: Entity) -> Self {
        Self {
            store,
            entity,
            registration: Mutex::new(()),
        }
    }

    /// Adds a product. Names are unique within the catalogue.
    pub async fn register(&self, product: ProductType) -> Result<ProductType> {
        if product.name.trim().is_empty() {
            return Err(LedgerError::ValidationError(format!(
                "{} name must not be empty",
                self.entity
            )));
        }
        let _guard = self.registration.lock().await;
        if self.store.find_by_name(&product.name).await?.is_some() {
            return Err(LedgerError::already_exists(self.entity, product.name));
        }
        self.store.store(product.clone()).await?;
        tracing::info!(product = %product.name, kind = %self.entity, "Product registered");
        Ok(product)
    }

    /// Unavailable products are reported as missing.
    pub async fn find(&self, name: &str) -> Result<ProductType> {
        self.store
            .find_by_name(name)
            .await?
            .filter(|p| p.available)
            .ok_or_else(|| LedgerError::not_found(self.entity, name))
    }

    /// The exact `(duration, percent)` pair offered by `name`.
    pub async fn option(&self, name: &str, duration: u32, percent: Decimal) -> Result<TermOption> {
        let product = self.find(name).await?;
        product
            .find_option(duration, percent)
            .ok_or_else(|| LedgerError::OptionNotFound {
                product: product.name.clone(),
                duration,
                percent,
            })
    }

    pub async fn all(&self) -> Result<Vec<ProductType>> {
        self.store.get_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::InMemoryProductTypeStore;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn catalogue() -> Catalogue {
        Catalogue::new(Arc::new(InMemoryProductTypeStore::new()), Entity::LoanType)
    }

    #[tokio::test]
    async fn test_register_rejects_blank_and_duplicate_names() {
        let catalogue = catalogue();
        let consumer = ProductType::new("Consumer", vec![TermOption::new(12, dec!(12))]);

        catalogue.register(consumer.clone()).await.unwrap();

        assert!(matches!(
            catalogue.register(consumer).await,
            Err(LedgerError::AlreadyExists { .. })
        ));
        assert!(matches!(
            catalogue.register(ProductType::new("  ", Vec::new())).await,
            Err(LedgerError::ValidationError(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_of_one_name() {
        let catalogue = Arc::new(catalogue());

        let mut handles = Vec::new();
        for i in 0..16u32 {
            let catalogue = catalogue.clone();
            handles.push(tokio::spawn(async move {
                catalogue
                    .register(ProductType::new("Mortgage", vec![TermOption::new(i + 1, dec!(9))]))
                    .await
            }));
        }

        let mut registered = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                registered += 1;
            }
        }
        assert_eq!(registered, 1);
        assert_eq!(catalogue.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_product_is_not_found() {
        let catalogue = catalogue();
        let mut retired = ProductType::new("Retired", vec![TermOption::new(6, dec!(10))]);
        retired.available = false;
        catalogue.register(retired).await.unwrap();

        assert!(matches!(
            catalogue.option("Retired", 6, dec!(10)).await,
            Err(LedgerError::NotFound { .. })
        ));
    }
}
