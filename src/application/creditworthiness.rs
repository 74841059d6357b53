use crate::domain::creditworthiness::{self as ordering, CreditworthinessTier};
use crate::domain::ports::{Ports, SharedCreditworthinessStore, SharedUserStore};
use crate::error::{Entity, LedgerError, Result};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Fields of a tier that can change without touching its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierUpdate {
    pub name: Option<String>,
    pub unblock_duration: Option<u32>,
    pub can_get_loan: Option<bool>,
}

/// Keeps the tiers densely ordered `0..n`.
///
/// Every mutation runs under one registry-wide lock, because the ordering
/// invariant spans all tiers at once.
pub struct CreditworthinessOrderRegistry {
    tiers: SharedCreditworthinessStore,
    users: SharedUserStore,
    guard: Mutex<()>,
}

impl CreditworthinessOrderRegistry {
    pub fn new(ports: &Ports) -> Self {
        Self {
            tiers: ports.tiers.clone(),
            users: ports.users.clone(),
            guard: Mutex::new(()),
        }
    }

    pub async fn list(&self) -> Result<Vec<CreditworthinessTier>> {
        self.tiers.list_ordered().await
    }

    /// The tier with the highest order, if any.
    pub async fn last_tier(&self) -> Result<Option<CreditworthinessTier>> {
        Ok(self.tiers.list_ordered().await?.pop())
    }

    pub async fn create(
        &self,
        tier: CreditworthinessTier,
        desired_order: usize,
    ) -> Result<CreditworthinessTier> {
        let _guard = self.guard.lock().await;
        let current = self.tiers.list_ordered().await?;
        ensure_unique_name(&current, &tier.name, None)?;

        let (shifted, placed) = ordering::insert_at(&current, tier, desired_order);
        self.tiers.store_all(shifted).await?;
        self.tiers.store(placed.clone()).await?;

        tracing::info!(tier = %placed.name, order = placed.order, "Creditworthiness tier created");
        Ok(placed)
    }

    pub async fn update(&self, id: Uuid, update: TierUpdate) -> Result<CreditworthinessTier> {
        let _guard = self.guard.lock().await;
        let current = self.tiers.list_ordered().await?;
        let mut tier = current
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found(Entity::Tier, id))?;

        if let Some(name) = update.name {
            ensure_unique_name(&current, &name, Some(id))?;
            tier.name = name;
        }
        if let Some(days) = update.unblock_duration {
            tier.unblock_duration = days;
        }
        if let Some(can_get_loan) = update.can_get_loan {
            tier.can_get_loan = can_get_loan;
        }

        self.tiers.store(tier.clone()).await?;
        Ok(tier)
    }

    pub async fn reorder(&self, id: Uuid, new_order: usize) -> Result<Vec<CreditworthinessTier>> {
        let _guard = self.guard.lock().await;
        let current = self.tiers.list_ordered().await?;
        let changed = ordering::move_to(&current, id, new_order)
            .ok_or_else(|| LedgerError::not_found(Entity::Tier, id))?;

        if !changed.is_empty() {
            self.tiers.store_all(changed.clone()).await?;
            tracing::info!(tier = %id, order = new_order, "Creditworthiness tiers reordered");
        }
        Ok(ordering::merge(&current, &changed))
    }

    pub async fn delete(&self, id: Uuid) -> Result<CreditworthinessTier> {
        let _guard = self.guard.lock().await;
        let current = self.tiers.list_ordered().await?;
        let (removed, shifted) = ordering::remove(&current, id)
            .ok_or_else(|| LedgerError::not_found(Entity::Tier, id))?;

        if self.users.references_tier(id).await? {
            return Err(LedgerError::InUse(id));
        }

        self.tiers.store_all(shifted).await?;
        self.tiers.delete(id).await?;

        tracing::info!(tier = %removed.name, "Creditworthiness tier deleted");
        Ok(removed)
    }
}

fn ensure_unique_name(
    tiers: &[CreditworthinessTier],
    name: &str,
    except: Option<Uuid>,
) -> Result<()> {
    if tiers
        .iter()
        .any(|t| t.name == name && Some(t.id) != except)
    {
        return Err(LedgerError::already_exists(Entity::Tier, name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::creditworthiness::is_dense;
    use crate::domain::user::User;
    use crate::infrastructure::in_memory::InMemoryPorts;

    fn names(tiers: &[CreditworthinessTier]) -> Vec<&str> {
        tiers.iter().map(|t| t.name.as_str()).collect()
    }

    async fn registry_with(names: &[&str]) -> (Ports, CreditworthinessOrderRegistry) {
        let ports = InMemoryPorts::new().into_ports();
        let registry = CreditworthinessOrderRegistry::new(&ports);
        for (i, name) in names.iter().enumerate() {
            registry
                .create(CreditworthinessTier::new(*name, 30, true), i)
                .await
                .unwrap();
        }
        (ports, registry)
    }

    #[tokio::test]
    async fn test_create_shifts_later_tiers() {
        let (_, registry) = registry_with(&["A", "B", "C"]).await;
        registry
            .create(CreditworthinessTier::new("D", 10, false), 1)
            .await
            .unwrap();

        let tiers = registry.list().await.unwrap();
        assert_eq!(names(&tiers), vec!["A", "D", "B", "C"]);
        assert!(is_dense(&tiers));
    }

    #[tokio::test]
    async fn test_delete_unused_tier() {
        let (_, registry) = registry_with(&["A", "B", "C"]).await;
        let b = registry.list().await.unwrap()[1].id;

        registry.delete(b).await.unwrap();

        let tiers = registry.list().await.unwrap();
        assert_eq!(names(&tiers), vec!["A", "C"]);
        assert_eq!(tiers[1].order, 1);
    }

    #[tokio::test]
    async fn test_delete_referenced_tier_is_rejected() {
        let (ports, registry) = registry_with(&["A", "B"]).await;
        let a = registry.list().await.unwrap()[0].id;
        ports.users.store(User::new("+1").with_tier(a)).await.unwrap();

        assert!(matches!(registry.delete(a).await, Err(LedgerError::InUse(_))));
        assert_eq!(registry.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_names_are_unique_except_self() {
        let (_, registry) = registry_with(&["A", "B"]).await;
        let a = registry.list().await.unwrap()[0].id;

        assert!(matches!(
            registry.create(CreditworthinessTier::new("B", 0, true), 0).await,
            Err(LedgerError::AlreadyExists { .. })
        ));
        assert!(matches!(
            registry
                .update(a, TierUpdate { name: Some("B".into()), ..Default::default() })
                .await,
            Err(LedgerError::AlreadyExists { .. })
        ));

        let renamed = registry
            .update(
                a,
                TierUpdate {
                    name: Some("A".into()),
                    can_get_loan: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!renamed.can_get_loan);
        assert_eq!(renamed.order, 0);
        // Case-sensitive comparison.
        registry
            .create(CreditworthinessTier::new("a", 0, true), 5)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reorder_keeps_orders_dense() {
        let (_, registry) = registry_with(&["A", "B", "C", "D"]).await;
        let a = registry.list().await.unwrap()[0].id;

        let tiers = registry.reorder(a, 99).await.unwrap();
        assert_eq!(names(&tiers), vec!["B", "C", "D", "A"]);
        assert!(is_dense(&registry.list().await.unwrap()));

        let last = registry.last_tier().await.unwrap().unwrap();
        assert_eq!(last.name, "A");
    }

    #[tokio::test]
    async fn test_concurrent_creates_stay_dense() {
        let ports = InMemoryPorts::new().into_ports();
        let registry = std::sync::Arc::new(CreditworthinessOrderRegistry::new(&ports));

        let mut tasks = Vec::new();
        for i in 0..20 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                registry
                    .create(CreditworthinessTier::new(format!("T{i}"), 0, true), i % 3)
                    .await
                    .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let tiers = registry.list().await.unwrap();
        assert_eq!(tiers.len(), 20);
        assert!(is_dense(&tiers));
    }
}
