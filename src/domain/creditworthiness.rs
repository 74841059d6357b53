//! Creditworthiness tiers and the dense-ordering arithmetic over them.
//!
//! The functions here are pure: given the current ordered set they return the
//! tiers whose `order` changed. Persisting them, and excluding concurrent
//! writers, is the registry's job.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditworthinessTier {
    pub id: Uuid,
    /// Position in `0..n`; the set of orders is always exactly `{0, …, n-1}`.
    pub order: usize,
    /// Days a borrower in this tier waits before the tier is lifted.
    pub unblock_duration: u32,
    /// Unique, compared case-sensitively.
    pub name: String,
    pub can_get_loan: bool,
}

impl CreditworthinessTier {
    pub fn new(name: impl Into<String>, unblock_duration: u32, can_get_loan: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            order: 0,
            unblock_duration,
            name: name.into(),
            can_get_loan,
        }
    }
}

/// True when the orders are exactly `0..n` with no gaps or duplicates.
pub fn is_dense(tiers: &[CreditworthinessTier]) -> bool {
    let mut orders: Vec<usize> = tiers.iter().map(|t| t.order).collect();
    orders.sort_unstable();
    orders.iter().enumerate().all(|(i, o)| i == *o)
}

fn sorted(tiers: &[CreditworthinessTier]) -> Vec<CreditworthinessTier> {
    let mut tiers = tiers.to_vec();
    tiers.sort_by_key(|t| t.order);
    tiers
}

/// Places `tier` at `desired` (clamped to `[0, n]`) and shifts every tier at or
/// above that index up by one. Returns the shifted tiers and the placed tier.
pub fn insert_at(
    tiers: &[CreditworthinessTier],
    mut tier: CreditworthinessTier,
    desired: usize,
) -> (Vec<CreditworthinessTier>, CreditworthinessTier) {
    let position = desired.min(tiers.len());
    let shifted = sorted(tiers)
        .into_iter()
        .filter(|t| t.order >= position)
        .map(|mut t| {
            t.order += 1;
            t
        })
        .collect();
    tier.order = position;
    (shifted, tier)
}

/// Moves the tier `id` to `new_order` (clamped to `[0, n-1]`). Returns every
/// tier whose order changed, the moved one included, or `None` if `id` is
/// unknown.
pub fn move_to(
    tiers: &[CreditworthinessTier],
    id: Uuid,
    new_order: usize,
) -> Option<Vec<CreditworthinessTier>> {
    let mut ordered = sorted(tiers);
    let old = ordered.iter().position(|t| t.id == id)?;
    let new = new_order.min(ordered.len() - 1);
    let moved = ordered.remove(old);
    ordered.insert(new, moved);

    Some(
        ordered
            .into_iter()
            .enumerate()
            .filter_map(|(index, mut t)| {
                if t.order == index {
                    None
                } else {
                    t.order = index;
                    Some(t)
                }
            })
            .collect(),
    )
}

/// Removes the tier `id` and shifts every tier above it down by one. Returns
/// the removed tier and the shifted ones, or `None` if `id` is unknown.
pub fn remove(
    tiers: &[CreditworthinessTier],
    id: Uuid,
) -> Option<(CreditworthinessTier, Vec<CreditworthinessTier>)> {
    let removed = tiers.iter().find(|t| t.id == id)?.clone();
    let shifted = sorted(tiers)
        .into_iter()
        .filter(|t| t.order > removed.order)
        .map(|mut t| {
            t.order -= 1;
            t
        })
        .collect();
    Some((removed, shifted))
}

/// Applies `changed` over `tiers` by id, for checking results.
pub fn merge(
    tiers: &[CreditworthinessTier],
    changed: &[CreditworthinessTier],
) -> Vec<CreditworthinessTier> {
    let mut merged: Vec<CreditworthinessTier> = tiers
        .iter()
        .map(|t| {
            changed
                .iter()
                .find(|c| c.id == t.id)
                .cloned()
                .unwrap_or_else(|| t.clone())
        })
        .collect();
    merged.sort_by_key(|t| t.order);
    merged
}
