//! Promotion catalog rules
//!
//! Conflict validation enforced at write time: two active PRODUCT-scoped
//! promotions may not target the same product on the same weekday. GLOBAL
//! promotions never conflict with anything.

use shared::models::{Promotion, PromotionScope};

use crate::storage::StorageError;

/// Reject `candidate` if an existing active PRODUCT promotion already
/// covers the same product on an overlapping weekday.
pub fn check_conflict(candidate: &Promotion, existing: &[Promotion]) -> Result<(), StorageError> {
    if candidate.scope != PromotionScope::Product || !candidate.active {
        return Ok(());
    }
    let Some(product_id) = candidate.product_id else {
        return Ok(());
    };

    for other in existing {
        if other.id == candidate.id
            || !other.active
            || other.scope != PromotionScope::Product
            || other.product_id != Some(product_id)
        {
            continue;
        }
        for &weekday in &candidate.weekdays {
            if other.applies_on(weekday) {
                return Err(StorageError::PromotionConflict {
                    product_id,
                    weekday,
                    existing_id: other.id,
                });
            }
        }
    }
    Ok(())
}
