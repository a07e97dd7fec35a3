//! Promotion resolution and price application
//!
//! Pure functions over integer cents. Every client runs the same logic so
//! cart totals never drift before submission; the authoritative total is
//! still recomputed at order creation inside the storage procedure.

use chrono::{DateTime, Datelike, Utc};
use shared::models::{DiscountType, Promotion, PromotionScope};

/// Result of applying a promotion to a base price
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuote {
    pub final_unit_price_cents: i64,
    pub discount_cents: i64,
    pub promo_name: Option<String>,
}

impl PriceQuote {
    /// Quote with no promotion applied
    pub fn base(base_price_cents: i64) -> Self {
        Self {
            final_unit_price_cents: base_price_cents.max(0),
            discount_cents: 0,
            promo_name: None,
        }
    }
}

/// Weekday as 0=Sunday .. 6=Saturday
pub fn weekday_index(now: DateTime<Utc>) -> u8 {
    now.weekday().num_days_from_sunday() as u8
}

/// Resolve the promotion that applies to a product right now.
///
/// Survivors are active promotions valid on `now`'s weekday. A
/// PRODUCT-scoped survivor naming this product wins; otherwise the first
/// GLOBAL survivor; otherwise none.
pub fn resolve<'a>(
    product_id: i64,
    promotions: &'a [Promotion],
    now: DateTime<Utc>,
) -> Option<&'a Promotion> {
    let weekday = weekday_index(now);
    let mut global: Option<&Promotion> = None;
    for promo in promotions {
        if !promo.active || !promo.applies_on(weekday) {
            continue;
        }
        match promo.scope {
            PromotionScope::Product if promo.targets(product_id) => return Some(promo),
            PromotionScope::Global => global = global.or(Some(promo)),
            _ => {}
        }
    }
    global
}

/// Apply a promotion to a base price.
///
/// AMOUNT: discount = min(base, value).
/// PERCENT: discount = round-half-up(base * clamp(value, 0, 100) / 100).
/// The final price is never negative.
pub fn apply(base_price_cents: i64, promotion: &Promotion) -> PriceQuote {
    let base = base_price_cents.max(0);
    let discount = match promotion.discount_type {
        DiscountType::Amount => promotion.discount_value.max(0).min(base),
        DiscountType::Percent => {
            let pct = promotion.discount_value.clamp(0, 100);
            (base * pct + 50) / 100
        }
    };
    PriceQuote {
        final_unit_price_cents: (base - discount).max(0),
        discount_cents: discount,
        promo_name: Some(promotion.name.clone()),
    }
}

/// Resolve and apply in one step
pub fn quote(
    product_id: i64,
    base_price_cents: i64,
    promotions: &[Promotion],
    now: DateTime<Utc>,
) -> PriceQuote {
    match resolve(product_id, promotions, now) {
        Some(promo) => apply(base_price_cents, promo),
        None => PriceQuote::base(base_price_cents),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn promo(
        id: i64,
        scope: PromotionScope,
        product_id: Option<i64>,
        discount_type: DiscountType,
        value: i64,
        weekdays: Vec<u8>,
    ) -> Promotion {
        Promotion {
            id,
            name: format!("promo-{id}"),
            scope,
            product_id,
            discount_type,
            discount_value: value,
            weekdays,
            active: true,
        }
    }

    /// 2025-06-02 is a Monday (weekday index 1)
    fn monday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap()
    }

    /// 2025-06-01 is a Sunday (weekday index 0)
    fn sunday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn product_promotion_beats_global() {
        let promos = vec![
            promo(1, PromotionScope::Global, None, DiscountType::Percent, 5, vec![1]),
            promo(2, PromotionScope::Product, Some(42), DiscountType::Percent, 10, vec![1]),
        ];
        let resolved = resolve(42, &promos, monday()).unwrap();
        assert_eq!(resolved.id, 2);
        // Other products fall back to the global promotion
        let resolved = resolve(99, &promos, monday()).unwrap();
        assert_eq!(resolved.id, 1);
    }

    #[test]
    fn weekday_gating() {
        let weekday_only = vec![promo(
            1,
            PromotionScope::Global,
            None,
            DiscountType::Percent,
            10,
            vec![1, 2, 3, 4, 5],
        )];
        assert!(resolve(1, &weekday_only, monday()).is_some());
        assert!(resolve(1, &weekday_only, sunday()).is_none());
        // 2025-06-07 is a Saturday (weekday index 6)
        let saturday = Utc.with_ymd_and_hms(2025, 6, 7, 12, 0, 0).unwrap();
        assert!(resolve(1, &weekday_only, saturday).is_none());
    }

    #[test]
    fn inactive_promotions_never_resolve() {
        let mut p = promo(1, PromotionScope::Global, None, DiscountType::Percent, 10, vec![1]);
        p.active = false;
        assert!(resolve(1, &[p], monday()).is_none());
    }

    #[test]
    fn amount_discount_is_capped_at_base() {
        let p = promo(1, PromotionScope::Global, None, DiscountType::Amount, 5000, vec![1]);
        let quote = apply(1200, &p);
        assert_eq!(quote.discount_cents, 1200);
        assert_eq!(quote.final_unit_price_cents, 0);
    }

    #[test]
    fn percent_rounds_half_up() {
        // 15% of 1010 = 151.5 -> 152
        let p = promo(1, PromotionScope::Global, None, DiscountType::Percent, 15, vec![1]);
        let quote = apply(1010, &p);
        assert_eq!(quote.discount_cents, 152);
        assert_eq!(quote.final_unit_price_cents, 858);

        // 15% of 1000 = 150 exactly
        let quote = apply(1000, &p);
        assert_eq!(quote.discount_cents, 150);
    }

    #[test]
    fn percent_is_clamped_to_0_100() {
        let over = promo(1, PromotionScope::Global, None, DiscountType::Percent, 250, vec![1]);
        let quote = apply(1000, &over);
        assert_eq!(quote.discount_cents, 1000);
        assert_eq!(quote.final_unit_price_cents, 0);

        let negative = promo(2, PromotionScope::Global, None, DiscountType::Percent, -5, vec![1]);
        let quote = apply(1000, &negative);
        assert_eq!(quote.discount_cents, 0);
        assert_eq!(quote.final_unit_price_cents, 1000);
    }

    #[test]
    fn final_price_stays_within_bounds() {
        // For all base >= 0 and any promotion: 0 <= final <= base
        let promos = [
            promo(1, PromotionScope::Global, None, DiscountType::Amount, 330, vec![1]),
            promo(2, PromotionScope::Global, None, DiscountType::Percent, 33, vec![1]),
            promo(3, PromotionScope::Global, None, DiscountType::Percent, 100, vec![1]),
            promo(4, PromotionScope::Global, None, DiscountType::Amount, 0, vec![1]),
        ];
        for base in [0, 1, 99, 100, 101, 12345, 1_000_000] {
            for p in &promos {
                let q = apply(base, p);
                assert!(q.final_unit_price_cents >= 0, "base={base}");
                assert!(q.final_unit_price_cents <= base, "base={base}");
                assert_eq!(q.final_unit_price_cents + q.discount_cents, base);
            }
        }
    }

    #[test]
    fn no_promotion_means_base_quote() {
        let q = quote(1, 900, &[], monday());
        assert_eq!(q.final_unit_price_cents, 900);
        assert_eq!(q.discount_cents, 0);
        assert!(q.promo_name.is_none());
    }
}
