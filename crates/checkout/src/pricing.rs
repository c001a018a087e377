use serde::{Deserialize, Serialize};

use common::Money;

/// Pricing policy applied to a validated order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Tax rate in basis points (1800 = 18%).
    pub tax_rate_bps: u32,
    /// Flat shipping fee per order.
    pub shipping_fee: Money,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate_bps: 1800,
            shipping_fee: Money::from_cents(20_000),
        }
    }
}

impl PricingPolicy {
    /// Computes order totals from a subtotal.
    ///
    /// Tax applies to the subtotal only, not the shipping fee. Rounding is
    /// half-up to the cent.
    pub fn totals(&self, subtotal: Money) -> OrderTotals {
        let tax = subtotal.rate_bps(self.tax_rate_bps);
        OrderTotals {
            subtotal,
            tax,
            shipping: self.shipping_fee,
            grand_total: subtotal + tax + self.shipping_fee,
        }
    }
}

/// Totals for an order, all derived from authoritative catalog prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub grand_total: Money,
}
