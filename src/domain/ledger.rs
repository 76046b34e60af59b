use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Amount, LineItem};

/// HT/TVA/TTC totals derived from a quote's lines and discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuoteTotals {
    #[serde(rename = "total_ht_before_discount")]
    pub subtotal_before_discount: Amount,
    #[serde(rename = "total_ht")]
    pub subtotal_excl_tax: Amount,
    #[serde(rename = "total_tva")]
    pub total_tax: Amount,
    #[serde(rename = "total_ttc")]
    pub total_incl_tax: Amount,
}

impl QuoteTotals {
    /// True when the flat discount is larger than the pre-tax subtotal,
    /// leaving a negative HT total.
    pub fn discount_exceeds_subtotal(&self) -> bool {
        self.subtotal_excl_tax < Decimal::ZERO
    }
}

/// Sum of quantity × unit price over all lines.
pub fn subtotal_before_discount(items: &[LineItem]) -> Amount {
    items
        .iter()
        .map(LineItem::amount_excl_tax)
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

/// Tax over all lines, computed on pre-discount amounts.
/// The discount is not prorated across rates.
pub fn total_tax(items: &[LineItem]) -> Amount {
    items
        .iter()
        .map(LineItem::tax_amount)
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

/// Compute all totals from scratch. The discount is subtracted once and is
/// not floored: it may drive the HT subtotal below zero.
///
/// Never panics: sums that leave the decimal range saturate at its bounds.
pub fn compute_totals(items: &[LineItem], discount: Amount) -> QuoteTotals {
    let subtotal_before_discount = subtotal_before_discount(items);
    let subtotal_excl_tax = subtotal_before_discount.saturating_sub(discount);
    let total_tax = total_tax(items);

    QuoteTotals {
        subtotal_before_discount,
        subtotal_excl_tax,
        total_tax,
        total_incl_tax: subtotal_excl_tax.saturating_add(total_tax),
    }
}
