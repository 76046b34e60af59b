use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Amount, ServiceCatalogEntry, coerce_amount};

pub const DEFAULT_UNIT: &str = "heure";

/// One priced row of a quote. Field names on the wire follow the quoting API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub service_name: String,
    pub quantity: Decimal,
    pub unit: String,
    #[serde(rename = "price_ht")]
    pub unit_price_excl_tax: Amount,
    #[serde(rename = "tva_rate", default)]
    pub tax_rate_percent: Decimal,
}

impl LineItem {
    pub fn new(
        service_name: impl Into<String>,
        quantity: Decimal,
        unit: impl Into<String>,
        unit_price_excl_tax: Amount,
        tax_rate_percent: Decimal,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            quantity,
            unit: unit.into(),
            unit_price_excl_tax,
            tax_rate_percent,
        }
    }

    /// Empty row added by hand before any field is filled.
    pub fn blank() -> Self {
        Self::new("", Decimal::ONE, DEFAULT_UNIT, Decimal::ZERO, Decimal::ZERO)
    }

    /// Row pre-filled from a catalog entry, quantity 1.
    pub fn from_catalog(entry: &ServiceCatalogEntry) -> Self {
        Self::new(
            entry.name.clone(),
            Decimal::ONE,
            entry.unit.clone(),
            entry.price_excl_tax,
            entry.tax_rate_percent,
        )
    }

    /// quantity × unit price, before discount and tax.
    /// Saturates at the decimal range instead of overflowing.
    pub fn amount_excl_tax(&self) -> Amount {
        self.quantity.saturating_mul(self.unit_price_excl_tax)
    }

    /// Tax on this row's pre-discount amount.
    pub fn tax_amount(&self) -> Amount {
        self.amount_excl_tax().saturating_mul(self.tax_rate_percent) / Decimal::ONE_HUNDRED
    }

    /// Replace a single field.
    pub fn apply(&mut self, update: ItemUpdate) {
        match update {
            ItemUpdate::ServiceName(name) => self.service_name = name,
            ItemUpdate::Quantity(quantity) => self.quantity = quantity,
            ItemUpdate::Unit(unit) => self.unit = unit,
            ItemUpdate::UnitPrice(price) => self.unit_price_excl_tax = price,
            ItemUpdate::TaxRate(rate) => self.tax_rate_percent = rate,
        }
    }
}

/// Editable columns of a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemField {
    ServiceName,
    Quantity,
    Unit,
    UnitPrice,
    TaxRate,
}

impl ItemField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemField::ServiceName => "service_name",
            ItemField::Quantity => "quantity",
            ItemField::Unit => "unit",
            ItemField::UnitPrice => "price_ht",
            ItemField::TaxRate => "tva_rate",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ItemField::Quantity | ItemField::UnitPrice | ItemField::TaxRate
        )
    }

    /// Build an update from raw form text. Numeric parse failures become zero.
    pub fn coerce(&self, raw: &str) -> ItemUpdate {
        match self {
            ItemField::ServiceName => ItemUpdate::ServiceName(raw.to_string()),
            ItemField::Unit => ItemUpdate::Unit(raw.to_string()),
            ItemField::Quantity => ItemUpdate::Quantity(coerce_amount(raw)),
            ItemField::UnitPrice => ItemUpdate::UnitPrice(coerce_amount(raw)),
            ItemField::TaxRate => ItemUpdate::TaxRate(coerce_amount(raw)),
        }
    }
}

impl std::str::FromStr for ItemField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "service_name" | "name" => Ok(ItemField::ServiceName),
            "quantity" | "qty" => Ok(ItemField::Quantity),
            "unit" => Ok(ItemField::Unit),
            "price_ht" | "price" | "unit_price" => Ok(ItemField::UnitPrice),
            "tva_rate" | "tax" | "tax_rate" => Ok(ItemField::TaxRate),
            other => Err(format!("unknown item field: {}", other)),
        }
    }
}

impl std::fmt::Display for ItemField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single-field replacement carrying its typed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemUpdate {
    ServiceName(String),
    Quantity(Decimal),
    Unit(String),
    UnitPrice(Amount),
    TaxRate(Decimal),
}

impl ItemUpdate {
    pub fn field(&self) -> ItemField {
        match self {
            ItemUpdate::ServiceName(_) => ItemField::ServiceName,
            ItemUpdate::Quantity(_) => ItemField::Quantity,
            ItemUpdate::Unit(_) => ItemField::Unit,
            ItemUpdate::UnitPrice(_) => ItemField::UnitPrice,
            ItemUpdate::TaxRate(_) => ItemField::TaxRate,
        }
    }
}
