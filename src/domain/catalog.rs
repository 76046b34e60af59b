use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Amount, DEFAULT_UNIT};

pub type ServiceId = Uuid;

/// A billable service offered by the business, used to pre-fill quote lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCatalogEntry {
    pub id: ServiceId,
    pub name: String,
    pub unit: String,
    #[serde(rename = "price_ht")]
    pub price_excl_tax: Amount,
    #[serde(rename = "tva_rate")]
    pub tax_rate_percent: Decimal,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ServiceCatalogEntry {
    pub fn new(name: String, price_excl_tax: Amount) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            unit: DEFAULT_UNIT.to_string(),
            price_excl_tax,
            tax_rate_percent: Decimal::ZERO,
            description: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_tax_rate(mut self, rate: Decimal) -> Self {
        self.tax_rate_percent = rate;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Catalog rows coming from outside (imports, the store) must carry
    /// non-negative prices and rates and a name.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("service name must not be empty".to_string());
        }
        if self.price_excl_tax.is_sign_negative() && !self.price_excl_tax.is_zero() {
            return Err(format!("negative price for '{}'", self.name));
        }
        if self.tax_rate_percent.is_sign_negative() && !self.tax_rate_percent.is_zero() {
            return Err(format!("negative tax rate for '{}'", self.name));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let entry = ServiceCatalogEntry::new("Retouche".into(), Decimal::new(45, 0));
        assert_eq!(entry.unit, "heure");
        assert_eq!(entry.tax_rate_percent, Decimal::ZERO);
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_negative_price() {
        let entry = ServiceCatalogEntry::new("Remise".into(), Decimal::new(-10, 0));
        assert!(entry.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_name() {
        let entry = ServiceCatalogEntry::new("  ".into(), Decimal::ONE).with_tax_rate(Decimal::new(20, 0));
        assert!(entry.validate().is_err());
    }
}
