use anyhow::Result;
use serde::Deserialize;
use std::io::Read;
use tracing::{info, warn};

use crate::application::{AppError, DevisService};
use crate::domain::{ServiceCatalogEntry, Session, parse_amount};

#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

/// A rejected row. `line` counts the header as line 1.
#[derive(Debug, Clone)]
pub struct ImportError {
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Validate every row without writing anything.
    pub dry_run: bool,
    /// Count rows naming an existing service as skipped instead of failed.
    pub skip_duplicates: bool,
}

/// One catalog row. Only `name` and `price_ht` are required.
#[derive(Debug, Deserialize)]
struct ServiceRow {
    name: String,
    #[serde(default)]
    unit: Option<String>,
    price_ht: String,
    #[serde(default)]
    tva_rate: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

pub struct Importer<'a> {
    service: &'a DevisService,
    session: &'a Session,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a DevisService, session: &'a Session) -> Self {
        Self { service, session }
    }

    /// Load catalog entries from CSV with a `name,unit,price_ht,tva_rate,description`
    /// header. Prices and rates accept a comma as decimal separator.
    pub async fn import_services_csv<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut result = ImportResult::default();

        for (index, row) in csv_reader.deserialize::<ServiceRow>().enumerate() {
            let line = index + 2;

            let row = match row {
                Ok(r) => r,
                Err(e) => {
                    result.errors.push(ImportError {
                        line,
                        field: None,
                        error: format!("CSV parse error: {}", e),
                    });
                    continue;
                }
            };

            let entry = match row_to_entry(row) {
                Ok(entry) => entry,
                Err((field, error)) => {
                    result.errors.push(ImportError {
                        line,
                        field,
                        error,
                    });
                    continue;
                }
            };

            if options.dry_run {
                result.imported += 1;
                continue;
            }

            match self.service.add_service(self.session, entry).await {
                Ok(_) => result.imported += 1,
                Err(AppError::ServiceAlreadyExists(_)) if options.skip_duplicates => {
                    result.skipped += 1
                }
                Err(e) => result.errors.push(ImportError {
                    line,
                    field: None,
                    error: e.to_string(),
                }),
            }
        }

        if !result.errors.is_empty() {
            warn!(rejected = result.errors.len(), "Some catalog rows were rejected");
        }
        info!(
            owner = self.session.owner(),
            imported = result.imported,
            skipped = result.skipped,
            dry_run = options.dry_run,
            "Catalog import finished"
        );
        Ok(result)
    }
}

fn row_to_entry(row: ServiceRow) -> Result<ServiceCatalogEntry, (Option<String>, String)> {
    let price = parse_amount(&row.price_ht)
        .map_err(|e| (Some("price_ht".to_string()), format!("Invalid price: {}", e)))?;

    let mut entry = ServiceCatalogEntry::new(row.name, price);
    if let Some(unit) = row.unit.filter(|u| !u.is_empty()) {
        entry = entry.with_unit(unit);
    }
    if let Some(rate) = row.tva_rate.filter(|r| !r.is_empty()) {
        let rate = parse_amount(&rate)
            .map_err(|e| (Some("tva_rate".to_string()), format!("Invalid tax rate: {}", e)))?;
        entry = entry.with_tax_rate(rate);
    }
    if let Some(desc) = row.description.filter(|d| !d.is_empty()) {
        entry = entry.with_description(desc);
    }

    entry.validate().map_err(|e| (None, e))?;
    Ok(entry)
}
