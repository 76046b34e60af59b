use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::DevisService;
use crate::domain::{
    Amount, Client, CompanyProfile, Invoice, Quote, ServiceCatalogEntry, Session, format_quantity,
    round_cents,
};

/// Everything one owner has stored, as written by `export_full_json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub owner: String,
    pub company: CompanyProfile,
    pub clients: Vec<Client>,
    pub services: Vec<ServiceCatalogEntry>,
    pub quotes: Vec<Quote>,
    pub invoices: Vec<Invoice>,
}

pub struct Exporter<'a> {
    service: &'a DevisService,
    session: &'a Session,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a DevisService, session: &'a Session) -> Self {
        Self { service, session }
    }

    /// One row per quote with its totals.
    pub async fn export_quotes_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let quotes = self.service.list_quotes(self.session, None).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "quote_number",
            "status",
            "client",
            "emission_date",
            "expiration_date",
            "event_date",
            "lines",
            "discount",
            "total_ht",
            "total_tva",
            "total_ttc",
        ])?;

        for quote in &quotes {
            csv_writer.write_record([
                quote.number.clone(),
                quote.status.as_str().to_string(),
                quote.client.name.clone(),
                quote.emission_date.to_string(),
                quote.expiration_date.to_string(),
                quote.event_date.map(|d| d.to_string()).unwrap_or_default(),
                quote.items.len().to_string(),
                amount_cell(quote.discount),
                amount_cell(quote.totals.subtotal_excl_tax),
                amount_cell(quote.totals.total_tax),
                amount_cell(quote.totals.total_incl_tax),
            ])?;
        }

        csv_writer.flush()?;
        Ok(quotes.len())
    }

    pub async fn export_invoices_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let invoices = self.service.list_invoices(self.session, None).await?;
        let quotes = self.service.list_quotes(self.session, None).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "invoice_number",
            "quote_number",
            "status",
            "client",
            "emission_date",
            "due_date",
            "total_ht",
            "total_tva",
            "total_ttc",
        ])?;

        for invoice in &invoices {
            // Empty when the source quote has since been deleted
            let quote_number = quotes
                .iter()
                .find(|q| q.id == invoice.quote_id)
                .map(|q| q.number.as_str())
                .unwrap_or_default();

            csv_writer.write_record([
                invoice.number.clone(),
                quote_number.to_string(),
                invoice.status.as_str().to_string(),
                invoice.client.name.clone(),
                invoice.emission_date.to_string(),
                invoice.due_date.to_string(),
                amount_cell(invoice.totals.subtotal_excl_tax),
                amount_cell(invoice.totals.total_tax),
                amount_cell(invoice.totals.total_incl_tax),
            ])?;
        }

        csv_writer.flush()?;
        Ok(invoices.len())
    }

    /// Same columns `Importer::import_services_csv` reads.
    pub async fn export_services_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let services = self.service.list_services(self.session).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["name", "unit", "price_ht", "tva_rate", "description"])?;

        for service in &services {
            csv_writer.write_record([
                service.name.clone(),
                service.unit.clone(),
                service.price_excl_tax.to_string(),
                format_quantity(service.tax_rate_percent),
                service.description.clone().unwrap_or_default(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(services.len())
    }

    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<DataSnapshot> {
        let snapshot = DataSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            owner: self.session.owner().to_string(),
            company: self.service.company(self.session).await?,
            clients: self.service.list_clients(self.session).await?,
            services: self.service.list_services(self.session).await?,
            quotes: self.service.list_quotes(self.session, None).await?,
            invoices: self.service.list_invoices(self.session, None).await?,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}

/// Amounts in CSV cells always carry two decimals and no currency sign.
fn amount_cell(amount: Amount) -> String {
    format!("{:.2}", round_cents(amount))
}
