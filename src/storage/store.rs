use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use tracing::info;

use crate::domain::{
    Client, ClientSnapshot, CompanyProfile, Quote, QuoteId, QuotePayload, ServiceCatalogEntry,
    Session, format_quote_number,
};

use super::Repository;

/// The collaborator a quote editing session reads reference data from and
/// hands finished drafts to.
#[async_trait]
pub trait QuoteStore: Send + Sync {
    async fn client_directory(&self, session: &Session) -> Result<Vec<Client>>;

    async fn service_catalog(&self, session: &Session) -> Result<Vec<ServiceCatalogEntry>>;

    /// The owner's company profile, or the defaults when none was saved.
    async fn company_profile(&self, session: &Session) -> Result<CompanyProfile>;

    async fn fetch_quote(&self, session: &Session, id: QuoteId) -> Result<Option<Quote>>;

    /// Persist a new quote; the store assigns id, number, status and emission date.
    async fn create_quote(
        &self,
        session: &Session,
        payload: &QuotePayload,
        today: NaiveDate,
    ) -> Result<Quote>;

    async fn replace_quote(
        &self,
        session: &Session,
        id: QuoteId,
        payload: &QuotePayload,
    ) -> Result<Quote>;
}

impl Repository {
    async fn client_snapshot(&self, owner: &str, payload: &QuotePayload) -> Result<ClientSnapshot> {
        let client_id = payload
            .client_id
            .ok_or_else(|| anyhow::anyhow!("Quote has no client"))?;
        let client = self
            .get_client(owner, client_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Client not found: {}", client_id))?;
        Ok(ClientSnapshot::from(&client))
    }
}

#[async_trait]
impl QuoteStore for Repository {
    async fn client_directory(&self, session: &Session) -> Result<Vec<Client>> {
        self.list_clients(session.owner()).await
    }

    async fn service_catalog(&self, session: &Session) -> Result<Vec<ServiceCatalogEntry>> {
        let services = self.list_services(session.owner()).await?;
        for service in &services {
            service
                .validate()
                .map_err(|e| anyhow::anyhow!("Invalid catalog entry: {}", e))?;
        }
        Ok(services)
    }

    async fn company_profile(&self, session: &Session) -> Result<CompanyProfile> {
        Ok(self
            .get_company(session.owner())
            .await?
            .unwrap_or_default())
    }

    async fn fetch_quote(&self, session: &Session, id: QuoteId) -> Result<Option<Quote>> {
        self.get_quote(session.owner(), id).await
    }

    async fn create_quote(
        &self,
        session: &Session,
        payload: &QuotePayload,
        today: NaiveDate,
    ) -> Result<Quote> {
        let owner = session.owner();
        let client = self.client_snapshot(owner, payload).await?;

        let sequence = self.next_quote_sequence(owner).await?;
        let number = format_quote_number(today.year(), sequence);
        let quote = Quote::from_payload(number, client, payload, today);

        self.insert_quote(owner, sequence, &quote).await?;
        info!(owner, quote = %quote.number, total_ttc = %quote.totals.total_incl_tax, "Quote created");
        Ok(quote)
    }

    async fn replace_quote(
        &self,
        session: &Session,
        id: QuoteId,
        payload: &QuotePayload,
    ) -> Result<Quote> {
        let owner = session.owner();
        let mut quote = self
            .get_quote(owner, id)
            .await?
            .with_context(|| format!("Quote not found: {}", id))?;
        let client = self.client_snapshot(owner, payload).await?;

        quote.apply_payload(client, payload);
        self.update_quote(owner, &quote).await?;
        info!(owner, quote = %quote.number, total_ttc = %quote.totals.total_incl_tax, "Quote updated");
        Ok(quote)
    }
}
