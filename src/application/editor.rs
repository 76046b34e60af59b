use chrono::NaiveDate;
use tracing::{info, warn};

use crate::domain::{
    Client, ClientId, CompanyProfile, Quote, QuoteDraft, QuoteId, QuoteTotals,
    ServiceCatalogEntry, ServiceId, Session,
};
use crate::storage::QuoteStore;

use super::{AppError, QuotePreview};

/// One quote editing session: a draft plus the reference data it was opened
/// with. Catalog, client directory and company profile are fetched once when
/// the session opens. Dropping the editor discards the draft.
pub struct QuoteEditor<'a, S: QuoteStore + ?Sized> {
    store: &'a S,
    session: Session,
    today: NaiveDate,
    clients: Vec<Client>,
    catalog: Vec<ServiceCatalogEntry>,
    company: CompanyProfile,
    draft: QuoteDraft,
    saved: Option<Quote>,
}

impl<'a, S: QuoteStore + ?Sized> QuoteEditor<'a, S> {
    /// Start a new, empty quote.
    pub async fn open_new(store: &'a S, session: Session, today: NaiveDate) -> Result<Self, AppError> {
        let (clients, catalog, company) = Self::load_reference_data(store, &session).await?;

        Ok(Self {
            store,
            session,
            today,
            clients,
            catalog,
            company,
            draft: QuoteDraft::new(today),
            saved: None,
        })
    }

    /// Open a stored quote for editing.
    pub async fn open_existing(
        store: &'a S,
        session: Session,
        id: QuoteId,
        today: NaiveDate,
    ) -> Result<Self, AppError> {
        let quote = store
            .fetch_quote(&session, id)
            .await?
            .ok_or_else(|| AppError::QuoteNotFound(id.to_string()))?;
        let (clients, catalog, company) = Self::load_reference_data(store, &session).await?;

        Ok(Self {
            store,
            session,
            today,
            clients,
            catalog,
            company,
            draft: QuoteDraft::from_quote(&quote),
            saved: Some(quote),
        })
    }

    async fn load_reference_data(
        store: &S,
        session: &Session,
    ) -> Result<(Vec<Client>, Vec<ServiceCatalogEntry>, CompanyProfile), AppError> {
        let (clients, catalog, company) = tokio::try_join!(
            store.client_directory(session),
            store.service_catalog(session),
            store.company_profile(session),
        )?;
        Ok((clients, catalog, company))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn draft(&self) -> &QuoteDraft {
        &self.draft
    }

    /// Direct access to the line-item ledger for add/update/remove/discount.
    pub fn draft_mut(&mut self) -> &mut QuoteDraft {
        &mut self.draft
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    pub fn catalog(&self) -> &[ServiceCatalogEntry] {
        &self.catalog
    }

    pub fn company(&self) -> &CompanyProfile {
        &self.company
    }

    /// The stored quote this session edits, once it exists.
    pub fn saved_quote(&self) -> Option<&Quote> {
        self.saved.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        self.saved.is_some()
    }

    pub fn find_client(&self, name: &str) -> Option<&Client> {
        self.clients.iter().find(|c| c.name == name)
    }

    pub fn find_service(&self, name: &str) -> Option<&ServiceCatalogEntry> {
        self.catalog.iter().find(|s| s.name == name)
    }

    pub fn selected_client(&self) -> Option<&Client> {
        let id = self.draft.client_id()?;
        self.clients.iter().find(|c| c.id == id)
    }

    /// Select a client from the directory fetched for this session.
    pub fn select_client(&mut self, client_id: ClientId) -> Result<(), AppError> {
        if !self.clients.iter().any(|c| c.id == client_id) {
            return Err(AppError::ClientNotFound(client_id.to_string()));
        }
        self.draft.select_client(client_id);
        Ok(())
    }

    /// Append a line pre-filled from the session's catalog.
    pub fn add_catalog_service(&mut self, service_id: ServiceId) -> Result<(), AppError> {
        let entry = self
            .catalog
            .iter()
            .find(|s| s.id == service_id)
            .ok_or_else(|| AppError::ServiceNotFound(service_id.to_string()))?;
        self.draft.add_item_from_catalog(entry);
        Ok(())
    }

    pub fn totals(&self) -> QuoteTotals {
        let totals = self.draft.compute_totals();
        if totals.discount_exceeds_subtotal() {
            warn!(
                discount = %self.draft.discount(),
                total_ht = %totals.subtotal_excl_tax,
                "Discount exceeds the pre-tax subtotal"
            );
        }
        totals
    }

    /// Read-only view for display.
    pub fn preview(&self) -> QuotePreview<'_> {
        let issued_on = self
            .saved
            .as_ref()
            .map(|q| q.emission_date)
            .unwrap_or(self.today);

        QuotePreview {
            company: &self.company,
            number: self.saved.as_ref().map(|q| q.number.as_str()),
            issued_on,
            expiration_date: self.draft.expiration_date(),
            event_date: self.draft.event_date(),
            client: self.selected_client().map(Into::into),
            items: self.draft.items(),
            discount: self.draft.discount(),
            totals: self.totals(),
            notes: Some(self.draft.notes()).filter(|n| !n.trim().is_empty()),
        }
    }

    /// Checks run at save time: a client is selected and there is at least one line.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.draft.client_id().is_none() {
            return Err(AppError::MissingClient);
        }
        if self.draft.is_empty() {
            return Err(AppError::EmptyQuote);
        }
        Ok(())
    }

    /// Hand the draft to the store. On failure the draft is unchanged and
    /// `save` can be called again.
    pub async fn save(&mut self) -> Result<Quote, AppError> {
        self.validate()?;
        let payload = self.draft.to_payload();

        let result = match &self.saved {
            Some(existing) => {
                self.store
                    .replace_quote(&self.session, existing.id, &payload)
                    .await
            }
            None => {
                self.store
                    .create_quote(&self.session, &payload, self.today)
                    .await
            }
        };

        match result {
            Ok(quote) => {
                info!(quote = %quote.number, lines = quote.items.len(), "Quote saved");
                self.saved = Some(quote.clone());
                Ok(quote)
            }
            Err(e) => {
                warn!(error = %e, "Quote save failed, draft kept");
                Err(AppError::PersistenceFailure(e))
            }
        }
    }
}
