// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use devispro::application::DevisService;
use devispro::domain::{
    Client, ClientSnapshot, CompanyProfile, Quote, QuoteId, QuotePayload, ServiceCatalogEntry,
    Session, format_quote_number,
};
use devispro::storage::QuoteStore;
use rust_decimal::Decimal;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(DevisService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = DevisService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

pub fn session() -> Session {
    Session::default()
}

/// Test fixture: a client and a small photography catalog
pub struct StandardData;

impl StandardData {
    pub async fn create(service: &DevisService, session: &Session) -> Result<()> {
        service
            .create_client(
                session,
                "Marie Dupont".into(),
                "1 rue de la Paix\n75002 Paris".into(),
                "marie@example.fr".into(),
                "0601020304".into(),
            )
            .await?;
        service
            .create_client(
                session,
                "Studio Lumière".into(),
                "12 quai des Arts\n69002 Lyon".into(),
                "contact@lumiere.fr".into(),
                String::new(),
            )
            .await?;

        service
            .create_service(session, "Reportage".into(), dec("100"), None, Some(dec("20")), None)
            .await?;
        service
            .create_service(
                session,
                "Album photo".into(),
                dec("500"),
                Some("forfait".into()),
                None,
                Some("30 pages".into()),
            )
            .await?;
        service
            .create_service(
                session,
                "Tirage".into(),
                dec("50"),
                Some("unité".into()),
                Some(dec("10")),
                None,
            )
            .await?;
        Ok(())
    }
}

/// In-memory store whose saves fail until `failures` is used up.
pub struct FlakyStore {
    clients: Vec<Client>,
    services: Vec<ServiceCatalogEntry>,
    quotes: Mutex<Vec<Quote>>,
    failures: AtomicUsize,
}

impl FlakyStore {
    pub fn new(failures: usize) -> Self {
        Self {
            clients: vec![Client::new(
                "Marie Dupont".into(),
                "1 rue de la Paix".into(),
                "marie@example.fr".into(),
                String::new(),
            )],
            services: vec![
                ServiceCatalogEntry::new("Reportage".into(), dec("100")).with_tax_rate(dec("20")),
            ],
            quotes: Mutex::new(Vec::new()),
            failures: AtomicUsize::new(failures),
        }
    }

    pub fn client(&self) -> &Client {
        &self.clients[0]
    }

    pub fn service(&self) -> &ServiceCatalogEntry {
        &self.services[0]
    }

    pub fn fail_next_saves(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    pub fn saved_quotes(&self) -> Vec<Quote> {
        self.quotes.lock().unwrap().clone()
    }

    fn check_failure(&self) -> Result<()> {
        let left = self.failures.load(Ordering::SeqCst);
        if left > 0 {
            self.failures.store(left - 1, Ordering::SeqCst);
            anyhow::bail!("connection reset by peer");
        }
        Ok(())
    }

    fn snapshot(&self, payload: &QuotePayload) -> Result<ClientSnapshot> {
        let client = self
            .clients
            .iter()
            .find(|c| Some(c.id) == payload.client_id)
            .ok_or_else(|| anyhow::anyhow!("unknown client"))?;
        Ok(ClientSnapshot::from(client))
    }
}

#[async_trait]
impl QuoteStore for FlakyStore {
    async fn client_directory(&self, _session: &Session) -> Result<Vec<Client>> {
        Ok(self.clients.clone())
    }

    async fn service_catalog(&self, _session: &Session) -> Result<Vec<ServiceCatalogEntry>> {
        Ok(self.services.clone())
    }

    async fn company_profile(&self, _session: &Session) -> Result<CompanyProfile> {
        Ok(CompanyProfile::default())
    }

    async fn fetch_quote(&self, _session: &Session, id: QuoteId) -> Result<Option<Quote>> {
        Ok(self.quotes.lock().unwrap().iter().find(|q| q.id == id).cloned())
    }

    async fn create_quote(
        &self,
        _session: &Session,
        payload: &QuotePayload,
        today: NaiveDate,
    ) -> Result<Quote> {
        self.check_failure()?;
        let client = self.snapshot(payload)?;
        let mut quotes = self.quotes.lock().unwrap();
        let number = format_quote_number(today.year(), quotes.len() as i64 + 1);
        let quote = Quote::from_payload(number, client, payload, today);
        quotes.push(quote.clone());
        Ok(quote)
    }

    async fn replace_quote(
        &self,
        _session: &Session,
        id: QuoteId,
        payload: &QuotePayload,
    ) -> Result<Quote> {
        self.check_failure()?;
        let client = self.snapshot(payload)?;
        let mut quotes = self.quotes.lock().unwrap();
        let quote = quotes
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or_else(|| anyhow::anyhow!("unknown quote"))?;
        quote.apply_payload(client, payload);
        Ok(quote.clone())
    }
}
