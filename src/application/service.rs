use chrono::{Datelike, NaiveDate};
use tracing::info;

use crate::domain::{
    Amount, Client, CompanyProfile, CompanyProfileUpdate, Invoice, InvoiceStatus, Quote,
    QuoteStatus, ServiceCatalogEntry, Session, format_invoice_number,
};
use crate::storage::Repository;

use super::{AppError, DashboardStats, QuoteEditor, build_dashboard_stats};

/// Application service for everything around the quote editor: client
/// directory, service catalog, company profile, quote lifecycle and invoices.
pub struct DevisService {
    repo: Repository,
}

/// Fields to change on a client; `None` leaves the field as is.
#[derive(Debug, Clone, Default)]
pub struct ClientUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Fields to change on a catalog entry; `None` leaves the field as is.
#[derive(Debug, Clone, Default)]
pub struct ServiceUpdate {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub price_excl_tax: Option<Amount>,
    pub tax_rate_percent: Option<Amount>,
    pub description: Option<String>,
}

impl DevisService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Create (if needed) and migrate the database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// The store quote editors read from and save to.
    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    // ========================
    // Quote editing
    // ========================

    pub async fn new_quote(
        &self,
        session: &Session,
        today: NaiveDate,
    ) -> Result<QuoteEditor<'_, Repository>, AppError> {
        QuoteEditor::open_new(&self.repo, session.clone(), today).await
    }

    pub async fn edit_quote(
        &self,
        session: &Session,
        number: &str,
        today: NaiveDate,
    ) -> Result<QuoteEditor<'_, Repository>, AppError> {
        let quote = self.get_quote(session, number).await?;
        QuoteEditor::open_existing(&self.repo, session.clone(), quote.id, today).await
    }

    // ========================
    // Clients
    // ========================

    pub async fn create_client(
        &self,
        session: &Session,
        name: String,
        address: String,
        email: String,
        phone: String,
    ) -> Result<Client, AppError> {
        let owner = session.owner();
        if self.repo.get_client_by_name(owner, &name).await?.is_some() {
            return Err(AppError::ClientAlreadyExists(name));
        }

        let client = Client::new(name, address, email, phone);
        self.repo.save_client(owner, &client).await?;
        info!(owner, client = %client.name, "Client created");
        Ok(client)
    }

    pub async fn get_client(&self, session: &Session, name: &str) -> Result<Client, AppError> {
        self.repo
            .get_client_by_name(session.owner(), name)
            .await?
            .ok_or_else(|| AppError::ClientNotFound(name.to_string()))
    }

    pub async fn list_clients(&self, session: &Session) -> Result<Vec<Client>, AppError> {
        Ok(self.repo.list_clients(session.owner()).await?)
    }

    pub async fn update_client(
        &self,
        session: &Session,
        name: &str,
        update: ClientUpdate,
    ) -> Result<Client, AppError> {
        let owner = session.owner();
        let mut client = self.get_client(session, name).await?;

        if let Some(new_name) = update.name {
            if new_name != client.name && self.repo.get_client_by_name(owner, &new_name).await?.is_some() {
                return Err(AppError::ClientAlreadyExists(new_name));
            }
            client.name = new_name;
        }
        if let Some(address) = update.address {
            client.address = address;
        }
        if let Some(email) = update.email {
            client.email = email;
        }
        if let Some(phone) = update.phone {
            client.phone = phone;
        }

        self.repo.update_client(owner, &client).await?;
        info!(owner, client = %client.name, "Client updated");
        Ok(client)
    }

    /// Stored quotes and invoices keep their own copy of the client details.
    pub async fn delete_client(&self, session: &Session, name: &str) -> Result<(), AppError> {
        let client = self.get_client(session, name).await?;
        self.repo.delete_client(session.owner(), client.id).await?;
        info!(owner = session.owner(), client = %client.name, "Client deleted");
        Ok(())
    }

    // ========================
    // Service catalog
    // ========================

    /// Add a validated entry to the catalog.
    pub async fn add_service(
        &self,
        session: &Session,
        service: ServiceCatalogEntry,
    ) -> Result<ServiceCatalogEntry, AppError> {
        let owner = session.owner();
        service.validate().map_err(AppError::InvalidService)?;
        if self.repo.get_service_by_name(owner, &service.name).await?.is_some() {
            return Err(AppError::ServiceAlreadyExists(service.name));
        }

        self.repo.save_service(owner, &service).await?;
        info!(owner, service = %service.name, price_ht = %service.price_excl_tax, "Service added");
        Ok(service)
    }

    pub async fn create_service(
        &self,
        session: &Session,
        name: String,
        price_excl_tax: Amount,
        unit: Option<String>,
        tax_rate_percent: Option<Amount>,
        description: Option<String>,
    ) -> Result<ServiceCatalogEntry, AppError> {
        let mut service = ServiceCatalogEntry::new(name, price_excl_tax);
        if let Some(unit) = unit {
            service = service.with_unit(unit);
        }
        if let Some(rate) = tax_rate_percent {
            service = service.with_tax_rate(rate);
        }
        if let Some(desc) = description {
            service = service.with_description(desc);
        }
        self.add_service(session, service).await
    }

    pub async fn get_service(
        &self,
        session: &Session,
        name: &str,
    ) -> Result<ServiceCatalogEntry, AppError> {
        self.repo
            .get_service_by_name(session.owner(), name)
            .await?
            .ok_or_else(|| AppError::ServiceNotFound(name.to_string()))
    }

    pub async fn list_services(
        &self,
        session: &Session,
    ) -> Result<Vec<ServiceCatalogEntry>, AppError> {
        Ok(self.repo.list_services(session.owner()).await?)
    }

    pub async fn update_service(
        &self,
        session: &Session,
        name: &str,
        update: ServiceUpdate,
    ) -> Result<ServiceCatalogEntry, AppError> {
        let owner = session.owner();
        let mut service = self.get_service(session, name).await?;

        if let Some(new_name) = update.name {
            if new_name != service.name
                && self.repo.get_service_by_name(owner, &new_name).await?.is_some()
            {
                return Err(AppError::ServiceAlreadyExists(new_name));
            }
            service.name = new_name;
        }
        if let Some(unit) = update.unit {
            service.unit = unit;
        }
        if let Some(price) = update.price_excl_tax {
            service.price_excl_tax = price;
        }
        if let Some(rate) = update.tax_rate_percent {
            service.tax_rate_percent = rate;
        }
        if let Some(desc) = update.description {
            service.description = Some(desc).filter(|d| !d.is_empty());
        }
        service.validate().map_err(AppError::InvalidService)?;

        self.repo.update_service(owner, &service).await?;
        info!(owner, service = %service.name, "Service updated");
        Ok(service)
    }

    pub async fn delete_service(&self, session: &Session, name: &str) -> Result<(), AppError> {
        let service = self.get_service(session, name).await?;
        self.repo.delete_service(session.owner(), service.id).await?;
        info!(owner = session.owner(), service = %service.name, "Service deleted");
        Ok(())
    }

    // ========================
    // Company profile
    // ========================

    /// The saved profile, or the defaults when none was saved yet.
    pub async fn company(&self, session: &Session) -> Result<CompanyProfile, AppError> {
        Ok(self
            .repo
            .get_company(session.owner())
            .await?
            .unwrap_or_default())
    }

    pub async fn update_company(
        &self,
        session: &Session,
        update: CompanyProfileUpdate,
    ) -> Result<CompanyProfile, AppError> {
        let mut profile = self.company(session).await?;
        profile.apply(update);
        self.repo.save_company(session.owner(), &profile).await?;
        info!(owner = session.owner(), company = %profile.name, "Company profile saved");
        Ok(profile)
    }

    // ========================
    // Quotes
    // ========================

    /// All quotes, newest first.
    pub async fn list_quotes(
        &self,
        session: &Session,
        status: Option<QuoteStatus>,
    ) -> Result<Vec<Quote>, AppError> {
        let quotes = self.repo.list_quotes(session.owner()).await?;
        Ok(match status {
            Some(status) => quotes.into_iter().filter(|q| q.status == status).collect(),
            None => quotes,
        })
    }

    pub async fn get_quote(&self, session: &Session, number: &str) -> Result<Quote, AppError> {
        self.repo
            .get_quote_by_number(session.owner(), number)
            .await?
            .ok_or_else(|| AppError::QuoteNotFound(number.to_string()))
    }

    pub async fn delete_quote(&self, session: &Session, number: &str) -> Result<(), AppError> {
        let quote = self.get_quote(session, number).await?;
        self.repo.delete_quote(session.owner(), quote.id).await?;
        info!(owner = session.owner(), quote = %quote.number, "Quote deleted");
        Ok(())
    }

    pub async fn set_quote_status(
        &self,
        session: &Session,
        number: &str,
        status: QuoteStatus,
    ) -> Result<Quote, AppError> {
        let mut quote = self.get_quote(session, number).await?;
        let previous = quote.status;
        quote.set_status(status);
        self.repo.update_quote(session.owner(), &quote).await?;
        info!(owner = session.owner(), quote = %quote.number, from = %previous, to = %status, "Quote status changed");
        Ok(quote)
    }

    // ========================
    // Invoices
    // ========================

    /// Turn a quote into an invoice dated `today`. A quote is invoiced at
    /// most once; converting marks it accepted.
    pub async fn convert_to_invoice(
        &self,
        session: &Session,
        quote_number: &str,
        today: NaiveDate,
    ) -> Result<Invoice, AppError> {
        let owner = session.owner();
        let mut quote = self.get_quote(session, quote_number).await?;

        if let Some(existing) = self.repo.get_invoice_for_quote(owner, quote.id).await? {
            return Err(AppError::AlreadyInvoiced {
                quote: quote.number,
                invoice: existing.number,
            });
        }

        let sequence = self.repo.next_invoice_sequence(owner).await?;
        let number = format_invoice_number(today.year(), sequence);
        let invoice = Invoice::from_quote(&quote, number, today);
        quote.set_status(QuoteStatus::Accepted);
        self.repo
            .insert_invoice_for_quote(owner, sequence, &invoice, &quote)
            .await?;

        info!(
            owner,
            quote = %quote.number,
            invoice = %invoice.number,
            total_ttc = %invoice.totals.total_incl_tax,
            "Quote converted to invoice"
        );
        Ok(invoice)
    }

    /// All invoices, newest first.
    pub async fn list_invoices(
        &self,
        session: &Session,
        status: Option<InvoiceStatus>,
    ) -> Result<Vec<Invoice>, AppError> {
        let invoices = self.repo.list_invoices(session.owner()).await?;
        Ok(match status {
            Some(status) => invoices.into_iter().filter(|i| i.status == status).collect(),
            None => invoices,
        })
    }

    pub async fn get_invoice(&self, session: &Session, number: &str) -> Result<Invoice, AppError> {
        self.repo
            .get_invoice_by_number(session.owner(), number)
            .await?
            .ok_or_else(|| AppError::InvoiceNotFound(number.to_string()))
    }

    pub async fn set_invoice_status(
        &self,
        session: &Session,
        number: &str,
        status: InvoiceStatus,
    ) -> Result<Invoice, AppError> {
        let mut invoice = self.get_invoice(session, number).await?;
        self.repo
            .update_invoice_status(session.owner(), invoice.id, status)
            .await?;
        info!(owner = session.owner(), invoice = %invoice.number, from = %invoice.status, to = %status, "Invoice status changed");
        invoice.status = status;
        Ok(invoice)
    }

    // ========================
    // Dashboard
    // ========================

    pub async fn dashboard_stats(&self, session: &Session) -> Result<DashboardStats, AppError> {
        let owner = session.owner();
        let quote_counts = self.repo.count_quotes_by_status(owner).await?;
        let invoices = self.repo.list_invoices(owner).await?;
        let clients = self.repo.count_clients(owner).await?;
        let services = self.repo.count_services(owner).await?;

        Ok(build_dashboard_stats(&quote_counts, &invoices, clients, services))
    }
}
