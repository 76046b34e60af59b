use std::collections::HashMap;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::domain::{
    Client, ClientId, ClientSnapshot, CompanyProfile, Invoice, InvoiceId, InvoiceStatus, Quote,
    QuoteId, QuoteStatus, QuoteTotals, ServiceCatalogEntry, ServiceId,
};

use super::MIGRATION_001_INITIAL;

const DATE_FORMAT: &str = "%Y-%m-%d";

const CLIENT_COLUMNS: &str = "id, name, address, email, phone, created_at";

const SERVICE_COLUMNS: &str = "id, name, unit, price_ht, tva_rate, description, created_at";

const QUOTE_COLUMNS: &str = "id, number, status, client_id, client_name, client_email, client_address, client_phone, \
     emission_date, expiration_date, event_date, items, discount, total_ht_before_discount, total_ht, total_tva, \
     total_ttc, notes, created_at, sent_at";

const INVOICE_COLUMNS: &str = "id, number, quote_id, client_id, client_name, client_email, client_address, client_phone, \
     emission_date, due_date, items, discount, total_ht_before_discount, total_ht, total_tva, total_ttc, status, created_at";

/// Repository for persisting and querying clients, services, quotes and invoices.
/// Every query is scoped to an owner.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        info!("Database schema ready");
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Company profile
    // ========================

    pub async fn get_company(&self, owner: &str) -> Result<Option<CompanyProfile>> {
        let row = sqlx::query(
            r#"
            SELECT name, address, email, phone, legal_status, siren, vat_number, bank_name, iban, bic
            FROM company_profiles
            WHERE owner = ?
            "#,
        )
        .bind(owner)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch company profile")?;

        Ok(row.map(|row| CompanyProfile {
            name: row.get("name"),
            address: row.get("address"),
            email: row.get("email"),
            phone: row.get("phone"),
            legal_status: row.get("legal_status"),
            siren: row.get("siren"),
            vat_number: row.get("vat_number"),
            bank_name: row.get("bank_name"),
            iban: row.get("iban"),
            bic: row.get("bic"),
        }))
    }

    /// Insert or replace the owner's company profile.
    pub async fn save_company(&self, owner: &str, profile: &CompanyProfile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO company_profiles (owner, name, address, email, phone, legal_status, siren, vat_number, bank_name, iban, bic)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(owner) DO UPDATE SET
                name = excluded.name,
                address = excluded.address,
                email = excluded.email,
                phone = excluded.phone,
                legal_status = excluded.legal_status,
                siren = excluded.siren,
                vat_number = excluded.vat_number,
                bank_name = excluded.bank_name,
                iban = excluded.iban,
                bic = excluded.bic
            "#,
        )
        .bind(owner)
        .bind(&profile.name)
        .bind(&profile.address)
        .bind(&profile.email)
        .bind(&profile.phone)
        .bind(&profile.legal_status)
        .bind(&profile.siren)
        .bind(&profile.vat_number)
        .bind(&profile.bank_name)
        .bind(&profile.iban)
        .bind(&profile.bic)
        .execute(&self.pool)
        .await
        .context("Failed to save company profile")?;
        Ok(())
    }

    // ========================
    // Clients
    // ========================

    pub async fn save_client(&self, owner: &str, client: &Client) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO clients (id, owner, name, address, email, phone, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(client.id.to_string())
        .bind(owner)
        .bind(&client.name)
        .bind(&client.address)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(client.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save client")?;
        Ok(())
    }

    pub async fn update_client(&self, owner: &str, client: &Client) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE clients SET name = ?, address = ?, email = ?, phone = ?
            WHERE id = ? AND owner = ?
            "#,
        )
        .bind(&client.name)
        .bind(&client.address)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(client.id.to_string())
        .bind(owner)
        .execute(&self.pool)
        .await
        .context("Failed to update client")?;
        Ok(())
    }

    pub async fn get_client(&self, owner: &str, id: ClientId) -> Result<Option<Client>> {
        let query = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ? AND owner = ?");
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .bind(owner)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch client")?;

        row.as_ref().map(Self::row_to_client).transpose()
    }

    pub async fn get_client_by_name(&self, owner: &str, name: &str) -> Result<Option<Client>> {
        let query = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE name = ? AND owner = ?");
        let row = sqlx::query(&query)
            .bind(name)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch client by name")?;

        row.as_ref().map(Self::row_to_client).transpose()
    }

    pub async fn list_clients(&self, owner: &str) -> Result<Vec<Client>> {
        let query = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE owner = ? ORDER BY name");
        let rows = sqlx::query(&query)
            .bind(owner)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list clients")?;

        rows.iter().map(Self::row_to_client).collect()
    }

    /// Returns false when no such client existed.
    pub async fn delete_client(&self, owner: &str, id: ClientId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM clients WHERE id = ? AND owner = ?")
            .bind(id.to_string())
            .bind(owner)
            .execute(&self.pool)
            .await
            .context("Failed to delete client")?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_clients(&self, owner: &str) -> Result<i64> {
        self.count_owned("clients", owner).await
    }

    fn row_to_client(row: &SqliteRow) -> Result<Client> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(Client {
            id: Uuid::parse_str(&id_str).context("Invalid client ID")?,
            name: row.get("name"),
            address: row.get("address"),
            email: row.get("email"),
            phone: row.get("phone"),
            created_at: parse_timestamp(&created_at_str)?,
        })
    }

    // ========================
    // Service catalog
    // ========================

    pub async fn save_service(&self, owner: &str, service: &ServiceCatalogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO services (id, owner, name, unit, price_ht, tva_rate, description, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(service.id.to_string())
        .bind(owner)
        .bind(&service.name)
        .bind(&service.unit)
        .bind(service.price_excl_tax.to_string())
        .bind(service.tax_rate_percent.to_string())
        .bind(&service.description)
        .bind(service.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save service")?;
        Ok(())
    }

    pub async fn update_service(&self, owner: &str, service: &ServiceCatalogEntry) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE services SET name = ?, unit = ?, price_ht = ?, tva_rate = ?, description = ?
            WHERE id = ? AND owner = ?
            "#,
        )
        .bind(&service.name)
        .bind(&service.unit)
        .bind(service.price_excl_tax.to_string())
        .bind(service.tax_rate_percent.to_string())
        .bind(&service.description)
        .bind(service.id.to_string())
        .bind(owner)
        .execute(&self.pool)
        .await
        .context("Failed to update service")?;
        Ok(())
    }

    pub async fn get_service(
        &self,
        owner: &str,
        id: ServiceId,
    ) -> Result<Option<ServiceCatalogEntry>> {
        let query = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ? AND owner = ?");
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .bind(owner)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch service")?;

        row.as_ref().map(Self::row_to_service).transpose()
    }

    pub async fn get_service_by_name(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<ServiceCatalogEntry>> {
        let query = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE name = ? AND owner = ?");
        let row = sqlx::query(&query)
            .bind(name)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch service by name")?;

        row.as_ref().map(Self::row_to_service).transpose()
    }

    pub async fn list_services(&self, owner: &str) -> Result<Vec<ServiceCatalogEntry>> {
        let query = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE owner = ? ORDER BY name");
        let rows = sqlx::query(&query)
            .bind(owner)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list services")?;

        rows.iter().map(Self::row_to_service).collect()
    }

    pub async fn delete_service(&self, owner: &str, id: ServiceId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM services WHERE id = ? AND owner = ?")
            .bind(id.to_string())
            .bind(owner)
            .execute(&self.pool)
            .await
            .context("Failed to delete service")?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_services(&self, owner: &str) -> Result<i64> {
        self.count_owned("services", owner).await
    }

    fn row_to_service(row: &SqliteRow) -> Result<ServiceCatalogEntry> {
        let id_str: String = row.get("id");
        let price_str: String = row.get("price_ht");
        let rate_str: String = row.get("tva_rate");
        let created_at_str: String = row.get("created_at");

        Ok(ServiceCatalogEntry {
            id: Uuid::parse_str(&id_str).context("Invalid service ID")?,
            name: row.get("name"),
            unit: row.get("unit"),
            price_excl_tax: parse_decimal(&price_str, "price_ht")?,
            tax_rate_percent: parse_decimal(&rate_str, "tva_rate")?,
            description: row.get("description"),
            created_at: parse_timestamp(&created_at_str)?,
        })
    }

    // ========================
    // Quotes
    // ========================

    /// Next per-owner quote sequence number (1-based).
    pub async fn next_quote_sequence(&self, owner: &str) -> Result<i64> {
        self.next_sequence("quotes", owner).await
    }

    pub async fn insert_quote(&self, owner: &str, sequence: i64, quote: &Quote) -> Result<()> {
        let items_json = serde_json::to_string(&quote.items)?;

        sqlx::query(
            r#"
            INSERT INTO quotes (id, owner, sequence, number, status, client_id, client_name, client_email, client_address,
                client_phone, emission_date, expiration_date, event_date, items, discount, total_ht_before_discount,
                total_ht, total_tva, total_ttc, notes, created_at, sent_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(quote.id.to_string())
        .bind(owner)
        .bind(sequence)
        .bind(&quote.number)
        .bind(quote.status.as_str())
        .bind(quote.client.client_id.to_string())
        .bind(&quote.client.name)
        .bind(&quote.client.email)
        .bind(&quote.client.address)
        .bind(&quote.client.phone)
        .bind(format_day(quote.emission_date))
        .bind(format_day(quote.expiration_date))
        .bind(quote.event_date.map(format_day))
        .bind(&items_json)
        .bind(quote.discount.to_string())
        .bind(quote.totals.subtotal_before_discount.to_string())
        .bind(quote.totals.subtotal_excl_tax.to_string())
        .bind(quote.totals.total_tax.to_string())
        .bind(quote.totals.total_incl_tax.to_string())
        .bind(&quote.notes)
        .bind(quote.created_at.to_rfc3339())
        .bind(quote.sent_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await
        .context("Failed to save quote")?;

        Ok(())
    }

    /// Rewrite every mutable column of an existing quote.
    pub async fn update_quote(&self, owner: &str, quote: &Quote) -> Result<()> {
        Self::quote_update_query(owner, quote)?
            .execute(&self.pool)
            .await
            .context("Failed to update quote")?;

        Ok(())
    }

    fn quote_update_query<'q>(
        owner: &'q str,
        quote: &'q Quote,
    ) -> Result<Query<'q, Sqlite, SqliteArguments<'q>>> {
        let items_json = serde_json::to_string(&quote.items)?;

        Ok(sqlx::query(
            r#"
            UPDATE quotes SET status = ?, client_id = ?, client_name = ?, client_email = ?, client_address = ?,
                client_phone = ?, expiration_date = ?, event_date = ?, items = ?, discount = ?,
                total_ht_before_discount = ?, total_ht = ?, total_tva = ?, total_ttc = ?, notes = ?, sent_at = ?
            WHERE id = ? AND owner = ?
            "#,
        )
        .bind(quote.status.as_str())
        .bind(quote.client.client_id.to_string())
        .bind(&quote.client.name)
        .bind(&quote.client.email)
        .bind(&quote.client.address)
        .bind(&quote.client.phone)
        .bind(format_day(quote.expiration_date))
        .bind(quote.event_date.map(format_day))
        .bind(items_json)
        .bind(quote.discount.to_string())
        .bind(quote.totals.subtotal_before_discount.to_string())
        .bind(quote.totals.subtotal_excl_tax.to_string())
        .bind(quote.totals.total_tax.to_string())
        .bind(quote.totals.total_incl_tax.to_string())
        .bind(&quote.notes)
        .bind(quote.sent_at.map(|dt| dt.to_rfc3339()))
        .bind(quote.id.to_string())
        .bind(owner))
    }

    pub async fn get_quote(&self, owner: &str, id: QuoteId) -> Result<Option<Quote>> {
        let query = format!("SELECT {QUOTE_COLUMNS} FROM quotes WHERE id = ? AND owner = ?");
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .bind(owner)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch quote")?;

        row.as_ref().map(Self::row_to_quote).transpose()
    }

    pub async fn get_quote_by_number(&self, owner: &str, number: &str) -> Result<Option<Quote>> {
        let query = format!("SELECT {QUOTE_COLUMNS} FROM quotes WHERE number = ? AND owner = ?");
        let row = sqlx::query(&query)
            .bind(number)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch quote by number")?;

        row.as_ref().map(Self::row_to_quote).transpose()
    }

    /// List quotes, newest first.
    pub async fn list_quotes(&self, owner: &str) -> Result<Vec<Quote>> {
        let query = format!(
            "SELECT {QUOTE_COLUMNS} FROM quotes WHERE owner = ? ORDER BY created_at DESC, sequence DESC"
        );
        let rows = sqlx::query(&query)
            .bind(owner)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list quotes")?;

        rows.iter().map(Self::row_to_quote).collect()
    }

    pub async fn delete_quote(&self, owner: &str, id: QuoteId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM quotes WHERE id = ? AND owner = ?")
            .bind(id.to_string())
            .bind(owner)
            .execute(&self.pool)
            .await
            .context("Failed to delete quote")?;
        Ok(result.rows_affected() > 0)
    }

    /// Quote count per status. Statuses with no quotes are absent.
    pub async fn count_quotes_by_status(&self, owner: &str) -> Result<HashMap<QuoteStatus, i64>> {
        let rows = sqlx::query(
            r#"
            SELECT status, COUNT(*) as count
            FROM quotes
            WHERE owner = ?
            GROUP BY status
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .context("Failed to count quotes by status")?;

        let mut counts = HashMap::new();
        for row in rows {
            let status_str: String = row.get("status");
            let status = QuoteStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid quote status: {}", status_str))?;
            counts.insert(status, row.get::<i64, _>("count"));
        }
        Ok(counts)
    }

    fn row_to_quote(row: &SqliteRow) -> Result<Quote> {
        let id_str: String = row.get("id");
        let status_str: String = row.get("status");
        let emission_str: String = row.get("emission_date");
        let expiration_str: String = row.get("expiration_date");
        let event_str: Option<String> = row.get("event_date");
        let items_json: String = row.get("items");
        let discount_str: String = row.get("discount");
        let created_at_str: String = row.get("created_at");
        let sent_at_str: Option<String> = row.get("sent_at");

        Ok(Quote {
            id: Uuid::parse_str(&id_str).context("Invalid quote ID")?,
            number: row.get("number"),
            status: QuoteStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid quote status: {}", status_str))?,
            client: Self::row_to_client_snapshot(row)?,
            emission_date: parse_day(&emission_str)?,
            expiration_date: parse_day(&expiration_str)?,
            event_date: event_str.as_deref().map(parse_day).transpose()?,
            items: serde_json::from_str(&items_json).context("Invalid quote items")?,
            discount: parse_decimal(&discount_str, "discount")?,
            totals: Self::row_to_totals(row)?,
            notes: row.get("notes"),
            created_at: parse_timestamp(&created_at_str)?,
            sent_at: sent_at_str.as_deref().map(parse_timestamp).transpose()?,
        })
    }

    // ========================
    // Invoices
    // ========================

    pub async fn next_invoice_sequence(&self, owner: &str) -> Result<i64> {
        self.next_sequence("invoices", owner).await
    }

    /// Store a new invoice and the updated quote it was created from in one
    /// transaction. Neither write is kept if the other fails.
    pub async fn insert_invoice_for_quote(
        &self,
        owner: &str,
        sequence: i64,
        invoice: &Invoice,
        quote: &Quote,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to start transaction")?;

        Self::invoice_insert_query(owner, sequence, invoice)?
            .execute(&mut *tx)
            .await
            .context("Failed to save invoice")?;
        Self::quote_update_query(owner, quote)?
            .execute(&mut *tx)
            .await
            .context("Failed to update quote")?;

        tx.commit().await.context("Failed to commit invoice")?;
        Ok(())
    }

    fn invoice_insert_query<'q>(
        owner: &'q str,
        sequence: i64,
        invoice: &'q Invoice,
    ) -> Result<Query<'q, Sqlite, SqliteArguments<'q>>> {
        let items_json = serde_json::to_string(&invoice.items)?;

        Ok(sqlx::query(
            r#"
            INSERT INTO invoices (id, owner, sequence, number, quote_id, client_id, client_name, client_email,
                client_address, client_phone, emission_date, due_date, items, discount, total_ht_before_discount,
                total_ht, total_tva, total_ttc, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(invoice.id.to_string())
        .bind(owner)
        .bind(sequence)
        .bind(&invoice.number)
        .bind(invoice.quote_id.to_string())
        .bind(invoice.client.client_id.to_string())
        .bind(&invoice.client.name)
        .bind(&invoice.client.email)
        .bind(&invoice.client.address)
        .bind(&invoice.client.phone)
        .bind(format_day(invoice.emission_date))
        .bind(format_day(invoice.due_date))
        .bind(items_json)
        .bind(invoice.discount.to_string())
        .bind(invoice.totals.subtotal_before_discount.to_string())
        .bind(invoice.totals.subtotal_excl_tax.to_string())
        .bind(invoice.totals.total_tax.to_string())
        .bind(invoice.totals.total_incl_tax.to_string())
        .bind(invoice.status.as_str())
        .bind(invoice.created_at.to_rfc3339()))
    }

    pub async fn get_invoice_by_number(&self, owner: &str, number: &str) -> Result<Option<Invoice>> {
        let query = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE number = ? AND owner = ?");
        let row = sqlx::query(&query)
            .bind(number)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch invoice by number")?;

        row.as_ref().map(Self::row_to_invoice).transpose()
    }

    pub async fn get_invoice_for_quote(
        &self,
        owner: &str,
        quote_id: QuoteId,
    ) -> Result<Option<Invoice>> {
        let query = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE quote_id = ? AND owner = ?");
        let row = sqlx::query(&query)
            .bind(quote_id.to_string())
            .bind(owner)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch invoice for quote")?;

        row.as_ref().map(Self::row_to_invoice).transpose()
    }

    /// List invoices, newest first.
    pub async fn list_invoices(&self, owner: &str) -> Result<Vec<Invoice>> {
        let query = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE owner = ? ORDER BY created_at DESC, sequence DESC"
        );
        let rows = sqlx::query(&query)
            .bind(owner)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list invoices")?;

        rows.iter().map(Self::row_to_invoice).collect()
    }

    pub async fn update_invoice_status(
        &self,
        owner: &str,
        id: InvoiceId,
        status: InvoiceStatus,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE invoices SET status = ? WHERE id = ? AND owner = ?")
            .bind(status.as_str())
            .bind(id.to_string())
            .bind(owner)
            .execute(&self.pool)
            .await
            .context("Failed to update invoice status")?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_invoices(&self, owner: &str) -> Result<i64> {
        self.count_owned("invoices", owner).await
    }

    fn row_to_invoice(row: &SqliteRow) -> Result<Invoice> {
        let id_str: String = row.get("id");
        let quote_id_str: String = row.get("quote_id");
        let emission_str: String = row.get("emission_date");
        let due_str: String = row.get("due_date");
        let items_json: String = row.get("items");
        let discount_str: String = row.get("discount");
        let status_str: String = row.get("status");
        let created_at_str: String = row.get("created_at");

        Ok(Invoice {
            id: Uuid::parse_str(&id_str).context("Invalid invoice ID")?,
            number: row.get("number"),
            quote_id: Uuid::parse_str(&quote_id_str).context("Invalid quote ID")?,
            client: Self::row_to_client_snapshot(row)?,
            emission_date: parse_day(&emission_str)?,
            due_date: parse_day(&due_str)?,
            items: serde_json::from_str(&items_json).context("Invalid invoice items")?,
            discount: parse_decimal(&discount_str, "discount")?,
            totals: Self::row_to_totals(row)?,
            status: InvoiceStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid invoice status: {}", status_str))?,
            created_at: parse_timestamp(&created_at_str)?,
        })
    }

    // ========================
    // Shared helpers
    // ========================

    async fn next_sequence(&self, table: &'static str, owner: &str) -> Result<i64> {
        let query = format!("SELECT COALESCE(MAX(sequence), 0) + 1 as next FROM {table} WHERE owner = ?");
        let row = sqlx::query(&query)
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to get next {} sequence", table))?;

        Ok(row.get("next"))
    }

    async fn count_owned(&self, table: &'static str, owner: &str) -> Result<i64> {
        let query = format!("SELECT COUNT(*) as count FROM {table} WHERE owner = ?");
        let row = sqlx::query(&query)
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to count {}", table))?;

        Ok(row.get("count"))
    }

    fn row_to_client_snapshot(row: &SqliteRow) -> Result<ClientSnapshot> {
        let client_id_str: String = row.get("client_id");

        Ok(ClientSnapshot {
            client_id: Uuid::parse_str(&client_id_str).context("Invalid client ID")?,
            name: row.get("client_name"),
            email: row.get("client_email"),
            address: row.get("client_address"),
            phone: row.get("client_phone"),
        })
    }

    fn row_to_totals(row: &SqliteRow) -> Result<QuoteTotals> {
        let before_str: String = row.get("total_ht_before_discount");
        let ht_str: String = row.get("total_ht");
        let tva_str: String = row.get("total_tva");
        let ttc_str: String = row.get("total_ttc");

        Ok(QuoteTotals {
            subtotal_before_discount: parse_decimal(&before_str, "total_ht_before_discount")?,
            subtotal_excl_tax: parse_decimal(&ht_str, "total_ht")?,
            total_tax: parse_decimal(&tva_str, "total_tva")?,
            total_incl_tax: parse_decimal(&ttc_str, "total_ttc")?,
        })
    }
}

fn format_day(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_day(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).with_context(|| format!("Invalid date: {}", s))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid timestamp: {}", s))?
        .with_timezone(&Utc))
}

fn parse_decimal(s: &str, column: &str) -> Result<Decimal> {
    Decimal::from_str(s).with_context(|| format!("Invalid {} value: {}", column, s))
}
