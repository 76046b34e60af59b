use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    Amount, ClientId, ItemField, ItemUpdate, LineItem, Quote, QuoteTotals, ServiceCatalogEntry,
    coerce_amount, compute_totals,
};

/// Days a new quote stays valid unless the user picks another date.
pub const DEFAULT_VALIDITY_DAYS: i64 = 30;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    #[error("Line {index} does not exist (quote has {len} lines)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// An in-memory quote being composed or edited.
///
/// Lines and discount are only changed through the methods below; totals are
/// never stored and are recomputed from the current lines on every call to
/// [`QuoteDraft::compute_totals`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteDraft {
    client_id: Option<ClientId>,
    expiration_date: NaiveDate,
    event_date: Option<NaiveDate>,
    items: Vec<LineItem>,
    discount: Amount,
    notes: String,
}

/// What gets handed to the persistence collaborator on save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotePayload {
    pub client_id: Option<ClientId>,
    pub expiration_date: NaiveDate,
    pub event_date: Option<NaiveDate>,
    pub items: Vec<LineItem>,
    pub discount: Amount,
    pub notes: Option<String>,
}

impl QuoteDraft {
    /// Empty draft created on `today`, valid for [`DEFAULT_VALIDITY_DAYS`].
    pub fn new(today: NaiveDate) -> Self {
        Self {
            client_id: None,
            expiration_date: today + Duration::days(DEFAULT_VALIDITY_DAYS),
            event_date: None,
            items: Vec::new(),
            discount: Decimal::ZERO,
            notes: String::new(),
        }
    }

    /// Hydrate a draft from a stored quote for editing.
    pub fn from_quote(quote: &Quote) -> Self {
        Self {
            client_id: Some(quote.client.client_id),
            expiration_date: quote.expiration_date,
            event_date: quote.event_date,
            items: quote.items.clone(),
            discount: quote.discount,
            notes: quote.notes.clone().unwrap_or_default(),
        }
    }

    pub fn client_id(&self) -> Option<ClientId> {
        self.client_id
    }

    pub fn expiration_date(&self) -> NaiveDate {
        self.expiration_date
    }

    pub fn event_date(&self) -> Option<NaiveDate> {
        self.event_date
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn discount(&self) -> Amount {
        self.discount
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn select_client(&mut self, client_id: ClientId) {
        self.client_id = Some(client_id);
    }

    pub fn set_expiration_date(&mut self, date: NaiveDate) {
        self.expiration_date = date;
    }

    pub fn set_event_date(&mut self, date: Option<NaiveDate>) {
        self.event_date = date;
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    /// Append a line. Field values are not checked until save.
    pub fn add_item(&mut self, item: LineItem) {
        tracing::debug!(position = self.items.len(), name = %item.service_name, "line added");
        self.items.push(item);
    }

    pub fn add_blank_item(&mut self) {
        self.add_item(LineItem::blank());
    }

    pub fn add_item_from_catalog(&mut self, entry: &ServiceCatalogEntry) {
        self.add_item(LineItem::from_catalog(entry));
    }

    /// Replace one field of the line at `index`.
    pub fn update_item(&mut self, index: usize, update: ItemUpdate) -> Result<(), DraftError> {
        let len = self.items.len();
        let item = self
            .items
            .get_mut(index)
            .ok_or(DraftError::IndexOutOfRange { index, len })?;

        tracing::debug!(index, field = %update.field(), "line updated");
        item.apply(update);
        Ok(())
    }

    /// Same as [`QuoteDraft::update_item`] from raw form text;
    /// unparseable numbers are stored as zero.
    pub fn update_item_from_input(
        &mut self,
        index: usize,
        field: ItemField,
        raw: &str,
    ) -> Result<(), DraftError> {
        self.update_item(index, field.coerce(raw))
    }

    /// Remove the line at `index`; later lines shift down by one.
    pub fn remove_item(&mut self, index: usize) -> Result<LineItem, DraftError> {
        if index >= self.items.len() {
            return Err(DraftError::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        tracing::debug!(index, "line removed");
        Ok(self.items.remove(index))
    }

    pub fn set_discount(&mut self, amount: Amount) {
        self.discount = amount;
    }

    pub fn set_discount_from_input(&mut self, raw: &str) {
        self.set_discount(coerce_amount(raw));
    }

    pub fn compute_totals(&self) -> QuoteTotals {
        compute_totals(&self.items, self.discount)
    }

    pub fn to_payload(&self) -> QuotePayload {
        QuotePayload {
            client_id: self.client_id,
            expiration_date: self.expiration_date,
            event_date: self.event_date,
            items: self.items.clone(),
            discount: self.discount,
            notes: if self.notes.trim().is_empty() {
                None
            } else {
                Some(self.notes.clone())
            },
        }
    }
}
