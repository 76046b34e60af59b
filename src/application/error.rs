use thiserror::Error;

use crate::domain::DraftError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Client not found: {0}")]
    ClientNotFound(String),

    #[error("Client already exists: {0}")]
    ClientAlreadyExists(String),

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Service already exists: {0}")]
    ServiceAlreadyExists(String),

    #[error("Invalid service: {0}")]
    InvalidService(String),

    #[error("Quote not found: {0}")]
    QuoteNotFound(String),

    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    #[error("Please select a client before saving the quote")]
    MissingClient,

    #[error("Please add at least one line before saving the quote")]
    EmptyQuote,

    #[error("Quote {quote} was already converted into invoice {invoice}")]
    AlreadyInvoiced { quote: String, invoice: String },

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error(transparent)]
    Draft(#[from] DraftError),

    /// The store rejected a save. The draft is left untouched so it can be retried.
    #[error("Could not save the quote: {0}")]
    PersistenceFailure(anyhow::Error),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
