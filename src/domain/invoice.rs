use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Amount, ClientSnapshot, LineItem, Quote, QuoteId, QuoteTotals};

pub type InvoiceId = Uuid;

/// Days between emission and due date.
pub const PAYMENT_TERM_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvoiceStatus {
    #[serde(rename = "en attente")]
    Pending,
    #[serde(rename = "payée")]
    Paid,
    #[serde(rename = "annulée")]
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "en attente",
            InvoiceStatus::Paid => "payée",
            InvoiceStatus::Cancelled => "annulée",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "en attente" | "pending" => Some(InvoiceStatus::Pending),
            "payée" | "payee" | "paid" => Some(InvoiceStatus::Paid),
            "annulée" | "annulee" | "cancelled" | "canceled" => Some(InvoiceStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// An invoice issued from an accepted quote. Lines and totals are copied
/// from the quote at conversion time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    #[serde(rename = "invoice_number")]
    pub number: String,
    pub quote_id: QuoteId,
    pub client: ClientSnapshot,
    pub emission_date: NaiveDate,
    pub due_date: NaiveDate,
    pub items: Vec<LineItem>,
    pub discount: Amount,
    pub totals: QuoteTotals,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    pub fn from_quote(quote: &Quote, number: String, emission_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            number,
            quote_id: quote.id,
            client: quote.client.clone(),
            emission_date,
            due_date: emission_date + Duration::days(PAYMENT_TERM_DAYS),
            items: quote.items.clone(),
            discount: quote.discount,
            totals: quote.totals,
            status: InvoiceStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == InvoiceStatus::Pending && today > self.due_date
    }
}

/// "F-2024-003": yearly prefix plus a per-owner running count.
pub fn format_invoice_number(year: i32, sequence: i64) -> String {
    format!("F-{}-{:03}", year, sequence)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::{QuotePayload, QuoteStatus};

    #[test]
    fn test_status_display_honours_width() {
        assert_eq!(format!("[{:<11}]", InvoiceStatus::Paid), "[payée      ]");
        assert_eq!(format!("{:>10}", InvoiceStatus::Pending), "en attente");
    }

    fn accepted_quote() -> Quote {
        let payload = QuotePayload {
            client_id: None,
            expiration_date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            event_date: None,
            items: vec![LineItem::new(
                "Vidéo",
                Decimal::ONE,
                "forfait",
                Decimal::new(1200, 0),
                Decimal::new(20, 0),
            )],
            discount: Decimal::new(200, 0),
            notes: None,
        };
        let client = ClientSnapshot {
            client_id: Uuid::new_v4(),
            name: "Léa".into(),
            email: "lea@example.com".into(),
            address: "Aix".into(),
            phone: "0700000000".into(),
        };
        let mut quote = Quote::from_payload(
            "D-2024-001".into(),
            client,
            &payload,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        );
        quote.set_status(QuoteStatus::Accepted);
        quote
    }

    #[test]
    fn test_invoice_copies_quote() {
        let quote = accepted_quote();
        let emission = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let invoice = Invoice::from_quote(&quote, "F-2024-001".into(), emission);

        assert_eq!(invoice.quote_id, quote.id);
        assert_eq!(invoice.totals, quote.totals);
        assert_eq!(invoice.totals.total_incl_tax, Decimal::new(1240, 0));
        assert_eq!(invoice.status, InvoiceStatus::Pending);
        assert_eq!(invoice.due_date, NaiveDate::from_ymd_opt(2024, 7, 15).unwrap());
    }

    #[test]
    fn test_overdue_only_when_pending() {
        let quote = accepted_quote();
        let emission = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let mut invoice = Invoice::from_quote(&quote, "F-2024-001".into(), emission);
        let later = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();

        assert!(invoice.is_overdue(later));
        invoice.status = InvoiceStatus::Paid;
        assert!(!invoice.is_overdue(later));
    }

    #[test]
    fn test_invoice_status_roundtrip() {
        for status in [
            InvoiceStatus::Pending,
            InvoiceStatus::Paid,
            InvoiceStatus::Cancelled,
        ] {
            assert_eq!(InvoiceStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(format_invoice_number(2024, 3), "F-2024-003");
    }
}
