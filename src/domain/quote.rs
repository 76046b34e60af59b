use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Amount, ClientSnapshot, LineItem, QuotePayload, QuoteTotals, compute_totals};

pub type QuoteId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuoteStatus {
    /// Saved but not yet sent to the client
    #[serde(rename = "brouillon")]
    Draft,
    #[serde(rename = "envoyé")]
    Sent,
    #[serde(rename = "accepté")]
    Accepted,
    #[serde(rename = "refusé")]
    Refused,
}

impl QuoteStatus {
    pub const ALL: [QuoteStatus; 4] = [
        QuoteStatus::Draft,
        QuoteStatus::Sent,
        QuoteStatus::Accepted,
        QuoteStatus::Refused,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Draft => "brouillon",
            QuoteStatus::Sent => "envoyé",
            QuoteStatus::Accepted => "accepté",
            QuoteStatus::Refused => "refusé",
        }
    }

    /// Accepts the stored labels and their English equivalents.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "brouillon" | "draft" => Some(QuoteStatus::Draft),
            "envoyé" | "envoye" | "sent" => Some(QuoteStatus::Sent),
            "accepté" | "accepte" | "accepted" => Some(QuoteStatus::Accepted),
            "refusé" | "refuse" | "refused" => Some(QuoteStatus::Refused),
            _ => None,
        }
    }
}

impl std::fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A persisted quote. Totals are stored alongside the lines as they were
/// computed at save time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    #[serde(rename = "quote_number")]
    pub number: String,
    pub status: QuoteStatus,
    pub client: ClientSnapshot,
    pub emission_date: NaiveDate,
    pub expiration_date: NaiveDate,
    pub event_date: Option<NaiveDate>,
    pub items: Vec<LineItem>,
    pub discount: Amount,
    pub totals: QuoteTotals,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl Quote {
    /// Build a new quote from a saved draft. Number is assigned by the store.
    pub fn from_payload(
        number: String,
        client: ClientSnapshot,
        payload: &QuotePayload,
        emission_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            number,
            status: QuoteStatus::Draft,
            client,
            emission_date,
            expiration_date: payload.expiration_date,
            event_date: payload.event_date,
            items: payload.items.clone(),
            discount: payload.discount,
            totals: compute_totals(&payload.items, payload.discount),
            notes: payload.notes.clone(),
            created_at: Utc::now(),
            sent_at: None,
        }
    }

    /// Overwrite the editable content and recompute totals.
    pub fn apply_payload(&mut self, client: ClientSnapshot, payload: &QuotePayload) {
        self.client = client;
        self.expiration_date = payload.expiration_date;
        self.event_date = payload.event_date;
        self.items = payload.items.clone();
        self.discount = payload.discount;
        self.totals = compute_totals(&payload.items, payload.discount);
        self.notes = payload.notes.clone();
    }

    pub fn set_status(&mut self, status: QuoteStatus) {
        if status == QuoteStatus::Sent && self.sent_at.is_none() {
            self.sent_at = Some(Utc::now());
        }
        self.status = status;
    }
}

/// "D-2024-007": yearly prefix plus a per-owner running count.
pub fn format_quote_number(year: i32, sequence: i64) -> String {
    format!("D-{}-{:03}", year, sequence)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_status_display_honours_width() {
        assert_eq!(format!("[{:<10}]", QuoteStatus::Sent), "[envoyé    ]");
        assert_eq!(format!("{}", QuoteStatus::Accepted), "accepté");
    }

    fn snapshot() -> ClientSnapshot {
        ClientSnapshot {
            client_id: Uuid::new_v4(),
            name: "Camille & Hugo".into(),
            email: "camille@example.com".into(),
            address: "Marseille".into(),
            phone: "0600000000".into(),
        }
    }

    fn payload() -> QuotePayload {
        QuotePayload {
            client_id: None,
            expiration_date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            event_date: None,
            items: vec![LineItem::new(
                "Reportage",
                Decimal::new(2, 0),
                "heure",
                Decimal::new(100, 0),
                Decimal::new(20, 0),
            )],
            discount: Decimal::ZERO,
            notes: None,
        }
    }

    #[test]
    fn test_quote_status_roundtrip() {
        for status in QuoteStatus::ALL {
            assert_eq!(QuoteStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(QuoteStatus::from_str("SENT"), Some(QuoteStatus::Sent));
        assert_eq!(QuoteStatus::from_str("archived"), None);
    }

    #[test]
    fn test_format_quote_number() {
        assert_eq!(format_quote_number(2024, 7), "D-2024-007");
        assert_eq!(format_quote_number(2025, 1234), "D-2025-1234");
    }

    #[test]
    fn test_from_payload_computes_totals() {
        let quote = Quote::from_payload(
            "D-2024-001".into(),
            snapshot(),
            &payload(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        );

        assert_eq!(quote.status, QuoteStatus::Draft);
        assert_eq!(quote.totals.total_incl_tax, Decimal::new(240, 0));
    }

    #[test]
    fn test_sent_status_stamps_once() {
        let mut quote = Quote::from_payload(
            "D-2024-001".into(),
            snapshot(),
            &payload(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        );
        assert!(quote.sent_at.is_none());

        quote.set_status(QuoteStatus::Sent);
        let first = quote.sent_at;
        assert!(first.is_some());

        quote.set_status(QuoteStatus::Sent);
        assert_eq!(quote.sent_at, first);
    }
}
