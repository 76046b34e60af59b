use std::fmt;

use chrono::{Datelike, NaiveDate};

use crate::domain::{
    Amount, ClientSnapshot, CompanyProfile, LineItem, Quote, QuoteTotals, format_amount,
    format_quantity,
};

const RULE_WIDTH: usize = 78;

const MONTHS: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

/// Read-only view of a quote, borrowed from an editing session or a stored quote.
#[derive(Debug, Clone)]
pub struct QuotePreview<'a> {
    pub company: &'a CompanyProfile,
    /// None until the quote has been saved once.
    pub number: Option<&'a str>,
    pub issued_on: NaiveDate,
    pub expiration_date: NaiveDate,
    pub event_date: Option<NaiveDate>,
    pub client: Option<ClientSnapshot>,
    pub items: &'a [LineItem],
    pub discount: Amount,
    pub totals: QuoteTotals,
    pub notes: Option<&'a str>,
}

impl<'a> QuotePreview<'a> {
    pub fn from_quote(quote: &'a Quote, company: &'a CompanyProfile) -> Self {
        Self {
            company,
            number: Some(quote.number.as_str()),
            issued_on: quote.emission_date,
            expiration_date: quote.expiration_date,
            event_date: quote.event_date,
            client: Some(quote.client.clone()),
            items: &quote.items,
            discount: quote.discount,
            totals: quote.totals,
            notes: quote.notes.as_deref(),
        }
    }
}

/// "10 mai 2024"
pub fn format_long_date(date: NaiveDate) -> String {
    let month = MONTHS[date.month0() as usize];
    format!("{} {} {}", date.day(), month, date.year())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

impl fmt::Display for QuotePreview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);
        let thin = "-".repeat(RULE_WIDTH);
        let company = self.company;

        writeln!(f, "{}", company.name)?;
        for line in company.address.lines() {
            writeln!(f, "{}", line)?;
        }
        writeln!(f, "{} | {}", company.email, company.phone)?;
        writeln!(f, "{} - SIREN {}", company.legal_status, company.siren)?;
        writeln!(f, "{}", rule)?;

        match self.number {
            Some(number) => writeln!(f, "DEVIS {}", number)?,
            None => writeln!(f, "DEVIS (brouillon)")?,
        }
        writeln!(f, "Date: {}", format_long_date(self.issued_on))?;
        writeln!(
            f,
            "Valable jusqu'au: {}",
            format_long_date(self.expiration_date)
        )?;
        writeln!(f)?;

        writeln!(f, "Client:")?;
        match &self.client {
            Some(client) => {
                writeln!(f, "  {}", client.name)?;
                for line in client.address.lines() {
                    writeln!(f, "  {}", line)?;
                }
                if !client.email.is_empty() {
                    writeln!(f, "  {}", client.email)?;
                }
                if !client.phone.is_empty() {
                    writeln!(f, "  {}", client.phone)?;
                }
            }
            None => writeln!(f, "  (aucun client sélectionné)")?,
        }

        if let Some(event) = self.event_date {
            writeln!(f)?;
            writeln!(f, "Date de l'événement: {}", format_long_date(event))?;
        }
        writeln!(f)?;

        writeln!(
            f,
            "{:<30} {:>8} {:<9} {:>12} {:>5} {:>12}",
            "Prestation", "Qté", "Unité", "Prix HT", "TVA", "Total HT"
        )?;
        writeln!(f, "{}", thin)?;
        if self.items.is_empty() {
            writeln!(f, "(aucune ligne)")?;
        }
        for item in self.items {
            writeln!(
                f,
                "{:<30} {:>8} {:<9} {:>12} {:>4}% {:>12}",
                truncate(&item.service_name, 30),
                format_quantity(item.quantity),
                truncate(&item.unit, 9),
                format_amount(item.unit_price_excl_tax),
                format_quantity(item.tax_rate_percent),
                format_amount(item.amount_excl_tax()),
            )?;
        }
        writeln!(f, "{}", thin)?;

        let totals = &self.totals;
        writeln!(
            f,
            "{:>60} {:>17}",
            "Sous-total HT:",
            format_amount(totals.subtotal_before_discount)
        )?;
        if !self.discount.is_zero() {
            writeln!(f, "{:>60} {:>17}", "Remise:", format_amount(-self.discount))?;
        }
        writeln!(f, "{:>60} {:>17}", "Total HT:", format_amount(totals.subtotal_excl_tax))?;
        writeln!(f, "{:>60} {:>17}", "TVA:", format_amount(totals.total_tax))?;
        writeln!(f, "{:>60} {:>17}", "Total TTC:", format_amount(totals.total_incl_tax))?;

        if let Some(notes) = self.notes {
            writeln!(f)?;
            writeln!(f, "Notes:")?;
            for line in notes.lines() {
                writeln!(f, "  {}", line)?;
            }
        }

        writeln!(f, "{}", rule)?;
        writeln!(f, "Coordonnées bancaires: {}", company.bank_name)?;
        writeln!(f, "IBAN: {}  BIC: {}", company.iban, company.bic)?;
        write!(f, "TVA intracommunautaire: {}", company.vat_number)
    }
}
