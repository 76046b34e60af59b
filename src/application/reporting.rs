use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Amount, Invoice, InvoiceStatus, QuoteStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_quotes: i64,
    pub draft_quotes: i64,
    pub sent_quotes: i64,
    pub accepted_quotes: i64,
    pub refused_quotes: i64,
    pub total_invoices: i64,
    pub pending_invoices: i64,
    pub paid_invoices: i64,
    /// Sum of TTC over paid invoices.
    pub revenue: Amount,
    /// Accepted / total quotes, as a percentage with one decimal.
    pub conversion_rate: f64,
    pub total_clients: i64,
    pub total_services: i64,
}

/// Accepted share of all quotes in percent, rounded to one decimal.
pub fn conversion_rate(accepted: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let rate = accepted as f64 / total as f64 * 100.0;
    (rate * 10.0).round() / 10.0
}

pub fn build_dashboard_stats(
    quote_counts: &HashMap<QuoteStatus, i64>,
    invoices: &[Invoice],
    total_clients: i64,
    total_services: i64,
) -> DashboardStats {
    let count = |status: QuoteStatus| quote_counts.get(&status).copied().unwrap_or(0);
    let total_quotes: i64 = quote_counts.values().sum();
    let accepted_quotes = count(QuoteStatus::Accepted);

    let paid: Vec<&Invoice> = invoices
        .iter()
        .filter(|i| i.status == InvoiceStatus::Paid)
        .collect();
    let revenue = paid
        .iter()
        .fold(Decimal::ZERO, |acc, i| acc.saturating_add(i.totals.total_incl_tax));

    DashboardStats {
        total_quotes,
        draft_quotes: count(QuoteStatus::Draft),
        sent_quotes: count(QuoteStatus::Sent),
        accepted_quotes,
        refused_quotes: count(QuoteStatus::Refused),
        total_invoices: invoices.len() as i64,
        pending_invoices: invoices
            .iter()
            .filter(|i| i.status == InvoiceStatus::Pending)
            .count() as i64,
        paid_invoices: paid.len() as i64,
        revenue,
        conversion_rate: conversion_rate(accepted_quotes, total_quotes),
        total_clients,
        total_services,
    }
}
