use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};

use super::ledger::{LoanPaymentRecord, SavingsTransaction, TransactionKind};

/// Neutral sub-score applied where a member has no usable history, so new
/// members are neither rewarded nor penalized.
pub(crate) const NEUTRAL_SCORE: u8 = 50;

/// Savings sub-score: deposit volume (1 point per 1000, capped at 80) plus
/// deposit cadence (2 points per deposit, capped at 20).
pub(crate) fn savings_score(transactions: &[SavingsTransaction]) -> u8 {
    if transactions.is_empty() {
        return 0;
    }

    let mut total_deposits = 0.0;
    let mut deposit_count = 0u32;
    for transaction in transactions {
        if transaction.kind == TransactionKind::Deposit {
            total_deposits += transaction.amount;
            deposit_count += 1;
        }
    }

    let volume = (total_deposits / 1000.0).min(80.0);
    let cadence = f64::from(deposit_count * 2).min(20.0);
    ((volume + cadence).round() as u8).min(100)
}

/// Repayment sub-score: share of on-time payments. No history scores neutral.
pub(crate) fn repayment_score(payments: &[LoanPaymentRecord]) -> u8 {
    if payments.is_empty() {
        return NEUTRAL_SCORE;
    }

    let on_time = payments.iter().filter(|payment| !payment.is_late).count();
    ((on_time as f64 / payments.len() as f64) * 100.0).round() as u8
}

/// Consistency sub-score: coefficient of variation of monthly transaction
/// counts, inverted so steadier activity scores higher. Fewer than two active
/// months is neutral; no activity at all scores zero.
pub(crate) fn consistency_score(transactions: &[SavingsTransaction]) -> u8 {
    if transactions.is_empty() {
        return 0;
    }

    let monthly = monthly_activity(transactions);
    if monthly.len() < 2 {
        return NEUTRAL_SCORE;
    }

    let counts: Vec<f64> = monthly.values().map(|count| f64::from(*count)).collect();
    let mean = counts.iter().sum::<f64>() / counts.len() as f64;
    let variance = counts
        .iter()
        .map(|count| (count - mean).powi(2))
        .sum::<f64>()
        / counts.len() as f64;
    let coefficient = variance.sqrt() / mean;

    (100.0 - (coefficient * 100.0).min(50.0)).round() as u8
}

/// Whole calendar months between joining and `as_of`, clamped at zero.
pub(crate) fn membership_months(joined_at: DateTime<Utc>, as_of: DateTime<Utc>) -> u32 {
    let months = (as_of.year() - joined_at.year()) * 12 + as_of.month() as i32
        - joined_at.month() as i32;
    months.max(0) as u32
}

fn monthly_activity(transactions: &[SavingsTransaction]) -> BTreeMap<(i32, u32), u32> {
    let mut monthly = BTreeMap::new();
    for transaction in transactions {
        let key = (transaction.posted_at.year(), transaction.posted_at.month());
        *monthly.entry(key).or_insert(0) += 1;
    }
    monthly
}
