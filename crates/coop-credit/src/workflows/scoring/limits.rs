use super::CreditScoreFactors;

/// Minimum composite score at which pay-later credit is extended.
pub const MINIMUM_ELIGIBLE_SCORE: u16 = 580;

/// Months of membership at which the duration factor saturates.
const DURATION_SATURATION_MONTHS: f64 = 24.0;

const SAVINGS_WEIGHT: f64 = 0.30;
const REPAYMENT_WEIGHT: f64 = 0.40;
const CONSISTENCY_WEIGHT: f64 = 0.20;
const DURATION_WEIGHT: f64 = 0.10;

/// Weighted composite of the four factors, mapped from the 0-100 working
/// range onto the conventional 300-850 scale.
pub(crate) fn composite_score(factors: &CreditScoreFactors) -> u16 {
    let duration = (f64::from(factors.membership_duration_months) / DURATION_SATURATION_MONTHS)
        .min(1.0)
        * 100.0;

    let weighted = f64::from(factors.savings_history) * SAVINGS_WEIGHT
        + f64::from(factors.loan_repayment_history) * REPAYMENT_WEIGHT
        + f64::from(factors.transaction_consistency) * CONSISTENCY_WEIGHT
        + duration * DURATION_WEIGHT;

    (300.0 + weighted / 100.0 * 550.0).round() as u16
}

/// Base limit for each score bucket, before the savings multiplier.
pub(crate) fn base_limit(score: u16) -> f64 {
    match score {
        0..=579 => 0.0,
        580..=669 => 500.0,
        670..=739 => 1000.0,
        740..=799 => 2000.0,
        _ => 5000.0,
    }
}

/// Final limit: the bucket base scaled by savings strength (1.0x-2.0x).
pub(crate) fn credit_limit(score: u16, savings_sub_score: u8) -> f64 {
    let multiplier = 1.0 + f64::from(savings_sub_score) / 100.0;
    (base_limit(score) * multiplier).round()
}

/// Payment terms (in months) offered at a given score.
pub(crate) fn allowed_terms(score: u16) -> Vec<u32> {
    match score {
        0..=579 => Vec::new(),
        580..=669 => vec![1],
        670..=739 => vec![1, 3],
        _ => vec![1, 3, 6],
    }
}
