mod factors;
mod ledger;
mod limits;


pub use ledger::{
    CreditScoreSnapshot, LedgerError, LoanPaymentRecord, MemberAccount, MemberId, MemberLedger,
    PaymentStatus, SavingsTransaction, TransactionKind,
};
pub use limits::MINIMUM_ELIGIBLE_SCORE;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Behavioral sub-scores feeding the composite score. Recomputed per scoring
/// run; only the derived snapshot is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditScoreFactors {
    pub savings_history: u8,
    pub loan_repayment_history: u8,
    pub transaction_consistency: u8,
    pub membership_duration_months: u32,
}

/// Outcome of one scoring run for a member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditScoreResult {
    pub member_id: MemberId,
    pub score: u16,
    pub credit_limit: f64,
    pub allowed_terms: Vec<u32>,
    pub factors: CreditScoreFactors,
    pub computed_at: DateTime<Utc>,
}

/// Error raised by a scoring run.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Derives a member's composite credit score, limit, and allowed payment
/// terms from their transaction and repayment history.
pub struct CreditScoringEngine<L> {
    ledger: Arc<L>,
}

impl<L> CreditScoringEngine<L>
where
    L: MemberLedger,
{
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    /// Score `member` from their history as of `as_of`.
    ///
    /// Read failures propagate; a member with no rows at all still scores via
    /// the zero/neutral defaults. The snapshot write-back onto the member
    /// record is best-effort: a failure is logged and the computed result is
    /// returned regardless, since the reads already succeeded.
    pub fn calculate(
        &self,
        member: &MemberId,
        as_of: DateTime<Utc>,
    ) -> Result<CreditScoreResult, ScoringError> {
        let savings = self.ledger.savings_transactions(member)?;
        let payments = self.ledger.loan_payments(member)?;
        let account = self.ledger.member_account(member)?;

        let joined_at = account.map(|account| account.joined_at).unwrap_or(as_of);
        let factors = CreditScoreFactors {
            savings_history: factors::savings_score(&savings),
            loan_repayment_history: factors::repayment_score(&payments),
            transaction_consistency: factors::consistency_score(&savings),
            membership_duration_months: factors::membership_months(joined_at, as_of),
        };

        let score = limits::composite_score(&factors);
        let credit_limit = limits::credit_limit(score, factors.savings_history);
        let allowed_terms = limits::allowed_terms(score);

        let snapshot = CreditScoreSnapshot {
            score,
            credit_limit,
            computed_at: as_of,
        };
        if let Err(err) = self.ledger.record_credit_score(member, snapshot) {
            warn!(member = %member.0, error = %err, "credit score write-back failed");
        }

        Ok(CreditScoreResult {
            member_id: member.clone(),
            score,
            credit_limit,
            allowed_terms,
            factors,
            computed_at: as_of,
        })
    }
}
