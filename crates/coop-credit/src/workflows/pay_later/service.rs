use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use super::domain::{
    ApplicationId, ApplicationRequest, ApplicationStatus, EligibilitySnapshot, InstallmentId,
    InstallmentRecord, PayLaterApplication, PaymentOutcome,
};
use super::repository::{CreditStore, PaymentGateway, SettlementReceipt, StoreError};
use crate::workflows::amortization::{
    InstallmentStatus, InvalidLoanTermsError, LoanTerms, PaymentSchedule,
};
use crate::workflows::scoring::{
    CreditScoringEngine, LoanPaymentRecord, MemberId, MemberLedger, PaymentStatus, ScoringError,
    MINIMUM_ELIGIBLE_SCORE,
};

/// Payment method recorded for gateway-driven installment captures.
const AUTOMATIC_METHOD: &str = "automatic";

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("pl-{id:06}"))
}

/// Annualized interest rate offered for a given plan length.
pub fn rate_for_term(term_months: u32) -> f64 {
    match term_months {
        1 => 0.08,
        3 => 0.10,
        6 => 0.12,
        _ => 0.15,
    }
}

/// Service composing the scoring engine, credit store, and payment gateway
/// into the pay-later application workflow.
pub struct PayLaterService<L, S, G> {
    scoring: CreditScoringEngine<L>,
    store: Arc<S>,
    gateway: Arc<G>,
}

impl<L, S, G> PayLaterService<L, S, G>
where
    L: MemberLedger + 'static,
    S: CreditStore + 'static,
    G: PaymentGateway + 'static,
{
    pub fn new(ledger: Arc<L>, store: Arc<S>, gateway: Arc<G>) -> Self {
        Self {
            scoring: CreditScoringEngine::new(ledger),
            store,
            gateway,
        }
    }

    /// Score the member and gate on the eligibility floor.
    pub fn check_eligibility(
        &self,
        member: &MemberId,
        as_of: DateTime<Utc>,
    ) -> Result<EligibilitySnapshot, PayLaterError> {
        let result = self.scoring.calculate(member, as_of)?;
        Ok(EligibilitySnapshot {
            eligible: result.score >= MINIMUM_ELIGIBLE_SCORE,
            score: result.score,
            credit_limit: result.credit_limit,
            allowed_terms: result.allowed_terms,
        })
    }

    /// Validate eligibility and limit, then persist a Pending application.
    pub fn create_application(
        &self,
        request: ApplicationRequest,
        as_of: DateTime<Utc>,
    ) -> Result<PayLaterApplication, PayLaterError> {
        let eligibility = self.check_eligibility(&request.member_id, as_of)?;
        if !eligibility.eligible {
            return Err(PayLaterError::NotEligible {
                score: eligibility.score,
            });
        }
        if request.amount > eligibility.credit_limit {
            return Err(PayLaterError::LimitExceeded {
                requested: request.amount,
                limit: eligibility.credit_limit,
            });
        }

        let application = PayLaterApplication {
            id: next_application_id(),
            member_id: request.member_id,
            amount: request.amount,
            term_months: request.term_months,
            purpose: request.purpose,
            status: ApplicationStatus::Pending,
            schedule: None,
            created_at: as_of,
        };

        let stored = self.store.insert_application(application)?;
        info!(application = %stored.id.0, member = %stored.member_id.0, "pay-later application created");
        Ok(stored)
    }

    /// Generate the installment plan and transition the application to
    /// Approved. Re-approving is rejected; the schedule is generated exactly
    /// once per application.
    pub fn approve_application(
        &self,
        id: &ApplicationId,
        today: NaiveDate,
    ) -> Result<PayLaterApplication, PayLaterError> {
        let application = self
            .store
            .fetch_application(id)?
            .ok_or(StoreError::NotFound)?;

        if application.status != ApplicationStatus::Pending {
            return Err(PayLaterError::InvalidState {
                entity: "application",
                found: application.status.label(),
            });
        }

        let terms = LoanTerms {
            principal: application.amount,
            annual_rate: rate_for_term(application.term_months),
            term_months: application.term_months,
        };
        let schedule = PaymentSchedule::build(terms, today)?;

        let approved = match self.store.approve_application(id, schedule) {
            Ok(approved) => approved,
            Err(StoreError::InvalidTransition { entity, found }) => {
                return Err(PayLaterError::InvalidState { entity, found })
            }
            Err(other) => return Err(other.into()),
        };
        info!(
            application = %approved.id.0,
            term_months = approved.term_months,
            "pay-later application approved"
        );
        Ok(approved)
    }

    /// Capture one installment through the gateway and settle it.
    ///
    /// A capture failure is an expected outcome: the installment is left
    /// untouched and a retryable `success: false` result is returned. The
    /// follow-up payment-history append is best-effort.
    pub fn process_scheduled_payment(
        &self,
        id: &InstallmentId,
        now: DateTime<Utc>,
    ) -> Result<PaymentOutcome, PayLaterError> {
        let record = self
            .store
            .fetch_installment(id)?
            .ok_or(StoreError::NotFound)?;

        let was_overdue = match record.installment.status {
            InstallmentStatus::Pending | InstallmentStatus::Scheduled => false,
            InstallmentStatus::Overdue => true,
            other => {
                return Err(PayLaterError::InvalidState {
                    entity: "installment",
                    found: other.label(),
                })
            }
        };

        let receipt = match self
            .gateway
            .capture(record.installment.total_payment, AUTOMATIC_METHOD)
        {
            Ok(receipt) => receipt,
            Err(err) => {
                warn!(installment = %id.0, error = %err, "installment capture failed");
                return Ok(PaymentOutcome {
                    success: false,
                    status: record.installment.status,
                    message: "Payment processing failed. Please try again.".to_string(),
                });
            }
        };

        let settlement = SettlementReceipt {
            paid_on: now,
            payment_method: AUTOMATIC_METHOD.to_string(),
            transaction_ref: receipt.reference.clone(),
        };
        let settled = match self.store.mark_installment_paid(id, settlement) {
            Ok(settled) => settled,
            Err(StoreError::InvalidTransition { entity, found }) => {
                return Err(PayLaterError::InvalidState { entity, found })
            }
            Err(other) => return Err(other.into()),
        };

        let entry = LoanPaymentRecord {
            member_id: settled.member_id.clone(),
            amount: settled.installment.total_payment,
            paid_on: now,
            is_late: was_overdue,
            status: PaymentStatus::Completed,
            payment_method: AUTOMATIC_METHOD.to_string(),
            installment_number: Some(settled.installment.number),
            transaction_ref: Some(receipt.reference),
        };
        if let Err(err) = self.store.record_payment(entry) {
            warn!(installment = %id.0, error = %err, "payment history append failed");
        }

        Ok(PaymentOutcome {
            success: true,
            status: InstallmentStatus::Paid,
            message: "Payment processed successfully.".to_string(),
        })
    }

    /// Cancel an installment that has not settled yet.
    pub fn cancel_scheduled_payment(
        &self,
        id: &InstallmentId,
    ) -> Result<PaymentOutcome, PayLaterError> {
        let cancelled = match self.store.cancel_installment(id) {
            Ok(cancelled) => cancelled,
            Err(StoreError::InvalidTransition { entity, found }) => {
                return Err(PayLaterError::InvalidState { entity, found })
            }
            Err(other) => return Err(other.into()),
        };

        Ok(PaymentOutcome {
            success: true,
            status: cancelled.installment.status,
            message: "Payment cancelled successfully.".to_string(),
        })
    }

    /// Time-based sweep flagging past-due installments as Overdue. The
    /// trigger is external (CLI, cron); the service only applies the
    /// transition.
    pub fn mark_overdue(&self, as_of: NaiveDate) -> Result<Vec<InstallmentRecord>, PayLaterError> {
        let flagged = self.store.mark_overdue(as_of)?;
        if !flagged.is_empty() {
            info!(count = flagged.len(), %as_of, "installments flagged overdue");
        }
        Ok(flagged)
    }

    /// Fetch one application for API responses.
    pub fn application(&self, id: &ApplicationId) -> Result<PayLaterApplication, PayLaterError> {
        Ok(self
            .store
            .fetch_application(id)?
            .ok_or(StoreError::NotFound)?)
    }

    /// All applications submitted by a member, for portal listings.
    pub fn applications_for(
        &self,
        member: &MemberId,
    ) -> Result<Vec<PayLaterApplication>, PayLaterError> {
        Ok(self.store.applications_for(member)?)
    }

    /// The persisted installment rows of one application, in plan order.
    pub fn installments_for(
        &self,
        application: &ApplicationId,
    ) -> Result<Vec<InstallmentRecord>, PayLaterError> {
        Ok(self.store.installments_for(application)?)
    }
}

/// Error raised by the pay-later workflow.
#[derive(Debug, thiserror::Error)]
pub enum PayLaterError {
    #[error("member is not eligible for pay later (score {score})")]
    NotEligible { score: u16 },
    #[error("requested amount {requested:.2} exceeds credit limit {limit:.2}")]
    LimitExceeded { requested: f64, limit: f64 },
    #[error(transparent)]
    InvalidTerms(#[from] InvalidLoanTermsError),
    #[error("{entity} is {found}; operation rejected")]
    InvalidState {
        entity: &'static str,
        found: &'static str,
    },
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
