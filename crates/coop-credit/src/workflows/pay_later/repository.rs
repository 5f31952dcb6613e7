use chrono::{DateTime, NaiveDate, Utc};

use super::domain::{ApplicationId, InstallmentId, InstallmentRecord, PayLaterApplication};
use crate::workflows::amortization::PaymentSchedule;
use crate::workflows::scoring::{LoanPaymentRecord, MemberId};

/// Details stamped onto an installment when a capture settles.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementReceipt {
    pub paid_on: DateTime<Utc>,
    pub payment_method: String,
    pub transaction_ref: String,
}

/// Storage abstraction for applications and their installments.
///
/// The transition methods are conditional updates: implementations must gate
/// the write on the current status (compare-and-swap, not read-then-write) so
/// concurrent approvals or payments cannot both succeed.
pub trait CreditStore: Send + Sync {
    fn insert_application(
        &self,
        application: PayLaterApplication,
    ) -> Result<PayLaterApplication, StoreError>;
    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<PayLaterApplication>, StoreError>;
    /// Transition Pending -> Approved and persist the schedule's installment
    /// rows in one step. Any other starting status is an invalid transition.
    fn approve_application(
        &self,
        id: &ApplicationId,
        schedule: PaymentSchedule,
    ) -> Result<PayLaterApplication, StoreError>;
    fn applications_for(&self, member: &MemberId) -> Result<Vec<PayLaterApplication>, StoreError>;

    fn fetch_installment(&self, id: &InstallmentId)
        -> Result<Option<InstallmentRecord>, StoreError>;
    fn installments_for(
        &self,
        application: &ApplicationId,
    ) -> Result<Vec<InstallmentRecord>, StoreError>;
    /// Transition Pending/Scheduled/Overdue -> Paid, stamping the receipt.
    fn mark_installment_paid(
        &self,
        id: &InstallmentId,
        receipt: SettlementReceipt,
    ) -> Result<InstallmentRecord, StoreError>;
    /// Transition Pending/Scheduled -> Cancelled.
    fn cancel_installment(&self, id: &InstallmentId) -> Result<InstallmentRecord, StoreError>;
    /// Sweep Pending/Scheduled installments due strictly before `as_of` to
    /// Overdue, returning the rows that changed.
    fn mark_overdue(&self, as_of: NaiveDate) -> Result<Vec<InstallmentRecord>, StoreError>;

    fn record_payment(&self, entry: LoanPaymentRecord) -> Result<(), StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("{entity} is {found}; transition rejected")]
    InvalidTransition {
        entity: &'static str,
        found: &'static str,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Capability interface for the external payment processor. The workflow only
/// needs a single capture primitive; adapters own connection details and the
/// capture timeout, surfacing [`CaptureError::Timeout`] instead of hanging.
pub trait PaymentGateway: Send + Sync {
    fn capture(&self, amount: f64, method: &str) -> Result<CaptureReceipt, CaptureError>;
}

/// Processor acknowledgement for a settled capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureReceipt {
    pub reference: String,
}

/// Capture failures. All variants are retryable from the workflow's point of
/// view; callers should check final installment state before retrying after a
/// timeout, since the capture may have partially succeeded.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture declined: {0}")]
    Declined(String),
    #[error("capture timed out")]
    Timeout,
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}
