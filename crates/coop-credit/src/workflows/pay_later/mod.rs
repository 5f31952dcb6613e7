//! Pay-later intake, approval, and installment settlement workflow.
//!
//! The service facade composes three injected collaborators: the member
//! ledger read by the scoring engine, the credit store holding applications
//! and installments, and the payment gateway performing captures. All state
//! transitions are gated in the store so concurrent approvals or captures
//! cannot both land.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicationId, ApplicationRequest, ApplicationStatus, ApplicationView, EligibilitySnapshot,
    InstallmentId, InstallmentRecord, PayLaterApplication, PaymentOutcome,
};
pub use repository::{
    CaptureError, CaptureReceipt, CreditStore, PaymentGateway, SettlementReceipt, StoreError,
};
pub use router::credit_router;
pub use service::{rate_for_term, PayLaterError, PayLaterService};
