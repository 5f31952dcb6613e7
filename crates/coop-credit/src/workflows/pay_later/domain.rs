use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::amortization::{Installment, InstallmentStatus, PaymentSchedule};
use crate::workflows::scoring::MemberId;

/// Identifier wrapper for pay-later applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for persisted installments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstallmentId(pub String);

/// High level status tracked throughout the pay-later workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

/// Inbound request to open a pay-later plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRequest {
    pub member_id: MemberId,
    pub amount: f64,
    pub term_months: u32,
    pub purpose: String,
}

/// A member's pay-later application. The schedule is attached on approval and
/// never regenerated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayLaterApplication {
    pub id: ApplicationId,
    pub member_id: MemberId,
    pub amount: f64,
    pub term_months: u32,
    pub purpose: String,
    pub status: ApplicationStatus,
    pub schedule: Option<PaymentSchedule>,
    pub created_at: DateTime<Utc>,
}

impl PayLaterApplication {
    pub fn status_view(&self) -> ApplicationView {
        ApplicationView {
            application_id: self.id.clone(),
            member_id: self.member_id.clone(),
            status: self.status.label(),
            amount: self.amount,
            term_months: self.term_months,
            monthly_payment: self
                .schedule
                .as_ref()
                .map(|schedule| schedule.monthly_payment),
        }
    }
}

/// Sanitized representation of an application's exposed status.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationView {
    pub application_id: ApplicationId,
    pub member_id: MemberId,
    pub status: &'static str,
    pub amount: f64,
    pub term_months: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_payment: Option<f64>,
}

/// Persisted installment row, carrying its plan position plus foreign keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentRecord {
    pub id: InstallmentId,
    pub application_id: ApplicationId,
    pub member_id: MemberId,
    pub installment: Installment,
}

/// Eligibility decision handed to intake callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilitySnapshot {
    pub eligible: bool,
    pub score: u16,
    pub credit_limit: f64,
    pub allowed_terms: Vec<u32>,
}

/// Structured result of a payment or cancellation attempt. Capture failures
/// are an expected outcome, not an exception, so they surface here with
/// `success: false` and the installment left untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub success: bool,
    pub status: InstallmentStatus,
    pub message: String,
}
