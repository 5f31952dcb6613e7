use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for cooperative members.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberId(pub String);

/// Direction of a savings transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

/// One row of a member's savings history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsTransaction {
    pub member_id: MemberId,
    pub amount: f64,
    pub kind: TransactionKind,
    pub posted_at: DateTime<Utc>,
}

/// Settlement state of a recorded loan payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Completed,
    Pending,
    Failed,
}

impl PaymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentStatus::Completed => "completed",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Failed => "failed",
        }
    }
}

/// One row of a member's loan repayment history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanPaymentRecord {
    pub member_id: MemberId,
    pub amount: f64,
    pub paid_on: DateTime<Utc>,
    pub is_late: bool,
    pub status: PaymentStatus,
    pub payment_method: String,
    pub installment_number: Option<u32>,
    pub transaction_ref: Option<String>,
}

/// Most recent scoring outcome persisted on the member record. Overwritten on
/// every recomputation, no history retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditScoreSnapshot {
    pub score: u16,
    pub credit_limit: f64,
    pub computed_at: DateTime<Utc>,
}

/// Membership record as exposed by the members table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberAccount {
    pub member_id: MemberId,
    pub joined_at: DateTime<Utc>,
    pub credit: Option<CreditScoreSnapshot>,
}

/// Read/write contract the scoring engine holds against member data, so the
/// engine can be exercised against in-memory fixtures.
pub trait MemberLedger: Send + Sync {
    fn savings_transactions(
        &self,
        member: &MemberId,
    ) -> Result<Vec<SavingsTransaction>, LedgerError>;
    fn loan_payments(&self, member: &MemberId) -> Result<Vec<LoanPaymentRecord>, LedgerError>;
    fn member_account(&self, member: &MemberId) -> Result<Option<MemberAccount>, LedgerError>;
    fn record_credit_score(
        &self,
        member: &MemberId,
        snapshot: CreditScoreSnapshot,
    ) -> Result<(), LedgerError>;
}

/// Data-access failures raised by a [`MemberLedger`] backend.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger read failed during {operation} for member {member}: {detail}")]
    ReadFailed {
        operation: &'static str,
        member: String,
        detail: String,
    },
    #[error("ledger write failed during {operation} for member {member}: {detail}")]
    WriteFailed {
        operation: &'static str,
        member: String,
        detail: String,
    },
}
