use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Immutable inputs to schedule generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: f64,
    /// Annual interest rate as a fraction (0.12 == 12%).
    pub annual_rate: f64,
    pub term_months: u32,
}

/// Validation errors for loan terms.
#[derive(Debug, thiserror::Error)]
pub enum InvalidLoanTermsError {
    #[error("principal must be positive, got {0}")]
    NonPositivePrincipal(f64),
    #[error("annual rate must lie in [0, 1), got {0}")]
    RateOutOfRange(f64),
    #[error("term must cover at least one month")]
    EmptyTerm,
    #[error("no calendar date {months} months after {start}")]
    DueDateOverflow { start: NaiveDate, months: u32 },
}

/// Lifecycle of a single installment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentStatus {
    Pending,
    Scheduled,
    Paid,
    Overdue,
    Cancelled,
}

impl InstallmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            InstallmentStatus::Pending => "pending",
            InstallmentStatus::Scheduled => "scheduled",
            InstallmentStatus::Paid => "paid",
            InstallmentStatus::Overdue => "overdue",
            InstallmentStatus::Cancelled => "cancelled",
        }
    }
}

/// One scheduled payment unit within a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub number: u32,
    pub due_date: NaiveDate,
    pub total_payment: f64,
    pub principal_portion: f64,
    pub interest_portion: f64,
    pub status: InstallmentStatus,
    pub paid_on: Option<DateTime<Utc>>,
    pub payment_method: Option<String>,
    pub transaction_ref: Option<String>,
}

/// Fixed-payment amortization plan derived from [`LoanTerms`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSchedule {
    pub terms: LoanTerms,
    pub monthly_payment: f64,
    pub total_payments: f64,
    pub total_interest: f64,
    pub first_due: NaiveDate,
    pub last_due: NaiveDate,
    pub installments: Vec<Installment>,
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn due_date(start: NaiveDate, months: u32) -> Result<NaiveDate, InvalidLoanTermsError> {
    start
        .checked_add_months(Months::new(months))
        .ok_or(InvalidLoanTermsError::DueDateOverflow { start, months })
}

impl PaymentSchedule {
    /// Build the installment plan for `terms`, with the first installment due
    /// one calendar month after `start_date`.
    ///
    /// Due dates keep the day-of-month of `start_date`, clamped to the end of
    /// shorter months. The final installment's principal portion absorbs the
    /// rounding residual so the principal portions sum exactly to the
    /// principal.
    pub fn build(terms: LoanTerms, start_date: NaiveDate) -> Result<Self, InvalidLoanTermsError> {
        if !terms.principal.is_finite() || terms.principal <= 0.0 {
            return Err(InvalidLoanTermsError::NonPositivePrincipal(terms.principal));
        }
        if !terms.annual_rate.is_finite() || terms.annual_rate < 0.0 || terms.annual_rate >= 1.0 {
            return Err(InvalidLoanTermsError::RateOutOfRange(terms.annual_rate));
        }
        if terms.term_months == 0 {
            return Err(InvalidLoanTermsError::EmptyTerm);
        }

        let monthly_rate = terms.annual_rate / 12.0;
        let raw_payment = if monthly_rate == 0.0 {
            terms.principal / f64::from(terms.term_months)
        } else {
            terms.principal * monthly_rate
                / (1.0 - (1.0 + monthly_rate).powi(-(terms.term_months as i32)))
        };
        let monthly_payment = round_cents(raw_payment);

        let mut installments = Vec::with_capacity(terms.term_months as usize);
        let mut remaining = terms.principal;
        let mut principal_allocated = 0.0;

        for number in 1..=terms.term_months {
            let interest_portion = round_cents(remaining * monthly_rate);
            let principal_portion = if number == terms.term_months {
                round_cents(terms.principal - principal_allocated)
            } else {
                round_cents(monthly_payment - interest_portion)
            };
            remaining -= principal_portion;
            principal_allocated = round_cents(principal_allocated + principal_portion);

            installments.push(Installment {
                number,
                due_date: due_date(start_date, number)?,
                total_payment: round_cents(principal_portion + interest_portion),
                principal_portion,
                interest_portion,
                status: InstallmentStatus::Pending,
                paid_on: None,
                payment_method: None,
                transaction_ref: None,
            });
        }

        let total_payments = round_cents(monthly_payment * f64::from(terms.term_months));
        let first_due = installments[0].due_date;
        let last_due = installments[installments.len() - 1].due_date;

        Ok(Self {
            terms,
            monthly_payment,
            total_payments,
            total_interest: round_cents(total_payments - terms.principal),
            first_due,
            last_due,
            installments,
        })
    }
}
