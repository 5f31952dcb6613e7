use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;

use coop_credit::workflows::amortization::{InstallmentStatus, PaymentSchedule};
use coop_credit::workflows::pay_later::{
    ApplicationId, ApplicationStatus, CaptureError, CaptureReceipt, CreditStore, InstallmentId,
    InstallmentRecord, PayLaterApplication, PaymentGateway, SettlementReceipt, StoreError,
};
use coop_credit::workflows::scoring::{
    CreditScoreSnapshot, LedgerError, LoanPaymentRecord, MemberAccount, MemberId, MemberLedger,
    SavingsTransaction,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local ledger backing the scoring reads until the hosted database
/// client is wired in.
#[derive(Default)]
pub(crate) struct InMemoryLedger {
    accounts: Mutex<HashMap<MemberId, MemberAccount>>,
    savings: Mutex<Vec<SavingsTransaction>>,
    payments: Mutex<Vec<LoanPaymentRecord>>,
}

impl InMemoryLedger {
    pub(crate) fn register_member(&self, member: MemberId, joined_at: DateTime<Utc>) {
        self.accounts.lock().expect("accounts mutex poisoned").insert(
            member.clone(),
            MemberAccount {
                member_id: member,
                joined_at,
                credit: None,
            },
        );
    }

    pub(crate) fn add_savings_transaction(&self, transaction: SavingsTransaction) {
        self.savings
            .lock()
            .expect("savings mutex poisoned")
            .push(transaction);
    }

    pub(crate) fn add_loan_payment(&self, payment: LoanPaymentRecord) {
        self.payments
            .lock()
            .expect("payments mutex poisoned")
            .push(payment);
    }
}

impl MemberLedger for InMemoryLedger {
    fn savings_transactions(
        &self,
        member: &MemberId,
    ) -> Result<Vec<SavingsTransaction>, LedgerError> {
        Ok(self
            .savings
            .lock()
            .expect("savings mutex poisoned")
            .iter()
            .filter(|transaction| &transaction.member_id == member)
            .cloned()
            .collect())
    }

    fn loan_payments(&self, member: &MemberId) -> Result<Vec<LoanPaymentRecord>, LedgerError> {
        Ok(self
            .payments
            .lock()
            .expect("payments mutex poisoned")
            .iter()
            .filter(|payment| &payment.member_id == member)
            .cloned()
            .collect())
    }

    fn member_account(&self, member: &MemberId) -> Result<Option<MemberAccount>, LedgerError> {
        Ok(self
            .accounts
            .lock()
            .expect("accounts mutex poisoned")
            .get(member)
            .cloned())
    }

    fn record_credit_score(
        &self,
        member: &MemberId,
        snapshot: CreditScoreSnapshot,
    ) -> Result<(), LedgerError> {
        let mut accounts = self.accounts.lock().expect("accounts mutex poisoned");
        if let Some(account) = accounts.get_mut(member) {
            account.credit = Some(snapshot);
        }
        Ok(())
    }
}

/// Process-local credit store. Transitions are gated on current status under
/// one lock, matching the conditional-update contract of the trait.
#[derive(Default)]
pub(crate) struct InMemoryCreditStore {
    applications: Mutex<HashMap<ApplicationId, PayLaterApplication>>,
    installments: Mutex<BTreeMap<InstallmentId, InstallmentRecord>>,
    payment_log: Mutex<Vec<LoanPaymentRecord>>,
}

impl CreditStore for InMemoryCreditStore {
    fn insert_application(
        &self,
        application: PayLaterApplication,
    ) -> Result<PayLaterApplication, StoreError> {
        let mut applications = self
            .applications
            .lock()
            .expect("applications mutex poisoned");
        if applications.contains_key(&application.id) {
            return Err(StoreError::Conflict);
        }
        applications.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<PayLaterApplication>, StoreError> {
        Ok(self
            .applications
            .lock()
            .expect("applications mutex poisoned")
            .get(id)
            .cloned())
    }

    fn approve_application(
        &self,
        id: &ApplicationId,
        schedule: PaymentSchedule,
    ) -> Result<PayLaterApplication, StoreError> {
        let mut applications = self
            .applications
            .lock()
            .expect("applications mutex poisoned");
        let application = applications.get_mut(id).ok_or(StoreError::NotFound)?;
        if application.status != ApplicationStatus::Pending {
            return Err(StoreError::InvalidTransition {
                entity: "application",
                found: application.status.label(),
            });
        }

        let mut installments = self
            .installments
            .lock()
            .expect("installments mutex poisoned");
        for installment in &schedule.installments {
            let installment_id = InstallmentId(format!("{}-{:02}", id.0, installment.number));
            installments.insert(
                installment_id.clone(),
                InstallmentRecord {
                    id: installment_id,
                    application_id: id.clone(),
                    member_id: application.member_id.clone(),
                    installment: installment.clone(),
                },
            );
        }

        application.status = ApplicationStatus::Approved;
        application.schedule = Some(schedule);
        Ok(application.clone())
    }

    fn applications_for(&self, member: &MemberId) -> Result<Vec<PayLaterApplication>, StoreError> {
        Ok(self
            .applications
            .lock()
            .expect("applications mutex poisoned")
            .values()
            .filter(|application| &application.member_id == member)
            .cloned()
            .collect())
    }

    fn fetch_installment(
        &self,
        id: &InstallmentId,
    ) -> Result<Option<InstallmentRecord>, StoreError> {
        Ok(self
            .installments
            .lock()
            .expect("installments mutex poisoned")
            .get(id)
            .cloned())
    }

    fn installments_for(
        &self,
        application: &ApplicationId,
    ) -> Result<Vec<InstallmentRecord>, StoreError> {
        Ok(self
            .installments
            .lock()
            .expect("installments mutex poisoned")
            .values()
            .filter(|record| &record.application_id == application)
            .cloned()
            .collect())
    }

    fn mark_installment_paid(
        &self,
        id: &InstallmentId,
        receipt: SettlementReceipt,
    ) -> Result<InstallmentRecord, StoreError> {
        let mut installments = self
            .installments
            .lock()
            .expect("installments mutex poisoned");
        let record = installments.get_mut(id).ok_or(StoreError::NotFound)?;
        match record.installment.status {
            InstallmentStatus::Pending
            | InstallmentStatus::Scheduled
            | InstallmentStatus::Overdue => {}
            other => {
                return Err(StoreError::InvalidTransition {
                    entity: "installment",
                    found: other.label(),
                })
            }
        }
        record.installment.status = InstallmentStatus::Paid;
        record.installment.paid_on = Some(receipt.paid_on);
        record.installment.payment_method = Some(receipt.payment_method);
        record.installment.transaction_ref = Some(receipt.transaction_ref);
        Ok(record.clone())
    }

    fn cancel_installment(&self, id: &InstallmentId) -> Result<InstallmentRecord, StoreError> {
        let mut installments = self
            .installments
            .lock()
            .expect("installments mutex poisoned");
        let record = installments.get_mut(id).ok_or(StoreError::NotFound)?;
        match record.installment.status {
            InstallmentStatus::Pending | InstallmentStatus::Scheduled => {}
            other => {
                return Err(StoreError::InvalidTransition {
                    entity: "installment",
                    found: other.label(),
                })
            }
        }
        record.installment.status = InstallmentStatus::Cancelled;
        Ok(record.clone())
    }

    fn mark_overdue(&self, as_of: NaiveDate) -> Result<Vec<InstallmentRecord>, StoreError> {
        let mut installments = self
            .installments
            .lock()
            .expect("installments mutex poisoned");
        let mut flagged = Vec::new();
        for record in installments.values_mut() {
            let pending = matches!(
                record.installment.status,
                InstallmentStatus::Pending | InstallmentStatus::Scheduled
            );
            if pending && record.installment.due_date < as_of {
                record.installment.status = InstallmentStatus::Overdue;
                flagged.push(record.clone());
            }
        }
        Ok(flagged)
    }

    fn record_payment(&self, entry: LoanPaymentRecord) -> Result<(), StoreError> {
        self.payment_log
            .lock()
            .expect("payment log mutex poisoned")
            .push(entry);
        Ok(())
    }
}

/// Deterministic stand-in for the real payment processor: sequential
/// transaction references, with every tenth capture declined so retry
/// handling stays observable in demos and manual testing.
#[derive(Default)]
pub(crate) struct SimulatedGateway {
    attempts: AtomicU64,
}

impl PaymentGateway for SimulatedGateway {
    fn capture(&self, _amount: f64, _method: &str) -> Result<CaptureReceipt, CaptureError> {
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        if attempt % 10 == 0 {
            return Err(CaptureError::Declined(
                "simulated processor decline".to_string(),
            ));
        }
        Ok(CaptureReceipt {
            reference: format!("txn_{attempt:08}"),
        })
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_gateway_declines_every_tenth_capture() {
        let gateway = SimulatedGateway::default();
        let mut outcomes = Vec::new();
        for _ in 0..20 {
            outcomes.push(gateway.capture(100.0, "automatic").is_ok());
        }
        let declined: Vec<usize> = outcomes
            .iter()
            .enumerate()
            .filter(|(_, ok)| !**ok)
            .map(|(index, _)| index + 1)
            .collect();
        assert_eq!(declined, vec![10, 20]);
    }

    #[test]
    fn parse_date_accepts_iso_dates() {
        assert!(parse_date("2025-09-01").is_ok());
        assert!(parse_date("September 1").is_err());
    }
}
