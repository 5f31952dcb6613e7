use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::workflows::amortization::{InstallmentStatus, PaymentSchedule};
use crate::workflows::pay_later::domain::{
    ApplicationId, ApplicationRequest, ApplicationStatus, InstallmentId, InstallmentRecord,
    PayLaterApplication,
};
use crate::workflows::pay_later::repository::{
    CaptureError, CaptureReceipt, CreditStore, PaymentGateway, SettlementReceipt, StoreError,
};
use crate::workflows::pay_later::service::PayLaterService;
use crate::workflows::scoring::{
    CreditScoreSnapshot, LedgerError, LoanPaymentRecord, MemberAccount, MemberId, MemberLedger,
    PaymentStatus, SavingsTransaction, TransactionKind,
};

pub(super) fn strong_member() -> MemberId {
    MemberId("mem-100".to_string())
}

pub(super) fn blank_member() -> MemberId {
    MemberId("mem-200".to_string())
}

pub(super) fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).single().expect("valid timestamp")
}

pub(super) fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(super) fn request(member: MemberId, amount: f64, term_months: u32) -> ApplicationRequest {
    ApplicationRequest {
        member_id: member,
        amount,
        term_months,
        purpose: "school fees".to_string(),
    }
}

/// Ledger fixture seeding one member with a flawless history (score 850,
/// limit 10000, all terms) and one with no history at all.
#[derive(Default)]
pub(super) struct MemoryLedger {
    accounts: Mutex<HashMap<MemberId, MemberAccount>>,
    savings: Mutex<Vec<SavingsTransaction>>,
    payments: Mutex<Vec<LoanPaymentRecord>>,
}

impl MemoryLedger {
    pub(super) fn seeded() -> Self {
        let ledger = Self::default();
        ledger.add_account(strong_member(), at(2020, 1, 15));
        ledger.add_account(blank_member(), at(2025, 6, 1));
        for month in 1..=12 {
            ledger.add_deposit(strong_member(), 10_000.0, at(2024, month, 10));
        }
        for month in 1..=8 {
            ledger.add_payment(strong_member(), false, at(2024, month, 20));
        }
        ledger
    }

    pub(super) fn add_account(&self, member: MemberId, joined_at: DateTime<Utc>) {
        self.accounts.lock().expect("accounts mutex poisoned").insert(
            member.clone(),
            MemberAccount {
                member_id: member,
                joined_at,
                credit: None,
            },
        );
    }

    pub(super) fn add_deposit(&self, member: MemberId, amount: f64, posted_at: DateTime<Utc>) {
        self.savings
            .lock()
            .expect("savings mutex poisoned")
            .push(SavingsTransaction {
                member_id: member,
                amount,
                kind: TransactionKind::Deposit,
                posted_at,
            });
    }

    pub(super) fn add_payment(&self, member: MemberId, is_late: bool, paid_on: DateTime<Utc>) {
        self.payments
            .lock()
            .expect("payments mutex poisoned")
            .push(LoanPaymentRecord {
                member_id: member,
                amount: 500.0,
                paid_on,
                is_late,
                status: PaymentStatus::Completed,
                payment_method: "cash".to_string(),
                installment_number: None,
                transaction_ref: None,
            });
    }

    pub(super) fn snapshot_for(&self, member: &MemberId) -> Option<CreditScoreSnapshot> {
        self.accounts
            .lock()
            .expect("accounts mutex poisoned")
            .get(member)
            .and_then(|account| account.credit.clone())
    }
}

impl MemberLedger for MemoryLedger {
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

/// Mutex-guarded store whose transition methods enforce the same
/// status-gating contract a database-backed implementation would.
#[derive(Default)]
pub(super) struct MemoryStore {
    applications: Mutex<HashMap<ApplicationId, PayLaterApplication>>,
    installments: Mutex<BTreeMap<InstallmentId, InstallmentRecord>>,
    payment_log: Mutex<Vec<LoanPaymentRecord>>,
    pub(super) fail_payment_log: AtomicBool,
}

impl MemoryStore {
    pub(super) fn payment_log(&self) -> Vec<LoanPaymentRecord> {
        self.payment_log
            .lock()
            .expect("payment log mutex poisoned")
            .clone()
    }
}

impl CreditStore for MemoryStore {
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
        let applications = self
            .applications
            .lock()
            .expect("applications mutex poisoned");
        Ok(applications.get(id).cloned())
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
        let applications = self
            .applications
            .lock()
            .expect("applications mutex poisoned");
        Ok(applications
            .values()
            .filter(|application| &application.member_id == member)
            .cloned()
            .collect())
    }

    fn fetch_installment(
        &self,
        id: &InstallmentId,
    ) -> Result<Option<InstallmentRecord>, StoreError> {
        let installments = self
            .installments
            .lock()
            .expect("installments mutex poisoned");
        Ok(installments.get(id).cloned())
    }

    fn installments_for(
        &self,
        application: &ApplicationId,
    ) -> Result<Vec<InstallmentRecord>, StoreError> {
        let installments = self
            .installments
            .lock()
            .expect("installments mutex poisoned");
        Ok(installments
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
            let due = record.installment.due_date;
            let pending = matches!(
                record.installment.status,
                InstallmentStatus::Pending | InstallmentStatus::Scheduled
            );
            if pending && due < as_of {
                record.installment.status = InstallmentStatus::Overdue;
                flagged.push(record.clone());
            }
        }
        Ok(flagged)
    }

    fn record_payment(&self, entry: LoanPaymentRecord) -> Result<(), StoreError> {
        if self.fail_payment_log.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("payment log offline".to_string()));
        }
        self.payment_log
            .lock()
            .expect("payment log mutex poisoned")
            .push(entry);
        Ok(())
    }
}

/// Gateway double that settles every capture with sequential references and
/// records the captured amounts.
#[derive(Default)]
pub(super) struct RecordingGateway {
    sequence: AtomicU64,
    captured: Mutex<Vec<f64>>,
}

impl RecordingGateway {
    pub(super) fn captured(&self) -> Vec<f64> {
        self.captured.lock().expect("capture mutex poisoned").clone()
    }
}

impl PaymentGateway for RecordingGateway {
    fn capture(&self, amount: f64, _method: &str) -> Result<CaptureReceipt, CaptureError> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        self.captured
            .lock()
            .expect("capture mutex poisoned")
            .push(amount);
        Ok(CaptureReceipt {
            reference: format!("txn_{sequence:08}"),
        })
    }
}

/// Gateway double that refuses every capture.
pub(super) struct DecliningGateway;

impl PaymentGateway for DecliningGateway {
    fn capture(&self, _amount: f64, _method: &str) -> Result<CaptureReceipt, CaptureError> {
        Err(CaptureError::Declined("insufficient funds".to_string()))
    }
}

pub(super) type TestService = PayLaterService<MemoryLedger, MemoryStore, RecordingGateway>;

pub(super) fn build_service() -> (TestService, Arc<MemoryLedger>, Arc<MemoryStore>, Arc<RecordingGateway>) {
    let ledger = Arc::new(MemoryLedger::seeded());
    let store = Arc::new(MemoryStore::default());
    let gateway = Arc::new(RecordingGateway::default());
    let service = PayLaterService::new(ledger.clone(), store.clone(), gateway.clone());
    (service, ledger, store, gateway)
}

pub(super) fn build_declining_service() -> (
    PayLaterService<MemoryLedger, MemoryStore, DecliningGateway>,
    Arc<MemoryStore>,
) {
    let ledger = Arc::new(MemoryLedger::seeded());
    let store = Arc::new(MemoryStore::default());
    let service = PayLaterService::new(ledger, store.clone(), Arc::new(DecliningGateway));
    (service, store)
}
