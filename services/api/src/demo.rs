use crate::infra::{InMemoryCreditStore, InMemoryLedger, SimulatedGateway};
use chrono::{Duration, Local, NaiveDate, TimeZone, Utc};
use clap::Args;
use std::sync::Arc;

use coop_credit::error::AppError;
use coop_credit::workflows::pay_later::{ApplicationRequest, PayLaterService};
use coop_credit::workflows::scoring::{
    LoanPaymentRecord, MemberId, PaymentStatus, SavingsTransaction, TransactionKind,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reference date for approval and due dates (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Amount requested in the demo application
    #[arg(long, default_value_t = 3000.0)]
    pub(crate) amount: f64,
    /// Plan length in months (1, 3, or 6)
    #[arg(long, default_value_t = 3)]
    pub(crate) term: u32,
}

/// Seed a member with two years of steady cooperative activity so the demo
/// walks the approval path rather than the rejection path.
fn seed_demo_member(ledger: &InMemoryLedger, member: &MemberId, today: NaiveDate) {
    let noon = |date: NaiveDate| {
        Utc.from_utc_datetime(&date.and_hms_opt(12, 0, 0).expect("valid time"))
    };

    let joined = today - Duration::days(365 * 3);
    ledger.register_member(member.clone(), noon(joined));

    let mut cursor = today - Duration::days(30 * 14);
    while cursor < today {
        ledger.add_savings_transaction(SavingsTransaction {
            member_id: member.clone(),
            amount: 8_000.0,
            kind: TransactionKind::Deposit,
            posted_at: noon(cursor),
        });
        ledger.add_loan_payment(LoanPaymentRecord {
            member_id: member.clone(),
            amount: 450.0,
            paid_on: noon(cursor),
            is_late: false,
            status: PaymentStatus::Completed,
            payment_method: "cash".to_string(),
            installment_number: None,
            transaction_ref: None,
        });
        cursor = cursor + Duration::days(30);
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { today, amount, term } = args;
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let now = Utc::now();
    let member = MemberId("mem-demo-001".to_string());

    println!("Cooperative credit demo (reference date {today})");

    let ledger = Arc::new(InMemoryLedger::default());
    seed_demo_member(&ledger, &member, today);

    let store = Arc::new(InMemoryCreditStore::default());
    let gateway = Arc::new(SimulatedGateway::default());
    let service = PayLaterService::new(ledger, store, gateway);

    let eligibility = service.check_eligibility(&member, now)?;
    println!("\nEligibility for {}", member.0);
    println!("- score: {}", eligibility.score);
    println!("- credit limit: {:.2}", eligibility.credit_limit);
    println!(
        "- available terms: {}",
        eligibility
            .allowed_terms
            .iter()
            .map(|months| format!("{months}mo"))
            .collect::<Vec<_>>()
            .join(", ")
    );
    if !eligibility.eligible {
        println!("Member is below the eligibility floor; demo stops here.");
        return Ok(());
    }

    let application = service.create_application(
        ApplicationRequest {
            member_id: member.clone(),
            amount,
            term_months: term,
            purpose: "demo purchase".to_string(),
        },
        now,
    )?;
    println!(
        "\nApplication {} created ({:.2} over {} months) -> status {}",
        application.id.0,
        application.amount,
        application.term_months,
        application.status.label()
    );

    let approved = service.approve_application(&application.id, today)?;
    if let Some(schedule) = &approved.schedule {
        println!(
            "Approved at {:.1}% annual: {} installments of {:.2} (total interest {:.2})",
            schedule.terms.annual_rate * 100.0,
            schedule.installments.len(),
            schedule.monthly_payment,
            schedule.total_interest
        );
        println!("\nInstallment plan");
        for installment in &schedule.installments {
            println!(
                "- #{} due {} | payment {:.2} (principal {:.2} + interest {:.2})",
                installment.number,
                installment.due_date,
                installment.total_payment,
                installment.principal_portion,
                installment.interest_portion
            );
        }
    }

    let mut installments = service.installments_for(&application.id)?;
    installments.sort_by_key(|record| record.installment.number);

    if let Some(first) = installments.first() {
        let mut outcome = service.process_scheduled_payment(&first.id, now)?;
        if !outcome.success {
            println!("\nFirst installment capture declined, retrying once...");
            outcome = service.process_scheduled_payment(&first.id, now)?;
        }
        println!(
            "\nFirst installment {} -> {} ({})",
            first.id.0,
            outcome.status.label(),
            outcome.message
        );
    }

    if let Some(second) = installments.get(1) {
        let outcome = service.cancel_scheduled_payment(&second.id)?;
        println!(
            "Second installment {} -> {} ({})",
            second.id.0,
            outcome.status.label(),
            outcome.message
        );
    }

    Ok(())
}
