/// quick start - originate a loan and look at its schedule
use loan_tracker_rs::{InMemoryStore, LoanTerms, LoanTracker, Money, NewBorrower, Rate};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // production: system time, default configuration
    let tracker = LoanTracker::new(InMemoryStore::new());

    // $10,000 over 12 months at 8%, due on the 15th
    let borrower = tracker.originate_loan_for_new_borrower_now(
        &NewBorrower::new("Ada Lovelace", "ada@example.com", "+44-20-7946-0000"),
        LoanTerms::new(Money::from_major(10_000), Rate::from_percentage(8), 12, 15),
    )?;

    let loan = &borrower.loans[0];
    println!("borrower {} ({})", borrower.name, borrower.id);
    println!("loan {} status {}", loan.id, loan.status);

    for installment in &loan.installments {
        println!(
            "  #{:>2}  due {}  amount {}",
            installment.number,
            installment.due_date.date_naive(),
            installment.amount_due.round_dp(2)
        );
    }

    println!("\n{}", serde_json::to_string_pretty(&tracker.loan_standing(loan.id)?)?);

    Ok(())
}
