/// backdated loan - import a historical loan under a controlled clock
use chrono::{Duration, TimeZone, Utc};
use loan_tracker_rs::{
    InMemoryStore, LoanTerms, LoanTracker, Money, NewBorrower, Rate, SafeTimeProvider,
    TimeSource, TrackerConfig,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== backdated loan example ===\n");

    // test: time starts at a fixed point and only moves when told to
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 6, 20, 9, 0, 0).unwrap(),
    ));
    let control = time.test_control().unwrap();

    let tracker = LoanTracker::with_time(InMemoryStore::with_time(time.clone()), time)
        .with_config(TrackerConfig::backfill());

    // taken in january; everything due before today is recorded as paid
    let borrower = tracker.originate_with_defaults(
        &NewBorrower::new("Grace Hopper", "grace@example.com", "+1-555-0199"),
        LoanTerms::new(Money::from_major(24_000), Rate::from_decimal(dec!(0.06)), 24, 31),
        Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap(),
    )?;
    let loan_id = borrower.loans[0].id;

    for installment in &borrower.loans[0].installments {
        let state = match installment.paid_date {
            Some(paid) => format!("paid {}", paid.date_naive()),
            None => "open".to_string(),
        };
        println!("  #{:>2}  due {}  {}", installment.number, installment.due_date.date_naive(), state);
    }

    let standing = tracker.loan_standing(loan_id)?;
    println!("\nsettled: {} of {}", standing.fully_paid_count, standing.installment_count);
    println!("outstanding: {}", standing.outstanding_balance.round_dp(2));

    // skip ahead two months without paying
    control.advance(Duration::days(60));
    let standing = tracker.loan_standing(loan_id)?;
    println!("\nafter 60 days: {} overdue, worst by {} days", standing.overdue_count, standing.max_days_overdue);

    // catch up the oldest open installment
    if let Some(next) = standing.next_due {
        let installment = tracker
            .get_full_loan(loan_id)?
            .installment(next.number)
            .cloned()
            .ok_or("installment vanished")?;
        tracker.record_payment(installment.id, installment.amount_due, tracker.now())?;
        println!("paid installment #{} late", next.number);
    }

    let standing = tracker.loan_standing(loan_id)?;
    println!("now {} overdue, {} paid late", standing.overdue_count, standing.paid_late_count);

    Ok(())
}
