use chrono::{DateTime, Duration, TimeZone, Utc};
use loan_tracker_rs::{
    compute_monthly_payment, FailPoint, InMemoryStore, LoanError, LoanStatus, LoanStore,
    LoanTerms, LoanTracker, Money, NewBorrower, Rate, SafeTimeProvider, Stage, TimeSource,
    TrackerConfig, Uuid,
};
use rust_decimal_macros::dec;

fn ymd(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

fn tracker_at(now: DateTime<Utc>) -> LoanTracker<InMemoryStore> {
    let time = SafeTimeProvider::new(TimeSource::Test(now));
    LoanTracker::with_time(InMemoryStore::with_time(time.clone()), time)
}

fn standard_terms() -> LoanTerms {
    LoanTerms::new(Money::from_major(10_000), Rate::from_decimal(dec!(0.05)), 12, 15)
}

fn ada() -> NewBorrower {
    NewBorrower::new("Ada Lovelace", "ada@example.com", "+44-20-7946-0000")
}

#[test]
fn test_standard_twelve_month_loan() {
    let tracker = tracker_at(ymd(2024, 1, 15));
    let borrower = tracker
        .originate_loan_for_new_borrower(&ada(), standard_terms(), ymd(2024, 1, 15), false)
        .unwrap();

    let loan = &borrower.loans[0];
    assert_eq!(loan.installments.len(), 12);
    assert_eq!(loan.installments[0].number, 1);
    assert_eq!(loan.installments[0].due_date, ymd(2024, 2, 15));
    assert_eq!(loan.installments[11].number, 12);
    assert_eq!(loan.installments[11].due_date, ymd(2025, 1, 15));

    let payment = compute_monthly_payment(loan.principal, loan.annual_rate, 12).unwrap();
    assert_eq!(payment.round_dp(2), Money::from_str_exact("856.07").unwrap());
    for installment in &loan.installments {
        assert_eq!(installment.amount_due, payment);
        assert_eq!(installment.amount_paid, Money::ZERO);
        assert!(installment.paid_date.is_none());
    }
}

#[test]
fn test_month_end_due_day_clamps_every_month() {
    let tracker = tracker_at(ymd(2024, 1, 31));
    let terms = LoanTerms::new(Money::from_major(12_000), Rate::ZERO, 4, 31);
    let borrower = tracker
        .originate_loan_for_new_borrower(&ada(), terms, ymd(2024, 1, 31), false)
        .unwrap();

    let due: Vec<_> = borrower.loans[0].installments.iter().map(|i| i.due_date).collect();
    assert_eq!(due, vec![ymd(2024, 2, 29), ymd(2024, 3, 31), ymd(2024, 4, 30), ymd(2024, 5, 31)]);
    assert!(borrower.loans[0]
        .installments
        .iter()
        .all(|i| i.amount_due == Money::from_major(3_000)));
}

#[test]
fn test_backdated_loan_settles_only_past_installments() {
    let now = Utc.with_ymd_and_hms(2024, 6, 20, 9, 30, 0).unwrap();
    let tracker = tracker_at(now);
    let borrower = tracker
        .originate_loan_for_new_borrower(&ada(), standard_terms(), ymd(2024, 1, 15), true)
        .unwrap();

    let loan = tracker.get_full_loan(borrower.loans[0].id).unwrap();
    let (settled, open): (Vec<_>, Vec<_>) = loan.installments.iter().partition(|i| i.due_date < now);
    assert_eq!(settled.len(), 5);
    assert_eq!(open.len(), 7);
    assert!(settled
        .iter()
        .all(|i| i.amount_paid == i.amount_due && i.paid_date == Some(i.due_date)));
    assert!(open.iter().all(|i| i.amount_paid == Money::ZERO && i.paid_date.is_none()));

    let standing = tracker.loan_standing(loan.id).unwrap();
    assert!(!standing.is_delinquent());
    assert_eq!(standing.paid_late_count, 0);
}

#[test]
fn test_backdated_loan_without_settlement_is_delinquent() {
    let now = Utc.with_ymd_and_hms(2024, 6, 20, 9, 30, 0).unwrap();
    let tracker = tracker_at(now);
    let borrower = tracker
        .originate_loan_for_new_borrower(&ada(), standard_terms(), ymd(2024, 1, 15), false)
        .unwrap();

    let standing = tracker.loan_standing(borrower.loans[0].id).unwrap();
    assert!(standing.is_delinquent());
    assert_eq!(standing.overdue_count, 5);
    assert_eq!(standing.next_due.map(|s| s.number), Some(1));
}

#[test]
fn test_unknown_borrower_creates_nothing() {
    let tracker = tracker_at(ymd(2024, 1, 15));
    let err = tracker
        .add_loan_to_borrower(Uuid::new_v4(), standard_terms(), ymd(2024, 1, 15), false)
        .unwrap_err();

    assert!(matches!(err, LoanError::NotFound { entity: "borrower", .. }));
    assert!(tracker.store().list_loans().unwrap().is_empty());
    assert!(tracker.store().list_installments().unwrap().is_empty());
}

#[test]
fn test_invalid_terms_create_nothing() {
    let tracker = tracker_at(ymd(2024, 1, 15));
    let bad = [
        LoanTerms { principal: Money::ZERO, ..standard_terms() },
        LoanTerms { term_months: 0, ..standard_terms() },
        LoanTerms { day_due: 0, ..standard_terms() },
        LoanTerms { annual_rate: Rate::from_decimal(dec!(-0.05)), ..standard_terms() },
    ];
    for terms in bad {
        let err = tracker
            .originate_loan_for_new_borrower(&ada(), terms, ymd(2024, 1, 15), false)
            .unwrap_err();
        assert!(matches!(err, LoanError::Validation { .. }), "{err}");
    }
    assert_eq!(tracker.store().count_borrowers().unwrap(), 0);
}

#[test]
fn test_failure_at_each_stage_reports_what_was_left() {
    // (fail point, borrowers left, loans left, installments left)
    let cases = [
        (FailPoint::CreateBorrower, 0, 0, 0),
        (FailPoint::CreateLoan, 1, 0, 0),
        (FailPoint::CreateInstallment(1), 1, 1, 0),
        (FailPoint::CreateInstallment(12), 1, 1, 11),
    ];

    for (point, borrowers, loans, installments) in cases {
        let tracker = tracker_at(ymd(2024, 1, 15));
        tracker.store().fail_on(point);

        let err = tracker
            .originate_loan_for_new_borrower(&ada(), standard_terms(), ymd(2024, 1, 15), false)
            .unwrap_err();
        assert!(matches!(err, LoanError::Storage { .. }), "{point:?}: {err}");

        assert_eq!(tracker.store().count_borrowers().unwrap(), borrowers, "{point:?}");
        assert_eq!(tracker.store().list_loans().unwrap().len(), loans, "{point:?}");
        assert_eq!(tracker.store().list_installments().unwrap().len(), installments, "{point:?}");

        let partial = err.partial_write().copied().unwrap_or_default();
        assert_eq!(partial.borrower_id.is_some(), borrowers == 1);
        assert_eq!(partial.loan_id.is_some(), loans == 1);
        assert_eq!(partial.installments_created as usize, installments);
    }
}

#[test]
fn test_failed_installment_names_loan_and_number() {
    let tracker = tracker_at(ymd(2024, 1, 15));
    let borrower = tracker
        .originate_loan_for_new_borrower(&ada(), standard_terms(), ymd(2024, 1, 15), false)
        .unwrap();

    tracker.store().fail_on(FailPoint::CreateInstallment(3));
    let err = tracker
        .add_loan_to_borrower(borrower.id, standard_terms(), ymd(2024, 1, 15), false)
        .unwrap_err();

    match err {
        LoanError::Storage { stage: Stage::CreateInstallment { loan_id, number }, partial, .. } => {
            assert_eq!(number, 3);
            assert_eq!(partial.loan_id, Some(loan_id));
            assert_eq!(partial.installments_created, 2);
            assert_eq!(tracker.get_full_loan(loan_id).unwrap().installments.len(), 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_full_borrower_orders_loans_and_installments() {
    let tracker = tracker_at(ymd(2024, 3, 1));
    let borrower = tracker
        .originate_loan_for_new_borrower_now(&ada(), standard_terms())
        .unwrap();

    let control = tracker.time().test_control().unwrap();
    control.advance(Duration::days(1));
    let second = tracker
        .add_loan_to_borrower_now(borrower.id, LoanTerms::new(Money::from_major(2_400), Rate::ZERO, 24, 28))
        .unwrap();

    let full = tracker.get_full_borrower(borrower.id).unwrap();
    assert_eq!(full.loans.len(), 2);
    assert_eq!(full.loans[0].id, borrower.loans[0].id);
    assert_eq!(full.loans[1].id, second.id);
    for loan in &full.loans {
        let numbers: Vec<u32> = loan.installments.iter().map(|i| i.number).collect();
        assert_eq!(numbers, (1..=loan.term_months).collect::<Vec<_>>());
    }
    assert_eq!(full.loans[1].total_scheduled().unwrap(), Money::from_major(2_400));
}

#[test]
fn test_missing_records_are_not_found() {
    let tracker = tracker_at(ymd(2024, 1, 15));
    assert!(tracker.get_full_borrower(Uuid::new_v4()).unwrap_err().is_not_found());
    assert!(tracker.get_full_loan(Uuid::new_v4()).unwrap_err().is_not_found());
    assert!(tracker
        .record_payment(Uuid::new_v4(), Money::from_major(10), ymd(2024, 1, 15))
        .unwrap_err()
        .is_not_found());
}

#[test]
fn test_partial_then_full_payment() {
    let tracker = tracker_at(ymd(2024, 1, 15));
    let borrower = tracker
        .originate_loan_for_new_borrower(
            &ada(),
            LoanTerms::new(Money::from_major(1_200), Rate::ZERO, 12, 15),
            ymd(2024, 1, 15),
            false,
        )
        .unwrap();
    let first = borrower.loans[0].installments[0].clone();

    let on_time = ymd(2024, 2, 10);
    let partial = tracker.record_payment(first.id, Money::from_major(40), on_time).unwrap();
    assert_eq!(partial.amount_paid, Money::from_major(40));

    let control = tracker.time().test_control().unwrap();
    control.set(ymd(2024, 2, 20));
    let standing = tracker.loan_standing(borrower.loans[0].id).unwrap();
    assert_eq!(standing.overdue_count, 1);
    assert_eq!(standing.overdue_balance, Money::from_major(60));

    let late = ymd(2024, 2, 22);
    let full = tracker.record_payment(first.id, Money::from_major(60), late).unwrap();
    assert_eq!(full.amount_paid, Money::from_major(100));
    assert_eq!(full.paid_date, Some(late));

    let standing = tracker.loan_standing(borrower.loans[0].id).unwrap();
    assert_eq!(standing.overdue_count, 0);
    assert_eq!(standing.paid_late_count, 1);
    assert_eq!(standing.outstanding_balance, Money::from_major(1_100));
}

#[test]
fn test_duplicate_email_is_rejected_before_any_write() {
    let tracker = tracker_at(ymd(2024, 1, 15));
    tracker.originate_loan_for_new_borrower_now(&ada(), standard_terms()).unwrap();

    let twin = NewBorrower::new("Another Ada", "ada@example.com", "+1-555-0100");
    let err = tracker
        .originate_loan_for_new_borrower_now(&twin, standard_terms())
        .unwrap_err();
    assert!(matches!(err, LoanError::Duplicate { .. }));
    assert!(err.partial_write().is_none());
    assert_eq!(tracker.store().count_borrowers().unwrap(), 1);
}

#[test]
fn test_configured_status_and_limits() {
    let config = TrackerConfig::from_json(
        r#"{ "default_status": "paid_off", "limits": { "max_principal": "5000" } }"#,
    )
    .unwrap();
    let tracker = tracker_at(ymd(2024, 1, 15)).with_config(config);

    let err = tracker
        .originate_loan_for_new_borrower_now(&ada(), standard_terms())
        .unwrap_err();
    assert!(matches!(err, LoanError::Validation { field: "principal", .. }));

    let small = LoanTerms::new(Money::from_major(5_000), Rate::from_percentage(7), 6, 1);
    let borrower = tracker.originate_loan_for_new_borrower_now(&ada(), small).unwrap();
    assert_eq!(borrower.loans[0].status, LoanStatus::PaidOff);
    assert_eq!(tracker.store().count_loans_by_status(&LoanStatus::PaidOff).unwrap(), 1);
}

#[test]
fn test_deleting_borrower_cascades() {
    let tracker = tracker_at(ymd(2024, 1, 15));
    let borrower = tracker.originate_loan_for_new_borrower_now(&ada(), standard_terms()).unwrap();
    tracker.store().delete_borrower(borrower.id).unwrap();

    assert!(tracker.get_full_borrower(borrower.id).unwrap_err().is_not_found());
    assert!(tracker.store().list_installments().unwrap().is_empty());
}

#[test]
fn test_unpayable_terms_fail_before_any_write() {
    let tracker = tracker_at(ymd(2024, 1, 15));
    let terms = LoanTerms::new(Money::from_major(10_000), Rate::from_decimal(dec!(1)), 1_000, 15);

    let err = tracker
        .originate_loan_for_new_borrower(&ada(), terms, ymd(2024, 1, 15), false)
        .unwrap_err();
    assert!(matches!(err, LoanError::CalculationError { .. }), "{err}");
    assert!(err.partial_write().is_none());
    assert_eq!(tracker.store().count_borrowers().unwrap(), 0);
    assert!(tracker.store().list_loans().unwrap().is_empty());
    assert!(tracker.store().list_installments().unwrap().is_empty());
}
