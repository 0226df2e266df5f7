pub mod amortization;
pub mod schedule;
pub mod status;

pub use amortization::{compute_monthly_payment, total_interest, total_repayment};
pub use schedule::{build_schedule, ScheduleParams, SchedulePlan};
pub use status::{
    days_late, days_overdue, is_fully_paid, is_overdue, is_paid, is_partially_paid,
    remaining_balance, was_paid_late, InstallmentStatus, LoanStanding,
};
