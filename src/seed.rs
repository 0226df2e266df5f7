use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::models::{LoanTerms, NewBorrower};
use crate::origination::LoanTracker;
use crate::store::LoanStore;

const PRINCIPALS: [i64; 11] = [
    5_000, 7_500, 10_000, 12_500, 15_000, 20_000, 25_000, 30_000, 35_000, 40_000, 50_000,
];
const TERMS: [u32; 5] = [12, 24, 36, 48, 60];

const FIRST_NAMES: [&str; 12] = [
    "Ada", "Alan", "Barbara", "Dennis", "Edsger", "Frances", "Grace", "John", "Ken", "Margaret",
    "Niklaus", "Radia",
];
const LAST_NAMES: [&str; 12] = [
    "Allen", "Backus", "Dijkstra", "Hamilton", "Hopper", "Kernighan", "Liskov", "Lovelace",
    "Perlman", "Ritchie", "Turing", "Wirth",
];

/// counts produced by one seeding run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeedSummary {
    pub borrowers: usize,
    pub loans: usize,
    pub installments: usize,
    pub settled_installments: usize,
}

/// Random but realistic borrowers and loans for demos and local data.
pub struct Seeder {
    rng: StdRng,
}

impl Seeder {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// reproducible seeder
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// loan terms drawn from the fixture pools
    pub fn loan_terms(&mut self) -> LoanTerms {
        let principal = *PRINCIPALS.choose(&mut self.rng).unwrap_or(&PRINCIPALS[0]);
        // 3% to 18% in 1.5 point steps
        let step: i64 = self.rng.gen_range(0..=10);
        let rate = Decimal::new(30 + 15 * step, 3);
        let term = *TERMS.choose(&mut self.rng).unwrap_or(&TERMS[0]);
        // stays clear of month-end clamping
        let day_due = self.rng.gen_range(1..=28);

        LoanTerms::new(Money::from_major(principal), Rate::from_decimal(rate), term, day_due)
    }

    /// a date between 1 and 365 days before `now`
    pub fn date_taken(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.rng.gen_range(1..=365))
    }

    /// contact details; `index` keeps the email unique within a run
    pub fn borrower(&mut self, index: usize) -> NewBorrower {
        let first = FIRST_NAMES.choose(&mut self.rng).copied().unwrap_or("Ada");
        let last = LAST_NAMES.choose(&mut self.rng).copied().unwrap_or("Lovelace");
        let phone = format!(
            "+1-555-{:03}-{:04}",
            self.rng.gen_range(100..1000),
            self.rng.gen_range(0..10_000)
        );

        NewBorrower::new(
            format!("{first} {last}"),
            format!("{}.{}.{index}@example.com", first.to_lowercase(), last.to_lowercase()),
            phone,
        )
    }

    /// Create `borrowers` borrowers sharing `loans` loans round-robin.
    ///
    /// The remainder goes to the first borrowers. Every borrower is originated with a
    /// first loan, so asking for fewer loans than borrowers still yields one each.
    /// Schedules are backdated with past installments settled.
    pub fn run<S: LoanStore>(
        &mut self,
        tracker: &LoanTracker<S>,
        borrowers: usize,
        loans: usize,
    ) -> Result<SeedSummary> {
        if borrowers == 0 {
            return Err(LoanError::validation("borrowers", "must be positive, got 0"));
        }

        let per_borrower = loans / borrowers;
        let remainder = loans % borrowers;
        let mut summary = SeedSummary::default();

        for index in 0..borrowers {
            let share = (per_borrower + usize::from(index < remainder)).max(1);
            let contact = self.borrower(index);

            let terms = self.loan_terms();
            let date_taken = self.date_taken(tracker.now());
            let created = tracker.originate_loan_for_new_borrower(&contact, terms, date_taken, true)?;
            summary.borrowers += 1;
            for loan in &created.loans {
                summary.record(loan.installments.iter().map(|i| i.paid_date.is_some()));
            }

            info!(borrower_id = %created.id, name = %created.name, loans = share, "seeded borrower");

            for _ in 1..share {
                let terms = self.loan_terms();
                let date_taken = self.date_taken(tracker.now());
                let loan = tracker.add_loan_to_borrower(created.id, terms, date_taken, true)?;
                summary.record(loan.installments.iter().map(|i| i.paid_date.is_some()));
            }
        }

        info!(
            borrowers = summary.borrowers,
            loans = summary.loans,
            installments = summary.installments,
            "seeding complete"
        );
        Ok(summary)
    }
}

impl Default for Seeder {
    fn default() -> Self {
        Self::new()
    }
}

impl SeedSummary {
    fn record(&mut self, settled: impl Iterator<Item = bool>) {
        self.loans += 1;
        for paid in settled {
            self.installments += 1;
            self.settled_installments += usize::from(paid);
        }
    }
}
