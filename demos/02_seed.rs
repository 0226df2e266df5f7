/// seed - fill a store with random borrowers and loans
use loan_tracker_rs::{InMemoryStore, LoanStatus, LoanStore, LoanTracker, Seeder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // usage: 02_seed [borrowers] [loans] [seed]
    let mut args = std::env::args().skip(1);
    let borrowers: usize = args.next().map(|a| a.parse()).transpose()?.unwrap_or(5);
    let loans: usize = args.next().map(|a| a.parse()).transpose()?.unwrap_or(10);
    let mut seeder = match args.next() {
        Some(seed) => Seeder::from_seed(seed.parse()?),
        None => Seeder::new(),
    };

    let tracker = LoanTracker::new(InMemoryStore::new());
    let summary = seeder.run(&tracker, borrowers, loans)?;

    println!("\nsummary:");
    println!("  borrowers:    {}", tracker.store().count_borrowers()?);
    println!("  loans:        {}", summary.loans);
    println!("  active:       {}", tracker.store().count_loans_by_status(&LoanStatus::Active)?);
    println!("  installments: {}", summary.installments);
    println!("  settled:      {}", summary.settled_installments);

    Ok(())
}
