use clap::Args;
use serde_json::Value;

use loan_tape_core::analyze_portfolio;
use loan_tape_core::types::{AnalysisConfig, PortfolioInput};

use crate::input;

/// Arguments for portfolio analysis
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to the borrower table (CSV)
    #[arg(long, requires_all = ["loans", "payments"])]
    pub borrowers: Option<String>,

    /// Path to the loan table (CSV)
    #[arg(long, requires_all = ["borrowers", "payments"])]
    pub loans: Option<String>,

    /// Path to the payment table (CSV)
    #[arg(long, requires_all = ["borrowers", "loans"])]
    pub payments: Option<String>,

    /// Path to a JSON file holding all three tables
    #[arg(long, conflicts_with_all = ["borrowers", "loans", "payments"])]
    pub input: Option<String>,

    /// Days past maturity before a loan counts toward portfolio at risk
    #[arg(long)]
    pub par_threshold_days: Option<i64>,
}

pub fn run_analyze(args: AnalyzeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut portfolio = load_portfolio(&args)?;

    if let Some(days) = args.par_threshold_days {
        portfolio.config = AnalysisConfig {
            par_threshold_days: days,
        };
    }

    let output = analyze_portfolio(portfolio)?;
    Ok(serde_json::to_value(output)?)
}

fn load_portfolio(args: &AnalyzeArgs) -> Result<PortfolioInput, Box<dyn std::error::Error>> {
    if let (Some(borrowers), Some(loans), Some(payments)) =
        (&args.borrowers, &args.loans, &args.payments)
    {
        return Ok(PortfolioInput {
            borrowers: input::csv_in::load_borrowers(borrowers)?,
            loans: input::csv_in::load_loans(loans)?,
            payments: input::csv_in::load_payments(payments)?,
            config: AnalysisConfig::default(),
        });
    }

    if let Some(ref path) = args.input {
        return input::file::read_json(path);
    }

    if let Some(portfolio) = input::stdin::read_portfolio()? {
        return Ok(portfolio);
    }

    Err("No input: pass --borrowers/--loans/--payments, --input <file.json>, \
         or pipe JSON via stdin"
        .into())
}
