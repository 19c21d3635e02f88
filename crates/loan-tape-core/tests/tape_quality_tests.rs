// ===========================================================================
// Dirty-tape resilience tests: threshold overrides, unreadable dates,
// duplicate keys, orphan handling
// ===========================================================================

use rust_decimal_macros::dec;

use loan_tape_core::analyze_portfolio;
use loan_tape_core::types::{
    AnalysisConfig, BorrowerRecord, LoanRecord, Money, PaymentRecord, PaymentType, PortfolioInput,
};

fn borrower(id: &str) -> BorrowerRecord {
    BorrowerRecord {
        borrower_id: id.to_string(),
    }
}

fn loan(loan_id: &str, borrower_id: &str, outstanding: Money, maturity: &str) -> LoanRecord {
    LoanRecord {
        loan_id: loan_id.to_string(),
        borrower_id: borrower_id.to_string(),
        principal_amount: dec!(10_000),
        total_outstanding: outstanding,
        interest_rate: dec!(0.10),
        penalties: dec!(0),
        fees: dec!(0),
        product_name: "SME Term".to_string(),
        as_of_datetime: "2024-03-31 00:00:00".to_string(),
        maturity_date: maturity.to_string(),
        default_date: None,
        write_off_date: None,
        write_off_amount: None,
        closing_date: None,
    }
}

fn payment(loan_id: &str, date: &str, amount: Money, kind: &str) -> PaymentRecord {
    PaymentRecord {
        loan_id: loan_id.to_string(),
        payment_date: date.to_string(),
        amount,
        payment_type: PaymentType::from_label(kind),
    }
}

fn portfolio(loans: Vec<LoanRecord>, payments: Vec<PaymentRecord>) -> PortfolioInput {
    let borrowers = loans.iter().map(|l| borrower(&l.borrower_id)).collect();
    PortfolioInput {
        borrowers,
        loans,
        payments,
        config: AnalysisConfig::default(),
    }
}

#[test]
fn test_fully_repaid_book() {
    let mut early = loan("LN-1", "BR-1", dec!(0), "2025-01-01");
    early.closing_date = Some("2023-09-15".to_string());
    let mut on_time = loan("LN-2", "BR-2", dec!(0), "2024-02-29");
    on_time.closing_date = Some("2024-02-29".to_string());

    let report = analyze_portfolio(portfolio(vec![early, on_time], vec![]))
        .unwrap()
        .result;

    assert_eq!(report.repayment_rate, dec!(100));
    assert_eq!(report.write_off_rate, dec!(0));
    assert_eq!(report.portfolio_at_risk, dec!(0));
    assert_eq!(report.collections_rate, dec!(0));
    assert_eq!(report.active_loans.count, 0);
    assert_eq!(report.active_loans.total_principal, dec!(0));
}

#[test]
fn test_fully_written_off_book() {
    let mut first = loan("LN-1", "BR-1", dec!(4_000), "2021-06-30");
    first.write_off_date = Some("2023-05-10".to_string());
    first.write_off_amount = Some(dec!(4_000));
    let mut second = loan("LN-2", "BR-2", dec!(6_000), "2021-09-30");
    second.write_off_date = Some("2023-05-20".to_string());
    second.write_off_amount = Some(dec!(6_000));

    let report = analyze_portfolio(portfolio(vec![first, second], vec![]))
        .unwrap()
        .result;

    assert_eq!(report.write_off_rate, dec!(100));
    assert_eq!(report.monthly_write_offs.len(), 1);
    assert_eq!(report.monthly_write_offs[0].month.to_string(), "2023-05");
    assert_eq!(report.monthly_write_offs[0].write_off_amount, dec!(10_000));
    assert_eq!(report.monthly_write_offs[0].write_off_rate, dec!(100));
    assert_eq!(report.recovery_rate, dec!(0));
    assert_eq!(report.default_rate, dec!(0));
}

#[test]
fn test_par_threshold_override() {
    // 1005 and 137 days past maturity respectively at the as-of date
    let input = portfolio(
        vec![
            loan("LN-1", "BR-1", dec!(4_000), "2021-06-30"),
            loan("LN-2", "BR-2", dec!(6_000), "2023-11-15"),
        ],
        vec![],
    );

    let default_threshold = analyze_portfolio(input.clone()).unwrap().result;
    assert_eq!(default_threshold.portfolio_at_risk, dec!(50));

    let mut tight = input.clone();
    tight.config = AnalysisConfig {
        par_threshold_days: 100,
    };
    assert_eq!(
        analyze_portfolio(tight).unwrap().result.portfolio_at_risk,
        dec!(100)
    );

    let mut loose = input;
    loose.config = AnalysisConfig {
        par_threshold_days: 2000,
    };
    assert_eq!(
        analyze_portfolio(loose).unwrap().result.portfolio_at_risk,
        dec!(0)
    );
}

#[test]
fn test_identifier_casing_never_orphans() {
    let input = PortfolioInput {
        borrowers: vec![borrower("ABC")],
        loans: vec![loan("LN-9", "abc", dec!(1_000), "2024-06-30")],
        payments: vec![payment("ln-9", "2024-01-15", dec!(100), "REPAYMENT")],
        config: AnalysisConfig::default(),
    };

    let output = analyze_portfolio(input).unwrap();
    assert_eq!(output.result.reconciliation.loans_matched, 1);
    assert_eq!(output.result.reconciliation.loans_orphaned, 0);
    assert_eq!(output.result.reconciliation.payments_matched, 1);
    assert_eq!(output.result.reconciliation.payments_orphaned, 0);
    assert!(output.warnings.is_empty());
}

#[test]
fn test_unreadable_dates_degrade_to_missing() {
    let mut smudged = loan("LN-1", "BR-1", dec!(2_000), "31/31/2024");
    smudged.as_of_datetime = "not a timestamp".to_string();
    smudged.default_date = Some("soon".to_string());
    let undated = payment("LN-1", "whenever", dec!(100), "REPAYMENT");

    let output = analyze_portfolio(portfolio(vec![smudged], vec![undated])).unwrap();

    // unparsable default date means the loan never counts as defaulted
    assert_eq!(output.result.default_rate, dec!(0));
    assert_eq!(output.result.average_days_in_arrears, dec!(0));
    assert_eq!(output.result.delinquency_rate, dec!(0));
    assert_eq!(output.result.portfolio_at_risk, dec!(0));
    assert!(output.result.monthly_defaults.is_empty());
    // the undated payment reconciles but belongs to no month bucket
    assert_eq!(output.result.reconciliation.payments_matched, 1);
    assert!(output.result.monthly_delinquency.is_empty());

    assert_eq!(output.warnings.len(), 3);
    assert!(output.warnings[0].contains("no readable as_of_datetime"));
    assert!(output.warnings[1].contains("no readable maturity_date"));
    assert!(output.warnings[2].contains("no readable payment_date"));
}

#[test]
fn test_payments_to_orphan_loans_are_excluded() {
    let mut written_off = loan("LN-1", "BR-1", dec!(5_000), "2021-06-30");
    written_off.write_off_date = Some("2023-05-10".to_string());
    written_off.write_off_amount = Some(dec!(1_000));

    let input = PortfolioInput {
        borrowers: vec![borrower("BR-1")],
        loans: vec![written_off],
        payments: vec![
            payment("LN-1", "2024-01-15", dec!(400), "RECOVERIES"),
            payment("LN-2", "2024-01-20", dec!(999), "RECOVERIES"),
        ],
        config: AnalysisConfig::default(),
    };

    let report = analyze_portfolio(input).unwrap().result;
    assert_eq!(report.reconciliation.payments_matched, 1);
    assert_eq!(report.reconciliation.payments_orphaned, 1);
    // only the matched recovery counts: 400 against 1000 written off
    assert_eq!(report.recovery_rate, dec!(40));
}

#[test]
fn test_duplicate_borrower_rows_are_tolerated() {
    let input = PortfolioInput {
        borrowers: vec![borrower("BR-1"), borrower("br-1")],
        loans: vec![loan("LN-1", "BR-1", dec!(5_000), "2024-06-30")],
        payments: vec![],
        config: AnalysisConfig::default(),
    };

    let report = analyze_portfolio(input).unwrap().result;
    assert_eq!(report.reconciliation.loans_matched, 1);
    assert_eq!(report.reconciliation.borrowers_without_loans, 0);
}
