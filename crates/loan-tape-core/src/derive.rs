//! Per-loan derived fields, the third pipeline stage.
//!
//! Everything here is a pure row-wise calculation over a single loan.

use chrono::{NaiveDate, NaiveTime};

use crate::types::{AnalysisConfig, Loan, Rate};

/// A reconciled loan together with its derived fields.
#[derive(Debug, Clone)]
pub struct DerivedLoan {
    pub loan: Loan,
    /// Whole days in arrears, never negative.
    pub days_in_arrears: i64,
    pub is_delinquent: bool,
    /// None when there is nothing outstanding to rate against.
    pub write_off_rate: Option<Rate>,
    pub is_at_risk: bool,
}

/// The date the loan went bad: default first, then write-off, then maturity.
fn distress_reference_date(loan: &Loan) -> Option<NaiveDate> {
    loan.default_date
        .or(loan.write_off_date)
        .or(loan.maturity_date)
}

/// Days elapsed from the distress reference date to the loan's own as-of
/// stamp, floored at zero. With either date missing no arrears can be shown.
pub fn days_in_arrears(loan: &Loan) -> i64 {
    match (loan.as_of_datetime, distress_reference_date(loan)) {
        (Some(as_of), Some(reference)) => (as_of.date() - reference).num_days().max(0),
        _ => 0,
    }
}

/// Past maturity with neither a default nor a write-off recorded.
pub fn is_delinquent(loan: &Loan) -> bool {
    match (loan.maturity_date, loan.as_of_datetime) {
        (Some(maturity), Some(as_of)) => {
            maturity.and_time(NaiveTime::MIN) < as_of
                && loan.default_date.is_none()
                && loan.write_off_date.is_none()
        }
        _ => false,
    }
}

/// Written-off share of this loan's outstanding balance.
pub fn write_off_rate(loan: &Loan) -> Option<Rate> {
    if loan.total_outstanding.is_zero() {
        None
    } else {
        Some(loan.write_off_amount / loan.total_outstanding)
    }
}

/// Past maturity beyond the configured at-risk threshold. The comparison is
/// strict: exactly at the threshold is not yet at risk.
pub fn is_at_risk(loan: &Loan, par_threshold_days: i64) -> bool {
    match (loan.maturity_date, loan.as_of_datetime) {
        (Some(maturity), Some(as_of)) => (as_of.date() - maturity).num_days() > par_threshold_days,
        _ => false,
    }
}

pub fn derive_loan(loan: Loan, config: &AnalysisConfig) -> DerivedLoan {
    DerivedLoan {
        days_in_arrears: days_in_arrears(&loan),
        is_delinquent: is_delinquent(&loan),
        write_off_rate: write_off_rate(&loan),
        is_at_risk: is_at_risk(&loan, config.par_threshold_days),
        loan,
    }
}

pub fn derive_loans(loans: Vec<Loan>, config: &AnalysisConfig) -> Vec<DerivedLoan> {
    loans
        .into_iter()
        .map(|loan| derive_loan(loan, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use rust_decimal_macros::dec;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn midnight(year: i32, month: u32, day: u32) -> NaiveDateTime {
        date(year, month, day).and_hms_opt(0, 0, 0).unwrap()
    }

    fn base_loan() -> Loan {
        Loan {
            loan_id: "ln-1".to_string(),
            borrower_id: "b-1".to_string(),
            principal_amount: dec!(10_000),
            total_outstanding: dec!(8_000),
            interest_rate: dec!(0.10),
            penalties: dec!(0),
            fees: dec!(0),
            product_name: "Term".to_string(),
            as_of_datetime: Some(midnight(2024, 3, 31)),
            maturity_date: Some(date(2023, 11, 15)),
            default_date: None,
            write_off_date: None,
            write_off_amount: dec!(0),
            closing_date: None,
        }
    }

    #[test]
    fn test_arrears_reference_prefers_default_date() {
        let mut loan = base_loan();
        loan.default_date = Some(date(2024, 3, 1));
        loan.write_off_date = Some(date(2024, 2, 1));
        // measured from the default, not the earlier write-off
        assert_eq!(days_in_arrears(&loan), 30);
    }

    #[test]
    fn test_arrears_fall_back_to_write_off_then_maturity() {
        let mut loan = base_loan();
        loan.write_off_date = Some(date(2024, 3, 21));
        assert_eq!(days_in_arrears(&loan), 10);
        loan.write_off_date = None;
        // maturity 2023-11-15 to as-of 2024-03-31
        assert_eq!(days_in_arrears(&loan), 137);
    }

    #[test]
    fn test_arrears_never_negative() {
        let mut loan = base_loan();
        loan.maturity_date = Some(date(2024, 6, 30));
        assert_eq!(days_in_arrears(&loan), 0);
    }

    #[test]
    fn test_arrears_zero_when_dates_missing() {
        let mut loan = base_loan();
        loan.maturity_date = None;
        assert_eq!(days_in_arrears(&loan), 0);

        let mut loan = base_loan();
        loan.as_of_datetime = None;
        assert_eq!(days_in_arrears(&loan), 0);
    }

    #[test]
    fn test_delinquency_compares_at_datetime_grain() {
        let mut loan = base_loan();
        assert!(is_delinquent(&loan));

        loan.maturity_date = Some(date(2024, 3, 31));
        assert!(!is_delinquent(&loan));

        // any time past the maturity midnight counts
        loan.as_of_datetime = Some(date(2024, 3, 31).and_hms_opt(10, 0, 0).unwrap());
        assert!(is_delinquent(&loan));
    }

    #[test]
    fn test_default_or_write_off_clears_delinquency() {
        let mut loan = base_loan();
        loan.default_date = Some(date(2023, 12, 1));
        assert!(!is_delinquent(&loan));

        let mut loan = base_loan();
        loan.write_off_date = Some(date(2023, 12, 1));
        assert!(!is_delinquent(&loan));
    }

    #[test]
    fn test_delinquency_false_when_dates_missing() {
        let mut loan = base_loan();
        loan.maturity_date = None;
        assert!(!is_delinquent(&loan));
    }

    #[test]
    fn test_write_off_rate_guards_zero_outstanding() {
        let mut loan = base_loan();
        loan.write_off_amount = dec!(2_000);
        assert_eq!(write_off_rate(&loan), Some(dec!(0.25)));

        loan.total_outstanding = dec!(0);
        assert_eq!(write_off_rate(&loan), None);
    }

    #[test]
    fn test_at_risk_threshold_is_strict() {
        let mut loan = base_loan();
        // exactly 854 days before the as-of
        loan.maturity_date = Some(date(2021, 11, 28));
        assert!(!is_at_risk(&loan, 854));
        // 855 days
        loan.maturity_date = Some(date(2021, 11, 27));
        assert!(is_at_risk(&loan, 854));
    }

    #[test]
    fn test_at_risk_false_when_dates_missing() {
        let mut loan = base_loan();
        loan.as_of_datetime = None;
        assert!(!is_at_risk(&loan, 854));
    }

    #[test]
    fn test_derive_loan_carries_all_fields() {
        let derived = derive_loan(base_loan(), &AnalysisConfig::default());
        assert_eq!(derived.days_in_arrears, 137);
        assert!(derived.is_delinquent);
        assert!(!derived.is_at_risk);
        assert_eq!(derived.write_off_rate, Some(dec!(0)));
        assert_eq!(derived.loan.loan_id, "ln-1");
    }
}
