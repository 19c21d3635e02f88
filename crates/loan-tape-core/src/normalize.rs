//! Identifier and date normalization, the first pipeline stage.
//!
//! Every join key is folded to lowercase here so downstream matching is
//! case-insensitive. Dates are read leniently: a value matching none of the
//! known formats becomes a missing date rather than an error.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::types::{Borrower, BorrowerRecord, Loan, LoanRecord, Payment, PaymentRecord};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

/// Fold an identifier for case-insensitive matching.
pub fn fold_identifier(id: &str) -> String {
    id.to_lowercase()
}

/// Read a date-like value, treating anything unreadable as missing.
pub fn parse_date_lenient(raw: &str) -> Option<NaiveDate> {
    parse_datetime_lenient(raw).map(|stamp| stamp.date())
}

/// Datetime variant used for as-of stamps. Bare dates read as midnight.
pub fn parse_datetime_lenient(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(parsed);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(parsed.and_time(NaiveTime::MIN));
        }
    }
    None
}

pub fn normalize_borrowers(records: Vec<BorrowerRecord>) -> Vec<Borrower> {
    records
        .into_iter()
        .map(|record| Borrower {
            borrower_id: fold_identifier(&record.borrower_id),
        })
        .collect()
}

pub fn normalize_loans(records: Vec<LoanRecord>) -> Vec<Loan> {
    records.into_iter().map(normalize_loan).collect()
}

fn normalize_loan(record: LoanRecord) -> Loan {
    Loan {
        loan_id: fold_identifier(&record.loan_id),
        borrower_id: fold_identifier(&record.borrower_id),
        principal_amount: record.principal_amount,
        total_outstanding: record.total_outstanding,
        interest_rate: record.interest_rate,
        penalties: record.penalties,
        fees: record.fees,
        product_name: record.product_name,
        as_of_datetime: parse_datetime_lenient(&record.as_of_datetime),
        maturity_date: parse_date_lenient(&record.maturity_date),
        default_date: record.default_date.as_deref().and_then(parse_date_lenient),
        write_off_date: record
            .write_off_date
            .as_deref()
            .and_then(parse_date_lenient),
        write_off_amount: record.write_off_amount.unwrap_or(Decimal::ZERO),
        closing_date: record.closing_date.as_deref().and_then(parse_date_lenient),
    }
}

pub fn normalize_payments(records: Vec<PaymentRecord>) -> Vec<Payment> {
    records
        .into_iter()
        .map(|record| Payment {
            loan_id: fold_identifier(&record.loan_id),
            payment_date: parse_date_lenient(&record.payment_date),
            amount: record.amount,
            payment_type: record.payment_type,
        })
        .collect()
}
