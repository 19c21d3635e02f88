//! Portfolio metrics over reconciled, derived tables.
//!
//! Every reported ratio is on a 0..=100 scale and collapses to zero when
//! its denominator is zero, so an empty or fully-recovered book reports
//! clean zeros instead of failing.

use std::collections::{HashMap, HashSet};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::aggregate::{aggregate_by, join_inner, loan_activity_by_month};
use crate::derive::DerivedLoan;
use crate::types::{Money, Month, Payment, PaymentType, Rate};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// Write-offs recognized in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyWriteOff {
    pub month: Month,
    pub write_off_amount: Money,
    /// Written-off share of the whole book's outstanding balance.
    pub write_off_rate: Rate,
}

/// Write-off exposure for one product line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductWriteOff {
    pub product_name: String,
    pub total_outstanding: Money,
    pub total_write_off: Money,
    pub write_off_rate: Rate,
}

/// Recoveries measured against write-offs recognized in the same month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyRecovery {
    pub month: Month,
    pub recoveries: Money,
    pub write_offs: Money,
    pub recovery_rate: Rate,
}

/// Defaults recognized in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyDefaults {
    pub month: Month,
    pub defaults: u64,
    /// Share of the whole reconciled book that defaulted in this month.
    pub default_rate: Rate,
}

/// Default incidence for one product line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDefaultRate {
    pub product_name: String,
    pub loans: u64,
    pub defaults: u64,
    pub default_rate: Rate,
}

/// Delinquency among loans with payment activity in one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyDelinquency {
    pub month: Month,
    pub delinquent_loans: u64,
    pub total_loans: u64,
    pub delinquency_rate: Rate,
}

/// The open book: loans with no closing date on record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveLoans {
    /// Distinct open loan ids.
    pub count: u64,
    pub total_principal: Money,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const HUNDRED: Decimal = dec!(100);

/// Percentage with the zero-denominator guard: a ratio over nothing is zero.
fn guarded_pct(numerator: Money, denominator: Money) -> Rate {
    if denominator.is_zero() {
        Decimal::ZERO
    } else {
        numerator / denominator * HUNDRED
    }
}

fn count_pct(numerator: u64, denominator: u64) -> Rate {
    guarded_pct(Decimal::from(numerator), Decimal::from(denominator))
}

fn sum_outstanding(loans: &[DerivedLoan]) -> Money {
    loans.iter().map(|l| l.loan.total_outstanding).sum()
}

fn sum_principal(loans: &[DerivedLoan]) -> Money {
    loans.iter().map(|l| l.loan.principal_amount).sum()
}

fn sum_write_offs(loans: &[DerivedLoan]) -> Money {
    loans.iter().map(|l| l.loan.write_off_amount).sum()
}

fn sum_recoveries(payments: &[Payment]) -> Money {
    payments
        .iter()
        .filter(|p| p.payment_type == PaymentType::Recoveries)
        .map(|p| p.amount)
        .sum()
}

// ---------------------------------------------------------------------------
// Portfolio ratios
// ---------------------------------------------------------------------------

/// Total write-offs as a share of total outstanding.
pub fn write_off_rate(loans: &[DerivedLoan]) -> Rate {
    guarded_pct(sum_write_offs(loans), sum_outstanding(loans))
}

/// Total principal booked as a share of total outstanding.
pub fn collections_rate(loans: &[DerivedLoan]) -> Rate {
    guarded_pct(sum_principal(loans), sum_outstanding(loans))
}

/// Contractual interest, penalties and fees as a share of total principal.
pub fn gross_yield(loans: &[DerivedLoan]) -> Rate {
    let income: Money = loans
        .iter()
        .map(|l| l.loan.principal_amount * l.loan.interest_rate + l.loan.penalties + l.loan.fees)
        .sum();
    guarded_pct(income, sum_principal(loans))
}

/// Mean days in arrears across the reconciled book.
pub fn average_days_in_arrears(loans: &[DerivedLoan]) -> Decimal {
    if loans.is_empty() {
        return Decimal::ZERO;
    }
    let total: Decimal = loans
        .iter()
        .map(|l| Decimal::from(l.days_in_arrears))
        .sum();
    total / Decimal::from(loans.len() as u64)
}

/// Principal on at-risk loans as a share of total principal.
pub fn portfolio_at_risk(loans: &[DerivedLoan]) -> Rate {
    let at_risk: Money = loans
        .iter()
        .filter(|l| l.is_at_risk)
        .map(|l| l.loan.principal_amount)
        .sum();
    guarded_pct(at_risk, sum_principal(loans))
}

/// Recovery payments as a share of total write-offs.
pub fn recovery_rate(loans: &[DerivedLoan], payments: &[Payment]) -> Rate {
    guarded_pct(sum_recoveries(payments), sum_write_offs(loans))
}

/// Penalty balances as a share of total principal.
pub fn penalty_rate(loans: &[DerivedLoan]) -> Rate {
    let penalties: Money = loans.iter().map(|l| l.loan.penalties).sum();
    guarded_pct(penalties, sum_principal(loans))
}

/// Principal of loans fully paid down no later than maturity, as a share of
/// total principal.
pub fn repayment_rate(loans: &[DerivedLoan]) -> Rate {
    let repaid: Money = loans
        .iter()
        .filter(|l| {
            l.loan.total_outstanding.is_zero()
                && match (l.loan.closing_date, l.loan.maturity_date) {
                    (Some(closing), Some(maturity)) => closing <= maturity,
                    _ => false,
                }
        })
        .map(|l| l.loan.principal_amount)
        .sum();
    guarded_pct(repaid, sum_principal(loans))
}

/// Loans with a recorded default, as a share of all loans.
pub fn default_rate(loans: &[DerivedLoan]) -> Rate {
    let defaulted = loans
        .iter()
        .filter(|l| l.loan.default_date.is_some())
        .count() as u64;
    count_pct(defaulted, loans.len() as u64)
}

/// Currently delinquent loans as a share of all loans.
pub fn delinquency_rate(loans: &[DerivedLoan]) -> Rate {
    let delinquent = loans.iter().filter(|l| l.is_delinquent).count() as u64;
    count_pct(delinquent, loans.len() as u64)
}

/// Loans still open. The count is over distinct ids; principal sums every
/// open row.
pub fn active_loans(loans: &[DerivedLoan]) -> ActiveLoans {
    let mut ids: HashSet<&str> = HashSet::new();
    let mut total_principal = Decimal::ZERO;
    for loan in loans {
        if loan.loan.closing_date.is_none() {
            ids.insert(loan.loan.loan_id.as_str());
            total_principal += loan.loan.principal_amount;
        }
    }
    ActiveLoans {
        count: ids.len() as u64,
        total_principal,
    }
}

// ---------------------------------------------------------------------------
// Bucketed tables
// ---------------------------------------------------------------------------

/// Write-offs by recognition month, each rated against the whole book's
/// outstanding balance.
pub fn monthly_write_offs(loans: &[DerivedLoan]) -> Vec<MonthlyWriteOff> {
    let outstanding = sum_outstanding(loans);
    aggregate_by(
        loans,
        |l| l.loan.write_off_date.map(Month::from_date),
        |l| l.loan.write_off_amount,
    )
    .into_iter()
    .map(|group| MonthlyWriteOff {
        month: group.key,
        write_off_amount: group.total,
        write_off_rate: guarded_pct(group.total, outstanding),
    })
    .collect()
}

/// Write-off exposure per product line.
pub fn write_offs_by_product(loans: &[DerivedLoan]) -> Vec<ProductWriteOff> {
    let write_offs = aggregate_by(
        loans,
        |l| Some(l.loan.product_name.clone()),
        |l| l.loan.write_off_amount,
    );
    let outstanding = aggregate_by(
        loans,
        |l| Some(l.loan.product_name.clone()),
        |l| l.loan.total_outstanding,
    );
    join_inner(&write_offs, &outstanding)
        .into_iter()
        .map(
            |(product_name, total_write_off, total_outstanding)| ProductWriteOff {
                product_name,
                total_outstanding,
                total_write_off,
                write_off_rate: guarded_pct(total_write_off, total_outstanding),
            },
        )
        .collect()
}

/// Recoveries joined to write-offs recognized in the same month. Months with
/// activity on only one side are left out.
pub fn monthly_recoveries(loans: &[DerivedLoan], payments: &[Payment]) -> Vec<MonthlyRecovery> {
    let recoveries = aggregate_by(
        payments,
        |p| {
            if p.payment_type == PaymentType::Recoveries {
                p.payment_date.map(Month::from_date)
            } else {
                None
            }
        },
        |p| p.amount,
    );
    let write_offs = aggregate_by(
        loans,
        |l| l.loan.write_off_date.map(Month::from_date),
        |l| l.loan.write_off_amount,
    );
    join_inner(&recoveries, &write_offs)
        .into_iter()
        .map(|(month, recovered, written_off)| MonthlyRecovery {
            month,
            recoveries: recovered,
            write_offs: written_off,
            recovery_rate: guarded_pct(recovered, written_off),
        })
        .collect()
}

/// Defaults by recognition month, each rated against the whole book.
pub fn monthly_defaults(loans: &[DerivedLoan]) -> Vec<MonthlyDefaults> {
    let total = loans.len() as u64;
    aggregate_by(
        loans,
        |l| l.loan.default_date.map(Month::from_date),
        |_| Decimal::ZERO,
    )
    .into_iter()
    .map(|group| MonthlyDefaults {
        month: group.key,
        defaults: group.count,
        default_rate: count_pct(group.count, total),
    })
    .collect()
}

/// Default incidence per product line. The amount column sums a default
/// indicator, so a group's total is its defaulted-row count.
pub fn default_rates_by_product(loans: &[DerivedLoan]) -> Vec<ProductDefaultRate> {
    aggregate_by(
        loans,
        |l| Some(l.loan.product_name.clone()),
        |l| {
            if l.loan.default_date.is_some() {
                Decimal::ONE
            } else {
                Decimal::ZERO
            }
        },
    )
    .into_iter()
    .map(|group| {
        let defaults = group.total.to_u64().unwrap_or(0);
        ProductDefaultRate {
            product_name: group.key,
            loans: group.count,
            defaults,
            default_rate: count_pct(defaults, group.count),
        }
    })
    .collect()
}

/// Delinquency among the loans that saw payment activity in each month.
pub fn monthly_delinquency(
    loans: &[DerivedLoan],
    payments: &[Payment],
) -> Vec<MonthlyDelinquency> {
    let by_id: HashMap<&str, &DerivedLoan> = loans
        .iter()
        .map(|loan| (loan.loan.loan_id.as_str(), loan))
        .collect();
    loan_activity_by_month(payments)
        .into_iter()
        .map(|(month, active_ids)| {
            let mut total = 0u64;
            let mut delinquent = 0u64;
            for id in active_ids {
                if let Some(loan) = by_id.get(id) {
                    total += 1;
                    if loan.is_delinquent {
                        delinquent += 1;
                    }
                }
            }
            MonthlyDelinquency {
                month,
                delinquent_loans: delinquent,
                total_loans: total,
                delinquency_rate: count_pct(delinquent, total),
            }
        })
        .collect()
}
