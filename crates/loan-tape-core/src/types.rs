use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LoanTapeError;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Ratios and percentages. Report-level rates are on a 0..=100 scale.
pub type Rate = Decimal;

/// Days past maturity before a loan counts toward portfolio-at-risk.
pub const DEFAULT_PAR_THRESHOLD_DAYS: i64 = 854;

/// Calendar month used as an aggregation key. Orders chronologically and
/// renders as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    pub fn from_date(date: NaiveDate) -> Self {
        Month {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = LoanTapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s.split_once('-').ok_or_else(|| month_parse_error(s))?;
        let year: i32 = year.parse().map_err(|_| month_parse_error(s))?;
        let month: u32 = month.parse().map_err(|_| month_parse_error(s))?;
        if !(1..=12).contains(&month) {
            return Err(month_parse_error(s));
        }
        Ok(Month { year, month })
    }
}

fn month_parse_error(raw: &str) -> LoanTapeError {
    LoanTapeError::InvalidInput {
        field: "month".to_string(),
        reason: format!("expected YYYY-MM, got '{}'", raw),
    }
}

impl Serialize for Month {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Payment category as labelled on the tape. Labels outside the known set
/// are carried through untouched, not rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentType {
    Repayment,
    Interest,
    Fees,
    Penalties,
    Recoveries,
    Other(String),
}

impl PaymentType {
    pub fn from_label(label: &str) -> Self {
        match label {
            "REPAYMENT" => PaymentType::Repayment,
            "INTEREST" => PaymentType::Interest,
            "FEES" => PaymentType::Fees,
            "PENALTIES" => PaymentType::Penalties,
            "RECOVERIES" => PaymentType::Recoveries,
            other => PaymentType::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            PaymentType::Repayment => "REPAYMENT",
            PaymentType::Interest => "INTEREST",
            PaymentType::Fees => "FEES",
            PaymentType::Penalties => "PENALTIES",
            PaymentType::Recoveries => "RECOVERIES",
            PaymentType::Other(label) => label,
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl Serialize for PaymentType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for PaymentType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(PaymentType::from_label(&raw))
    }
}

/// Borrower row as it arrives on the tape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowerRecord {
    pub borrower_id: String,
}

/// Loan row as it arrives on the tape. Date columns stay raw strings so the
/// normalizer can read them leniently; nullable columns are options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanRecord {
    pub loan_id: String,
    pub borrower_id: String,
    pub principal_amount: Money,
    pub total_outstanding: Money,
    pub interest_rate: Rate,
    pub penalties: Money,
    pub fees: Money,
    pub product_name: String,
    pub as_of_datetime: String,
    pub maturity_date: String,
    #[serde(default)]
    pub default_date: Option<String>,
    #[serde(default)]
    pub write_off_date: Option<String>,
    #[serde(default)]
    pub write_off_amount: Option<Money>,
    #[serde(default)]
    pub closing_date: Option<String>,
}

/// Payment row as it arrives on the tape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub loan_id: String,
    pub payment_date: String,
    pub amount: Money,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
}

/// Borrower with a case-folded identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Borrower {
    pub borrower_id: String,
}

/// Loan with case-folded keys and canonical dates. A date that could not be
/// read is absent, and a null write-off amount reads as zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub loan_id: String,
    pub borrower_id: String,
    pub principal_amount: Money,
    pub total_outstanding: Money,
    pub interest_rate: Rate,
    pub penalties: Money,
    pub fees: Money,
    pub product_name: String,
    pub as_of_datetime: Option<NaiveDateTime>,
    pub maturity_date: Option<NaiveDate>,
    pub default_date: Option<NaiveDate>,
    pub write_off_date: Option<NaiveDate>,
    pub write_off_amount: Money,
    pub closing_date: Option<NaiveDate>,
}

/// Payment with a case-folded loan key and canonical date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub loan_id: String,
    pub payment_date: Option<NaiveDate>,
    pub amount: Money,
    pub payment_type: PaymentType,
}

/// Policy knobs for the analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Days past maturity before a loan is at risk.
    pub par_threshold_days: i64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            par_threshold_days: DEFAULT_PAR_THRESHOLD_DAYS,
        }
    }
}

/// The three raw tables plus configuration, as handed to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioInput {
    pub borrowers: Vec<BorrowerRecord>,
    pub loans: Vec<LoanRecord>,
    pub payments: Vec<PaymentRecord>,
    #[serde(default)]
    pub config: AnalysisConfig,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_renders_zero_padded() {
        let month = Month {
            year: 2023,
            month: 5,
        };
        assert_eq!(month.to_string(), "2023-05");
    }

    #[test]
    fn test_month_orders_chronologically() {
        let earlier = Month {
            year: 2023,
            month: 12,
        };
        let later = Month {
            year: 2024,
            month: 1,
        };
        assert!(earlier < later);
    }

    #[test]
    fn test_month_parses_own_rendering() {
        let month = Month {
            year: 2024,
            month: 11,
        };
        let parsed: Month = month.to_string().parse().unwrap();
        assert_eq!(parsed, month);
    }

    #[test]
    fn test_month_rejects_garbage() {
        assert!("202403".parse::<Month>().is_err());
        assert!("2024-13".parse::<Month>().is_err());
        assert!("2024-xx".parse::<Month>().is_err());
    }

    #[test]
    fn test_payment_type_round_trips_known_labels() {
        for label in ["REPAYMENT", "INTEREST", "FEES", "PENALTIES", "RECOVERIES"] {
            assert_eq!(PaymentType::from_label(label).label(), label);
        }
    }

    #[test]
    fn test_payment_type_preserves_unknown_labels() {
        let unknown = PaymentType::from_label("CHARGEBACK");
        assert_eq!(unknown, PaymentType::Other("CHARGEBACK".to_string()));
        assert_eq!(unknown.label(), "CHARGEBACK");
    }

    #[test]
    fn test_config_defaults_to_standard_par_threshold() {
        assert_eq!(AnalysisConfig::default().par_threshold_days, 854);
    }

    #[test]
    fn test_portfolio_input_defaults_missing_config() {
        let input: PortfolioInput =
            serde_json::from_str(r#"{"borrowers":[],"loans":[],"payments":[]}"#).unwrap();
        assert_eq!(input.config.par_threshold_days, 854);
    }
}
