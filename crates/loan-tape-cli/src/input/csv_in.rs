use csv::ReaderBuilder;
use serde::de::DeserializeOwned;
use std::fs;

use loan_tape_core::types::{BorrowerRecord, LoanRecord, PaymentRecord};
use loan_tape_core::LoanTapeError;

const BORROWER_COLUMNS: &[&str] = &["borrower_id"];

const LOAN_COLUMNS: &[&str] = &[
    "loan_id",
    "borrower_id",
    "principal_amount",
    "total_outstanding",
    "interest_rate",
    "penalties",
    "fees",
    "product_name",
    "as_of_datetime",
    "maturity_date",
    "default_date",
    "write_off_date",
    "write_off_amount",
    "closing_date",
];

const PAYMENT_COLUMNS: &[&str] = &["loan_id", "payment_date", "amount", "type"];

pub fn load_borrowers(path: &str) -> Result<Vec<BorrowerRecord>, Box<dyn std::error::Error>> {
    let text = read_file_lossy(path)?;
    Ok(parse_borrowers(&text)?)
}

pub fn load_loans(path: &str) -> Result<Vec<LoanRecord>, Box<dyn std::error::Error>> {
    let text = read_file_lossy(path)?;
    Ok(parse_loans(&text)?)
}

pub fn load_payments(path: &str) -> Result<Vec<PaymentRecord>, Box<dyn std::error::Error>> {
    let text = read_file_lossy(path)?;
    Ok(parse_payments(&text)?)
}

fn parse_borrowers(text: &str) -> Result<Vec<BorrowerRecord>, LoanTapeError> {
    parse_table(text, "borrowers", BORROWER_COLUMNS)
}

fn parse_loans(text: &str) -> Result<Vec<LoanRecord>, LoanTapeError> {
    parse_table(text, "loans", LOAN_COLUMNS)
}

fn parse_payments(text: &str) -> Result<Vec<PaymentRecord>, LoanTapeError> {
    parse_table(text, "payments", PAYMENT_COLUMNS)
}

/// Parse one CSV table: validate the header against the required column set,
/// then deserialize row by row. Cell values may be empty; columns may not be
/// absent.
fn parse_table<T: DeserializeOwned>(
    text: &str,
    table: &str,
    required: &[&str],
) -> Result<Vec<T>, LoanTapeError> {
    let mut reader = ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| LoanTapeError::MalformedColumn {
            table: table.to_string(),
            column: "<header>".to_string(),
            reason: e.to_string(),
        })?
        .clone();

    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(LoanTapeError::MissingColumn {
                table: table.to_string(),
                column: column.to_string(),
            });
        }
    }

    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: T = record.map_err(|e| malformed(table, &headers, e))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Map a csv deserialization error back to the column it occurred in.
fn malformed(table: &str, headers: &csv::StringRecord, err: csv::Error) -> LoanTapeError {
    let column = match err.kind() {
        csv::ErrorKind::Deserialize { err: de, .. } => de
            .field()
            .and_then(|idx| headers.get(idx as usize))
            .unwrap_or("<row>")
            .to_string(),
        _ => "<row>".to_string(),
    };
    LoanTapeError::MalformedColumn {
        table: table.to_string(),
        column,
        reason: err.to_string(),
    }
}

fn read_file_lossy(path: &str) -> Result<String, Box<dyn std::error::Error>> {
    let bytes = fs::read(path).map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    Ok(decode_lossy(&bytes))
}

/// Decode as UTF-8, falling back to Latin-1 when the bytes do not parse.
/// Loan tapes exported from older core-banking systems still arrive in
/// Latin-1 often enough to matter.
fn decode_lossy(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
