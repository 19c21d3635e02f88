use napi::Result as NapiResult;
use napi_derive::napi;

use loan_tape_core::types::{AnalysisConfig, PortfolioInput};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Run the full portfolio analysis over a JSON tape with `borrowers`,
/// `loans` and `payments` tables and an optional `config` block.
#[napi]
pub fn analyze_loan_tape(input_json: String) -> NapiResult<String> {
    let input: PortfolioInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = loan_tape_core::analyze_portfolio(input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// The configuration the analysis runs with when none is supplied.
#[napi]
pub fn default_analysis_config() -> NapiResult<String> {
    serde_json::to_string(&AnalysisConfig::default()).map_err(to_napi_error)
}
