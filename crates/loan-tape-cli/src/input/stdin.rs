use loan_tape_core::types::PortfolioInput;
use std::io::{self, Read};

/// Attempt to read a JSON portfolio from stdin if data is being piped.
/// Returns None if stdin is a TTY (interactive).
pub fn read_portfolio() -> Result<Option<PortfolioInput>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let portfolio: PortfolioInput = serde_json::from_str(trimmed)?;
    Ok(Some(portfolio))
}
