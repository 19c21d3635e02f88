pub mod aggregate;
pub mod derive;
pub mod error;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod types;

pub use error::LoanTapeError;
pub use pipeline::{analyze_portfolio, PortfolioReport};
pub use types::*;

/// Standard result type for all loan-tape operations
pub type LoanTapeResult<T> = Result<T, LoanTapeError>;
