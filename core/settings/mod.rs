mod chain;
mod constraint;
mod error;

pub use chain::*;
pub use constraint::*;
pub use error::*;
