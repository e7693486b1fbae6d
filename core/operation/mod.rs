mod error;
mod postback;
mod status;

pub use error::*;
pub use postback::*;
pub use status::*;
