mod channel;
mod consumer;
pub mod event;

pub use channel::*;
pub use consumer::*;
pub use event::Event;
