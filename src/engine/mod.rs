//! Core engine: the trading session and its timer.

pub mod controller;
pub mod journal;
pub mod session;

pub use controller::SessionController;
pub use session::{Session, SessionSnapshot, StepOutcome};
