//! Core data model for the overlay.
//!
//! Commands flow in from the scheduler, actions flow back from the display
//! surface, and both end up as records in the day's event log.

mod action;
mod command;
mod platform;
mod record;

pub use action::Action;
pub use command::{Command, Level};
pub use platform::Platform;
pub use record::Record;
