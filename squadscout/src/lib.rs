//! SquadScout: recognize an opposing roster from portraits or text, name
//! the team, and recommend counters.

mod config;
pub use config::Config;
mod error;
pub use error::SlotError;
mod manifest;
pub use manifest::{Manifest, SlotInput};
mod session;
pub use session::*;
