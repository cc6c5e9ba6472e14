//! View layer for Telegram bot UI
//!
//! Separates presentation (messages, keyboards) from handler logic.

/// Ads board messages and keyboards
pub mod ads;

pub use ads::*;
