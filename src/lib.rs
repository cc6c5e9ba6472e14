#![deny(missing_docs)]
//! Telegram bot for posting and browsing text, photo, audio and voice advertisements.

/// Telegram handlers, views, and per-user flow.
pub mod bot;
/// Settings and runtime constants.
pub mod config;
/// Page slicing of the ad collection.
pub mod pagination;
/// Dispatcher setup and entrypoint.
pub mod runner;
/// Persistent advertisement storage.
pub mod storage;
/// Shared helpers.
pub mod utils;
