/// Store-facing outcomes of user actions
pub mod actions;
/// Inline button handlers
pub mod ad_handlers;
/// Inline button tokens
pub mod callbacks;
/// Per-user pending submissions
pub mod flow;
/// Command and message handlers
pub mod handlers;
/// Paginated listing
pub mod listing;
/// Telegram calls with retry and graceful degradation
pub mod resilient;
/// Messages and keyboards
pub mod views;

pub use flow::FlowController;
