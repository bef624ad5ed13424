//! OSSUS core: combat log parsing and state aggregation.
//!
//! Raw lines flow through the tokenizer and parser into typed events, the
//! rectifier restores a deterministic timeline, and the event processor
//! folds the ordered stream into encounters and queryable session state.
//! Front-ends (overlays, grids, recaps) consume the signal stream and the
//! point-in-time query API; nothing in here renders anything.

pub mod combat_log;
pub mod context;
pub mod encounter;
pub mod game_data;
pub mod reader;
pub mod session;
pub mod signal_processor;
pub mod state;

// Re-exports for convenience
pub use combat_log::{CombatEvent, LogParser, MalformedLine, rectify};
pub use context::{IStr, intern, resolve};
pub use session::{ParsingSession, ReparseOutcome, SessionError};
pub use signal_processor::{EventProcessor, GameSignal, SignalHandler};
pub use state::SessionCache;
