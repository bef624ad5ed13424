pub mod combat_state;
pub mod handler;
pub mod processor;
pub mod signal;


pub use handler::{SignalHandler, dispatch_signals};
pub use processor::EventProcessor;
pub use signal::GameSignal;
