pub mod ports;
pub mod store;
pub mod prompt;
pub mod tools;
pub mod event_bus;
pub mod session;
pub mod executor;
pub mod dispatcher;
pub mod conversation;
pub mod persistence;
pub mod defaults;
pub mod runtime;

#[cfg(test)]
mod tests;

pub use runtime::{ArchiveRuntime, TurnOutcome};
