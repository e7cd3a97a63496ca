pub mod error;
pub mod types;
pub mod contracts;
pub mod chain;
pub mod prompt;
pub mod participants;
pub mod llm;
pub mod command;
pub mod engine;
pub mod wallet;
pub mod swap;
pub mod ledger;

pub use error::RoomError;
pub use types::*;
