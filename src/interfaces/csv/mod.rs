//! CSV adapters used by the replay CLI.

pub mod balance_reader;
pub mod balance_writer;
pub mod event_reader;
