//! Application layer containing the transaction processor.
//!
//! `TransactionProcessor` is the only entry point the saga orchestrator
//! calls. Each call runs as one unit of work against the injected store;
//! concurrent calls for the same customer serialize on the balance row lock.

pub mod processor;
