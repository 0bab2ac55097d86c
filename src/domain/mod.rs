//! Domain model of the payment participant: balances, payments, the events
//! that move them, and the ports the stores implement.

pub mod balance;
pub mod event;
pub mod ids;
pub mod payment;
pub mod ports;
