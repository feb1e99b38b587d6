//! Core domain types and the collaborator ports the engine is written
//! against.

pub mod audit;
pub mod balance;
pub mod job;
pub mod ports;
pub mod transaction;
