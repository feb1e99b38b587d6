//! Application layer: synchronous transaction intake and the asynchronous
//! processing engine that drains the job queue.

pub mod processor;
pub mod service;
