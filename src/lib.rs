//! # dispatchq
//!
//! Bounded task dispatch: many producers submit requests into a fixed-size
//! FIFO queue, a fixed pool of workers services them and replies directly
//! to the submitter, and producers abandon attempts that are not accepted
//! within a deadline.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod model;
pub mod producer;
pub mod queue;
pub mod simulator;
pub mod telemetry;
pub mod worker;
