//! Core types and the queue engine for the Triage walk-in service queue.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! [`manager::QueueManager`] is written entirely against the
//! [`store::QueueStore`] trait; concrete backends live in other crates (or,
//! for tests and embedding, in [`memory`]).

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod index;
pub mod manager;
pub mod memory;
pub mod priority;
pub mod store;
pub mod ticket;
pub mod ticket_number;

pub use error::{Error, Result};
pub use manager::{QueueConfig, QueueManager, Removal, SyncReport};
pub use ticket::{NewTicket, PriorityClass, ServiceWindow, Ticket, TicketStatus};
pub use ticket_number::TicketNumber;

#[cfg(test)]
mod tests;
