//! Task board ordering and persistence.
//!
//! A board is a fixed set of lists, each holding an ordered sequence of
//! tasks. Every change goes through the pure reorder engine, is shown to the
//! user at once, and is persisted in the background by the sync controller.
//! The module follows hexagonal architecture:
//!
//! - Domain types and the reorder engine in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
