//! Taskboard: ordered task lists with optimistic, persisted reordering.
//!
//! This crate keeps a small kanban-style board of fixed lists and provides
//! the pieces a UI host needs to edit it safely: a pure reorder engine that
//! preserves dense per-list ordering, a snapshot codec with schema
//! versioning, snapshot stores, and a sync controller that applies changes
//! immediately and saves them in the background.
//!
//! # Architecture
//!
//! Taskboard follows hexagonal architecture principles:
//!
//! - **Domain**: Board model, reorder engine and snapshot codec
//! - **Ports**: The snapshot store contract
//! - **Adapters**: In-memory and JSON file stores
//! - **Services**: The sync controller and host-facing triggers
//!
//! # Modules
//!
//! - [`board`]: Board model, persistence and synchronization
//! - [`config`]: Board and controller configuration

pub mod board;
pub mod config;
