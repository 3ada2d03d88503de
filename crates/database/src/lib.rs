//! # navloader Database Crate
//!
//! This crate is the application-specific interface to the relational store
//! that holds funds and their NAV history.
//!
//! ## Architectural Principles
//!
//! - **Adapter:** All SQL lives here. The loader talks to the [`FundStore`]
//!   trait and never sees a connection or a query.
//! - **Scoped transactions:** Every write owns its transaction for the length
//!   of one call and rolls back if it does not reach commit.
//! - **Asynchronous & Pooled:** Operations are async and share a `PgPool`, so
//!   many batch transactions can be open at once.
//!
//! ## Public API
//!
//! - `connect` / `run_migrations`: pool creation and schema setup.
//! - `FundStore`: the capability interface used by the loader.
//! - `DbRepository`: the PostgreSQL implementation.
//! - `InMemoryStore`: a process-local implementation for dry runs and tests.
//! - `DbError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod memory;
pub mod repository;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use memory::InMemoryStore;
pub use repository::{DbRepository, FundStore, NAV_BIND_PARAMS, PG_BIND_LIMIT};
