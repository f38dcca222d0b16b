//! pgdrift introspection - live PostgreSQL schema loading
//!
//! Reads `pg_catalog` over a `tokio-postgres` connection and produces
//! the same `Schema` model the DDL parser produces, so the comparator
//! never needs to know whether a schema came from files or from a
//! database.

mod postgres;

pub use postgres::*;
