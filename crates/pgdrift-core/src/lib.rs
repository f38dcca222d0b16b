//! pgdrift core - schema model and normalization rules
//!
//! This crate provides the types the rest of pgdrift operates on:
//!
//! - `Schema` / `TableDef` / `Column` - the table model built by the DDL
//!   parser and the live-database introspection adapter
//! - `ColumnConstraint` / `TableConstraint` - constraint sum types
//! - `normalize` - equivalence rules for type names, expressions, and
//!   identifiers
//!
//! Both schema producers emit the same model, so downstream consumers
//! never need to know where a schema came from.

mod error;
pub mod normalize;
mod schema;

pub use error::*;
pub use schema::*;
