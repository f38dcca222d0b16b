//! pgdrift schema tools - comparison, diff, and migration generation
//!
//! This crate provides the back half of the pgdrift pipeline:
//! - Comparing two schema models into a structured diff
//! - Ordering table creations by foreign-key dependencies
//! - Generating forward-migration SQL from a diff
//! - Rendering diffs as human-readable reports

pub mod compare;
pub mod migration;
pub mod report;

pub use compare::*;
pub use migration::*;
pub use report::*;
