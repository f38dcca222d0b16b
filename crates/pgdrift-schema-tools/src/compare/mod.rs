//! Schema comparison module
//!
//! Compares two schema models and reduces their differences to a
//! structured `SchemaDiff`.

mod comparator;
mod diff;

#[cfg(test)]
mod tests;

pub use comparator::*;
pub use diff::*;
