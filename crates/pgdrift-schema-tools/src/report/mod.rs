//! Report rendering module
//!
//! Renders schema diffs as human-readable text or Markdown.

mod renderer;

#[cfg(test)]
mod tests;

pub use renderer::*;
