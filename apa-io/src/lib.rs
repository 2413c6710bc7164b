//! # Input/Output utilities for poly(A) site data.
//!
//! Interval files are the exchange format between pipeline stages: one row
//! per position, `chr start end value`, with reverse strand counts written
//! negative. Status markers record whether a sample's artifacts are complete.
//!
pub mod error;
pub mod interval;
pub mod status;

// re-expose core functions
pub use error::*;
pub use interval::*;
pub use status::*;
