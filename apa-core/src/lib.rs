//! Core data model for poly(A) site analysis.
//!
//! This crate holds what every stage of the pipeline shares:
//!
//! - [`models::SiteTable`] and [`models::CountTrack`] for per-position cDNA counts
//! - [`models::ExpressionTable`] and [`models::ReferenceSites`] for the overlay
//!   of raw sites onto a curated poly(A) database
//! - [`models::SequenceSource`], strand aware access to a reference genome
//! - [`project::Project`] and [`project::Layout`], the on-disk arrangement of
//!   experiments and comparisons

pub mod errors;
pub mod models;
pub mod project;
pub mod utils;
