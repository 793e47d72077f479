//! Core types and error definitions for Binwise.
//!
//! This crate provides the foundational types shared across all Binwise crates:
//! the error taxonomy and the classification result.
//!
//! # Main types
//!
//! - [`BinwiseError`] — Unified error enum for all Binwise subsystems.
//! - [`BinwiseResult`] — Convenience alias for `Result<T, BinwiseError>`.
//! - [`EmbeddingError`] — Failure modes of the embedding service.
//! - [`ClassifyError`] — A failed classification tagged with its pipeline stage.
//! - [`Classification`] — The `{object_name, bin_type}` result.

/// Classification result and bin-label helpers.
pub mod classification;
/// Error types.
pub mod error;

pub use classification::{display_bin, known_bin, Classification, NONE_LABEL};
pub use error::{BinwiseError, BinwiseResult, ClassifyError, EmbeddingError};
