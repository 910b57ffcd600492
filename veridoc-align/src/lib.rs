#![forbid(unsafe_code)]

//! Tetrad similarity and alignment.
//!
//! Documentation variables and code-derived variables drift apart in naming
//! (`n_components` vs `ncomp`). This crate scores how well two tetrads
//! correspond despite that drift, substitutes best-matching path variable
//! names into constraint tetrads, and aggregates per-tetrad scores through a
//! formula skeleton into one confidence score per constraint.

mod similarity;

pub use similarity::{
    align, levenshtein, name_similarity, op_similarity, similarity, total_similarity, Aligned,
    BATCH_SIZE_NAME, REVERSED_DISCOUNT,
};
