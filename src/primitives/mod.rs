//! Core compute primitives (dense Matrix, sparse CsrMatrix).
//!
//! These types provide the storage for every topic-model quantity.

mod matrix;
mod sparse;

pub use matrix::Matrix;
pub use sparse::{CsrMatrix, SparseRow};
