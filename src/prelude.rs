//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use aprender_lda::prelude::*;
//! ```

pub use crate::config::{InitStrategy, LdaConfig, LearningMethod};
pub use crate::error::{LdaError, LdaResult};
pub use crate::lda::LatentDirichletAllocation;
pub use crate::partition::{split_by_sizes, split_into_folds, split_into_mini_batches};
pub use crate::primitives::{CsrMatrix, Matrix};
pub use crate::traits::TopicModel;
