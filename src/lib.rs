//! Aprender LDA: online variational Bayes for Latent Dirichlet Allocation.
//!
//! Learns topics from document-term count matrices with the stochastic
//! variational scheme of Hoffman, Blei and Bach: a per-document E-step
//! fixed point, a decayed-learning-rate M-step on the shared topic-word
//! parameters, and optional data-parallel fan-out of the E-step.
//!
//! # Quick Start
//!
//! ```
//! use aprender_lda::prelude::*;
//!
//! // Two groups of documents over disjoint vocabulary
//! let dtm = Matrix::from_vec(4, 4, vec![
//!     3.0, 3.0, 0.0, 0.0,
//!     2.0, 4.0, 0.0, 0.0,
//!     0.0, 0.0, 3.0, 3.0,
//!     0.0, 0.0, 4.0, 2.0,
//! ]).expect("4x4");
//! let x = CsrMatrix::from_dense(&dtm);
//!
//! let mut lda = LatentDirichletAllocation::new(2);
//! let doc_topics = lda.fit_transform(&x, 10).expect("fit should succeed");
//! let perplexity = lda.perplexity(&x, &doc_topics, false).expect("perplexity");
//! assert!(perplexity < 4.0);
//!
//! // Or stream the corpus in as mini-batches
//! let mut online = LatentDirichletAllocation::new(2).with_total_samples(4.0);
//! for batch in split_into_mini_batches(&x, 2).expect("batch size 2") {
//!     online.partial_fit(&batch).expect("partial_fit should succeed");
//! }
//! assert_eq!(online.n_batch_iter(), 2);
//! ```
//!
//! # Modules
//!
//! - [`primitives`]: Dense `Matrix` and sparse `CsrMatrix` types
//! - [`partition`]: Batch, fold and mini-batch row splitting
//! - [`estep`]: Per-document variational inference
//! - [`mstep`]: Learning-rate schedule and topic-word update
//! - [`parallel`]: Sharded E-step driver
//! - [`lda`]: The `LatentDirichletAllocation` estimator
//! - [`model_selection`]: Cross-validated held-out perplexity

pub mod config;
pub mod error;
pub mod estep;
pub mod init;
pub mod lda;
pub mod model_selection;
pub mod mstep;
pub mod parallel;
pub mod partition;
pub mod prelude;
pub mod primitives;
pub mod special;
pub mod traits;

pub use config::{InitStrategy, LdaConfig, LearningMethod};
pub use error::{LdaError, LdaResult};
pub use lda::LatentDirichletAllocation;
pub use primitives::{CsrMatrix, Matrix};
pub use traits::TopicModel;
