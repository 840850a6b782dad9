//! # Feature-ML: hierarchical feature vectors and pairwise ranking losses
//!
//! This library implements named, scoped feature vectors for linear models,
//! together with the pairwise ranking losses used to train them.
//!
//! ## Features
//!
//! - **Dictionaries**: shared naming trees mapping features and scopes to indices
//! - **Vectors**: sparse, dense, lazy and composite feature generators
//! - **Visitors**: one traversal protocol for norms, dot products, accumulation and rendering
//! - **Ranking**: all-pairs, best-against-all and most-violated-pair losses with
//!   pluggable discriminant losses and sub-quadratic fast paths

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Feature and scope naming trees
pub mod dictionary;

/// Feature generators and vector representations
pub mod vector;

/// Traversal protocol and the visitors built on it
pub mod visitor;

/// Pairwise ranking losses
pub mod ranking;

/// Serializable loss configuration
pub mod config;

// Re-export commonly used types
pub use dictionary::{DictionaryRef, FeatureDictionary};
pub use vector::{DenseVector, FeatureGenerator, GeneratorRef, LazyVector, SparseVector};
pub use ranking::{RankingExample, RankingLoss};
pub use config::RankingConfig;

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum FeatureMLError {
    /// Invalid loss or initialization configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Ranking example whose alternatives and costs do not fit together
    #[error("Invalid example: {0}")]
    InvalidExample(String),

    /// Snapshot that cannot be loaded into the given dictionary
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for the library
pub type Result<T> = std::result::Result<T, FeatureMLError>;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        config::{DiscriminantKind, RankingConfig, RankingLossKind},
        dictionary::{DictionaryRef, FeatureDictionary},
        ranking::{
            AllPairsLoss, BestAgainstAllLoss, DiscriminantLoss, HingeLoss, LogBinomialLoss,
            MostViolatedPairLoss, RankingExample, RankingLoss,
        },
        vector::{
            CompositeFeatureGenerator, DenseVector, FeatureGenerator, GeneratorRef, LazyVector,
            SparseVector,
        },
        FeatureMLError, Result,
    };
}
