//! Feature generators and their concrete representations
//!
//! - [`SparseVector`] and [`DenseVector`] store values
//! - [`LazyVector`] defers a weighted sum of shared generators
//! - composite, sum, sub and scaled generators describe structure without copying

mod generator;
mod sparse;
mod dense;
mod lazy;
mod composite;
mod primitives;
mod combinators;
mod snapshot;

pub use generator::{dot_product_with, FeatureGenerator, GeneratorRef};
pub use sparse::SparseVector;
pub use dense::DenseVector;
pub use lazy::{LazyVector, Materialized};
pub use composite::{CompositeFeatureGenerator, SubFeatureGenerator, SumFeatureGenerator};
pub use primitives::{unit_dictionary, EmptyFeatureGenerator, UnitFeatureGenerator};
pub use combinators::{
    addition, difference, linear_combination, multiply_by_scalar, weighted_sum,
    ScaledFeatureGenerator,
};
pub use snapshot::{ScopeSnapshot, VectorSnapshot};
