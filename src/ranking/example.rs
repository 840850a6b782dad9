//! Ranking examples: alternatives described by features, plus their costs

use super::RankingLoss;
use crate::dictionary::{same_dictionary, FeatureDictionary};
use crate::vector::{
    linear_combination, CompositeFeatureGenerator, DenseVector, FeatureGenerator, GeneratorRef,
    LazyVector,
};
use crate::{FeatureMLError, Result};
use ndarray::Array1;

/// Alternatives to rank, one scope each, with a parallel cost per alternative
///
/// Lower costs are better; alternatives sharing a cost are never compared.
/// Scores are linear: `score(i) = <alternative(i), parameters>`.
#[derive(Clone, Debug)]
pub struct RankingExample {
    alternatives: CompositeFeatureGenerator,
    costs: Vec<f64>,
}

impl RankingExample {
    /// Wrap an existing composite of alternatives
    ///
    /// Fails when the composite has an empty slot, when the counts differ or
    /// when a cost is not finite.
    pub fn new(alternatives: CompositeFeatureGenerator, costs: Vec<f64>) -> Result<Self> {
        if alternatives.num_sub_generators() != costs.len() {
            return Err(FeatureMLError::InvalidExample(format!(
                "{} alternatives but {} costs",
                alternatives.num_sub_generators(),
                costs.len()
            )));
        }
        if let Some(missing) =
            (0..costs.len()).find(|&index| alternatives.sub_generator(index).is_none())
        {
            return Err(FeatureMLError::InvalidExample(format!(
                "alternative {} has no feature generator",
                missing
            )));
        }
        if let Some(cost) = costs.iter().find(|cost| !cost.is_finite()) {
            return Err(FeatureMLError::InvalidExample(format!(
                "costs must be finite, got {}",
                cost
            )));
        }
        Ok(RankingExample {
            alternatives,
            costs,
        })
    }

    /// Build an example whose alternatives all live in one feature space
    ///
    /// Alternative `i` is placed under scope `"i"` of a fresh dictionary called `name`.
    pub fn from_alternatives(
        name: &str,
        alternatives: Vec<GeneratorRef>,
        costs: Vec<f64>,
    ) -> Result<Self> {
        let mut shared = None;
        for (index, alternative) in alternatives.iter().enumerate() {
            match (&shared, alternative.dictionary()) {
                (None, Some(dictionary)) => shared = Some(dictionary),
                (Some(first), Some(dictionary)) if !same_dictionary(first, &dictionary) => {
                    return Err(FeatureMLError::InvalidExample(format!(
                        "alternative {} uses dictionary '{}' instead of '{}'",
                        index,
                        dictionary.name(),
                        first.name()
                    )));
                }
                _ => {}
            }
        }
        let mut composite = CompositeFeatureGenerator::new(FeatureDictionary::new(name));
        for alternative in alternatives {
            composite.append(alternative);
        }
        RankingExample::new(composite, costs)
    }

    /// Number of alternatives
    pub fn num_alternatives(&self) -> usize {
        self.costs.len()
    }

    /// The alternatives as one generator, alternative `i` under scope `i`
    pub fn input(&self) -> &CompositeFeatureGenerator {
        &self.alternatives
    }

    /// Alternative `index`
    pub fn alternative(&self, index: usize) -> Option<&GeneratorRef> {
        self.alternatives.sub_generator(index)
    }

    /// Cost of every alternative
    pub fn costs(&self) -> &[f64] {
        &self.costs
    }

    /// Linear score of every alternative
    ///
    /// # Panics
    /// If an alternative does not share the dictionary of `parameters`.
    pub fn scores(&self, parameters: &DenseVector) -> Array1<f64> {
        Array1::from(self.score_vec(parameters))
    }

    /// `Σ_i alternative_gradient[i] * alternative(i)`: the loss gradient with
    /// respect to linear parameters, kept symbolic
    pub fn parameters_gradient(&self, alternative_gradient: &[f64]) -> LazyVector {
        linear_combination(&self.alternatives, alternative_gradient)
    }

    /// Loss value and parameter gradient of `loss` at `parameters`
    pub fn compute(&self, loss: &dyn RankingLoss, parameters: &DenseVector) -> (f64, LazyVector) {
        let scores = self.score_vec(parameters);
        let (value, gradient) = loss.value_and_gradient(&scores, &self.costs);
        (value, self.parameters_gradient(&gradient))
    }

    fn score_vec(&self, parameters: &DenseVector) -> Vec<f64> {
        (0..self.num_alternatives())
            .map(|index| {
                self.alternatives
                    .sub_generator(index)
                    .map_or(0.0, |alternative| alternative.dot_product(parameters))
            })
            .collect()
    }
}
