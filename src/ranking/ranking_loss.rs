//! Common contract and shared machinery of the pairwise ranking losses

use super::{DiscriminantLoss, LargeMargin};
use std::fmt;

/// What a caller needs from a loss evaluation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LossRequest {
    /// Scalar loss only
    Value,
    /// Gradient with respect to the scores only
    Gradient,
    /// Both
    ValueAndGradient,
}

impl LossRequest {
    /// Whether the scalar loss is requested
    pub fn wants_value(self) -> bool {
        matches!(self, LossRequest::Value | LossRequest::ValueAndGradient)
    }

    /// Whether the gradient is requested
    pub fn wants_gradient(self) -> bool {
        matches!(self, LossRequest::Gradient | LossRequest::ValueAndGradient)
    }
}

/// Result of a loss evaluation; unrequested parts are `None`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LossOutput {
    /// Normalized loss
    pub value: Option<f64>,
    /// Normalized gradient, one entry per alternative
    pub gradient: Option<Vec<f64>>,
}

impl LossOutput {
    /// Zero loss and zero gradient for `n` alternatives, as requested
    pub fn zero(n: usize, request: LossRequest) -> Self {
        LossOutput {
            value: request.wants_value().then_some(0.0),
            gradient: request.wants_gradient().then(|| vec![0.0; n]),
        }
    }
}

/// Which algorithm evaluated a pairwise loss
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PairwisePath {
    /// No pair of alternatives has different costs
    NoPairs,
    /// Two cost levels, one sort and two pointer sweeps
    Bipartite,
    /// A handful of cost levels, one sort and per-level counters
    FewCosts,
    /// Every pair
    BruteForce,
}

impl fmt::Display for PairwisePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PairwisePath::NoPairs => "no-pairs",
            PairwisePath::Bipartite => "bipartite",
            PairwisePath::FewCosts => "few-costs",
            PairwisePath::BruteForce => "brute-force",
        };
        f.write_str(name)
    }
}

/// Turns per-alternative scores and costs (lower is better) into a loss
///
/// Every contributing ordered pair `(i, j)` with `costs[j] > costs[i]` adds
/// `l(s[i] - s[j]) * (costs[j] - costs[i])` to the loss, and the result is
/// divided by the number of contributing pairs. No contributing pair means
/// zero loss and zero gradient.
///
/// # Panics
/// Implementations panic when `scores` and `costs` differ in length or hold
/// non-finite values.
pub trait RankingLoss: fmt::Debug {
    /// Short identifier, including the discriminant loss
    fn name(&self) -> String;

    /// Evaluate the requested parts of the loss
    fn compute(&self, scores: &[f64], costs: &[f64], request: LossRequest) -> LossOutput;

    /// Normalized scalar loss
    fn value(&self, scores: &[f64], costs: &[f64]) -> f64 {
        self.compute(scores, costs, LossRequest::Value)
            .value
            .unwrap_or(0.0)
    }

    /// Normalized gradient with respect to the scores
    fn gradient(&self, scores: &[f64], costs: &[f64]) -> Vec<f64> {
        self.compute(scores, costs, LossRequest::Gradient)
            .gradient
            .unwrap_or_else(|| vec![0.0; scores.len()])
    }

    /// Normalized loss and gradient
    fn value_and_gradient(&self, scores: &[f64], costs: &[f64]) -> (f64, Vec<f64>) {
        let output = self.compute(scores, costs, LossRequest::ValueAndGradient);
        (
            output.value.unwrap_or(0.0),
            output.gradient.unwrap_or_else(|| vec![0.0; scores.len()]),
        )
    }
}

/// Reject inputs no loss can be computed from
pub(crate) fn check_inputs(scores: &[f64], costs: &[f64]) {
    assert_eq!(
        scores.len(),
        costs.len(),
        "scores and costs must have the same length"
    );
    assert!(
        scores.iter().all(|score| score.is_finite()),
        "scores must be finite: {:?}",
        scores
    );
    assert!(
        costs.iter().all(|cost| cost.is_finite()),
        "costs must be finite: {:?}",
        costs
    );
}

/// Sums pair contributions and normalizes by the number of pairs
pub(crate) struct PairAccumulator<'a> {
    discriminant: &'a dyn DiscriminantLoss,
    scores: &'a [f64],
    request: LossRequest,
    value: f64,
    gradient: Vec<f64>,
    num_pairs: usize,
}

impl<'a> PairAccumulator<'a> {
    pub(crate) fn new(
        discriminant: &'a dyn DiscriminantLoss,
        scores: &'a [f64],
        request: LossRequest,
    ) -> Self {
        PairAccumulator {
            discriminant,
            scores,
            request,
            value: 0.0,
            gradient: if request.wants_gradient() {
                vec![0.0; scores.len()]
            } else {
                Vec::new()
            },
            num_pairs: 0,
        }
    }

    /// Add the pair where `better` should outrank `worse` by `cost_gap > 0`
    pub(crate) fn add_pair(&mut self, better: usize, worse: usize, cost_gap: f64) {
        let margin = self.scores[better] - self.scores[worse];
        if self.request.wants_value() {
            self.value += self.discriminant.value(margin) * cost_gap;
        }
        if self.request.wants_gradient() {
            let derivative = self.discriminant.derivative(margin) * cost_gap;
            self.gradient[better] += derivative;
            self.gradient[worse] -= derivative;
        }
        self.num_pairs += 1;
    }

    pub(crate) fn finish(self) -> LossOutput {
        normalize(self.value, self.gradient, self.num_pairs, self.request)
    }
}

/// Divide accumulated sums by the pair count, zero pairs yielding zeros
pub(crate) fn normalize(
    value: f64,
    mut gradient: Vec<f64>,
    num_pairs: usize,
    request: LossRequest,
) -> LossOutput {
    if num_pairs == 0 {
        return LossOutput::zero(gradient.len(), request);
    }
    let scale = 1.0 / num_pairs as f64;
    for entry in &mut gradient {
        *entry *= scale;
    }
    LossOutput {
        value: request.wants_value().then_some(value * scale),
        gradient: request.wants_gradient().then_some(gradient),
    }
}

/// Alternative indices sorted by decreasing score, ties kept in index order
pub(crate) fn descending_score_order(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order
}

/// The distinct cost values of an example and the level of each alternative
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CostLevels {
    /// Distinct costs, increasing
    pub(crate) levels: Vec<f64>,
    /// Level index of each alternative
    pub(crate) level_of: Vec<usize>,
}

impl CostLevels {
    pub(crate) fn new(costs: &[f64]) -> Self {
        let mut levels = costs.to_vec();
        levels.sort_by(f64::total_cmp);
        levels.dedup_by(|a, b| a == b);
        let level_of = costs
            .iter()
            .map(|cost| levels.partition_point(|level| level < cost))
            .collect();
        CostLevels { levels, level_of }
    }

    pub(crate) fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Number of alternatives per level
    pub(crate) fn level_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.levels.len()];
        for &level in &self.level_of {
            sizes[level] += 1;
        }
        sizes
    }

    /// Pairs of alternatives with different costs
    pub(crate) fn num_pairs(&self) -> usize {
        let sizes = self.level_sizes();
        let total: usize = sizes.iter().sum();
        let same_level: usize = sizes.iter().map(|size| size * size).sum();
        (total * total - same_level) / 2
    }
}

/// Whether the few-costs sweep should replace brute force for `n` alternatives
/// spread over `num_levels` cost levels
pub fn has_few_different_costs(n: usize, num_levels: usize) -> bool {
    n > 3 && (n as f64) < 2.5 * num_levels as f64
}

/// Choose the pairwise algorithm; fast paths only produce gradients
pub(crate) fn select_path(
    levels: &CostLevels,
    request: LossRequest,
    large_margin: Option<LargeMargin>,
) -> PairwisePath {
    let num_levels = levels.num_levels();
    if num_levels <= 1 {
        PairwisePath::NoPairs
    } else if request.wants_value() || large_margin.is_none() {
        PairwisePath::BruteForce
    } else if num_levels == 2 {
        PairwisePath::Bipartite
    } else if has_few_different_costs(levels.level_of.len(), num_levels) {
        PairwisePath::FewCosts
    } else {
        PairwisePath::BruteForce
    }
}
