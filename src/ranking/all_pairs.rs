//! Loss over every pair of alternatives with different costs

use super::ranking_loss::{
    check_inputs, descending_score_order, normalize, select_path, CostLevels, PairAccumulator,
};
use super::{DiscriminantLoss, LargeMargin, LossOutput, LossRequest, PairwisePath, RankingLoss};

/// Relative tolerance of the fast-path cross-check
const CROSS_CHECK_TOLERANCE: f64 = 1e-9;

/// Pairwise ranking loss over all ordered pairs `(i, j)` with `costs[j] > costs[i]`
///
/// With a large-margin discriminant and a gradient-only request, cost
/// vectors with two levels (or few levels) are handled by O(n log n) sweeps
/// over a single score sort instead of the O(n²) pair loop.
#[derive(Debug)]
pub struct AllPairsLoss {
    discriminant: Box<dyn DiscriminantLoss>,
    cross_check: bool,
}

impl AllPairsLoss {
    /// Create the loss around a discriminant loss
    pub fn new(discriminant: Box<dyn DiscriminantLoss>) -> Self {
        AllPairsLoss {
            discriminant,
            cross_check: false,
        }
    }

    /// Recompute every fast-path result by brute force and panic on disagreement
    pub fn with_cross_check(mut self, enabled: bool) -> Self {
        self.cross_check = enabled;
        self
    }

    /// The pluggable discriminant loss
    pub fn discriminant(&self) -> &dyn DiscriminantLoss {
        self.discriminant.as_ref()
    }

    /// Algorithm used for these costs and this request
    pub fn path(&self, costs: &[f64], request: LossRequest) -> PairwisePath {
        select_path(
            &CostLevels::new(costs),
            request,
            self.discriminant.large_margin(),
        )
    }

    /// Reference O(n²) evaluation
    pub fn brute_force(&self, scores: &[f64], costs: &[f64], request: LossRequest) -> LossOutput {
        check_inputs(scores, costs);
        let mut accumulator = PairAccumulator::new(self.discriminant.as_ref(), scores, request);
        for (better, &better_cost) in costs.iter().enumerate() {
            for (worse, &worse_cost) in costs.iter().enumerate() {
                if worse_cost > better_cost {
                    accumulator.add_pair(better, worse, worse_cost - better_cost);
                }
            }
        }
        accumulator.finish()
    }
}

impl RankingLoss for AllPairsLoss {
    fn name(&self) -> String {
        format!("all-pairs({})", self.discriminant.name())
    }

    fn compute(&self, scores: &[f64], costs: &[f64], request: LossRequest) -> LossOutput {
        check_inputs(scores, costs);
        let levels = CostLevels::new(costs);
        let large_margin = self.discriminant.large_margin();
        let path = select_path(&levels, request, large_margin);
        tracing::debug!(
            loss = "all-pairs",
            path = %path,
            alternatives = scores.len(),
            cost_levels = levels.num_levels(),
            "ranking loss dispatch"
        );

        let fast_gradient = match (path, large_margin) {
            (PairwisePath::NoPairs, _) => return LossOutput::zero(scores.len(), request),
            (PairwisePath::Bipartite, Some(large_margin)) => {
                bipartite_gradient(scores, &levels, large_margin)
            }
            (PairwisePath::FewCosts, Some(large_margin)) => {
                few_costs_gradient(scores, &levels, large_margin)
            }
            _ => return self.brute_force(scores, costs, request),
        };
        let output = normalize(0.0, fast_gradient, levels.num_pairs(), LossRequest::Gradient);
        if self.cross_check {
            let expected = self.brute_force(scores, costs, LossRequest::Gradient);
            cross_check(&self.name(), path, &output, &expected);
        }
        output
    }
}

/// Un-normalized gradient for two cost levels
///
/// Better alternatives are swept by decreasing score while a pointer counts
/// the worse alternatives still inside the margin window; worse alternatives
/// are swept the other way. Both pointers only move forward.
fn bipartite_gradient(scores: &[f64], levels: &CostLevels, large_margin: LargeMargin) -> Vec<f64> {
    let n = scores.len();
    let order = descending_score_order(scores);
    let step = large_margin.slope * (levels.levels[1] - levels.levels[0]);
    let mut gradient = vec![0.0; n];

    let mut pointer = 0;
    let mut active_worse = 0usize;
    for &better in order.iter().filter(|&&i| levels.level_of[i] == 0) {
        while pointer < n && large_margin.is_active(scores[better] - scores[order[pointer]]) {
            if levels.level_of[order[pointer]] == 1 {
                active_worse += 1;
            }
            pointer += 1;
        }
        gradient[better] += step * active_worse as f64;
    }

    let mut pointer = 0;
    let mut active_better = 0usize;
    for &worse in order.iter().rev().filter(|&&j| levels.level_of[j] == 1) {
        while pointer < n
            && large_margin.is_active(scores[order[n - 1 - pointer]] - scores[worse])
        {
            if levels.level_of[order[n - 1 - pointer]] == 0 {
                active_better += 1;
            }
            pointer += 1;
        }
        gradient[worse] -= step * active_better as f64;
    }
    gradient
}

/// Un-normalized gradient for any number of cost levels
///
/// Same two sweeps as the bipartite case, with one active counter per cost
/// level; each alternative then pays the cost gap to every other level.
fn few_costs_gradient(scores: &[f64], levels: &CostLevels, large_margin: LargeMargin) -> Vec<f64> {
    let n = scores.len();
    let num_levels = levels.num_levels();
    let order = descending_score_order(scores);
    let mut gradient = vec![0.0; n];

    let mut active = vec![0usize; num_levels];
    let mut pointer = 0;
    for &better in &order {
        while pointer < n && large_margin.is_active(scores[better] - scores[order[pointer]]) {
            active[levels.level_of[order[pointer]]] += 1;
            pointer += 1;
        }
        let level = levels.level_of[better];
        let weighted: f64 = (level + 1..num_levels)
            .map(|worse_level| {
                (levels.levels[worse_level] - levels.levels[level]) * active[worse_level] as f64
            })
            .sum();
        gradient[better] += large_margin.slope * weighted;
    }

    let mut active = vec![0usize; num_levels];
    let mut pointer = 0;
    for &worse in order.iter().rev() {
        while pointer < n
            && large_margin.is_active(scores[order[n - 1 - pointer]] - scores[worse])
        {
            active[levels.level_of[order[n - 1 - pointer]]] += 1;
            pointer += 1;
        }
        let level = levels.level_of[worse];
        let weighted: f64 = (0..level)
            .map(|better_level| {
                (levels.levels[level] - levels.levels[better_level]) * active[better_level] as f64
            })
            .sum();
        gradient[worse] -= large_margin.slope * weighted;
    }
    gradient
}

fn cross_check(name: &str, path: PairwisePath, fast: &LossOutput, expected: &LossOutput) {
    let (Some(fast), Some(expected)) = (&fast.gradient, &expected.gradient) else {
        return;
    };
    for (index, (&a, &b)) in fast.iter().zip(expected).enumerate() {
        let tolerance = CROSS_CHECK_TOLERANCE * a.abs().max(b.abs()).max(1.0);
        if (a - b).abs() > tolerance {
            tracing::error!(
                loss = %name,
                path = %path,
                index,
                fast = a,
                brute_force = b,
                "fast path disagrees with brute force"
            );
            panic!(
                "{}: {} gradient differs from brute force at {} ({} vs {})",
                name, path, index, a, b
            );
        }
    }
}
