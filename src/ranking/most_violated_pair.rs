//! Loss restricted to the single worst-violated pair

use super::ranking_loss::{check_inputs, select_path, CostLevels, PairAccumulator};
use super::{DiscriminantLoss, LossOutput, LossRequest, PairwisePath, RankingLoss};

/// The pair with the largest contribution `l(s[better] - s[worse]) * (c[worse] - c[better])`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViolatedPair {
    /// Alternative that should be ranked higher
    pub better: usize,
    /// Alternative that should be ranked lower
    pub worse: usize,
    /// Weighted discriminant loss of the pair
    pub contribution: f64,
}

impl ViolatedPair {
    fn beats(&self, other: &ViolatedPair) -> bool {
        self.contribution > other.contribution
            || (self.contribution == other.contribution
                && (self.better, self.worse) < (other.better, other.worse))
    }
}

/// Penalizes only the pair that all-pairs evaluation would weigh the most
///
/// Ties between equally violated pairs go to the smallest `(better, worse)`.
#[derive(Debug)]
pub struct MostViolatedPairLoss {
    discriminant: Box<dyn DiscriminantLoss>,
    cross_check: bool,
}

impl MostViolatedPairLoss {
    /// Create the loss around a discriminant loss
    pub fn new(discriminant: Box<dyn DiscriminantLoss>) -> Self {
        MostViolatedPairLoss {
            discriminant,
            cross_check: false,
        }
    }

    /// Recompute every fast-path pair by brute force and panic on disagreement
    pub fn with_cross_check(mut self, enabled: bool) -> Self {
        self.cross_check = enabled;
        self
    }

    /// The pluggable discriminant loss
    pub fn discriminant(&self) -> &dyn DiscriminantLoss {
        self.discriminant.as_ref()
    }

    /// Find the most violated pair, if any pair has different costs
    pub fn most_violated_pair(&self, scores: &[f64], costs: &[f64]) -> Option<ViolatedPair> {
        self.find_pair(scores, costs, LossRequest::Gradient).1
    }

    /// Reference O(n²) search
    pub fn brute_force_pair(&self, scores: &[f64], costs: &[f64]) -> Option<ViolatedPair> {
        check_inputs(scores, costs);
        let mut best: Option<ViolatedPair> = None;
        for (better, &better_cost) in costs.iter().enumerate() {
            for (worse, &worse_cost) in costs.iter().enumerate() {
                if worse_cost <= better_cost {
                    continue;
                }
                let contribution = self.discriminant.value(scores[better] - scores[worse])
                    * (worse_cost - better_cost);
                if best.map_or(true, |current| contribution > current.contribution) {
                    best = Some(ViolatedPair {
                        better,
                        worse,
                        contribution,
                    });
                }
            }
        }
        best
    }

    /// Compare, for each pair of cost levels, the lowest-scored better
    /// alternative with the highest-scored worse one
    ///
    /// Valid because a large-margin loss never increases with the margin.
    /// Returns `None` when no candidate is actually violated, since zero
    /// contributions tie everywhere and only the full scan orders them.
    fn level_candidates(
        &self,
        scores: &[f64],
        costs: &[f64],
        levels: &CostLevels,
    ) -> Option<ViolatedPair> {
        let num_levels = levels.num_levels();
        let mut lowest: Vec<Option<usize>> = vec![None; num_levels];
        let mut highest: Vec<Option<usize>> = vec![None; num_levels];
        for (index, &level) in levels.level_of.iter().enumerate() {
            if lowest[level].map_or(true, |current| scores[index] < scores[current]) {
                lowest[level] = Some(index);
            }
            if highest[level].map_or(true, |current| scores[index] > scores[current]) {
                highest[level] = Some(index);
            }
        }

        let mut best: Option<ViolatedPair> = None;
        for better_level in 0..num_levels {
            for worse_level in better_level + 1..num_levels {
                let (Some(better), Some(worse)) = (lowest[better_level], highest[worse_level])
                else {
                    continue;
                };
                let candidate = ViolatedPair {
                    better,
                    worse,
                    contribution: self.discriminant.value(scores[better] - scores[worse])
                        * (costs[worse] - costs[better]),
                };
                if best.map_or(true, |current| candidate.beats(&current)) {
                    best = Some(candidate);
                }
            }
        }
        best.filter(|pair| pair.contribution > 0.0)
    }

    fn find_pair(
        &self,
        scores: &[f64],
        costs: &[f64],
        request: LossRequest,
    ) -> (PairwisePath, Option<ViolatedPair>) {
        check_inputs(scores, costs);
        let levels = CostLevels::new(costs);
        let path = select_path(&levels, request, self.discriminant.large_margin());
        tracing::debug!(
            loss = "most-violated-pair",
            path = %path,
            alternatives = scores.len(),
            cost_levels = levels.num_levels(),
            "ranking loss dispatch"
        );
        let pair = match path {
            PairwisePath::NoPairs => None,
            PairwisePath::BruteForce => self.brute_force_pair(scores, costs),
            PairwisePath::Bipartite | PairwisePath::FewCosts => {
                match self.level_candidates(scores, costs, &levels) {
                    Some(pair) => {
                        if self.cross_check {
                            self.check_against_brute_force(scores, costs, path, &pair);
                        }
                        Some(pair)
                    }
                    None => self.brute_force_pair(scores, costs),
                }
            }
        };
        (path, pair)
    }

    fn check_against_brute_force(
        &self,
        scores: &[f64],
        costs: &[f64],
        path: PairwisePath,
        pair: &ViolatedPair,
    ) {
        let expected = self.brute_force_pair(scores, costs);
        if expected.as_ref() != Some(pair) {
            tracing::error!(
                loss = %self.name(),
                path = %path,
                fast = ?pair,
                brute_force = ?expected,
                "fast path disagrees with brute force"
            );
            panic!(
                "{}: {} pair {:?} differs from brute force {:?}",
                self.name(),
                path,
                pair,
                expected
            );
        }
    }
}

impl RankingLoss for MostViolatedPairLoss {
    fn name(&self) -> String {
        format!("most-violated-pair({})", self.discriminant.name())
    }

    fn compute(&self, scores: &[f64], costs: &[f64], request: LossRequest) -> LossOutput {
        let (_, pair) = self.find_pair(scores, costs, request);
        let mut accumulator = PairAccumulator::new(self.discriminant.as_ref(), scores, request);
        if let Some(pair) = pair {
            accumulator.add_pair(pair.better, pair.worse, costs[pair.worse] - costs[pair.better]);
        }
        accumulator.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::{AllPairsLoss, ExponentialLoss, HingeLoss, PerceptronLoss};
    use proptest::prelude::*;

    fn hinge() -> MostViolatedPairLoss {
        MostViolatedPairLoss::new(Box::new(HingeLoss::default())).with_cross_check(true)
    }

    #[test]
    fn test_known_maximum_bipartite() {
        // better alternatives 0 and 2, worse 1 and 3; worst case is 2 (0.0) below 3 (4.0)
        let pair = hinge().most_violated_pair(&[1.0, 2.0, 0.0, 4.0], &[0.0, 1.0, 0.0, 1.0]);
        assert_eq!(
            pair,
            Some(ViolatedPair {
                better: 2,
                worse: 3,
                contribution: 5.0
            })
        );
    }

    #[test]
    fn test_known_maximum_weighted_by_cost_gap() {
        // (0 vs 2): margin 0 -> 1 * 3 = 3 beats (0 vs 1): margin -1 -> 2 * 1 = 2
        let pair = hinge().most_violated_pair(&[1.0, 2.0, 1.0], &[0.0, 1.0, 3.0]);
        assert_eq!(pair.map(|p| (p.better, p.worse, p.contribution)), Some((0, 2, 3.0)));
    }

    #[test]
    fn test_known_maximum_with_ties() {
        // both (0, 2) and (1, 2) have margin -1: the first one wins
        let loss = hinge();
        let scores = [0.0, 0.0, 1.0, -5.0];
        let costs = [0.0, 0.0, 1.0, 1.0];
        let pair = loss.most_violated_pair(&scores, &costs).unwrap();
        assert_eq!((pair.better, pair.worse), (0, 2));
        assert_eq!(Some(pair), loss.brute_force_pair(&scores, &costs));
    }

    #[test]
    fn test_no_violation_falls_back_to_full_scan() {
        let loss = MostViolatedPairLoss::new(Box::new(PerceptronLoss));
        let scores = [3.0, 1.0, 2.5, 0.0];
        let costs = [0.0, 1.0, 0.0, 1.0];
        let pair = loss.most_violated_pair(&scores, &costs);
        assert_eq!(pair, loss.brute_force_pair(&scores, &costs));
        assert_eq!(pair.map(|p| (p.better, p.worse, p.contribution)), Some((0, 1, 0.0)));
        assert_eq!(loss.value(&scores, &costs), 0.0);
    }

    #[test]
    fn test_loss_is_the_pair_contribution() {
        let loss = hinge();
        let (value, gradient) = loss.value_and_gradient(&[0.0, 0.0], &[1.0, 0.0]);
        assert_eq!(value, 1.0);
        assert_eq!(gradient, vec![1.0, -1.0]);

        let smooth = MostViolatedPairLoss::new(Box::new(ExponentialLoss));
        let (value, _) = smooth.value_and_gradient(&[0.0, 1.0, 2.0], &[0.0, 1.0, 0.0]);
        // pairs (0,1): exp(1), (2,1): exp(-1)
        assert!((value - 1f64.exp()).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_costs() {
        let (value, gradient) = hinge().value_and_gradient(&[1.0, 2.0, 3.0], &[0.0, 0.0, 0.0]);
        assert_eq!(value, 0.0);
        assert_eq!(gradient, vec![0.0; 3]);
        assert_eq!(hinge().most_violated_pair(&[1.0], &[0.0]), None);
    }

    #[test]
    fn test_matches_largest_all_pairs_term() {
        let discriminant = HingeLoss::new(0.5);
        let scores = [0.2, -1.0, 0.7, 0.1, 1.5];
        let costs = [1.0, 0.0, 2.0, 0.0, 3.0];
        let pair = MostViolatedPairLoss::new(Box::new(discriminant))
            .most_violated_pair(&scores, &costs)
            .unwrap();

        let mut largest = 0.0f64;
        for i in 0..scores.len() {
            for j in 0..scores.len() {
                if costs[j] > costs[i] {
                    let contribution =
                        discriminant.value(scores[i] - scores[j]) * (costs[j] - costs[i]);
                    largest = largest.max(contribution);
                }
            }
        }
        assert_eq!(pair.contribution, largest);
        let all_pairs = AllPairsLoss::new(Box::new(discriminant));
        assert!(all_pairs.value(&scores, &costs) <= largest);
    }

    fn spread_costs(n: usize, levels: u8, seed: u64) -> Vec<f64> {
        (0..n)
            .map(|i| ((i as u64 * 31 + seed * 17) % u64::from(levels)) as f64)
            .collect()
    }

    proptest! {
        #[test]
        fn test_fast_pair_equals_brute_force(
            scores in prop::collection::vec((-6i32..6).prop_map(|s| s as f64 * 0.5), 2..=50),
            levels in 2u8..8,
            seed in 0u64..10_000,
            margin in 0.0f64..2.0,
        ) {
            let costs = spread_costs(scores.len(), levels, seed);
            let loss = MostViolatedPairLoss::new(Box::new(HingeLoss::new(margin)));
            prop_assert_eq!(
                loss.most_violated_pair(&scores, &costs),
                loss.brute_force_pair(&scores, &costs)
            );
        }

        #[test]
        fn test_perceptron_fast_pair_equals_brute_force(
            scores in prop::collection::vec((-6i32..6).prop_map(|s| s as f64 * 0.5), 2..=50),
            levels in 2u8..8,
            seed in 0u64..10_000,
        ) {
            let costs = spread_costs(scores.len(), levels, seed);
            let loss = MostViolatedPairLoss::new(Box::new(PerceptronLoss));
            prop_assert_eq!(
                loss.most_violated_pair(&scores, &costs),
                loss.brute_force_pair(&scores, &costs)
            );
        }
    }
}
