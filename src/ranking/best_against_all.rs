//! Loss over the pairs involving the top-scored alternative

use super::ranking_loss::{check_inputs, PairAccumulator};
use super::{DiscriminantLoss, LossOutput, LossRequest, RankingLoss};

/// Pairs the highest-scored alternative against every other one
///
/// Only what the predictor would actually pick is penalized: O(n) per
/// evaluation. Ties on the top score go to the lowest index.
#[derive(Debug)]
pub struct BestAgainstAllLoss {
    discriminant: Box<dyn DiscriminantLoss>,
}

impl BestAgainstAllLoss {
    /// Create the loss around a discriminant loss
    pub fn new(discriminant: Box<dyn DiscriminantLoss>) -> Self {
        BestAgainstAllLoss { discriminant }
    }

    /// The pluggable discriminant loss
    pub fn discriminant(&self) -> &dyn DiscriminantLoss {
        self.discriminant.as_ref()
    }
}

/// Index of the first maximal score
pub(crate) fn top_scored(scores: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (index, score) in scores.iter().enumerate() {
        if best.map_or(true, |top| *score > scores[top]) {
            best = Some(index);
        }
    }
    best
}

impl RankingLoss for BestAgainstAllLoss {
    fn name(&self) -> String {
        format!("best-against-all({})", self.discriminant.name())
    }

    fn compute(&self, scores: &[f64], costs: &[f64], request: LossRequest) -> LossOutput {
        check_inputs(scores, costs);
        let top = match top_scored(scores) {
            Some(top) => top,
            None => return LossOutput::zero(0, request),
        };
        let mut accumulator = PairAccumulator::new(self.discriminant.as_ref(), scores, request);
        for (other, &cost) in costs.iter().enumerate() {
            if cost < costs[top] {
                accumulator.add_pair(other, top, costs[top] - cost);
            } else if cost > costs[top] {
                accumulator.add_pair(top, other, cost - costs[top]);
            }
        }
        accumulator.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::{HingeLoss, LogBinomialLoss};

    fn hinge() -> BestAgainstAllLoss {
        BestAgainstAllLoss::new(Box::new(HingeLoss::default()))
    }

    #[test]
    fn test_confident_correct_top_has_zero_loss() {
        let (value, gradient) = hinge().value_and_gradient(&[3.0, 1.0, 1.0], &[0.0, 1.0, 1.0]);
        assert_eq!(value, 0.0);
        assert_eq!(gradient, vec![0.0; 3]);
    }

    #[test]
    fn test_wrong_top_is_pushed_down() {
        // alternative 1 is top-scored but costs 1; alternative 0 is best
        let (value, gradient) = hinge().value_and_gradient(&[0.0, 2.0, -1.0], &[0.0, 1.0, 1.0]);
        // only the pair (0, 1): margin -2 -> hinge 3
        assert_eq!(value, 3.0);
        assert_eq!(gradient, vec![-1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_ties_on_top_score_pick_first() {
        assert_eq!(top_scored(&[1.0, 4.0, 4.0]), Some(1));
        assert_eq!(top_scored(&[]), None);
    }

    #[test]
    fn test_degenerate_costs() {
        let loss = BestAgainstAllLoss::new(Box::new(LogBinomialLoss));
        let (value, gradient) = loss.value_and_gradient(&[1.0, 2.0, 3.0], &[0.0, 0.0, 0.0]);
        assert_eq!(value, 0.0);
        assert_eq!(gradient, vec![0.0; 3]);
        assert_eq!(loss.value(&[], &[]), 0.0);
    }

    #[test]
    fn test_normalized_by_pair_count() {
        let loss = hinge();
        // top = 2 (cost 1), better: 0 (cost 0); worse: 1 (cost 3); 3 ties with top
        let value = loss.value(&[0.0, 0.5, 1.0, -2.0], &[0.0, 3.0, 1.0, 1.0]);
        // (0 vs 2): margin -1, gap 1 -> 2 ; (2 vs 1): margin 0.5, gap 2 -> 1
        assert_eq!(value, (2.0 + 1.0) / 2.0);
    }
}
