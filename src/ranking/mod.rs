//! Pairwise ranking losses
//!
//! A ranking loss turns the scores a predictor gives to the alternatives of
//! an example, and the costs of those alternatives, into a scalar loss and a
//! gradient with respect to the scores. Each variant chooses which pairs of
//! alternatives contribute; the pluggable [`DiscriminantLoss`] decides how a
//! single pair is penalized.

mod discriminant;
mod ranking_loss;
mod all_pairs;
mod best_against_all;
mod most_violated_pair;
mod example;

pub use discriminant::{
    DiscriminantLoss, ExponentialLoss, HingeLoss, LargeMargin, LogBinomialLoss, PerceptronLoss,
};
pub use ranking_loss::{has_few_different_costs, LossOutput, LossRequest, PairwisePath, RankingLoss};
pub use all_pairs::AllPairsLoss;
pub use best_against_all::BestAgainstAllLoss;
pub use most_violated_pair::{MostViolatedPairLoss, ViolatedPair};
pub use example::RankingExample;
