//! Ranking configuration

use crate::ranking::{
    AllPairsLoss, BestAgainstAllLoss, DiscriminantLoss, ExponentialLoss, HingeLoss,
    LogBinomialLoss, MostViolatedPairLoss, PerceptronLoss, RankingLoss,
};
use crate::{FeatureMLError, Result};
use serde::{Deserialize, Serialize};

/// Which pairs of alternatives contribute to the loss
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankingLossKind {
    /// Every pair with different costs
    AllPairs,
    /// Pairs involving the top-scored alternative
    BestAgainstAll,
    /// The single most violated pair
    MostViolatedPair,
}

/// How a single pair is penalized
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum DiscriminantKind {
    /// `max(0, margin - x)`
    Hinge {
        /// Required score gap
        margin: f64,
    },
    /// `max(0, -x)`
    Perceptron,
    /// `ln(1 + exp(-x))`
    LogBinomial,
    /// `exp(-x)`
    Exponential,
}

impl DiscriminantKind {
    /// Instantiate the discriminant loss
    pub fn build(&self) -> Box<dyn DiscriminantLoss> {
        match *self {
            DiscriminantKind::Hinge { margin } => Box::new(HingeLoss::new(margin)),
            DiscriminantKind::Perceptron => Box::new(PerceptronLoss),
            DiscriminantKind::LogBinomial => Box::new(LogBinomialLoss),
            DiscriminantKind::Exponential => Box::new(ExponentialLoss),
        }
    }
}

/// Ranking loss configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Pair selection
    pub loss: RankingLossKind,
    /// Pair penalty
    pub discriminant: DiscriminantKind,
    /// Verify every fast-path result against brute force (slow)
    #[serde(default)]
    pub cross_check_fast_paths: bool,
}

impl RankingConfig {
    /// Hinge loss over all pairs
    pub fn large_margin_all_pairs() -> Self {
        RankingConfig {
            loss: RankingLossKind::AllPairs,
            discriminant: DiscriminantKind::Hinge { margin: 1.0 },
            cross_check_fast_paths: false,
        }
    }

    /// Hinge loss on the most violated pair
    pub fn large_margin_most_violated_pair() -> Self {
        RankingConfig {
            loss: RankingLossKind::MostViolatedPair,
            ..Self::large_margin_all_pairs()
        }
    }

    /// Hinge loss between the top-scored alternative and the others
    pub fn large_margin_best_against_all() -> Self {
        RankingConfig {
            loss: RankingLossKind::BestAgainstAll,
            ..Self::large_margin_all_pairs()
        }
    }

    /// Logistic loss over all pairs
    pub fn log_binomial_all_pairs() -> Self {
        RankingConfig {
            loss: RankingLossKind::AllPairs,
            discriminant: DiscriminantKind::LogBinomial,
            cross_check_fast_paths: false,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if let DiscriminantKind::Hinge { margin } = self.discriminant {
            if !margin.is_finite() || margin <= 0.0 {
                return Err(FeatureMLError::InvalidConfig(format!(
                    "hinge margin must be finite and positive, got {}",
                    margin
                )));
            }
        }
        if self.cross_check_fast_paths && self.loss == RankingLossKind::BestAgainstAll {
            tracing::debug!("best-against-all has no fast path, cross-check has no effect");
        }
        Ok(())
    }

    /// Validate and instantiate the configured loss
    pub fn build(&self) -> Result<Box<dyn RankingLoss>> {
        self.validate()?;
        let discriminant = self.discriminant.build();
        let loss: Box<dyn RankingLoss> = match self.loss {
            RankingLossKind::AllPairs => Box::new(
                AllPairsLoss::new(discriminant).with_cross_check(self.cross_check_fast_paths),
            ),
            RankingLossKind::BestAgainstAll => Box::new(BestAgainstAllLoss::new(discriminant)),
            RankingLossKind::MostViolatedPair => Box::new(
                MostViolatedPairLoss::new(discriminant)
                    .with_cross_check(self.cross_check_fast_paths),
            ),
        };
        Ok(loss)
    }

    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let config: RankingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self::large_margin_all_pairs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let mut config = RankingConfig::default();
        assert!(config.validate().is_ok());

        config.discriminant = DiscriminantKind::Hinge { margin: 0.0 };
        assert!(config.validate().is_err());

        config.discriminant = DiscriminantKind::Hinge { margin: f64::INFINITY };
        assert!(matches!(config.build(), Err(FeatureMLError::InvalidConfig(_))));
    }

    #[test]
    fn test_predefined_configs() {
        let presets = [
            (RankingConfig::large_margin_all_pairs(), "all-pairs(hinge(margin = 1))"),
            (
                RankingConfig::large_margin_most_violated_pair(),
                "most-violated-pair(hinge(margin = 1))",
            ),
            (
                RankingConfig::large_margin_best_against_all(),
                "best-against-all(hinge(margin = 1))",
            ),
            (RankingConfig::log_binomial_all_pairs(), "all-pairs(log-binomial)"),
        ];
        for (config, name) in presets {
            assert_eq!(config.build().unwrap().name(), name);
        }
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = RankingConfig::large_margin_most_violated_pair();
        config.cross_check_fast_paths = true;
        let json = config.to_json().unwrap();
        assert_eq!(RankingConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_json_defaults_and_errors() {
        let config =
            RankingConfig::from_json(r#"{"loss": "AllPairs", "discriminant": "Perceptron"}"#)
                .unwrap();
        assert!(!config.cross_check_fast_paths);
        assert_eq!(config.discriminant, DiscriminantKind::Perceptron);

        let invalid = RankingConfig::from_json(
            r#"{"loss": "AllPairs", "discriminant": {"Hinge": {"margin": -1.0}}}"#,
        );
        assert!(matches!(invalid, Err(FeatureMLError::InvalidConfig(_))));

        assert!(matches!(
            RankingConfig::from_json("{\"loss\": \"Sideways\"}"),
            Err(FeatureMLError::Serialization(_))
        ));
    }

    #[test]
    fn test_built_loss_evaluates() {
        let loss = RankingConfig::default().build().unwrap();
        assert_eq!(loss.value(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }
}
