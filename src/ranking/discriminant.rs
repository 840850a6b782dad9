//! Scalar losses of a score margin, plugged into the ranking losses

use std::fmt;

/// Below this margin the log-binomial loss is replaced by its asymptote `-x`
const LOG_BINOMIAL_LINEAR_REGION: f64 = -30.0;

/// Largest exponent evaluated by the exponential loss
const MAX_EXPONENT: f64 = 50.0;

/// Shape of a large-margin loss derivative: `slope` when `margin <= threshold`, else 0
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LargeMargin {
    /// Margin up to which the pair is still penalized
    pub threshold: f64,
    /// Constant derivative inside the penalized region
    pub slope: f64,
}

impl LargeMargin {
    /// Check if a pair with the given margin is inside the penalized region
    pub fn is_active(&self, margin: f64) -> bool {
        margin <= self.threshold
    }
}

/// A loss `l(x)` of the margin `x = s_better - s_worse`, with its derivative
pub trait DiscriminantLoss: fmt::Debug {
    /// Short identifier
    fn name(&self) -> String;

    /// `l(x)`
    fn value(&self, margin: f64) -> f64;

    /// `l'(x)`
    fn derivative(&self, margin: f64) -> f64;

    /// `(l(x), l'(x))`
    fn value_and_derivative(&self, margin: f64) -> (f64, f64) {
        (self.value(margin), self.derivative(margin))
    }

    /// Derivative shape when it is piecewise constant across one threshold
    ///
    /// Large-margin losses enable the sort-based ranking fast paths.
    fn large_margin(&self) -> Option<LargeMargin> {
        None
    }
}

/// `max(0, margin - x)`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HingeLoss {
    /// Required score gap between a better and a worse alternative
    pub margin: f64,
}

impl HingeLoss {
    /// Hinge loss with the given margin
    pub fn new(margin: f64) -> Self {
        HingeLoss { margin }
    }
}

impl Default for HingeLoss {
    fn default() -> Self {
        HingeLoss::new(1.0)
    }
}

impl DiscriminantLoss for HingeLoss {
    fn name(&self) -> String {
        format!("hinge(margin = {})", self.margin)
    }

    fn value(&self, margin: f64) -> f64 {
        (self.margin - margin).max(0.0)
    }

    fn derivative(&self, margin: f64) -> f64 {
        if margin <= self.margin {
            -1.0
        } else {
            0.0
        }
    }

    fn large_margin(&self) -> Option<LargeMargin> {
        Some(LargeMargin {
            threshold: self.margin,
            slope: -1.0,
        })
    }
}

/// `max(0, -x)`: only misordered pairs are penalized
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PerceptronLoss;

impl DiscriminantLoss for PerceptronLoss {
    fn name(&self) -> String {
        "perceptron".to_string()
    }

    fn value(&self, margin: f64) -> f64 {
        (-margin).max(0.0)
    }

    fn derivative(&self, margin: f64) -> f64 {
        if margin <= 0.0 {
            -1.0
        } else {
            0.0
        }
    }

    fn large_margin(&self) -> Option<LargeMargin> {
        Some(LargeMargin {
            threshold: 0.0,
            slope: -1.0,
        })
    }
}

/// `ln(1 + exp(-x))`, the logistic loss
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LogBinomialLoss;

impl DiscriminantLoss for LogBinomialLoss {
    fn name(&self) -> String {
        "log-binomial".to_string()
    }

    fn value(&self, margin: f64) -> f64 {
        if margin < LOG_BINOMIAL_LINEAR_REGION {
            -margin
        } else {
            (-margin).exp().ln_1p()
        }
    }

    fn derivative(&self, margin: f64) -> f64 {
        -1.0 / (1.0 + margin.exp())
    }
}

/// `exp(-x)`, saturated for very negative margins
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ExponentialLoss;

impl DiscriminantLoss for ExponentialLoss {
    fn name(&self) -> String {
        "exponential".to_string()
    }

    fn value(&self, margin: f64) -> f64 {
        (-margin).min(MAX_EXPONENT).exp()
    }

    fn derivative(&self, margin: f64) -> f64 {
        -self.value(margin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numerical_derivative(loss: &dyn DiscriminantLoss, x: f64) -> f64 {
        let h = 1e-6;
        (loss.value(x + h) - loss.value(x - h)) / (2.0 * h)
    }

    #[test]
    fn test_hinge() {
        let hinge = HingeLoss::default();
        assert_eq!(hinge.value(-1.0), 2.0);
        assert_eq!(hinge.value(1.0), 0.0);
        assert_eq!(hinge.value(3.0), 0.0);
        assert_eq!(hinge.derivative(0.5), -1.0);
        assert_eq!(hinge.derivative(1.0), -1.0);
        assert_eq!(hinge.derivative(1.5), 0.0);
        assert!(hinge.large_margin().unwrap().is_active(1.0));
    }

    #[test]
    fn test_perceptron() {
        let perceptron = PerceptronLoss;
        assert_eq!(perceptron.value(-2.0), 2.0);
        assert_eq!(perceptron.value(0.5), 0.0);
        assert_eq!(perceptron.derivative(0.0), -1.0);
        assert_eq!(perceptron.large_margin().unwrap().threshold, 0.0);
    }

    #[test]
    fn test_smooth_losses_match_numerical_derivative() {
        let losses: [&dyn DiscriminantLoss; 2] = [&LogBinomialLoss, &ExponentialLoss];
        for loss in losses {
            assert!(loss.large_margin().is_none());
            for x in [-3.0, -0.5, 0.0, 0.7, 4.0] {
                let expected = numerical_derivative(loss, x);
                assert!(
                    (loss.derivative(x) - expected).abs() < 1e-5,
                    "{} at {}: {} vs {}",
                    loss.name(),
                    x,
                    loss.derivative(x),
                    expected
                );
            }
        }
    }

    #[test]
    fn test_extreme_margins_stay_finite() {
        for x in [-1e6, -800.0, -31.0, 0.0, 800.0, 1e6] {
            for loss in [&LogBinomialLoss as &dyn DiscriminantLoss, &ExponentialLoss] {
                assert!(loss.value(x).is_finite(), "{} value at {}", loss.name(), x);
                assert!(loss.derivative(x).is_finite(), "{} derivative at {}", loss.name(), x);
            }
        }
        assert_eq!(LogBinomialLoss.value(-100.0), 100.0);
        assert!((LogBinomialLoss.value(0.0) - 2f64.ln()).abs() < 1e-12);
        assert_eq!(LogBinomialLoss.derivative(-1e6), -1.0);
    }
}
