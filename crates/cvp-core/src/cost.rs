//! Admission cost and governance zoning.
//!
//! The cost of admitting a canonical payload is
//!
//! ```text
//! C = α·KL(P‖Q) + β·ΔH(P,Q)
//! ```
//!
//! where `P` is a probability distribution derived from the first
//! `k = min(n, 16)` canonical bytes, `Q` is uniform over the same support,
//! `KL` is the Kullback-Leibler divergence (base 2, epsilon-floored), and
//! `ΔH = H(P) − H(Q)`. The cost is discretized into three governance zones;
//! the governance zone is rejecting.

use crate::error::{Error, Result};

/// Default KL weight.
pub const ALPHA_DEFAULT: f64 = 0.6;

/// Default entropy-change weight.
pub const BETA_DEFAULT: f64 = 0.4;

/// Upper cost bound of the autonomous zone.
pub const COST_AUTONOMOUS_MAX: f64 = 0.5;

/// Upper cost bound of the warning zone.
pub const COST_WARNING_MAX: f64 = 0.6;

/// Epsilon floor applied to `Q` terms inside the divergence.
pub const EPSILON_MIN: f64 = 1e-12;

/// Tolerance on the `α + β ≤ 1` parameter constraint.
const PARAM_SUM_TOLERANCE: f64 = 1e-4;

/// Number of leading canonical bytes the distribution is built from.
const DISTRIBUTION_WIDTH: usize = 16;

/// Discretized admission cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GovernanceZone {
    /// Cost at or below 0.5: admit without oversight.
    Autonomous,
    /// Cost in (0.5, 0.6]: admit, flagged for review.
    Warning,
    /// Cost above 0.6: rejected.
    Governance,
}

impl GovernanceZone {
    /// Classify a cost value.
    pub fn from_cost(cost: f64) -> Self {
        if cost <= COST_AUTONOMOUS_MAX {
            GovernanceZone::Autonomous
        } else if cost <= COST_WARNING_MAX {
            GovernanceZone::Warning
        } else {
            GovernanceZone::Governance
        }
    }

    /// Stable textual tag.
    pub fn as_str(self) -> &'static str {
        match self {
            GovernanceZone::Autonomous => "AUTONOMOUS",
            GovernanceZone::Warning => "WARNING",
            GovernanceZone::Governance => "GOVERNANCE",
        }
    }

    /// Whether a payload in this zone may be admitted.
    pub fn is_admissible(self) -> bool {
        !matches!(self, GovernanceZone::Governance)
    }
}

impl std::fmt::Display for GovernanceZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kullback-Leibler divergence `KL(P‖Q)` in bits, with `Q` epsilon-floored.
pub fn kl_divergence(p: &[f64], q: &[f64]) -> f64 {
    p.iter()
        .zip(q)
        .filter(|(&pi, _)| pi > 0.0)
        .map(|(&pi, &qi)| pi * (pi / qi.max(EPSILON_MIN)).log2())
        .sum()
}

/// Shannon entropy `H(X)` in bits.
pub fn entropy(p: &[f64]) -> f64 {
    -p.iter()
        .filter(|&&pi| pi > 0.0)
        .map(|&pi| pi * pi.log2())
        .sum::<f64>()
}

/// The admission cost evaluator.
///
/// Weights are fixed at construction; the parameter simplex
/// `α ≥ 0, β ≥ 0, α + β ≤ 1` (to tolerance) is enforced there, so evaluation
/// never re-checks it.
#[derive(Debug, Clone, Copy)]
pub struct CostEvaluator {
    alpha: f64,
    beta: f64,
}

impl CostEvaluator {
    /// Create an evaluator, enforcing the parameter constraints.
    pub fn new(alpha: f64, beta: f64) -> Result<Self> {
        if !alpha.is_finite() || !beta.is_finite() || alpha < 0.0 || beta < 0.0 {
            return Err(Error::NumericalInstability(format!(
                "cost weights must be non-negative and finite (alpha={alpha}, beta={beta})"
            )));
        }
        if alpha + beta > 1.0 + PARAM_SUM_TOLERANCE {
            return Err(Error::NumericalInstability(format!(
                "cost weights must satisfy alpha + beta <= 1 (alpha={alpha}, beta={beta})"
            )));
        }
        Ok(Self { alpha, beta })
    }

    /// Create an evaluator with the default weights.
    pub fn with_defaults() -> Self {
        Self {
            alpha: ALPHA_DEFAULT,
            beta: BETA_DEFAULT,
        }
    }

    /// KL weight.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Entropy-change weight.
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Evaluate the admission cost of a canonical payload and classify it.
    ///
    /// `P_i = (b_i + 1) / Z` over the first `min(n, 16)` bytes, `Q` uniform.
    /// Non-finite intermediates fail with `NUMERICAL_INSTABILITY`; the cost
    /// is floored at zero so the published non-negativity property holds for
    /// every admissible weight pair (with uniform `Q`, `ΔH = −KL`).
    pub fn evaluate(&self, payload: &[u8]) -> Result<(f64, GovernanceZone)> {
        let k = payload.len().min(DISTRIBUTION_WIDTH);
        if k == 0 {
            return Err(Error::InvalidInput(
                "cannot derive a distribution from an empty payload".to_string(),
            ));
        }

        let (p, q) = distributions(&payload[..k]);
        let kl = kl_divergence(&p, &q);
        let delta_h = entropy(&p) - entropy(&q);

        let cost = self.alpha * kl + self.beta * delta_h;
        if !cost.is_finite() {
            return Err(Error::NumericalInstability(
                "admission cost is not finite".to_string(),
            ));
        }

        let cost = cost.max(0.0);
        Ok((cost, GovernanceZone::from_cost(cost)))
    }
}

impl Default for CostEvaluator {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Derive `(P, Q)` from the leading canonical bytes.
///
/// The `+ 1` shift keeps every `P_i` strictly positive.
fn distributions(bytes: &[u8]) -> (Vec<f64>, Vec<f64>) {
    let z: f64 = bytes.iter().map(|&b| f64::from(b) + 1.0).sum();
    let p = bytes.iter().map(|&b| (f64::from(b) + 1.0) / z).collect();
    let q = vec![1.0 / bytes.len() as f64; bytes.len()];
    (p, q)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_thresholds() {
        assert_eq!(GovernanceZone::from_cost(0.0), GovernanceZone::Autonomous);
        assert_eq!(GovernanceZone::from_cost(0.5), GovernanceZone::Autonomous);
        assert_eq!(GovernanceZone::from_cost(0.51), GovernanceZone::Warning);
        assert_eq!(GovernanceZone::from_cost(0.6), GovernanceZone::Warning);
        assert_eq!(GovernanceZone::from_cost(0.61), GovernanceZone::Governance);
        assert!(!GovernanceZone::Governance.is_admissible());
    }

    #[test]
    fn test_parameter_simplex_enforced() {
        assert!(CostEvaluator::new(0.6, 0.4).is_ok());
        assert!(CostEvaluator::new(0.0, 0.0).is_ok());
        assert!(CostEvaluator::new(1.0, 0.0).is_ok());

        // The tolerance admits exactly-1 sums under rounding.
        assert!(CostEvaluator::new(0.5, 0.50005).is_ok());

        assert!(matches!(
            CostEvaluator::new(0.8, 0.5),
            Err(Error::NumericalInstability(_))
        ));
        assert!(matches!(
            CostEvaluator::new(-0.1, 0.5),
            Err(Error::NumericalInstability(_))
        ));
        assert!(matches!(
            CostEvaluator::new(0.5, f64::NAN),
            Err(Error::NumericalInstability(_))
        ));
    }

    #[test]
    fn test_cost_identity_for_uniform_bytes() {
        // Identical bytes give P = Q, so KL = 0, ΔH = 0, C = 0.
        let evaluator = CostEvaluator::with_defaults();
        let (cost, zone) = evaluator.evaluate(&[0x41; 16]).unwrap();
        assert!(cost.abs() < 1e-12);
        assert_eq!(zone, GovernanceZone::Autonomous);
    }

    #[test]
    fn test_cost_is_non_negative_even_with_beta_heavy_weights() {
        let evaluator = CostEvaluator::new(0.1, 0.9).unwrap();
        let skewed = [255u8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let (cost, _) = evaluator.evaluate(&skewed).unwrap();
        assert!(cost >= 0.0);
    }

    #[test]
    fn test_skewed_distribution_reaches_governance() {
        // Pure KL weighting over a heavily skewed distribution.
        let evaluator = CostEvaluator::new(1.0, 0.0).unwrap();
        let skewed = [255u8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let (cost, zone) = evaluator.evaluate(&skewed).unwrap();
        assert!(cost > COST_WARNING_MAX);
        assert_eq!(zone, GovernanceZone::Governance);
    }

    #[test]
    fn test_cost_monotone_in_kl() {
        // Holding β = 0, more skew means more divergence means more cost.
        let evaluator = CostEvaluator::new(1.0, 0.0).unwrap();
        let mut previous = -1.0;
        for peak in [0u8, 63, 127, 191, 255] {
            let mut bytes = [0u8; 16];
            bytes[0] = peak;
            let (cost, _) = evaluator.evaluate(&bytes).unwrap();
            assert!(
                cost >= previous,
                "cost must not decrease as divergence grows"
            );
            previous = cost;
        }
    }

    #[test]
    fn test_short_payload_uses_short_support() {
        let evaluator = CostEvaluator::with_defaults();
        let (cost, _) = evaluator.evaluate(&[0x10, 0x10, 0x10]).unwrap();
        assert!(cost.abs() < 1e-12); // identical bytes, any width
    }

    #[test]
    fn test_empty_payload_rejected() {
        let evaluator = CostEvaluator::with_defaults();
        assert!(matches!(
            evaluator.evaluate(&[]),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let evaluator = CostEvaluator::with_defaults();
        let payload = b"{\"id\":\"12345\",\"x\":\"y\"}";
        let (c1, z1) = evaluator.evaluate(payload).unwrap();
        let (c2, z2) = evaluator.evaluate(payload).unwrap();
        assert_eq!(c1.to_bits(), c2.to_bits());
        assert_eq!(z1, z2);
    }

    #[test]
    fn test_divergence_helpers() {
        let p = [0.5, 0.5];
        let q = [0.5, 0.5];
        assert!(kl_divergence(&p, &q).abs() < 1e-12);
        assert!((entropy(&p) - 1.0).abs() < 1e-12);

        let skew = [0.9, 0.1];
        assert!(kl_divergence(&skew, &q) > 0.0);
        assert!(entropy(&skew) < 1.0);
    }
}
