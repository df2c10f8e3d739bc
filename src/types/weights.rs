//! Fuel / time / safety priority weights

use serde::{Deserialize, Serialize};

use super::ValidationError;

const NORMALIZED_TOLERANCE: f64 = 1e-12;

/// Relative priority of the three route objectives.
///
/// Values are normalized at construction so `fuel + time + safety == 1.0`;
/// the accessors always return normalized weights. Raw inputs must be finite
/// and non-negative with a positive sum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWeights")]
pub struct OptimizationWeights {
    fuel: f64,
    time: f64,
    safety: f64,
}

#[derive(Deserialize)]
struct RawWeights {
    fuel: f64,
    time: f64,
    safety: f64,
}

impl TryFrom<RawWeights> for OptimizationWeights {
    type Error = ValidationError;

    fn try_from(raw: RawWeights) -> Result<Self, Self::Error> {
        Self::new(raw.fuel, raw.time, raw.safety)
    }
}

impl Default for OptimizationWeights {
    /// Equal priority for all three objectives.
    fn default() -> Self {
        Self {
            fuel: 1.0 / 3.0,
            time: 1.0 / 3.0,
            safety: 1.0 / 3.0,
        }
    }
}

impl OptimizationWeights {
    /// Validate and normalize a raw weight triple.
    pub fn new(fuel: f64, time: f64, safety: f64) -> Result<Self, ValidationError> {
        for (name, value) in [("fuel", fuel), ("time", time), ("safety", safety)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::InvalidWeight { name, value });
            }
        }
        let sum = fuel + time + safety;
        if !sum.is_finite() || sum <= 0.0 {
            return Err(ValidationError::ZeroWeightSum(sum));
        }
        // Already-normalized triples are kept verbatim so serialized weights
        // read back bit-for-bit
        if (sum - 1.0).abs() <= NORMALIZED_TOLERANCE {
            return Ok(Self { fuel, time, safety });
        }
        Ok(Self {
            fuel: fuel / sum,
            time: time / sum,
            safety: safety / sum,
        })
    }

    pub fn fuel(&self) -> f64 {
        self.fuel
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn safety(&self) -> f64 {
        self.safety
    }

    /// Sum of the normalized weights (1.0 up to rounding).
    pub fn sum(&self) -> f64 {
        self.fuel + self.time + self.safety
    }

    /// Weighted composite of three per-objective costs.
    pub fn combine(&self, fuel_cost: f64, time_cost: f64, safety_cost: f64) -> f64 {
        self.fuel * fuel_cost + self.time * time_cost + self.safety * safety_cost
    }

    /// Shift priority towards safety by `extra` and renormalize.
    ///
    /// Used when a hazard breach triggers a replan: the observed risk is
    /// added to the safety weight before the three are normalized again.
    pub fn with_safety_boost(&self, extra: f64) -> Self {
        let extra = if extra.is_finite() { extra.max(0.0) } else { 0.0 };
        let safety = self.safety + extra;
        let sum = self.fuel + self.time + safety;
        Self {
            fuel: self.fuel / sum,
            time: self.time / sum,
            safety: safety / sum,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_to_unit_sum() {
        let triples = [
            (0.5, 0.3, 0.2),
            (1.0, 1.0, 1.0),
            (3.0, 0.0, 0.0),
            (1e-9, 2e-9, 3e-9),
            (1e6, 3.5, 42.0),
            (0.0, 0.0, 7.25),
        ];
        for (f, t, s) in triples {
            let w = OptimizationWeights::new(f, t, s).unwrap();
            assert!((w.sum() - 1.0).abs() < 1e-9, "sum {} for {:?}", w.sum(), (f, t, s));
        }
    }

    #[test]
    fn preserves_ratios() {
        let w = OptimizationWeights::new(2.0, 1.0, 1.0).unwrap();
        assert!((w.fuel() - 0.5).abs() < 1e-12);
        assert!((w.time() - 0.25).abs() < 1e-12);
        assert!((w.safety() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn rejects_zero_sum() {
        assert_eq!(
            OptimizationWeights::new(0.0, 0.0, 0.0),
            Err(ValidationError::ZeroWeightSum(0.0))
        );
    }

    #[test]
    fn rejects_negative_and_nan() {
        assert!(matches!(
            OptimizationWeights::new(-0.1, 0.5, 0.5),
            Err(ValidationError::InvalidWeight { name: "fuel", .. })
        ));
        assert!(matches!(
            OptimizationWeights::new(0.1, f64::NAN, 0.5),
            Err(ValidationError::InvalidWeight { name: "time", .. })
        ));
    }

    #[test]
    fn safety_boost_renormalizes() {
        let w = OptimizationWeights::new(0.3, 0.3, 0.4).unwrap();
        let boosted = w.with_safety_boost(0.5);
        assert!((boosted.sum() - 1.0).abs() < 1e-9);
        assert!(boosted.safety() > w.safety());
        assert!((boosted.fuel() / boosted.time() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn deserialization_normalizes() {
        let w: OptimizationWeights =
            serde_json::from_str(r#"{"fuel": 5.0, "time": 3.0, "safety": 2.0}"#).unwrap();
        assert!((w.fuel() - 0.5).abs() < 1e-12);

        let zero = serde_json::from_str::<OptimizationWeights>(r#"{"fuel": 0, "time": 0, "safety": 0}"#);
        assert!(zero.is_err());
    }
}
