//! Chaos, opposition and quantum-superposition operators

use rand::Rng;

/// Logistic map `x <- r x (1 - x)` with `r = 4` (fully chaotic regime).
#[derive(Debug, Clone)]
pub struct LogisticMap {
    state: f64,
}

const LOGISTIC_R: f64 = 4.0;

/// Starting values within this distance of a fixed point or one of its
/// preimages are redrawn.
const FIXED_POINT_MARGIN: f64 = 1e-3;

/// Orbit points the map collapses onto: 0 and 0.75 are fixed, 0.25, 0.5
/// and 1 map straight onto them.
const DEGENERATE_POINTS: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// Restart value used if rounding ever drives the orbit onto a fixed point.
const RESEED_STATE: f64 = 0.123_456_789;

impl LogisticMap {
    /// Draw the initial state from `rng`, away from degenerate orbits.
    pub fn seeded<R: Rng + ?Sized>(rng: &mut R) -> Self {
        loop {
            let x: f64 = rng.gen_range(0.01..0.99);
            if !is_degenerate(x) {
                return Self { state: x };
            }
        }
    }

    pub fn state(&self) -> f64 {
        self.state
    }

    /// Advance the map and return the new state in (0, 1).
    pub fn next_value(&mut self) -> f64 {
        let next = LOGISTIC_R * self.state * (1.0 - self.state);
        self.state = if is_degenerate(next) || !next.is_finite() {
            RESEED_STATE
        } else {
            next
        };
        self.state
    }
}

fn is_degenerate(x: f64) -> bool {
    DEGENERATE_POINTS.iter().any(|p| (x - p).abs() < FIXED_POINT_MARGIN)
}

/// Opposite point in the box `[lb, ub]`: `lb + ub - x`.
pub fn opposite(position: &[f64], lower: f64, upper: f64) -> Vec<f64> {
    position.iter().map(|x| lower + upper - x).collect()
}

/// Superposition of two positions: `alpha * a + (1 - alpha) * b`.
pub fn superpose(a: &[f64], b: &[f64], alpha: f64) -> Vec<f64> {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| alpha * x + (1.0 - alpha) * y)
        .collect()
}

/// Metropolis acceptance: always accept improvements, accept a worse
/// candidate with probability `exp(-delta / temperature)`.
pub fn metropolis_accept<R: Rng + ?Sized>(delta: f64, temperature: f64, rng: &mut R) -> bool {
    if delta <= 0.0 {
        return true;
    }
    if temperature <= 0.0 || !delta.is_finite() {
        return false;
    }
    rng.gen::<f64>() < (-delta / temperature).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn logistic_map_stays_in_open_interval() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut map = LogisticMap::seeded(&mut rng);
        for _ in 0..10_000 {
            let x = map.next_value();
            assert!(x > 0.0 && x < 1.0, "state escaped: {x}");
        }
    }

    #[test]
    fn logistic_map_is_deterministic_per_seed() {
        let mut a = LogisticMap::seeded(&mut StdRng::seed_from_u64(11));
        let mut b = LogisticMap::seeded(&mut StdRng::seed_from_u64(11));
        for _ in 0..100 {
            assert_eq!(a.next_value(), b.next_value());
        }
    }

    #[test]
    fn degenerate_state_is_reseeded() {
        let mut map = LogisticMap { state: 0.5 };
        // 4 * 0.5 * 0.5 = 1.0, then 0.0 forever without the guard
        let x = map.next_value();
        assert_eq!(x, RESEED_STATE);
        assert!(map.next_value() > 0.0);
    }

    #[test]
    fn opposite_reflects_through_box_centre() {
        assert_eq!(opposite(&[10.0, -30.0, 0.0], -50.0, 50.0), vec![-10.0, 30.0, 0.0]);
        assert_eq!(opposite(&[1.0], 0.0, 4.0), vec![3.0]);
    }

    #[test]
    fn superposition_interpolates() {
        assert_eq!(superpose(&[0.0, 10.0], &[10.0, 0.0], 0.25), vec![7.5, 2.5]);
    }

    #[test]
    fn metropolis_always_takes_improvements() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(metropolis_accept(-0.5, 0.0, &mut rng));
        assert!(!metropolis_accept(0.5, 0.0, &mut rng));
        // Huge temperature accepts almost anything
        let accepted = (0..100).filter(|_| metropolis_accept(1e-6, 1e6, &mut rng)).count();
        assert!(accepted > 95);
    }
}
