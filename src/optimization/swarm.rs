//! Particle and swarm state

/// One candidate route encoded as lateral offsets (nm) of the control points.
///
/// Positive offsets lie to starboard of the great-circle track, negative to
/// port. `best_fitness` only ever decreases.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: Vec<f64>,
    pub velocity: Vec<f64>,
    pub best_position: Vec<f64>,
    pub best_fitness: f64,
    pub fitness: f64,
}

impl Particle {
    /// A particle that has not been evaluated yet.
    pub fn new(position: Vec<f64>, velocity: Vec<f64>) -> Self {
        Self {
            best_position: position.clone(),
            position,
            velocity,
            best_fitness: f64::INFINITY,
            fitness: f64::INFINITY,
        }
    }

    /// Record a fresh evaluation of `position`, promoting it to personal
    /// best when it improves.
    pub fn record(&mut self, fitness: f64) -> bool {
        self.fitness = fitness;
        if fitness < self.best_fitness {
            self.best_fitness = fitness;
            self.best_position.clone_from(&self.position);
            true
        } else {
            false
        }
    }

    pub fn dimensions(&self) -> usize {
        self.position.len()
    }
}

/// Population of particles plus the best solution seen by any of them.
///
/// A finished run hands its final swarm back to the caller so a later run
/// on the same route can warm-start from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Swarm {
    pub particles: Vec<Particle>,
    pub global_best_position: Vec<f64>,
    pub global_best_fitness: f64,
    pub iteration: u32,
}

impl Swarm {
    pub fn new(particles: Vec<Particle>) -> Self {
        let dims = particles.first().map(Particle::dimensions).unwrap_or(0);
        let mut swarm = Self {
            particles,
            global_best_position: vec![0.0; dims],
            global_best_fitness: f64::INFINITY,
            iteration: 0,
        };
        swarm.refresh_global_best();
        swarm
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Control-point count shared by every particle (0 for an empty swarm).
    pub fn dimensions(&self) -> usize {
        self.global_best_position.len()
    }

    /// Adopt the best personal best if it beats the current global best.
    ///
    /// Ties keep the incumbent, and the lowest index wins among equal
    /// candidates, so updates are order-stable.
    pub fn refresh_global_best(&mut self) -> bool {
        let mut improved = false;
        for particle in &self.particles {
            if particle.best_fitness < self.global_best_fitness {
                self.global_best_fitness = particle.best_fitness;
                self.global_best_position.clone_from(&particle.best_position);
                improved = true;
            }
        }
        improved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keeps_best() {
        let mut p = Particle::new(vec![1.0, 2.0], vec![0.0, 0.0]);
        assert!(p.record(0.5));
        p.position = vec![3.0, 4.0];
        assert!(!p.record(0.7));
        assert_eq!(p.fitness, 0.7);
        assert_eq!(p.best_fitness, 0.5);
        assert_eq!(p.best_position, vec![1.0, 2.0]);
    }

    #[test]
    fn global_best_tracks_lowest_personal_best() {
        let mut a = Particle::new(vec![1.0], vec![0.0]);
        a.record(0.4);
        let mut b = Particle::new(vec![2.0], vec![0.0]);
        b.record(0.2);
        let mut swarm = Swarm::new(vec![a, b]);
        assert_eq!(swarm.global_best_fitness, 0.2);
        assert_eq!(swarm.global_best_position, vec![2.0]);

        swarm.particles[0].position = vec![5.0];
        swarm.particles[0].record(0.1);
        assert!(swarm.refresh_global_best());
        assert_eq!(swarm.global_best_position, vec![5.0]);
        assert!(!swarm.refresh_global_best());
    }
}
