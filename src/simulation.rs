//! The DLA engine: spawn → random walk → stick or escape.
//!
//! One particle walks at a time. The engine owns the lattice, the circle
//! geometry and the RNG stream; a driver advances it one tick per `step`
//! call until `is_halted` reports the target cluster size. Every decision
//! point consumes exactly one uniform draw (spawn angle, hop direction,
//! one per occupied neighbour in the stick test), so a fixed seed
//! reproduces the cluster byte for byte.

use crate::lattice::{Direction, Geometry, Lattice, Position};
use log::warn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default lattice edge length. Generously larger than the kill circle for
/// typical particle counts.
pub const DEFAULT_GRID_SIZE: usize = 1600;

/// The stick test needs one cell of slack beyond the kill circle, and the
/// truncating index mapping one more.
const GRID_MARGIN: f64 = 2.0;

/// What happens when a walking particle draws a hop into an occupied cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CollisionPolicy {
    /// Keep drawing fresh directions until the particle physically moves
    /// (or escapes); a blocked attempt alone never sticks.
    #[default]
    Roll,
    /// A blocked attempt immediately runs the stick test at the particle's
    /// current, unmoved position.
    Bump,
}

impl CollisionPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            CollisionPolicy::Roll => "roll",
            CollisionPolicy::Bump => "bump",
        }
    }

    /// Parse a setup-file token. Accepts the historical `0`/`1` flag as
    /// well as spelled-out names.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "0" | "false" | "roll" => Some(CollisionPolicy::Roll),
            "1" | "true" | "bump" => Some(CollisionPolicy::Bump),
            _ => None,
        }
    }
}

/// Failures that abort a run.
#[derive(Debug, Error)]
pub enum SimError {
    /// The add-circle spawn site was already occupied. The geometry keeps
    /// the add circle ahead of the cluster, so this signals a broken
    /// grid/geometry invariant rather than bad luck.
    #[error("spawn site ({x}, {y}) on the add circle is already occupied")]
    SpawnCollision { x: f64, y: f64 },
    /// The kill circle grew too close to the lattice edge for safe
    /// indexing.
    #[error("kill circle {kill_circle:.1} exceeds the {grid_size}x{grid_size} grid")]
    GridExhausted { kill_circle: f64, grid_size: usize },
}

/// One stick event: where the particle attached, and how large the cluster
/// was at that moment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StickEvent {
    pub x: f64,
    pub y: f64,
    pub cluster_radius: f64,
}

/// Engine-level state, derived from the particle collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No particle is walking; the next tick spawns one.
    Idle,
    /// A particle is mid random walk.
    Walking,
    /// The target stuck-particle count has been reached.
    Halted,
}

struct Particle {
    pos: Position,
}

/// DLA simulation engine.
///
/// Generic over the RNG so tests can script the draw stream; runs use
/// [`StdRng`] seeded through [`DlaSimulation::set_seed`].
pub struct DlaSimulation<R: Rng = StdRng> {
    target_particles: usize,
    stick_probability: f64,
    policy: CollisionPolicy,
    grid_size: usize,
    lattice: Lattice,
    geometry: Geometry,
    /// Stuck particles, plus the walker as the last entry while one is
    /// active. The initial seed particle is entry zero.
    particles: Vec<Particle>,
    active: bool,
    cluster: Vec<StickEvent>,
    spawn_collisions: usize,
    rng: R,
}

impl DlaSimulation<StdRng> {
    /// Build an idle engine with one stuck seed particle at the origin.
    /// Call [`set_seed`](Self::set_seed) before the first step for a
    /// reproducible run.
    pub fn new(
        target_particles: usize,
        stick_probability: f64,
        policy: CollisionPolicy,
    ) -> Result<Self, SimError> {
        Self::with_rng(
            target_particles,
            stick_probability,
            policy,
            DEFAULT_GRID_SIZE,
            StdRng::seed_from_u64(0),
        )
    }
}

impl<R: Rng + SeedableRng> DlaSimulation<R> {
    /// Replace the RNG with a freshly seeded stream. Must be called before
    /// the first step to guarantee reproducibility; reseeding mid-run is
    /// not supported.
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = R::seed_from_u64(seed);
    }
}

impl<R: Rng> DlaSimulation<R> {
    /// Build an engine over an explicit RNG and lattice size.
    pub fn with_rng(
        target_particles: usize,
        stick_probability: f64,
        policy: CollisionPolicy,
        grid_size: usize,
        rng: R,
    ) -> Result<Self, SimError> {
        let mut sim = Self {
            target_particles,
            stick_probability,
            policy,
            grid_size,
            lattice: Lattice::new(grid_size),
            geometry: Geometry::new(),
            particles: Vec::new(),
            active: false,
            cluster: Vec::new(),
            spawn_collisions: 0,
            rng,
        };
        sim.reset();
        if !sim.kill_circle_fits() {
            return Err(SimError::GridExhausted {
                kill_circle: sim.geometry.kill_circle,
                grid_size,
            });
        }
        Ok(sim)
    }

    /// Clear all particles, zero the grid, restore the initial geometry and
    /// place the stuck seed particle at the origin.
    pub fn reset(&mut self) {
        self.lattice.clear();
        self.geometry = Geometry::new();
        self.particles.clear();
        self.active = false;
        self.cluster.clear();
        self.spawn_collisions = 0;

        let origin = Position::new(0.0, 0.0);
        self.lattice.set(origin, true);
        self.particles.push(Particle { pos: origin });
    }

    /// Advance one tick: move the walker if there is one, otherwise spawn a
    /// new particle, otherwise (target reached) do nothing.
    pub fn step(&mut self) -> Result<(), SimError> {
        if self.active {
            self.move_active()
        } else if self.particles.len() < self.target_particles {
            self.spawn_on_add_circle()
        } else {
            Ok(())
        }
    }

    pub fn state(&self) -> EngineState {
        if self.active {
            EngineState::Walking
        } else if self.particles.len() >= self.target_particles {
            EngineState::Halted
        } else {
            EngineState::Idle
        }
    }

    pub fn is_halted(&self) -> bool {
        self.state() == EngineState::Halted
    }

    /// Stick events in the order they occurred. The seed particle is not
    /// logged, so a completed run yields `target_particles - 1` records.
    pub fn cluster_log(&self) -> impl Iterator<Item = &StickEvent> + '_ {
        self.cluster.iter()
    }

    /// Number of permanently stuck particles, seed included.
    pub fn stuck_particles(&self) -> usize {
        self.particles.len() - self.active as usize
    }

    /// How often a spawn landed on an occupied cell. Nonzero means the
    /// geometry invariant was violated.
    pub fn spawn_collisions(&self) -> usize {
        self.spawn_collisions
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Place a new walker at a uniformly random angle on the add circle.
    fn spawn_on_add_circle(&mut self) -> Result<(), SimError> {
        let theta = self.rng.gen::<f64>() * std::f64::consts::TAU;
        let pos = Position::new(
            (self.geometry.add_circle * theta.cos()).ceil(),
            (self.geometry.add_circle * theta.sin()).ceil(),
        );

        if self.lattice.is_occupied(pos) {
            self.spawn_collisions += 1;
            warn!(
                "spawn collision at ({}, {}); add circle {:.1}, cluster radius {:.1}",
                pos.x, pos.y, self.geometry.add_circle, self.geometry.cluster_radius
            );
            return Err(SimError::SpawnCollision { x: pos.x, y: pos.y });
        }

        self.lattice.set(pos, true);
        self.particles.push(Particle { pos });
        self.active = true;
        Ok(())
    }

    /// One move attempt of the walker. Loops over blocked hops within the
    /// tick (an explicit loop, never recursion); ends the tick on the first
    /// physical move, stick or escape.
    fn move_active(&mut self) -> Result<(), SimError> {
        loop {
            let current = match self.particles.last() {
                Some(walker) => walker.pos,
                None => {
                    self.active = false;
                    return Ok(());
                }
            };
            let direction = Direction::from_draw(self.rng.gen::<f64>());
            let candidate = current.neighbor(direction);

            // Escape is re-checked on every retry iteration.
            if candidate.distance_from_origin() > self.geometry.kill_circle {
                self.lattice.set(current, false);
                let _ = self.particles.pop();
                self.active = false;
                return Ok(());
            }

            if !self.lattice.is_occupied(candidate) {
                self.lattice.set(current, false);
                if let Some(walker) = self.particles.last_mut() {
                    walker.pos = candidate;
                }
                self.lattice.set(candidate, true);

                if self.stick_test(candidate) {
                    return self.finalize_stick(candidate);
                }
                // One lattice hop consumed, the tick is over.
                return Ok(());
            }

            // Blocked hop. Under bump the unmoved particle is itself
            // eligible to stick; under roll we just redraw.
            if self.policy == CollisionPolicy::Bump && self.stick_test(current) {
                return self.finalize_stick(current);
            }
        }
    }

    /// Probabilistic adhesion check around `pos`. All four neighbours are
    /// always scanned and every occupied one consumes its own draw, keeping
    /// the stream position independent of the outcome.
    fn stick_test(&mut self, pos: Position) -> bool {
        let mut stuck = false;
        for direction in Direction::ALL {
            if self.lattice.is_occupied(pos.neighbor(direction))
                && self.stick_probability > self.rng.gen::<f64>()
            {
                stuck = true;
            }
        }
        stuck
    }

    /// Mark the walker permanently stuck at `pos`, grow the geometry and
    /// append the stick event.
    fn finalize_stick(&mut self, pos: Position) -> Result<(), SimError> {
        self.active = false;
        self.geometry.update_cluster_radius(pos);
        if !self.kill_circle_fits() {
            return Err(SimError::GridExhausted {
                kill_circle: self.geometry.kill_circle,
                grid_size: self.grid_size,
            });
        }
        self.cluster.push(StickEvent {
            x: pos.x,
            y: pos.y,
            cluster_radius: self.geometry.cluster_radius,
        });
        Ok(())
    }

    fn kill_circle_fits(&self) -> bool {
        self.geometry.kill_circle <= self.lattice.half_extent() - GRID_MARGIN
    }
}
