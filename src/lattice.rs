//! Occupancy lattice and the adaptive circle geometry.
//!
//! World positions live in a continuous plane centred on the origin; the
//! lattice stores occupancy for the integer sites of that plane in a single
//! contiguous buffer with row-stride indexing. The geometry scalars (cluster
//! radius, add circle, kill circle) only ever grow over a run.

/// How much bigger the add circle is kept, relative to the cluster radius.
pub const ADD_RATIO: f64 = 1.2;
/// How much bigger the kill circle is, relative to the add circle.
pub const KILL_RATIO: f64 = 1.7;
/// Add-circle radius at reset, before any particle sticks.
pub const INITIAL_ADD_CIRCLE: f64 = 10.0;

/// A world position. Continuous-valued, but integer-aligned after every
/// lattice move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance from the cluster origin.
    pub fn distance_from_origin(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// The adjacent integer position in the given direction. No bounds
    /// checking; callers gate on distance from the origin before trusting
    /// the result maps inside the lattice.
    pub fn neighbor(&self, direction: Direction) -> Position {
        match direction {
            Direction::PosX => Position::new(self.x + 1.0, self.y),
            Direction::NegX => Position::new(self.x - 1.0, self.y),
            Direction::PosY => Position::new(self.x, self.y + 1.0),
            Direction::NegY => Position::new(self.x, self.y - 1.0),
        }
    }
}

/// The four cardinal hop directions of the lattice walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    PosX,
    NegX,
    PosY,
    NegY,
}

impl Direction {
    /// Scan order used by the stick test; index order matches the random
    /// direction draw.
    pub const ALL: [Direction; 4] = [
        Direction::PosX,
        Direction::NegX,
        Direction::PosY,
        Direction::NegY,
    ];

    /// Map a uniform draw in [0, 1) onto a direction.
    pub fn from_draw(draw: f64) -> Direction {
        Self::ALL[((draw * 4.0) as usize).min(3)]
    }
}

/// Square occupancy grid centred on the origin.
///
/// A cell is occupied iff exactly one particle (stuck or walking) currently
/// has that integer position; the simulation engine maintains that
/// agreement on every move.
pub struct Lattice {
    size: usize,
    cells: Vec<bool>,
}

impl Lattice {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![false; size * size],
        }
    }

    /// Half the grid extent; positions must satisfy |x|, |y| < half_extent.
    pub fn half_extent(&self) -> f64 {
        (self.size / 2) as f64
    }

    /// World position to buffer index. The origin maps to the centre cell.
    fn index(&self, pos: Position) -> usize {
        let half = (self.size / 2) as f64;
        let col = (pos.x + half) as usize;
        let row = (pos.y + half) as usize;
        col * self.size + row
    }

    pub fn is_occupied(&self, pos: Position) -> bool {
        self.cells[self.index(pos)]
    }

    pub fn set(&mut self, pos: Position, occupied: bool) {
        let idx = self.index(pos);
        self.cells[idx] = occupied;
    }

    /// Empty every cell, keeping the allocation.
    pub fn clear(&mut self) {
        self.cells.fill(false);
    }

    /// Number of occupied cells. Linear scan; used for bookkeeping and
    /// consistency checks, not in the walk loop.
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }
}

/// The three derived scalars that track cluster growth.
///
/// Invariants: `kill_circle == KILL_RATIO * add_circle` after every update
/// (the initial state uses the historical `2 * add_circle`), and all three
/// values are non-decreasing over a run.
#[derive(Debug, Clone, Copy)]
pub struct Geometry {
    pub cluster_radius: f64,
    pub add_circle: f64,
    pub kill_circle: f64,
}

impl Geometry {
    pub fn new() -> Self {
        Self {
            cluster_radius: 0.0,
            add_circle: INITIAL_ADD_CIRCLE,
            kill_circle: 2.0 * INITIAL_ADD_CIRCLE,
        }
    }

    /// Record a newly stuck particle. If it lies outside the current
    /// cluster radius, grow the radius and, where needed, both circles.
    /// Growth is one-directional: a smaller radius never shrinks anything.
    pub fn update_cluster_radius(&mut self, pos: Position) {
        let radius = pos.distance_from_origin();
        if radius > self.cluster_radius {
            self.cluster_radius = radius;
            // The add circle stays either 20% ahead of the cluster radius
            // or at least 5 units ahead, whichever is larger.
            let mut required = self.cluster_radius * ADD_RATIO;
            if required < self.cluster_radius + 5.0 {
                required = self.cluster_radius + 5.0;
            }
            if self.add_circle < required {
                self.add_circle = required;
                self.kill_circle = KILL_RATIO * self.add_circle;
            }
        }
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new()
    }
}
