//! Text mazes.
//!
//! A [`Maze`] is generated by one of two strategies selected through
//! [`MazeVariant`]: a growing tree that makes long winding corridors, and a
//! randomized Kruskal that makes short spiky dead ends.

use rand::RngCore;

pub mod grid;
pub mod growing_tree;
pub mod kruskal;

pub use self::grid::{Direction, Grid};

pub const MIN_DIMENSION: i32 = 2;
pub const MAX_DIMENSION: i32 = 30;

/// Cursor position that lies outside every maze, so no marker is drawn.
pub const HIDDEN_CURSOR: (i32, i32) = (-1, -1);

type Carver = fn(usize, usize, &mut dyn RngCore) -> Grid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MazeVariant {
    #[default]
    TreeBased,
    Alternate,
}

impl MazeVariant {
    fn carver(self) -> Carver {
        match self {
            MazeVariant::TreeBased => growing_tree::carve,
            MazeVariant::Alternate => kruskal::carve,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Maze {
    variant: MazeVariant,
    grid: Grid,
    cursor: (i32, i32),
}

impl Maze {
    pub fn new(variant: MazeVariant) -> Self {
        Self {
            variant,
            grid: Grid::new(0, 0),
            cursor: (0, 0),
        }
    }

    pub fn variant(&self) -> MazeVariant {
        self.variant
    }

    pub fn width(&self) -> usize {
        self.grid.width()
    }

    pub fn height(&self) -> usize {
        self.grid.height()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn cursor(&self) -> (i32, i32) {
        self.cursor
    }

    pub fn generate(&mut self, width: usize, height: usize) {
        self.generate_with(width, height, &mut rand::rng());
    }

    pub fn generate_with(&mut self, width: usize, height: usize, rng: &mut dyn RngCore) {
        self.grid = (self.variant.carver())(width, height, rng);
        self.cursor = (0, 0);
    }

    /// Opens one extra wall for every dead end.
    pub fn loopify(&mut self) {
        self.loopify_with(&mut rand::rng());
    }

    pub fn loopify_with(&mut self, rng: &mut dyn RngCore) {
        self.grid.remove_dead_ends(rng);
    }

    pub fn set_cursor(&mut self, x: i32, y: i32) {
        self.cursor = (x, y);
    }

    pub fn stringify(&self) -> String {
        self.grid.render(self.cursor)
    }
}
