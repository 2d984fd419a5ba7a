use rand::RngCore;
use rand::seq::SliceRandom;

use super::{Direction, Grid};

/// Randomized Kruskal: joins cells across walls in random order, skipping walls
/// whose sides are already connected.
pub fn carve(width: usize, height: usize, rng: &mut dyn RngCore) -> Grid {
    let mut grid = Grid::new(width, height);

    let mut walls = Vec::with_capacity(2 * grid.cell_count());
    for y in 0..height {
        for x in 0..width {
            if x + 1 < width {
                walls.push((x, y, Direction::East));
            }
            if y + 1 < height {
                walls.push((x, y, Direction::South));
            }
        }
    }
    walls.shuffle(&mut *rng);

    let mut sets = DisjointSets::new(grid.cell_count());
    for (x, y, direction) in walls {
        let Some((nx, ny)) = grid.neighbor(x, y, direction) else {
            continue;
        };
        if sets.union(y * width + x, ny * width + nx) {
            grid.carve(x, y, direction);
        }
    }

    grid
}

struct DisjointSets {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSets {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    fn find(&mut self, mut node: usize) -> usize {
        while self.parent[node] != node {
            self.parent[node] = self.parent[self.parent[node]];
            node = self.parent[node];
        }
        node
    }

    /// Returns false when both nodes were already in the same set.
    fn union(&mut self, a: usize, b: usize) -> bool {
        let (root_a, root_b) = (self.find(a), self.find(b));
        if root_a == root_b {
            return false;
        }
        match self.rank[root_a].cmp(&self.rank[root_b]) {
            std::cmp::Ordering::Less => self.parent[root_a] = root_b,
            std::cmp::Ordering::Greater => self.parent[root_b] = root_a,
            std::cmp::Ordering::Equal => {
                self.parent[root_b] = root_a;
                self.rank[root_a] += 1;
            }
        }
        true
    }
}
