use rand::seq::IndexedRandom;
use rand::{Rng, RngCore};

use super::{Direction, Grid};

/// Growing tree that always extends the newest cell, which gives long winding
/// corridors.
pub fn carve(width: usize, height: usize, rng: &mut dyn RngCore) -> Grid {
    let mut grid = Grid::new(width, height);
    if grid.cell_count() == 0 {
        return grid;
    }

    let mut visited = vec![false; grid.cell_count()];
    let start = (rng.random_range(0..width), rng.random_range(0..height));
    visited[start.1 * width + start.0] = true;
    let mut active = vec![start];

    while let Some(&(x, y)) = active.last() {
        let unvisited: Vec<(Direction, usize, usize)> = grid
            .neighbors(x, y)
            .filter(|(_, nx, ny)| !visited[ny * width + nx])
            .collect();

        match unvisited.choose(&mut *rng) {
            Some(&(direction, nx, ny)) => {
                grid.carve(x, y, direction);
                visited[ny * width + nx] = true;
                active.push((nx, ny));
            }
            None => {
                active.pop();
            }
        }
    }

    grid
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::carve;

    #[test]
    fn carves_spanning_tree() {
        let mut rng = StdRng::seed_from_u64(3);
        let grid = carve(9, 6, &mut rng);
        assert!(grid.is_perfect());
    }

    #[test]
    fn same_seed_same_maze() {
        let a = carve(6, 6, &mut StdRng::seed_from_u64(11));
        let b = carve(6, 6, &mut StdRng::seed_from_u64(11));
        assert_eq!(a, b);
    }
}
