use std::collections::VecDeque;

use rand::RngCore;
use rand::seq::IndexedRandom;

const WALL: char = '█';
const PASSAGE: char = ' ';
const MARKER: char = '@';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    fn offset(self) -> (isize, isize) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }
}

/// Cells with the passages carved between them. Only the east and south side of
/// each cell is stored; north and west are read from the neighbour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    open_east: Vec<bool>,
    open_south: Vec<bool>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            open_east: vec![false; width * height],
            open_south: vec![false; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    pub fn neighbor(&self, x: usize, y: usize, direction: Direction) -> Option<(usize, usize)> {
        let (dx, dy) = direction.offset();
        let nx = x.checked_add_signed(dx)?;
        let ny = y.checked_add_signed(dy)?;
        (nx < self.width && ny < self.height).then_some((nx, ny))
    }

    pub fn neighbors(
        &self,
        x: usize,
        y: usize,
    ) -> impl Iterator<Item = (Direction, usize, usize)> + '_ {
        Direction::ALL.into_iter().filter_map(move |direction| {
            self.neighbor(x, y, direction)
                .map(|(nx, ny)| (direction, nx, ny))
        })
    }

    pub fn is_open(&self, x: usize, y: usize, direction: Direction) -> bool {
        let Some((nx, ny)) = self.neighbor(x, y, direction) else {
            return false;
        };
        match direction {
            Direction::East => self.open_east[self.index(x, y)],
            Direction::South => self.open_south[self.index(x, y)],
            Direction::West => self.open_east[self.index(nx, ny)],
            Direction::North => self.open_south[self.index(nx, ny)],
        }
    }

    /// Removes the wall between a cell and its neighbour. Returns false when the
    /// neighbour lies outside the grid.
    pub fn carve(&mut self, x: usize, y: usize, direction: Direction) -> bool {
        let Some((nx, ny)) = self.neighbor(x, y, direction) else {
            return false;
        };
        let (index, east) = match direction {
            Direction::East => (self.index(x, y), true),
            Direction::South => (self.index(x, y), false),
            Direction::West => (self.index(nx, ny), true),
            Direction::North => (self.index(nx, ny), false),
        };
        if east {
            self.open_east[index] = true;
        } else {
            self.open_south[index] = true;
        }
        true
    }

    pub fn openings(&self, x: usize, y: usize) -> usize {
        Direction::ALL
            .into_iter()
            .filter(|direction| self.is_open(x, y, *direction))
            .count()
    }

    pub(crate) fn remove_dead_ends(&mut self, rng: &mut dyn RngCore) {
        for y in 0..self.height {
            for x in 0..self.width {
                if self.openings(x, y) != 1 {
                    continue;
                }
                let closed: Vec<Direction> = self
                    .neighbors(x, y)
                    .map(|(direction, _, _)| direction)
                    .filter(|direction| !self.is_open(x, y, *direction))
                    .collect();
                if let Some(direction) = closed.choose(&mut *rng) {
                    self.carve(x, y, *direction);
                }
            }
        }
    }

    /// True when every cell is reachable and there are no loops.
    pub fn is_perfect(&self) -> bool {
        let cells = self.cell_count();
        if cells == 0 {
            return true;
        }
        let passages = self.open_east.iter().filter(|open| **open).count()
            + self.open_south.iter().filter(|open| **open).count();
        passages + 1 == cells && self.reachable_from_origin() == cells
    }

    fn reachable_from_origin(&self) -> usize {
        let mut seen = vec![false; self.cell_count()];
        let mut queue = VecDeque::from([(0usize, 0usize)]);
        seen[0] = true;
        let mut count = 0;
        while let Some((x, y)) = queue.pop_front() {
            count += 1;
            for (direction, nx, ny) in self.neighbors(x, y) {
                let index = self.index(nx, ny);
                if self.is_open(x, y, direction) && !seen[index] {
                    seen[index] = true;
                    queue.push_back((nx, ny));
                }
            }
        }
        count
    }

    /// Draws the grid as `(2 * height + 1)` lines of `(2 * width + 1)` characters,
    /// each line ending in a newline. The cursor cell is marked when it lies
    /// inside the grid.
    pub fn render(&self, cursor: (i32, i32)) -> String {
        let cursor = usize::try_from(cursor.0)
            .ok()
            .zip(usize::try_from(cursor.1).ok())
            .filter(|(x, y)| *x < self.width && *y < self.height);

        let rows = 2 * self.height + 1;
        let cols = 2 * self.width + 1;
        let mut out = String::with_capacity(rows * (cols * WALL.len_utf8() + 1));

        for row in 0..rows {
            for col in 0..cols {
                let open = match (row % 2, col % 2) {
                    (1, 1) => {
                        let cell = ((col - 1) / 2, (row - 1) / 2);
                        if cursor == Some(cell) {
                            out.push(MARKER);
                            continue;
                        }
                        true
                    }
                    (1, 0) => {
                        col > 0 && col < cols - 1 && self.is_open(col / 2 - 1, row / 2, Direction::East)
                    }
                    (0, 1) => {
                        row > 0 && row < rows - 1 && self.is_open(col / 2, row / 2 - 1, Direction::South)
                    }
                    _ => false,
                };
                out.push(if open { PASSAGE } else { WALL });
            }
            out.push('\n');
        }
        out
    }
}
