use super::constants::{BODY_CODES, EMPTY_CODE, FOOD_CODE, HEAD_CODES};
use super::types::Point;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Head(usize),
    Body(usize),
    Food,
}

impl Cell {
    pub fn code(self) -> char {
        match self {
            Cell::Empty => EMPTY_CODE,
            Cell::Head(index) => HEAD_CODES.get(index).copied().unwrap_or('?'),
            Cell::Body(index) => BODY_CODES.get(index).copied().unwrap_or('?'),
            Cell::Food => FOOD_CODE,
        }
    }
}

/// Row-major cell buffer. Out-of-bounds writes are dropped and reads return
/// `None`, so callers never index past the edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: i32,
    cols: i32,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(rows: i32, cols: i32) -> Self {
        let rows = rows.max(0);
        let cols = cols.max(0);
        Self {
            rows,
            cols,
            cells: vec![Cell::Empty; (rows * cols) as usize],
        }
    }

    pub fn in_bounds(&self, point: Point) -> bool {
        point.x >= 0 && point.x < self.cols && point.y >= 0 && point.y < self.rows
    }

    #[cfg(test)]
    pub fn get(&self, point: Point) -> Option<Cell> {
        self.offset(point).map(|offset| self.cells[offset])
    }

    pub fn set(&mut self, point: Point, cell: Cell) {
        if let Some(offset) = self.offset(point) {
            self.cells[offset] = cell;
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(Cell::Empty);
    }

    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        (0..self.rows).flat_map(move |y| (0..self.cols).map(move |x| Point::new(x, y)))
    }

    pub fn row_codes(&self) -> impl Iterator<Item = String> + '_ {
        self.cells
            .chunks(self.cols.max(1) as usize)
            .map(|row| row.iter().map(|cell| cell.code()).collect())
    }

    fn offset(&self, point: Point) -> Option<usize> {
        if !self.in_bounds(point) {
            return None;
        }
        Some((point.y * self.cols + point.x) as usize)
    }
}

impl Serialize for Grid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.row_codes())
    }
}
