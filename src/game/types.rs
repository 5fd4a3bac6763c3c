use super::grid::Grid;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
  pub x: i32,
  pub y: i32,
}

impl Point {
  pub const fn new(x: i32, y: i32) -> Self {
    Self { x, y }
  }

  pub fn step(self, direction: Direction) -> Self {
    match direction {
      Direction::Up => Self::new(self.x, self.y - 1),
      Direction::Down => Self::new(self.x, self.y + 1),
      Direction::Left => Self::new(self.x - 1, self.y),
      Direction::Right => Self::new(self.x + 1, self.y),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
  Up,
  Down,
  Left,
  Right,
}

impl Direction {
  pub fn opposite(self) -> Self {
    match self {
      Direction::Up => Direction::Down,
      Direction::Down => Direction::Up,
      Direction::Left => Direction::Right,
      Direction::Right => Direction::Left,
    }
  }
}

#[derive(Debug, Clone)]
pub struct PlayerSnake {
  pub index: usize,
  pub name: String,
  pub points: Vec<Point>,
  pub direction: Direction,
  pub(crate) queued_direction: Direction,
  pub alive: bool,
  pub score: u32,
}

impl PlayerSnake {
  pub fn head(&self) -> Option<Point> {
    self.points.first().copied()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSnapshot {
  pub index: usize,
  pub name: String,
  pub score: u32,
  pub alive: bool,
  pub length: usize,
}

/// Owned copy of one tick's authoritative state. Nothing in here borrows
/// from the game it was taken from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameStateSnapshot {
  pub grid: Grid,
  pub players: Vec<PlayerSnapshot>,
  pub level: u32,
  pub food_eaten: u32,
  pub over: bool,
  /// `None` while running, and after a draw.
  pub winner: Option<usize>,
  pub died: Vec<usize>,
}
