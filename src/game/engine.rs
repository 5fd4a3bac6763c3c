use super::constants::{
    FOOD_PER_LEVEL, FOOD_REWARD, GRID_COLS, GRID_ROWS, MAX_LEVEL, MAX_PLAYERS,
};
use super::grid::{Cell, Grid};
use super::types::{Direction, GameStateSnapshot, PlayerSnake, PlayerSnapshot, Point};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;

const SPAWNS: [(Point, Direction); MAX_PLAYERS] = [
    (Point::new(GRID_COLS / 4, GRID_ROWS / 2), Direction::Right),
    (Point::new(3 * GRID_COLS / 4, GRID_ROWS / 2), Direction::Left),
    (Point::new(GRID_COLS / 2, GRID_ROWS / 4), Direction::Down),
];

#[derive(Debug, Clone, Copy)]
struct Move {
    index: usize,
    next: Point,
    alive: bool,
}

/// Authoritative state of one multiplayer round.
///
/// `Game` does no I/O and holds no locks; the room loop owning it is the only
/// caller of the mutating methods.
#[derive(Debug, Clone)]
pub struct Game {
    grid: Grid,
    players: Vec<PlayerSnake>,
    food: Vec<Option<Point>>,
    over: bool,
    winner: Option<usize>,
    food_eaten: u32,
    rng: StdRng,
}

impl Game {
    pub fn new(names: &[String]) -> Self {
        Self::with_rng(names, StdRng::from_entropy())
    }

    #[cfg(test)]
    pub fn with_seed(names: &[String], seed: u64) -> Self {
        Self::with_rng(names, StdRng::seed_from_u64(seed))
    }

    #[cfg(test)]
    pub fn with_food_eaten(mut self, food_eaten: u32) -> Self {
        self.food_eaten = food_eaten;
        self
    }

    fn with_rng(names: &[String], rng: StdRng) -> Self {
        let players = names
            .iter()
            .zip(SPAWNS)
            .enumerate()
            .map(|(index, (name, (spawn, direction)))| PlayerSnake {
                index,
                name: name.clone(),
                points: vec![spawn],
                direction,
                queued_direction: direction,
                alive: true,
                score: 0,
            })
            .collect::<Vec<_>>();

        let mut game = Self {
            grid: Grid::new(GRID_ROWS, GRID_COLS),
            food: Vec::with_capacity(players.len()),
            players,
            over: false,
            winner: None,
            food_eaten: 0,
            rng,
        };
        for _ in 0..game.players.len() {
            let spot = game.free_cell();
            game.food.push(spot);
        }
        game.redraw();
        game
    }

    #[cfg(test)]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[cfg(test)]
    pub fn players(&self) -> &[PlayerSnake] {
        &self.players
    }

    #[cfg(test)]
    pub fn food(&self) -> &[Option<Point>] {
        &self.food
    }

    #[cfg(test)]
    pub fn food_eaten(&self) -> u32 {
        self.food_eaten
    }

    pub fn level(&self) -> u32 {
        (1 + self.food_eaten / FOOD_PER_LEVEL).min(MAX_LEVEL)
    }

    pub fn is_over(&self) -> bool {
        self.over
    }

    /// Only meaningful once the game is over. `None` means a draw.
    pub fn winner(&self) -> Option<usize> {
        self.winner
    }

    pub fn queue_direction(&mut self, index: usize, direction: Direction) {
        let Some(snake) = self.players.get_mut(index) else { return };
        if !snake.alive || direction == snake.direction.opposite() {
            return;
        }
        snake.queued_direction = direction;
    }

    /// Advances every living snake by one cell and returns the indices that
    /// died. All collisions are judged against the world as it was before
    /// the tick, so the result never depends on player order.
    pub fn tick(&mut self) -> Vec<usize> {
        if self.over {
            return Vec::new();
        }

        let mut moves = Vec::with_capacity(self.players.len());
        for snake in self.players.iter_mut().filter(|snake| snake.alive) {
            snake.direction = snake.queued_direction;
            let Some(head) = snake.head() else { continue };
            moves.push(Move {
                index: snake.index,
                next: head.step(snake.direction),
                alive: true,
            });
        }

        for mv in &mut moves {
            if !self.grid.in_bounds(mv.next) {
                mv.alive = false;
            }
        }

        let after_walls = moves.clone();
        for (i, mv) in moves.iter_mut().enumerate() {
            if !mv.alive {
                continue;
            }
            let clash = after_walls
                .iter()
                .enumerate()
                .any(|(j, other)| i != j && other.alive && other.next == mv.next);
            if clash {
                mv.alive = false;
            }
        }

        for mv in &mut moves {
            if !mv.alive {
                continue;
            }
            let hits_body = after_walls.iter().any(|owner| {
                let snake = &self.players[owner.index];
                snake
                    .points
                    .iter()
                    .enumerate()
                    .any(|(segment, point)| {
                        !(owner.index == mv.index && segment == 0) && *point == mv.next
                    })
            });
            if hits_body {
                mv.alive = false;
            }
        }

        let died = moves
            .iter()
            .filter(|mv| !mv.alive)
            .map(|mv| mv.index)
            .collect::<Vec<_>>();
        for index in &died {
            self.players[*index].alive = false;
        }

        let mut eaten = Vec::new();
        for mv in moves.iter().filter(|mv| mv.alive) {
            let snake = &mut self.players[mv.index];
            snake.points.insert(0, mv.next);
            match self.food.iter().position(|food| *food == Some(mv.next)) {
                Some(slot) => {
                    snake.score += FOOD_REWARD;
                    self.food_eaten += 1;
                    self.food[slot] = None;
                    eaten.push(slot);
                }
                None => {
                    snake.points.pop();
                }
            }
        }
        for slot in eaten {
            let spot = self.free_cell();
            self.food[slot] = spot;
        }

        self.redraw();

        let mut survivors = self.players.iter().filter(|snake| snake.alive);
        let first = survivors.next().map(|snake| snake.index);
        if survivors.next().is_none() {
            self.over = true;
            self.winner = first;
        }

        died
    }

    pub fn snapshot(&self, died: Vec<usize>) -> GameStateSnapshot {
        GameStateSnapshot {
            grid: self.grid.clone(),
            players: self
                .players
                .iter()
                .map(|snake| PlayerSnapshot {
                    index: snake.index,
                    name: snake.name.clone(),
                    score: snake.score,
                    alive: snake.alive,
                    length: snake.points.len(),
                })
                .collect(),
            level: self.level(),
            food_eaten: self.food_eaten,
            over: self.over,
            winner: self.winner,
            died,
        }
    }

    fn free_cell(&mut self) -> Option<Point> {
        let occupied = self
            .players
            .iter()
            .filter(|snake| snake.alive)
            .flat_map(|snake| snake.points.iter().copied())
            .chain(self.food.iter().flatten().copied())
            .collect::<HashSet<_>>();
        let free = self
            .grid
            .points()
            .filter(|point| !occupied.contains(point))
            .collect::<Vec<_>>();
        free.choose(&mut self.rng).copied()
    }

    fn redraw(&mut self) {
        self.grid.clear();
        for food in self.food.iter().flatten() {
            self.grid.set(*food, Cell::Food);
        }
        for snake in self.players.iter().filter(|snake| snake.alive) {
            for (segment, point) in snake.points.iter().enumerate() {
                let cell = if segment == 0 {
                    Cell::Head(snake.index)
                } else {
                    Cell::Body(snake.index)
                };
                self.grid.set(*point, cell);
            }
        }
    }
}
