pub const GRID_COLS: i32 = 46;
pub const GRID_ROWS: i32 = 40;
pub const MAX_PLAYERS: usize = 3;
pub const MIN_PLAYERS_TO_START: usize = 2;
pub const FOOD_REWARD: u32 = 10;
pub const FOOD_PER_LEVEL: u32 = 5;
pub const MAX_LEVEL: u32 = 10;
pub const BASE_TICK_MS: u64 = 160;
pub const MIN_TICK_MS: u64 = 40;
pub const TICK_STEP_MS: u64 = 12;

pub const HEAD_CODES: [char; MAX_PLAYERS] = ['H', 'A', 'X'];
pub const BODY_CODES: [char; MAX_PLAYERS] = ['S', 'B', 'Y'];
pub const FOOD_CODE: char = 'F';
pub const EMPTY_CODE: char = '.';
