use super::types::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Steer(Direction),
    Restart,
    Quit,
}

pub fn parse_key(value: &str) -> Option<Key> {
    let key = match value.trim().to_ascii_lowercase().as_str() {
        "up" | "w" | "k" => Key::Steer(Direction::Up),
        "down" | "s" | "j" => Key::Steer(Direction::Down),
        "left" | "a" | "h" => Key::Steer(Direction::Left),
        "right" | "d" | "l" => Key::Steer(Direction::Right),
        "r" => Key::Restart,
        "q" | "ctrl+c" => Key::Quit,
        _ => return None,
    };
    Some(key)
}
