use crate::game::types::Direction;

/// Requests delivered to a room loop. The loop is the only writer of game
/// state; everything else talks to it through these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// Broadcast a one-line announcement to every participant.
    Note(String),
    Direction { slot: usize, direction: Direction },
    Restart,
}
