use crate::transport::handshake::usage;
use std::fmt;

/// Why a session was turned away instead of joining a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    NoTerminal,
    MissingRoom,
    MissingIdentity,
    AlreadyConnected,
    WrongPassword,
    RoomClosed,
}

impl JoinError {
    /// Text written to the rejected session before it is closed.
    pub fn message(&self) -> String {
        match self {
            JoinError::NoTerminal | JoinError::MissingRoom | JoinError::WrongPassword => {
                usage(&self.to_string())
            }
            _ => format!("{self}\n"),
        }
    }
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            JoinError::NoTerminal => "An interactive terminal is required.",
            JoinError::MissingRoom => "A room name is required.",
            JoinError::MissingIdentity => {
                "A public key is required to join. Reconnect with a key, e.g. ssh -i <key>."
            }
            JoinError::AlreadyConnected => "You are already connected to this room.",
            JoinError::WrongPassword => "Incorrect room password.",
            JoinError::RoomClosed => "This room is closing. Try again in a moment.",
        };
        f.write_str(text)
    }
}

impl std::error::Error for JoinError {}
