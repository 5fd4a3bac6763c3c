use crate::app::room_name::sanitize_room_name;
use crate::room::error::JoinError;
use crate::room::player::Attached;
use crate::room::registry::Registry;
use crate::transport::session::{Session, SessionOutput};

/// Usage block shown to sessions that connected the wrong way.
pub fn usage(reason: &str) -> String {
    let mut text = [
        "Snake Arena",
        "",
        "Usage:",
        "  hello {\"user\": <name>, \"key\": <public key>, \"command\": \"<room> [password]\", \"term\": {...}}",
        "",
        "Notes:",
        "  - Up to 3 players per room; later arrivals watch as observers.",
        "  - Whoever creates a room sets its password.",
        "  - The game starts once 2 or more players have joined.",
        "",
    ]
    .join("\n");
    if !reason.is_empty() {
        text.push_str(&format!("\nError: {reason}\n"));
    }
    text
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub room_id: String,
    pub password: String,
}

impl JoinRequest {
    /// Reads `<room> [password]` from the session's command tokens.
    pub fn parse(command: &[String]) -> Result<Self, JoinError> {
        let room_id = command
            .first()
            .map(|raw| sanitize_room_name(raw))
            .filter(|id| !id.is_empty())
            .ok_or(JoinError::MissingRoom)?;
        let password = command.get(1).cloned().unwrap_or_default();
        Ok(Self { room_id, password })
    }
}

/// Validates a fresh session and places it in its room.
pub fn admit(registry: &Registry, session: Session) -> Result<Attached, JoinError> {
    if session.info.term.is_none() {
        return Err(JoinError::NoTerminal);
    }
    let request = JoinRequest::parse(&session.info.command)?;
    let (room, _) = registry.find_or_create(&request.room_id, &request.password);
    if !room.password_matches(&request.password) {
        return Err(JoinError::WrongPassword);
    }
    room.add_player(session)
}

pub fn reject(output: &SessionOutput, error: &JoinError) {
    let _ = output.write(error.message());
    output.close();
}
