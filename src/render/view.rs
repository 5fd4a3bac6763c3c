use super::RenderEvent;
use crate::game::types::GameStateSnapshot;
use crate::transport::session::TermSize;
use serde::Serialize;

pub const OBSERVER_ROLE: &str = "Observer";

pub fn role_label(slot: Option<usize>) -> String {
    match slot {
        Some(slot) => format!("Player {}", slot + 1),
        None => OBSERVER_ROLE.to_string(),
    }
}

/// Everything one participant's screen shows. Rebuilt into a frame after
/// every event the program applies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct View {
    pub room: String,
    pub role: String,
    pub slot: Option<usize>,
    pub width: u16,
    pub height: u16,
    pub note: Option<String>,
    /// Set once this participant's snake has died in the current game.
    pub dead: bool,
    pub state: Option<GameStateSnapshot>,
}

impl View {
    pub fn new(room: String, slot: Option<usize>, term: TermSize) -> Self {
        Self {
            room,
            role: role_label(slot),
            slot,
            width: term.cols,
            height: term.rows,
            note: None,
            dead: false,
            state: None,
        }
    }

    pub fn is_over(&self) -> bool {
        self.state.as_ref().is_some_and(|state| state.over)
    }

    pub fn apply(&mut self, event: RenderEvent) {
        match event {
            RenderEvent::Note(text) => self.note = Some(text),
            RenderEvent::Resize(size) => {
                self.width = size.cols;
                self.height = size.rows;
            }
            RenderEvent::Restart => {
                self.state = None;
                self.dead = false;
            }
            RenderEvent::State(state) => {
                if let Some(slot) = self.slot {
                    if state.died.contains(&slot) {
                        self.dead = true;
                    }
                }
                self.state = Some(state);
            }
        }
    }
}
