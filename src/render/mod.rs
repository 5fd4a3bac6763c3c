pub mod view;

use crate::game::input::Key;
use crate::game::types::GameStateSnapshot;
use crate::protocol::ServerFrame;
use crate::room::messages::ControlMessage;
use crate::shared::signal::{signal, Listener, Trigger};
use crate::transport::session::{SessionOutput, TermSize};
use std::sync::Arc;
use tokio::sync::mpsc;
use view::View;

/// Messages the room pushes into a participant's render program.
#[derive(Debug, Clone)]
pub enum RenderEvent {
    Note(String),
    State(GameStateSnapshot),
    Restart,
    Resize(TermSize),
}

/// Room-side handle to a running [`RenderProgram`]. Sends never block.
#[derive(Debug, Clone)]
pub struct RenderHandle {
    events: mpsc::UnboundedSender<RenderEvent>,
    kill: Arc<Trigger>,
}

impl RenderHandle {
    pub fn send(&self, event: RenderEvent) {
        let _ = self.events.send(event);
    }

    pub fn kill(&self) {
        self.kill.fire();
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Per-participant interactive loop: folds room events into a [`View`],
/// pushes it to the session, and turns key presses into control messages.
#[derive(Debug)]
pub struct RenderProgram {
    view: View,
    events: mpsc::UnboundedReceiver<RenderEvent>,
    keys: mpsc::UnboundedReceiver<Key>,
    output: SessionOutput,
    control: mpsc::Sender<ControlMessage>,
    kill: Listener,
}

impl RenderProgram {
    pub fn new(
        view: View,
        keys: mpsc::UnboundedReceiver<Key>,
        output: SessionOutput,
        control: mpsc::Sender<ControlMessage>,
    ) -> (RenderHandle, Self) {
        let (events_tx, events) = mpsc::unbounded_channel();
        let (kill, kill_rx) = signal();
        let handle = RenderHandle {
            events: events_tx,
            kill: Arc::new(kill),
        };
        let program = Self {
            view,
            events,
            keys,
            output,
            control,
            kill: kill_rx,
        };
        (handle, program)
    }

    /// Runs until killed, until the participant quits, or until the session
    /// output fails.
    pub async fn run(mut self) -> anyhow::Result<()> {
        if self.kill.is_fired() {
            return Ok(());
        }
        self.draw()?;
        loop {
            tokio::select! {
                _ = self.kill.fired() => return Ok(()),
                event = self.events.recv() => {
                    let Some(event) = event else { return Ok(()) };
                    self.view.apply(event);
                    self.draw()?;
                }
                key = self.keys.recv() => {
                    let Some(key) = key else { return Ok(()) };
                    if self.handle_key(key).await == Flow::Quit {
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn handle_key(&mut self, key: Key) -> Flow {
        match key {
            Key::Quit => return Flow::Quit,
            Key::Restart => {
                if self.view.is_over() {
                    self.send_control(ControlMessage::Restart).await;
                }
            }
            Key::Steer(direction) => {
                if self.view.is_over() || self.view.dead {
                    return Flow::Continue;
                }
                if let Some(slot) = self.view.slot {
                    self.send_control(ControlMessage::Direction { slot, direction })
                        .await;
                }
            }
        }
        Flow::Continue
    }

    async fn send_control(&self, message: ControlMessage) {
        if self.control.send(message).await.is_err() {
            tracing::debug!(room_id = %self.view.room, "room loop already stopped");
        }
    }

    fn draw(&self) -> anyhow::Result<()> {
        self.output.send_frame(ServerFrame::View(self.view.clone()))
    }
}
