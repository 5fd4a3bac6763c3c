use super::messages::ControlMessage;
use super::Room;
use crate::render::view::role_label;
use crate::render::{RenderEvent, RenderHandle, RenderProgram};
use crate::shared::identity::Identity;
use crate::shared::signal::Listener;
use crate::transport::session::{SessionOutput, TermSize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// One connected participant: a session bound to a room, with its render
/// program and the channels feeding it.
#[derive(Debug)]
pub struct Player {
    session_id: Uuid,
    user: String,
    identity: Identity,
    slot: Option<usize>,
    room_id: String,
    room: Weak<Room>,
    control: mpsc::Sender<ControlMessage>,
    render: RenderHandle,
    output: SessionOutput,
    torn_down: AtomicBool,
}

/// Session signals the player watches while its program runs.
#[derive(Debug)]
pub(crate) struct SessionWatch {
    pub(crate) resize: mpsc::UnboundedReceiver<TermSize>,
    pub(crate) cancelled: Listener,
}

/// A freshly admitted player, ready to run.
#[derive(Debug)]
pub struct Attached {
    pub player: Arc<Player>,
    program: RenderProgram,
    watch: SessionWatch,
}

impl Attached {
    pub(crate) fn new(player: Arc<Player>, program: RenderProgram, watch: SessionWatch) -> Self {
        Self {
            player,
            program,
            watch,
        }
    }

    /// Drives the player until it quits, its session ends, or the room closes.
    pub async fn run(self) {
        let Attached {
            player,
            program,
            watch,
        } = self;
        player.run(program, watch).await;
    }
}

pub(crate) struct PlayerParts {
    pub(crate) user: String,
    pub(crate) identity: Identity,
    pub(crate) slot: Option<usize>,
    pub(crate) room: Weak<Room>,
    pub(crate) room_id: String,
    pub(crate) control: mpsc::Sender<ControlMessage>,
    pub(crate) render: RenderHandle,
    pub(crate) output: SessionOutput,
}

impl Player {
    pub(crate) fn new(parts: PlayerParts) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user: parts.user,
            identity: parts.identity,
            slot: parts.slot,
            room_id: parts.room_id,
            room: parts.room,
            control: parts.control,
            render: parts.render,
            output: parts.output,
            torn_down: AtomicBool::new(false),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn slot(&self) -> Option<usize> {
        self.slot
    }

    pub fn role(&self) -> String {
        role_label(self.slot)
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    pub(crate) fn send(&self, event: RenderEvent) {
        self.render.send(event);
    }

    pub(crate) fn write(&self, text: &str) {
        if let Err(error) = self.output.write(text) {
            tracing::debug!(?error, session_id = %self.session_id, "write to closed session");
        }
    }

    /// Kills the render program, closes the session and leaves the room.
    /// Runs its effects at most once however many paths reach it.
    pub(crate) fn teardown(&self) {
        if self
            .torn_down
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        self.render.kill();
        self.output.close();
        if let Some(room) = self.room.upgrade() {
            room.remove_member(self);
        }
        tracing::debug!(
            session_id = %self.session_id,
            room_id = %self.room_id,
            user = %self.user,
            "player torn down"
        );
    }

    async fn run(self: Arc<Self>, program: RenderProgram, watch: SessionWatch) {
        tracing::info!(
            session_id = %self.session_id,
            room_id = %self.room_id,
            identity = %self.identity,
            "render program started"
        );
        let (done_tx, done_rx) = oneshot::channel();
        let watcher = tokio::spawn(Arc::clone(&self).watch_session(watch, done_rx));

        if let Err(error) = program.run().await {
            if self.is_torn_down() {
                tracing::debug!(?error, session_id = %self.session_id, "render program stopped");
            } else {
                tracing::warn!(?error, session_id = %self.session_id, "render program failed");
            }
        }

        let _ = done_tx.send(());
        let note = ControlMessage::Note(format!("{self} left the room"));
        if self.control.try_send(note).is_err() {
            tracing::debug!(room_id = %self.room_id, "departure note dropped");
        }
        self.teardown();
        let _ = watcher.await;
    }

    async fn watch_session(self: Arc<Self>, mut watch: SessionWatch, mut done: oneshot::Receiver<()>) {
        let mut resize_open = true;
        loop {
            tokio::select! {
                _ = &mut done => return,
                _ = watch.cancelled.fired() => {
                    tracing::debug!(session_id = %self.session_id, "session cancelled");
                    self.teardown();
                    return;
                }
                size = watch.resize.recv(), if resize_open => match size {
                    Some(size) => self.send(RenderEvent::Resize(size)),
                    None => resize_open = false,
                },
            }
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.user, self.role())
    }
}
