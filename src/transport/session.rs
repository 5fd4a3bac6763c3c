use crate::game::input::Key;
use crate::protocol::ServerFrame;
use crate::shared::identity::Identity;
use crate::shared::signal::{signal, Listener, Trigger};
use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TermSize {
    pub cols: u16,
    pub rows: u16,
}

/// What the transport learned about a client during its handshake.
#[derive(Debug, Clone, Default)]
pub struct SessionInfo {
    pub user: String,
    pub remote_addr: String,
    pub identity: Option<Identity>,
    /// `None` when the client has no interactive terminal.
    pub term: Option<TermSize>,
    pub command: Vec<String>,
}

#[derive(Debug)]
pub enum Outbound {
    Text(String),
    Frame(ServerFrame),
    Close,
}

/// Write half of a session. Cloneable; closing is idempotent and every write
/// after it fails.
#[derive(Debug, Clone)]
pub struct SessionOutput {
    tx: mpsc::UnboundedSender<Outbound>,
    closed: Arc<AtomicBool>,
}

impl SessionOutput {
    pub fn write(&self, text: impl Into<String>) -> anyhow::Result<()> {
        self.push(Outbound::Text(text.into()))
    }

    pub fn send_frame(&self, frame: ServerFrame) -> anyhow::Result<()> {
        self.push(Outbound::Frame(frame))
    }

    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.tx.send(Outbound::Close);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn push(&self, item: Outbound) -> anyhow::Result<()> {
        if self.is_closed() {
            bail!("session already closed");
        }
        if self.tx.send(item).is_err() {
            bail!("session transport is gone");
        }
        Ok(())
    }
}

/// Server-side view of one connected client.
#[derive(Debug)]
pub struct Session {
    pub info: SessionInfo,
    pub output: SessionOutput,
    pub keys: mpsc::UnboundedReceiver<Key>,
    pub resize: mpsc::UnboundedReceiver<TermSize>,
    pub cancelled: Listener,
}

/// Transport-side ends of a [`Session`].
#[derive(Debug)]
pub struct SessionRemote {
    pub outbound: mpsc::UnboundedReceiver<Outbound>,
    pub input: RemoteInput,
}

#[derive(Debug)]
pub struct RemoteInput {
    keys: mpsc::UnboundedSender<Key>,
    resize: mpsc::UnboundedSender<TermSize>,
    cancel: Trigger,
}

impl RemoteInput {
    pub fn press(&self, key: Key) {
        let _ = self.keys.send(key);
    }

    pub fn resize(&self, size: TermSize) {
        let _ = self.resize.send(size);
    }

    /// Marks the session as gone. Dropping the `RemoteInput` does the same.
    pub fn cancel(&self) {
        self.cancel.fire();
    }
}

pub fn open(info: SessionInfo) -> (Session, SessionRemote) {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (keys_tx, keys_rx) = mpsc::unbounded_channel();
    let (resize_tx, resize_rx) = mpsc::unbounded_channel();
    let (cancel, cancelled) = signal();

    let session = Session {
        info,
        output: SessionOutput {
            tx: outbound_tx,
            closed: Arc::new(AtomicBool::new(false)),
        },
        keys: keys_rx,
        resize: resize_rx,
        cancelled,
    };
    let remote = SessionRemote {
        outbound: outbound_rx,
        input: RemoteInput {
            keys: keys_tx,
            resize: resize_tx,
            cancel,
        },
    };
    (session, remote)
}
