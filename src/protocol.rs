use crate::render::view::View;
use crate::shared::identity::Identity;
use crate::transport::session::{SessionInfo, TermSize};
use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
  Hello(Hello),
  Key { key: String },
  Resize { cols: u16, rows: u16 },
}

/// First message on every connection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Hello {
  #[serde(default)]
  pub user: String,
  /// Public key text; fingerprinted into the session identity.
  #[serde(default)]
  pub key: Option<String>,
  /// `"<room> [password]"`.
  #[serde(default)]
  pub command: String,
  /// Absent when the client has no interactive terminal.
  #[serde(default)]
  pub term: Option<TermSize>,
}

impl Hello {
  pub fn into_session_info(self, remote_addr: String) -> SessionInfo {
    SessionInfo {
      identity: self.key.as_deref().and_then(Identity::from_public_key),
      command: self.command.split_whitespace().map(str::to_string).collect(),
      user: self.user,
      term: self.term,
      remote_addr,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
  Text { text: String },
  View(View),
}

pub fn decode_client_message(text: &str) -> Option<ClientMessage> {
  serde_json::from_str(text).ok()
}

pub fn encode_server_frame(frame: &ServerFrame) -> anyhow::Result<String> {
  serde_json::to_string(frame).context("failed to encode server frame")
}
