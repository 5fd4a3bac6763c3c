pub mod error;
pub mod messages;
pub mod player;
pub mod registry;

#[cfg(test)]
mod tests;

use crate::app::config::RoomSettings;
use crate::game::constants::{MAX_PLAYERS, MIN_PLAYERS_TO_START};
use crate::game::engine::Game;
use crate::game::speed::tick_interval;
use crate::render::view::{role_label, View};
use crate::render::{RenderEvent, RenderProgram};
use crate::shared::identity::Identity;
use crate::shared::names::sanitize_player_name;
use crate::shared::signal::{signal, Trigger};
use crate::transport::session::Session;
use error::JoinError;
use messages::ControlMessage;
use player::{Attached, Player, PlayerParts, SessionWatch};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{sleep, Instant};

const DEFAULT_PLAYER_NAME: &str = "Player";
const SHUTDOWN_FAREWELL: &str = "\nServer is shutting down. Goodbye!\n";
const IDLE_FAREWELL: &str = "\nRoom closed after a period of inactivity. Goodbye!\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
  Shutdown,
  Idle,
}

impl CloseReason {
  fn farewell(self) -> &'static str {
    match self {
      CloseReason::Shutdown => SHUTDOWN_FAREWELL,
      CloseReason::Idle => IDLE_FAREWELL,
    }
  }
}

#[derive(Debug, Default)]
struct Membership {
  players: HashMap<Identity, Arc<Player>>,
  /// Names of slot holders in slot order. Frozen into the roster when the
  /// game starts; restarts reuse it.
  join_names: Vec<String>,
  next_slot: usize,
  started: bool,
  closing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomStats {
  pub id: String,
  pub players: usize,
  pub observers: usize,
  pub started: bool,
  pub locked: bool,
}

/// A named arena. Membership is shared behind a lock; game state belongs to
/// the room loop alone and only leaves it as snapshots.
#[derive(Debug)]
pub struct Room {
  id: String,
  password: String,
  settings: RoomSettings,
  members: RwLock<Membership>,
  control: mpsc::Sender<ControlMessage>,
  shutdown: Trigger,
  closed: Trigger,
}

impl Room {
  /// Creates the room and starts its loop. When the loop ends the room is
  /// sent on `deregister` so its owner can drop it.
  pub fn spawn(
    id: String,
    password: String,
    settings: RoomSettings,
    deregister: mpsc::UnboundedSender<Arc<Room>>,
  ) -> Arc<Self> {
    let (control, control_rx) = mpsc::channel(settings.control_capacity.max(1));
    let (shutdown, _) = signal();
    let (closed, _) = signal();
    let room = Arc::new(Self {
      id,
      password,
      settings,
      members: RwLock::new(Membership::default()),
      control,
      shutdown,
      closed,
    });
    tokio::spawn(Arc::clone(&room).run(control_rx, deregister));
    room
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn password_matches(&self, password: &str) -> bool {
    self.password == password
  }

  pub fn control(&self) -> mpsc::Sender<ControlMessage> {
    self.control.clone()
  }

  /// Asks the loop to stop. Safe to call any number of times.
  pub fn close(&self) {
    self.shutdown.fire();
  }

  #[cfg(test)]
  pub fn is_closed(&self) -> bool {
    self.closed.is_fired()
  }

  /// Resolves once the loop has said goodbye to every player.
  pub async fn wait_closed(&self) {
    self.closed.listen().fired().await;
  }

  pub fn stats(&self) -> RoomStats {
    let members = self.members();
    let players = members
      .players
      .values()
      .filter(|player| player.slot().is_some())
      .count();
    RoomStats {
      id: self.id.clone(),
      players,
      observers: members.players.len() - players,
      started: members.started,
      locked: !self.password.is_empty(),
    }
  }

  /// Admits a session. Before the game starts the first arrivals take slots
  /// 0, 1 and 2; everyone after that watches.
  pub fn add_player(self: &Arc<Self>, session: Session) -> Result<Attached, JoinError> {
    let Session {
      info,
      output,
      keys,
      resize,
      cancelled,
    } = session;
    let identity = info.identity.ok_or(JoinError::MissingIdentity)?;
    let user = sanitize_player_name(&info.user, DEFAULT_PLAYER_NAME);

    let attached = {
      let mut members = self.members_mut();
      if members.closing {
        return Err(JoinError::RoomClosed);
      }
      if members.players.contains_key(&identity) {
        return Err(JoinError::AlreadyConnected);
      }

      let slot = if !members.started && members.next_slot < MAX_PLAYERS {
        let slot = members.next_slot;
        members.next_slot += 1;
        members.join_names.push(user.clone());
        Some(slot)
      } else {
        None
      };

      let view = View::new(self.id.clone(), slot, info.term.unwrap_or_default());
      let (render, program) = RenderProgram::new(view, keys, output.clone(), self.control());
      let player = Arc::new(Player::new(PlayerParts {
        user: user.clone(),
        identity: identity.clone(),
        slot,
        room: Arc::downgrade(self),
        room_id: self.id.clone(),
        control: self.control(),
        render,
        output,
      }));
      members.players.insert(identity, Arc::clone(&player));
      Attached::new(player, program, SessionWatch { resize, cancelled })
    };

    let player = &attached.player;
    tracing::info!(
      room_id = %self.id,
      session_id = %player.session_id(),
      remote_addr = %info.remote_addr,
      user = %player.user(),
      slot = ?player.slot(),
      "player joined"
    );
    // Goes through the loop so a join counts as activity for the idle timer.
    let note = ControlMessage::Note(format!(
      "{} joined as {}",
      player.user(),
      role_label(player.slot())
    ));
    if let Err(TrySendError::Full(ControlMessage::Note(text))) = self.control.try_send(note) {
      self.broadcast(RenderEvent::Note(text));
    }
    Ok(attached)
  }

  #[cfg(test)]
  pub fn member_count(&self) -> usize {
    self.members().players.len()
  }

  pub(crate) fn remove_member(&self, player: &Player) {
    let mut members = self.members_mut();
    let current = members.players.get(player.identity());
    if current.is_some_and(|current| std::ptr::eq(Arc::as_ptr(current), player)) {
      members.players.remove(player.identity());
    }
  }

  fn broadcast(&self, event: RenderEvent) {
    for player in self.members().players.values() {
      player.send(event.clone());
    }
  }

  fn members(&self) -> RwLockReadGuard<'_, Membership> {
    self.members.read().unwrap_or_else(PoisonError::into_inner)
  }

  fn members_mut(&self) -> RwLockWriteGuard<'_, Membership> {
    self.members.write().unwrap_or_else(PoisonError::into_inner)
  }

  /// Marks the game as started and returns the roster, if enough players
  /// have joined. Both happen under one lock so a late join can't slip in
  /// between.
  fn freeze_roster(&self) -> Option<Vec<String>> {
    let mut members = self.members_mut();
    if members.closing || members.next_slot < MIN_PLAYERS_TO_START {
      return None;
    }
    members.started = true;
    Some(members.join_names.clone())
  }

  fn roster(&self) -> Vec<String> {
    self.members().join_names.clone()
  }

  async fn run(
    self: Arc<Self>,
    mut control_rx: mpsc::Receiver<ControlMessage>,
    deregister: mpsc::UnboundedSender<Arc<Room>>,
  ) {
    let mut shutdown = self.shutdown.listen();
    let mut game: Option<Game> = None;
    let idle = sleep(self.settings.idle_timeout);
    let tick = sleep(tick_interval(1));
    tokio::pin!(idle);
    tokio::pin!(tick);
    tracing::info!(room_id = %self.id, "room loop started");

    let reason = loop {
      tokio::select! {
        _ = shutdown.fired() => break CloseReason::Shutdown,
        _ = &mut idle => break CloseReason::Idle,
        message = control_rx.recv() => {
          let Some(message) = message else { break CloseReason::Shutdown };
          idle.as_mut().reset(Instant::now() + self.settings.idle_timeout);
          if let Some(next) = self.handle_control(&mut game, message) {
            tick.as_mut().reset(Instant::now() + next);
          }
        }
        _ = &mut tick => {
          let next = self.handle_tick(&mut game);
          tick.as_mut().reset(Instant::now() + next);
        }
      }
    };

    control_rx.close();
    self.say_goodbye(reason);
    self.closed.fire();
    if deregister.send(Arc::clone(&self)).is_err() {
      tracing::debug!(room_id = %self.id, "registry already gone");
    }
  }

  /// Returns a new tick interval when the message changed the pace.
  fn handle_control(&self, game: &mut Option<Game>, message: ControlMessage) -> Option<Duration> {
    match message {
      ControlMessage::Note(text) => {
        self.broadcast(RenderEvent::Note(text));
        None
      }
      ControlMessage::Direction { slot, direction } => {
        if let Some(game) = game.as_mut() {
          game.queue_direction(slot, direction);
        }
        None
      }
      ControlMessage::Restart => {
        if game.is_none() {
          tracing::debug!(room_id = %self.id, "restart before any game");
          return None;
        }
        let fresh = Game::new(&self.roster());
        tracing::info!(room_id = %self.id, "game restarted");
        self.broadcast(RenderEvent::Restart);
        self.broadcast(RenderEvent::Note("Game restarted!".to_string()));
        self.broadcast(RenderEvent::State(fresh.snapshot(Vec::new())));
        *game = Some(fresh);
        Some(tick_interval(1))
      }
    }
  }

  fn handle_tick(&self, game: &mut Option<Game>) -> Duration {
    if game.is_none() {
      if let Some(names) = self.freeze_roster() {
        let fresh = Game::new(&names);
        tracing::info!(room_id = %self.id, players = names.len(), "game started");
        self.broadcast(RenderEvent::Note("Game started! Good luck!".to_string()));
        self.broadcast(RenderEvent::State(fresh.snapshot(Vec::new())));
        *game = Some(fresh);
      }
      return tick_interval(1);
    }
    let Some(current) = game.as_mut() else {
      return tick_interval(1);
    };

    if !current.is_over() {
      let died = current.tick();
      if current.is_over() {
        tracing::info!(room_id = %self.id, winner = ?current.winner(), "game over");
      }
      self.broadcast(RenderEvent::State(current.snapshot(died)));
    }
    tick_interval(current.level())
  }

  fn say_goodbye(&self, reason: CloseReason) {
    let players: Vec<Arc<Player>> = {
      let mut members = self.members_mut();
      members.closing = true;
      members.players.drain().map(|(_, player)| player).collect()
    };
    tracing::info!(room_id = %self.id, ?reason, players = players.len(), "closing room");
    for player in players {
      player.write(reason.farewell());
      player.teardown();
    }
  }
}
