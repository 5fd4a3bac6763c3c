use super::*;
use crate::game::input::Key;
use crate::game::types::{Direction, GameStateSnapshot};
use crate::protocol::ServerFrame;
use crate::transport::session::{open, Outbound, SessionInfo, SessionRemote, TermSize};
use tokio::task::JoinHandle;

fn settings() -> RoomSettings {
    RoomSettings {
        idle_timeout: Duration::from_secs(3600),
        control_capacity: 32,
    }
}

fn spawn_room(settings: RoomSettings) -> (Arc<Room>, mpsc::UnboundedReceiver<Arc<Room>>) {
    let (deregister_tx, deregister_rx) = mpsc::unbounded_channel();
    let room = Room::spawn("arena".to_string(), String::new(), settings, deregister_tx);
    (room, deregister_rx)
}

fn session_info(user: &str, key: &str) -> SessionInfo {
    SessionInfo {
        user: user.to_string(),
        remote_addr: "127.0.0.1:4000".to_string(),
        identity: Identity::from_public_key(key),
        term: Some(TermSize { cols: 80, rows: 24 }),
        command: vec!["arena".to_string()],
    }
}

struct Client {
    player: Arc<Player>,
    remote: SessionRemote,
    task: JoinHandle<()>,
}

fn join(room: &Arc<Room>, user: &str) -> Client {
    let (session, remote) = open(session_info(user, &format!("key-{user}")));
    let attached = room.add_player(session).unwrap();
    let player = Arc::clone(&attached.player);
    let task = tokio::spawn(attached.run());
    Client {
        player,
        remote,
        task,
    }
}

async fn wait_for_view(remote: &mut SessionRemote, matches: impl Fn(&View) -> bool) -> View {
    loop {
        match remote.outbound.recv().await {
            Some(Outbound::Frame(ServerFrame::View(view))) if matches(&view) => return view,
            Some(_) => continue,
            None => panic!("session ended before the expected view"),
        }
    }
}

async fn next_view(remote: &mut SessionRemote) -> View {
    wait_for_view(remote, |_| true).await
}

async fn wait_for_text(remote: &mut SessionRemote) -> String {
    loop {
        match remote.outbound.recv().await {
            Some(Outbound::Text(text)) => return text,
            Some(_) => continue,
            None => panic!("session ended before any text"),
        }
    }
}

async fn wait_for_close(remote: &mut SessionRemote) {
    loop {
        match remote.outbound.recv().await {
            Some(Outbound::Close) | None => return,
            Some(_) => continue,
        }
    }
}

fn running(view: &View) -> bool {
    view.state.as_ref().is_some_and(|state| !state.over)
}

fn finished(view: &View) -> bool {
    view.state.as_ref().is_some_and(|state| state.over)
}

fn head_row(state: &GameStateSnapshot, code: char) -> Option<usize> {
    state.grid.row_codes().position(|row| row.contains(code))
}

#[tokio::test(start_paused = true)]
async fn first_three_take_slots_and_the_rest_observe() {
    let (room, _deregister) = spawn_room(settings());
    let clients: Vec<Client> = ["ann", "bob", "cat", "dan"]
        .iter()
        .map(|user| join(&room, user))
        .collect();

    let slots: Vec<Option<usize>> = clients.iter().map(|client| client.player.slot()).collect();
    assert_eq!(slots, vec![Some(0), Some(1), Some(2), None]);
    assert_eq!(clients[3].player.role(), "Observer");

    let stats = room.stats();
    assert_eq!(stats.players, 3);
    assert_eq!(stats.observers, 1);
    assert!(!stats.locked);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_joins_fill_three_slots_then_observe() {
    let (room, _deregister) = spawn_room(settings());
    let barrier = Arc::new(tokio::sync::Barrier::new(4));
    let handles = ["ann", "bob", "cat", "dan"]
        .into_iter()
        .map(|user| {
            let room = Arc::clone(&room);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                let (session, remote) = open(session_info(user, &format!("key-{user}")));
                barrier.wait().await;
                let attached = room.add_player(session).unwrap();
                (attached.player.slot(), attached, remote)
            })
        })
        .collect::<Vec<_>>();

    let mut slots = Vec::new();
    let mut connected = Vec::new();
    for handle in handles {
        let (slot, attached, remote) = handle.await.unwrap();
        slots.push(slot);
        connected.push((attached, remote));
    }
    slots.sort();

    assert_eq!(slots, vec![None, Some(0), Some(1), Some(2)]);
    assert_eq!(room.stats().players, 3);
    assert_eq!(room.stats().observers, 1);
}

#[tokio::test(start_paused = true)]
async fn duplicate_and_missing_identities_are_rejected() {
    let (room, _deregister) = spawn_room(settings());
    let _ann = join(&room, "ann");

    let (again, _again_remote) = open(session_info("ann", "key-ann"));
    assert_eq!(room.add_player(again).unwrap_err(), JoinError::AlreadyConnected);

    let (anonymous, _anonymous_remote) = open(session_info("eve", ""));
    assert_eq!(room.add_player(anonymous).unwrap_err(), JoinError::MissingIdentity);

    assert_eq!(room.member_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn joins_are_announced_to_everyone() {
    let (room, _deregister) = spawn_room(settings());
    let mut ann = join(&room, "ann");
    let _bob = join(&room, "bob");

    let view = wait_for_view(&mut ann.remote, |view| {
        view.note.as_deref() == Some("bob joined as Player 2")
    })
    .await;
    assert_eq!(view.role, "Player 1");
}

#[tokio::test(start_paused = true)]
async fn game_starts_once_two_players_are_in() {
    let (room, _deregister) = spawn_room(settings());
    let mut ann = join(&room, "ann");
    let _bob = join(&room, "bob");

    let view = wait_for_view(&mut ann.remote, running).await;
    assert_eq!(view.note.as_deref(), Some("Game started! Good luck!"));
    let state = view.state.unwrap();
    assert_eq!(state.players.len(), 2);
    assert_eq!(state.level, 1);
    assert!(room.stats().started);

    let late = join(&room, "cat");
    assert_eq!(late.player.slot(), None);
}

#[tokio::test(start_paused = true)]
async fn a_lone_player_waits() {
    let (room, _deregister) = spawn_room(settings());
    let _ann = join(&room, "ann");
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(!room.stats().started);
}

#[tokio::test(start_paused = true)]
async fn steering_reaches_the_game() {
    let (room, _deregister) = spawn_room(settings());
    let mut ann = join(&room, "ann");
    let _bob = join(&room, "bob");

    let start = wait_for_view(&mut ann.remote, running).await;
    let start_row = head_row(start.state.as_ref().unwrap(), 'H').unwrap();

    ann.remote.input.press(Key::Steer(Direction::Up));
    wait_for_view(&mut ann.remote, |view| {
        view.state
            .as_ref()
            .and_then(|state| head_row(state, 'H'))
            .is_some_and(|row| row < start_row)
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn restart_after_game_over_starts_fresh() {
    let (room, _deregister) = spawn_room(settings());
    let mut ann = join(&room, "ann");
    let _bob = join(&room, "bob");

    let over = wait_for_view(&mut ann.remote, finished).await;
    let final_state = over.state.clone().unwrap();

    ann.remote.input.press(Key::Restart);
    let reset = next_view(&mut ann.remote).await;
    assert!(reset.state.is_none());
    assert!(!reset.dead);
    assert_ne!(reset.note.as_deref(), Some("Game restarted!"));

    let noted = next_view(&mut ann.remote).await;
    assert_eq!(noted.note.as_deref(), Some("Game restarted!"));
    assert!(noted.state.is_none());

    let fresh = next_view(&mut ann.remote).await;
    assert!(running(&fresh));
    let fresh_state = fresh.state.unwrap();
    assert_eq!(fresh_state.level, 1);
    assert_eq!(fresh_state.food_eaten, 0);
    assert!(fresh_state.players.iter().all(|player| player.alive && player.score == 0));
    let names = |state: &GameStateSnapshot| {
        state
            .players
            .iter()
            .map(|player| player.name.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(names(&fresh_state), names(&final_state));
    assert_eq!(names(&fresh_state), vec!["ann".to_string(), "bob".to_string()]);
    assert_eq!(over.state.unwrap(), final_state);
    assert!(final_state.over);
}

#[tokio::test(start_paused = true)]
async fn restart_mid_game_keeps_earlier_snapshots_intact() {
    let (room, _deregister) = spawn_room(settings());
    let mut ann = join(&room, "ann");
    let _bob = join(&room, "bob");

    let first = wait_for_view(&mut ann.remote, running).await;
    let kept = first.state.clone().unwrap();
    wait_for_view(&mut ann.remote, |view| {
        view.state.as_ref().is_some_and(|state| state != &kept)
    })
    .await;

    room.control().send(ControlMessage::Restart).await.unwrap();
    let restarted = wait_for_view(&mut ann.remote, |view| {
        view.note.as_deref() == Some("Game restarted!") && view.state.is_some()
    })
    .await;

    assert_eq!(first.state.unwrap(), kept);
    assert_eq!(restarted.state.unwrap().players.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn restart_rebuilds_from_the_roster_with_nothing_eaten() {
    let (room, _deregister) = spawn_room(settings());
    let _ann = join(&room, "ann");
    let _bob = join(&room, "bob");
    let roster = vec!["ann".to_string(), "bob".to_string()];
    let mut game = Some(Game::with_seed(&roster, 7).with_food_eaten(12));
    assert_eq!(game.as_ref().unwrap().level(), 3);

    let next = room.handle_control(&mut game, ControlMessage::Restart);

    assert_eq!(next, Some(tick_interval(1)));
    let fresh = game.unwrap().snapshot(Vec::new());
    assert_eq!(fresh.food_eaten, 0);
    assert_eq!(fresh.level, 1);
    let names: Vec<&str> = fresh.players.iter().map(|player| player.name.as_str()).collect();
    assert_eq!(names, vec!["ann", "bob"]);
}

#[tokio::test(start_paused = true)]
async fn restart_before_any_game_is_ignored() {
    let (room, _deregister) = spawn_room(settings());
    let mut ann = join(&room, "ann");

    room.control().send(ControlMessage::Restart).await.unwrap();
    room.control()
        .send(ControlMessage::Note("ping".to_string()))
        .await
        .unwrap();

    let view = wait_for_view(&mut ann.remote, |view| view.note.as_deref() == Some("ping")).await;
    assert!(view.state.is_none());
}

#[tokio::test(start_paused = true)]
async fn disconnect_announces_departure_and_frees_the_identity() {
    let (room, _deregister) = spawn_room(settings());
    let mut ann = join(&room, "ann");
    let mut bob = join(&room, "bob");
    wait_for_view(&mut ann.remote, running).await;

    bob.remote.input.cancel();
    wait_for_view(&mut ann.remote, |view| {
        view.note.as_deref() == Some("bob (Player 2) left the room")
    })
    .await;
    wait_for_close(&mut bob.remote).await;
    bob.task.await.unwrap();

    assert!(bob.player.is_torn_down());
    assert_eq!(room.member_count(), 1);

    let (back, _back_remote) = open(session_info("bob", "key-bob"));
    let rejoined = room.add_player(back).unwrap();
    assert_eq!(rejoined.player.slot(), None);
}

#[tokio::test(start_paused = true)]
async fn quitting_leaves_the_room() {
    let (room, _deregister) = spawn_room(settings());
    let mut ann = join(&room, "ann");

    ann.remote.input.press(Key::Quit);
    wait_for_close(&mut ann.remote).await;
    ann.task.await.unwrap();
    assert_eq!(room.member_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn shutdown_says_goodbye_and_deregisters() {
    let (room, mut deregister) = spawn_room(settings());
    let mut ann = join(&room, "ann");
    let mut bob = join(&room, "bob");

    room.close();
    room.wait_closed().await;

    for client in [&mut ann, &mut bob] {
        let text = wait_for_text(&mut client.remote).await;
        assert!(text.contains("Server is shutting down. Goodbye!"));
        wait_for_close(&mut client.remote).await;
        assert!(client.player.is_torn_down());
    }
    ann.task.await.unwrap();
    bob.task.await.unwrap();

    let gone = deregister.recv().await.unwrap();
    assert!(Arc::ptr_eq(&gone, &room));
    assert_eq!(room.member_count(), 0);

    let (late, _late_remote) = open(session_info("cat", "key-cat"));
    assert_eq!(room.add_player(late).unwrap_err(), JoinError::RoomClosed);
}

#[tokio::test(start_paused = true)]
async fn idle_rooms_close_themselves() {
    let (room, mut deregister) = spawn_room(RoomSettings {
        idle_timeout: Duration::from_secs(5),
        control_capacity: 8,
    });
    let mut ann = join(&room, "ann");

    let text = wait_for_text(&mut ann.remote).await;
    assert!(text.contains("inactivity"));
    wait_for_close(&mut ann.remote).await;

    let gone = deregister.recv().await.unwrap();
    assert!(Arc::ptr_eq(&gone, &room));
    assert!(room.is_closed());
}

#[tokio::test(start_paused = true)]
async fn control_traffic_keeps_a_room_open() {
    let (room, _deregister) = spawn_room(RoomSettings {
        idle_timeout: Duration::from_secs(5),
        control_capacity: 8,
    });
    let _ann = join(&room, "ann");

    for _ in 0..4 {
        tokio::time::sleep(Duration::from_secs(3)).await;
        room.control()
            .send(ControlMessage::Note("still here".to_string()))
            .await
            .unwrap();
    }
    assert!(!room.is_closed());
}

#[tokio::test(start_paused = true)]
async fn a_fresh_join_keeps_a_room_open() {
    let (room, _deregister) = spawn_room(RoomSettings {
        idle_timeout: Duration::from_secs(5),
        control_capacity: 8,
    });
    let _ann = join(&room, "ann");

    tokio::time::sleep(Duration::from_millis(4900)).await;
    let _bob = join(&room, "bob");
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(!room.is_closed());
}
