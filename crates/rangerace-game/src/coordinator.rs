//! The pool coordinator: one actor task that owns all shared game state.
//!
//! Connection handlers register clients and forward their messages here, the
//! round timer posts ticks, and the reset countdown posts the waiting room
//! promotion. Every one of those arrives through the same mailbox, so
//! exactly one task ever touches the client map, the rooms, or the
//! leaderboard, and none of the handlers below awaits or locks.

use std::collections::{HashMap, HashSet};

use rand::Rng;
use rangerace_protocol::{ClientId, ClientMessage, PlayerMode, PlayerSummary, ServerMessage};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::ranking::{RankingSystem, score_guess};
use crate::{Client, ClientSender, GameConfig, GameError, SessionState};

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Commands processed by the coordinator's event loop.
pub(crate) enum Command {
    /// A new connection, registered by its handler.
    Register {
        client_id: ClientId,
        sender: ClientSender,
    },
    /// A connection is gone: its read loop ended or delivery to it failed.
    Unregister { client_id: ClientId },
    /// A gameplay message from a client.
    Message(ClientMessage),
    /// Fan an event out to every connected client.
    Broadcast(ServerMessage),
    /// Posted by the round timer while a session runs.
    RoundTick,
    /// Posted by the reset countdown once the delay has passed. Carries
    /// the reset cycle that scheduled it.
    PromoteWaiting { cycle: u64 },
    /// Request a point-in-time view of the pool.
    Snapshot {
        reply: oneshot::Sender<PoolSnapshot>,
    },
}

/// A point-in-time view of the pool, for tests and operational checks.
///
/// Id lists are sorted so callers can compare them directly.
#[derive(Debug, Clone)]
pub struct PoolSnapshot {
    /// Every connected client.
    pub connected: Vec<ClientId>,
    /// Clients in the player room.
    pub players: Vec<ClientId>,
    /// Clients queued for the next game.
    pub waiting: Vec<ClientId>,
    /// Current standings, best first.
    pub leaderboard: Vec<PlayerSummary>,
    /// Whether a session is running.
    pub session: SessionState,
    /// Rounds played in the current session.
    pub round: u32,
}

// ---------------------------------------------------------------------------
// CoordinatorHandle
// ---------------------------------------------------------------------------

/// Handle for posting events to a running [`Coordinator`]. Cheap to clone.
///
/// All methods fail with [`GameError::CoordinatorClosed`] once the pool task
/// is gone.
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    /// Registers a new client with the sender half of its outbound channel.
    pub async fn register(
        &self,
        client_id: ClientId,
        sender: ClientSender,
    ) -> Result<(), GameError> {
        self.tx
            .send(Command::Register { client_id, sender })
            .await
            .map_err(|_| GameError::CoordinatorClosed)
    }

    /// Unregisters a client. Safe to call for an id that is already gone.
    pub async fn unregister(&self, client_id: ClientId) -> Result<(), GameError> {
        self.tx
            .send(Command::Unregister { client_id })
            .await
            .map_err(|_| GameError::CoordinatorClosed)
    }

    /// Forwards a gameplay message from a client.
    pub async fn submit(&self, msg: ClientMessage) -> Result<(), GameError> {
        self.tx
            .send(Command::Message(msg))
            .await
            .map_err(|_| GameError::CoordinatorClosed)
    }

    /// Broadcasts an event to every connected client.
    pub async fn broadcast(&self, msg: ServerMessage) -> Result<(), GameError> {
        self.tx
            .send(Command::Broadcast(msg))
            .await
            .map_err(|_| GameError::CoordinatorClosed)
    }

    /// Fetches a snapshot of the pool.
    ///
    /// Because the mailbox is ordered, the snapshot reflects every event
    /// posted through this handle before the call.
    pub async fn snapshot(&self) -> Result<PoolSnapshot, GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| GameError::CoordinatorClosed)?;
        reply_rx.await.map_err(|_| GameError::CoordinatorClosed)
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// The pool actor. Owns all shared state and runs in its own task.
pub struct Coordinator {
    config: GameConfig,
    clients: HashMap<ClientId, Client>,
    player_room: HashSet<ClientId>,
    waiting_room: HashSet<ClientId>,
    session: SessionState,
    ranking: RankingSystem,
    mailbox: mpsc::Receiver<Command>,
    /// Sender for the own mailbox, handed to timer tasks. Weak, so the
    /// mailbox still closes once every external handle is gone.
    self_tx: mpsc::WeakSender<Command>,
    round_driver: Option<JoinHandle<()>>,
    /// Bumped on every reset. Promotions are tagged with it so one left
    /// over from an earlier reset cannot fire for a later one.
    cycle: u64,
}

impl Coordinator {
    /// Spawns the coordinator task and returns a handle to it.
    pub fn spawn(config: GameConfig) -> CoordinatorHandle {
        let (tx, rx) = mpsc::channel(config.mailbox_capacity);
        let actor = Self {
            config,
            clients: HashMap::new(),
            player_room: HashSet::new(),
            waiting_room: HashSet::new(),
            session: SessionState::Idle,
            ranking: RankingSystem::new(),
            mailbox: rx,
            self_tx: tx.downgrade(),
            round_driver: None,
            cycle: 0,
        };
        tokio::spawn(actor.run());
        CoordinatorHandle { tx }
    }

    async fn run(mut self) {
        tracing::info!("pool coordinator started");

        while let Some(cmd) = self.mailbox.recv().await {
            self.handle(cmd);
            // The start condition is re-checked after every event, whatever
            // kind it was.
            self.maybe_start_session();
        }

        if let Some(driver) = self.round_driver.take() {
            driver.abort();
        }
        tracing::info!("pool coordinator stopped");
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Register { client_id, sender } => self.handle_register(client_id, sender),
            Command::Unregister { client_id } => {
                self.handle_unregister(&client_id);
            }
            Command::Message(msg) => self.handle_message(msg),
            Command::Broadcast(msg) => self.broadcast(msg),
            Command::RoundTick => self.handle_round_tick(),
            Command::PromoteWaiting { cycle } => self.handle_promote_waiting(cycle),
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    // -- registration -------------------------------------------------------

    fn handle_register(&mut self, client_id: ClientId, sender: ClientSender) {
        // Existing clients hear about the join first, so nobody is notified
        // about themselves.
        self.broadcast(ServerMessage::GameInfo {
            info: "New user joined".to_string(),
            client_id: None,
        });

        self.clients
            .insert(client_id.clone(), Client::new(client_id.clone(), sender));
        tracing::info!(%client_id, connected = self.clients.len(), "client registered");

        self.send_to(
            &client_id,
            ServerMessage::GameInfo {
                info: "Welcome!".to_string(),
                client_id: Some(client_id.clone()),
            },
        );
    }

    /// Removes a client from everything it is part of and tells the rest.
    /// Idempotent: unknown ids are ignored.
    fn handle_unregister(&mut self, client_id: &ClientId) {
        if self.clients.remove(client_id).is_none() {
            return;
        }
        self.player_room.remove(client_id);
        self.waiting_room.remove(client_id);
        self.ranking.leaderboard.remove(client_id);
        tracing::info!(%client_id, connected = self.clients.len(), "client unregistered");

        self.broadcast(ServerMessage::GameInfo {
            info: "User disconnected".to_string(),
            client_id: None,
        });
    }

    // -- gameplay -----------------------------------------------------------

    fn handle_message(&mut self, msg: ClientMessage) {
        let ClientMessage {
            client_id,
            player,
            player_mode,
            input1,
            input2,
        } = msg;

        let Some(client) = self.clients.get_mut(&client_id) else {
            tracing::warn!(%client_id, "message from unknown client, dropping");
            return;
        };
        client.set_name_once(&player);

        match player_mode {
            PlayerMode::Play => self.handle_play(client_id),
            PlayerMode::RoundPlay => {
                client.set_guess(input1, input2);
                tracing::debug!(
                    %client_id,
                    lower = client.lower_bound,
                    upper = client.upper_bound,
                    "guess stored"
                );
            }
            PlayerMode::Unknown => {
                tracing::debug!(%client_id, "message without a play mode");
            }
        }
    }

    /// `play`: the client becomes a player now, or queues for the next game.
    fn handle_play(&mut self, client_id: ClientId) {
        let Some(client) = self.clients.get_mut(&client_id) else {
            return;
        };
        client.is_player = true;

        if self.session.is_active() {
            if self.player_room.contains(&client_id) {
                // Already playing this session.
                return;
            }
            self.waiting_room.insert(client_id.clone());
            tracing::info!(
                %client_id,
                waiting = self.waiting_room.len(),
                "queued for the next game"
            );
            self.send_to(
                &client_id,
                ServerMessage::PlayerWait {
                    info: "you can play when the next game begins!".to_string(),
                },
            );
        } else {
            // A reset countdown may still be running; whoever asks to play
            // while the pool is idle joins directly and leaves the queue.
            self.waiting_room.remove(&client_id);
            self.player_room.insert(client_id.clone());
            tracing::info!(
                %client_id,
                players = self.player_room.len(),
                "joined the player room"
            );
        }
    }

    // -- delivery -----------------------------------------------------------

    /// Sends one event to one client; a dead channel unregisters them.
    fn send_to(&mut self, client_id: &ClientId, msg: ServerMessage) {
        let dead = match self.clients.get(client_id) {
            Some(client) => client.send(msg).is_err(),
            None => false,
        };
        if dead {
            self.handle_unregister(client_id);
        }
    }

    /// Fans an event out to every connected client.
    ///
    /// A failed delivery never interrupts the fan-out: dead clients are
    /// collected and unregistered afterwards, one by one.
    fn broadcast(&mut self, msg: ServerMessage) {
        let mut dead: Vec<ClientId> = Vec::new();
        for (id, client) in &self.clients {
            if client.send(msg.clone()).is_err() {
                dead.push(id.clone());
            }
        }
        for id in dead {
            self.handle_unregister(&id);
        }
    }

    // -- session lifecycle --------------------------------------------------

    /// Starts a session once enough players are in the room. Runs after
    /// every processed event.
    fn maybe_start_session(&mut self) {
        if self.session.is_active() || self.player_room.len() < self.config.min_players {
            return;
        }
        self.session = SessionState::InSession;
        tracing::info!(players = self.player_room.len(), "game session started");
        self.broadcast(ServerMessage::GameStart {
            info: "game started!".to_string(),
        });
        self.start_round_driver();
    }

    /// Spawns the timer task that posts one round tick per interval.
    fn start_round_driver(&mut self) {
        if let Some(old) = self.round_driver.take() {
            old.abort();
        }
        let Some(tx) = self.self_tx.upgrade() else {
            return;
        };
        let interval = self.config.round_interval;
        self.round_driver = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if tx.send(Command::RoundTick).await.is_err() {
                    break;
                }
            }
        }));
    }

    /// Announces the winner, ends the game, and starts the reset.
    fn finish_session(&mut self, winner: PlayerSummary) {
        tracing::info!(
            winner_id = %winner.id,
            winner_name = %winner.name,
            score = winner.total_score,
            "we have a winner"
        );
        self.broadcast(ServerMessage::GameWinner {
            info: "we have a winner!".to_string(),
            winner,
        });
        self.broadcast(ServerMessage::GameEnd);
        self.reset_session();
    }

    /// Resets the cycle: standings and scores are cleared, the player room
    /// is emptied, and the waiting room promotion is scheduled.
    fn reset_session(&mut self) {
        self.session = SessionState::Idle;
        self.cycle += 1;
        if let Some(driver) = self.round_driver.take() {
            driver.abort();
        }
        self.ranking.reset();
        for id in self.player_room.drain() {
            if let Some(client) = self.clients.get_mut(&id) {
                client.total_score = 0;
                client.is_player = false;
            }
        }

        let secs = self.config.reset_delay.as_secs();
        self.broadcast(ServerMessage::GameInfo {
            info: format!("new game starts in {secs} secs"),
            client_id: None,
        });
        tracing::info!(
            delay_secs = secs,
            waiting = self.waiting_room.len(),
            "session reset, countdown running"
        );

        // The countdown runs as its own task and posts the promotion back
        // into the mailbox.
        let Some(tx) = self.self_tx.upgrade() else {
            return;
        };
        let delay = self.config.reset_delay;
        let cycle = self.cycle;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Command::PromoteWaiting { cycle }).await;
        });
    }

    /// Moves everyone who queued during the last session into the player
    /// room. The usual start check runs right after. A promotion from an
    /// earlier cycle is dropped; the reset that superseded it scheduled
    /// its own.
    fn handle_promote_waiting(&mut self, cycle: u64) {
        if cycle != self.cycle {
            tracing::debug!(cycle, current = self.cycle, "stale promotion, dropping");
            return;
        }
        if self.waiting_room.is_empty() {
            return;
        }
        for id in self.waiting_room.drain() {
            self.player_room.insert(id);
        }
        tracing::info!(players = self.player_room.len(), "waiting room promoted");
    }

    // -- rounds -------------------------------------------------------------

    fn handle_round_tick(&mut self) {
        if !self.session.is_active() {
            // A tick that was already queued when the session reset.
            tracing::debug!("round tick outside a session, dropping");
            return;
        }

        let round = self.ranking.begin_round();
        let target = self.draw_target();
        tracing::info!(
            round,
            target,
            players = self.player_room.len(),
            "round tick"
        );

        // Players are scored in id order so a tick that could produce two
        // winners always picks the same one.
        let mut ids: Vec<ClientId> = self.player_room.iter().cloned().collect();
        ids.sort_unstable();

        let mut winner: Option<PlayerSummary> = None;
        let mut dead: Vec<ClientId> = Vec::new();

        for id in ids {
            let Some(client) = self.clients.get_mut(&id) else {
                continue;
            };
            let (outcome, delta) = score_guess(target, client.lower_bound, client.upper_bound);
            client.total_score += delta;
            if client
                .send(ServerMessage::PlayInfo {
                    info: outcome.notice(target),
                })
                .is_err()
            {
                dead.push(id.clone());
            }
            self.ranking.leaderboard.record(client);

            if client.total_score == self.config.win_score {
                winner = Some(client.summary());
                break;
            }
        }

        for id in &dead {
            self.handle_unregister(id);
        }

        if let Some(winner) = winner {
            self.finish_session(winner);
            return;
        }

        if self.ranking.round() > self.config.round_limit {
            // The limit round itself was still scored; the leader takes it.
            match self.ranking.leaderboard.top() {
                Some(top) => self.finish_session(top),
                None => {
                    tracing::warn!(round, "round limit hit with an empty leaderboard");
                    self.reset_session();
                }
            }
            return;
        }

        self.broadcast(ServerMessage::Scoreboard {
            info: format!("round {round}"),
            scoreboard: self.ranking.leaderboard.standings(),
        });
    }

    fn draw_target(&self) -> u8 {
        rand::rng().random_range(self.config.target_range.clone())
    }

    // -- introspection ------------------------------------------------------

    fn snapshot(&self) -> PoolSnapshot {
        let mut connected: Vec<ClientId> = self.clients.keys().cloned().collect();
        let mut players: Vec<ClientId> = self.player_room.iter().cloned().collect();
        let mut waiting: Vec<ClientId> = self.waiting_room.iter().cloned().collect();
        connected.sort_unstable();
        players.sort_unstable();
        waiting.sort_unstable();

        PoolSnapshot {
            connected,
            players,
            waiting,
            leaderboard: self.ranking.leaderboard.standings(),
            session: self.session,
            round: self.ranking.round(),
        }
    }
}
