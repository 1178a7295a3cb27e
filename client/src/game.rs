//! Client-side world state and the per-frame tick
//!
//! [`World`] owns every simulator and runs them in a fixed order each frame:
//! local player, ball, remote interpolation, then the throttled position
//! send. Server events reach it through transport listeners that forward
//! into an inbox channel, which is drained at the start of the frame.

use crate::ball::Ball;
use crate::events::{Event, EventBus, Handler, Subscription};
use crate::player::{LocalPlayer, PlayerInput};
use crate::remote::RemotePlayers;
use crate::transport::Transport;
use log::{debug, info};
use shared::{AvatarConfig, EventKind, PlayerId, ServerEvent, Side, TileGrid};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// How long the scoring side stays highlighted
pub const SCORE_FLASH_SECS: f32 = 0.8;
pub const CHAT_HISTORY: usize = 8;

const ALL_KINDS: [EventKind; 5] = [
    EventKind::PlayersExisting,
    EventKind::PlayerJoined,
    EventKind::PlayerMoved,
    EventKind::PlayerLeft,
    EventKind::ChatMessage,
];

/// Local goal notification. Only this client sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalScored {
    pub side: Side,
}

impl Event for GoalScored {
    type Kind = Side;

    fn kind(&self) -> Side {
        self.side
    }
}

#[derive(Debug, Default)]
pub struct Scoreboard {
    left: u32,
    right: u32,
    flash: Option<(Side, f32)>,
}

impl Scoreboard {
    pub fn record(&mut self, side: Side) {
        match side {
            Side::Left => self.left += 1,
            Side::Right => self.right += 1,
        }
        self.flash = Some((side, SCORE_FLASH_SECS));
    }

    pub fn update(&mut self, dt: f32) {
        if let Some((side, remaining)) = self.flash {
            let remaining = remaining - dt;
            self.flash = (remaining > 0.0).then_some((side, remaining));
        }
    }

    pub fn left(&self) -> u32 {
        self.left
    }

    pub fn right(&self) -> u32 {
        self.right
    }

    /// Side to highlight right now, if a goal was scored recently
    pub fn flashing(&self) -> Option<Side> {
        self.flash.map(|(side, _)| side)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub id: PlayerId,
    pub sender: String,
    pub text: String,
}

/// The most recent relayed chat lines, oldest first
#[derive(Debug, Default)]
pub struct ChatLog {
    lines: VecDeque<ChatLine>,
}

impl ChatLog {
    pub fn push(&mut self, line: ChatLine) {
        if self.lines.len() == CHAT_HISTORY {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatLine> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

pub struct World {
    grid: Arc<TileGrid>,
    pub player: LocalPlayer,
    pub ball: Ball,
    pub remotes: RemotePlayers,
    pub scoreboard: Scoreboard,
    pub chat: ChatLog,
    goals: EventBus<GoalScored>,

    name: String,
    avatar: AvatarConfig,
    local_id: Option<PlayerId>,
    was_connected: bool,

    forward: Handler<ServerEvent>,
    inbox: mpsc::UnboundedReceiver<ServerEvent>,
    subscriptions: Vec<Subscription<EventKind>>,
}

impl World {
    pub fn new(grid: Arc<TileGrid>, name: &str, avatar: AvatarConfig) -> Self {
        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        let forward: Handler<ServerEvent> = Arc::new(move |event: &ServerEvent| {
            let _ = inbox_tx.send(event.clone());
        });

        Self {
            grid,
            player: LocalPlayer::at_spawn(),
            ball: Ball::at_center(),
            remotes: RemotePlayers::new(),
            scoreboard: Scoreboard::default(),
            chat: ChatLog::default(),
            goals: EventBus::new(),
            name: shared::clamp_name(name),
            avatar,
            local_id: None,
            was_connected: false,
            forward,
            inbox,
            subscriptions: Vec::new(),
        }
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_id(&self) -> Option<PlayerId> {
        self.local_id
    }

    /// Subscribes to every world event on the transport. Safe to call more
    /// than once.
    pub fn attach(&mut self, transport: &mut Transport) {
        self.subscriptions = ALL_KINDS
            .iter()
            .map(|kind| transport.on(*kind, Arc::clone(&self.forward)))
            .collect();
    }

    pub fn detach(&mut self, transport: &mut Transport) {
        for subscription in self.subscriptions.drain(..) {
            transport.off(subscription);
        }
    }

    /// Connects and announces the local player. The join is queued until
    /// the handshake completes.
    pub fn connect(&mut self, transport: &mut Transport) -> Result<(), crate::transport::TransportError> {
        transport.connect()?;
        transport.join(self.avatar.clone(), &self.name, self.player.x, self.player.y);
        Ok(())
    }

    pub fn disconnect(&mut self, transport: &mut Transport) {
        transport.disconnect();
        self.drop_session();
    }

    pub fn send_chat(&mut self, transport: &mut Transport, text: &str) {
        let text = text.trim();
        if !text.is_empty() {
            transport.send_chat(text, &self.name);
        }
    }

    pub fn on_goal(&mut self, side: Side, handler: Handler<GoalScored>) -> Subscription<Side> {
        self.goals.subscribe(side, handler)
    }

    /// Runs one frame.
    pub fn frame(&mut self, input: &PlayerInput, dt: f32, transport: &mut Transport, now: Instant) {
        transport.poll();
        self.local_id = transport.client_id();
        self.drain_inbox();

        let connected = transport.is_connected();
        if self.was_connected && !connected {
            self.drop_session();
        }
        self.was_connected = connected;

        self.tick(input, dt);

        transport.send_position_update(self.player.x, self.player.y, now);
    }

    /// Simulation part of a frame, without any networking
    pub fn tick(&mut self, input: &PlayerInput, dt: f32) {
        if let Some(kick) = self.player.update(input, dt, &self.grid) {
            if !self
                .ball
                .charged_kick(kick.dir_x, kick.dir_y, kick.charge, kick.x, kick.y)
            {
                debug!("Kick missed, ball out of range");
            }
        }

        if let Some(side) = self.ball.update(dt, &self.grid, self.player.x, self.player.y) {
            info!("Goal for {:?}", side);
            self.scoreboard.record(side);
            self.goals.emit(&GoalScored { side });
        }
        self.scoreboard.update(dt);

        self.remotes.update();
    }

    pub fn apply_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::PlayersExisting(players) => {
                let local = self.local_id;
                for player in players.iter().filter(|p| Some(p.id) != local) {
                    self.remotes.add(player);
                }
            }
            ServerEvent::PlayerJoined(player) => {
                if !self.is_local(player.id) {
                    info!("{} joined", player.name);
                    self.remotes.add(&player);
                }
            }
            ServerEvent::PlayerMoved { id, seq, x, y } => {
                if !self.is_local(id) {
                    self.remotes.move_to(id, seq, x, y);
                }
            }
            ServerEvent::PlayerLeft { id } => {
                if self.remotes.remove(id) {
                    info!("Player {} left", id);
                }
            }
            ServerEvent::ChatMessage { id, text, sender } => {
                self.chat.push(ChatLine { id, sender, text });
            }
        }
    }

    fn drain_inbox(&mut self) {
        while let Ok(event) = self.inbox.try_recv() {
            self.apply_event(event);
        }
    }

    fn is_local(&self, id: PlayerId) -> bool {
        self.local_id == Some(id)
    }

    fn drop_session(&mut self) {
        self.remotes.clear();
        self.local_id = None;
        self.was_connected = false;
    }
}
