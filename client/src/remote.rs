//! Smoothing of remote players between sparse position updates
//!
//! Network events only ever move a view's target. Every frame the drawn
//! position closes a fixed fraction of the remaining gap, and the animation
//! is inferred from how much gap is left.

use crate::appearance::Appearance;
use log::debug;
use shared::{PlayerData, PlayerId};
use std::collections::BTreeMap;

pub const LERP_FACTOR: f32 = 0.15;
/// Remaining distance above which the view counts as moving
pub const IDLE_THRESHOLD: f32 = 1.0;
/// Remaining distance above which moving becomes running
pub const RUN_THRESHOLD: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteAnimation {
    Idle,
    Walk,
    Run,
}

#[derive(Debug, Clone)]
pub struct RemotePlayerView {
    pub id: PlayerId,
    pub name: String,
    pub current_x: f32,
    pub current_y: f32,
    pub target_x: f32,
    pub target_y: f32,
    pub animation: RemoteAnimation,
    pub flip_x: bool,
    pub appearance: Appearance,
    last_seq: u32,
}

impl RemotePlayerView {
    pub fn new(player: &PlayerData) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            current_x: player.x,
            current_y: player.y,
            target_x: player.x,
            target_y: player.y,
            animation: RemoteAnimation::Idle,
            flip_x: false,
            appearance: Appearance::for_player(player.id, &player.avatar),
            last_seq: 0,
        }
    }

    /// Gap between drawn and reported position
    pub fn remaining(&self) -> f32 {
        let dx = self.target_x - self.current_x;
        let dy = self.target_y - self.current_y;
        (dx * dx + dy * dy).sqrt()
    }

    fn step(&mut self) {
        let dx = self.target_x - self.current_x;
        let dy = self.target_y - self.current_y;
        self.current_x += dx * LERP_FACTOR;
        self.current_y += dy * LERP_FACTOR;

        let remaining = self.remaining();
        self.animation = if remaining > RUN_THRESHOLD {
            RemoteAnimation::Run
        } else if remaining > IDLE_THRESHOLD {
            RemoteAnimation::Walk
        } else {
            RemoteAnimation::Idle
        };

        if remaining > IDLE_THRESHOLD && dx != 0.0 {
            self.flip_x = dx < 0.0;
        }
    }
}

#[derive(Debug, Default)]
pub struct RemotePlayers {
    views: BTreeMap<PlayerId, RemotePlayerView>,
}

impl RemotePlayers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a view at the reported position. An id that already has a
    /// view keeps it, only its move sequence baseline is reset.
    pub fn add(&mut self, player: &PlayerData) -> bool {
        if let Some(view) = self.views.get_mut(&player.id) {
            view.last_seq = 0;
            return false;
        }
        debug!("Adding remote player {} ({})", player.id, player.name);
        self.views.insert(player.id, RemotePlayerView::new(player));
        true
    }

    /// Retargets a view. Unknown ids and stale sequence numbers are ignored.
    pub fn move_to(&mut self, id: PlayerId, seq: u32, x: f32, y: f32) -> bool {
        let Some(view) = self.views.get_mut(&id) else {
            return false;
        };
        if seq <= view.last_seq {
            debug!("Dropping stale move {} for player {}", seq, id);
            return false;
        }

        view.last_seq = seq;
        view.target_x = x;
        view.target_y = y;
        true
    }

    /// Drops the view along with its generated appearance.
    pub fn remove(&mut self, id: PlayerId) -> bool {
        self.views.remove(&id).is_some()
    }

    /// One interpolation step for every view
    pub fn update(&mut self) {
        for view in self.views.values_mut() {
            view.step();
        }
    }

    pub fn clear(&mut self) {
        self.views.clear();
    }

    pub fn get(&self, id: PlayerId) -> Option<&RemotePlayerView> {
        self.views.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemotePlayerView> {
        self.views.values()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}
