//! Ball physics against the tile grid
//!
//! Each client simulates its own ball from the local player's position
//! only. Nothing here is sent over the network, so two clients can see
//! different trajectories and score different goals.

use shared::{tile_center, world_to_tile, Side, Tile, TileGrid};

pub const FRICTION: f32 = 0.97;
/// Below this on both axes the ball stops
pub const MIN_SPEED: f32 = 5.0;
pub const BOUNCE_DAMPING: f32 = 0.75;

pub const TOUCH_KICK_DISTANCE: f32 = 20.0;
pub const TOUCH_KICK_SPEED: f32 = 320.0;

pub const CHARGED_KICK_DISTANCE: f32 = 40.0;
pub const CHARGED_KICK_MIN_SPEED: f32 = 380.0;
pub const CHARGED_KICK_MAX_SPEED: f32 = 750.0;

pub const GOAL_COOLDOWN_SECS: f32 = 1.0;
pub const CENTER_TILE: (usize, usize) = (30, 7);
pub const BALL_RADIUS: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GoalState {
    Live,
    /// Scoring is suppressed until `remaining` reaches zero
    Cooldown { remaining: f32 },
}

#[derive(Debug, Clone)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    goal: GoalState,
}

impl Ball {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            vel_x: 0.0,
            vel_y: 0.0,
            goal: GoalState::Live,
        }
    }

    pub fn at_center() -> Self {
        let (x, y) = tile_center(CENTER_TILE.0, CENTER_TILE.1);
        Self::new(x, y)
    }

    pub fn goal_state(&self) -> GoalState {
        self.goal
    }

    pub fn speed(&self) -> f32 {
        (self.vel_x * self.vel_x + self.vel_y * self.vel_y).sqrt()
    }

    /// Advances one frame. Returns the side that scored, if any.
    pub fn update(&mut self, dt: f32, grid: &TileGrid, player_x: f32, player_y: f32) -> Option<Side> {
        if let GoalState::Cooldown { remaining } = self.goal {
            let remaining = remaining - dt;
            self.goal = if remaining <= 0.0 {
                GoalState::Live
            } else {
                GoalState::Cooldown { remaining }
            };
        }

        self.touch_kick(player_x, player_y);

        let (prev_x, prev_y) = (self.x, self.y);
        self.x += self.vel_x * dt;
        self.y += self.vel_y * dt;
        let (tile_x, tile_y) = world_to_tile(self.x, self.y);

        if self.goal == GoalState::Live {
            if let Some(side) = grid.get(tile_x, tile_y).and_then(scoring_side) {
                self.goal = GoalState::Cooldown {
                    remaining: GOAL_COOLDOWN_SECS,
                };
                self.reset();
                return Some(side);
            }
        }

        if grid.is_blocked(tile_x, tile_y) {
            self.x = prev_x;
            self.y = prev_y;
            self.bounce(grid, tile_x, tile_y);
        }

        self.vel_x *= FRICTION;
        self.vel_y *= FRICTION;
        if self.vel_x.abs() < MIN_SPEED && self.vel_y.abs() < MIN_SPEED {
            self.vel_x = 0.0;
            self.vel_y = 0.0;
        }

        None
    }

    /// Kicks along the given direction if the player is within range.
    /// Returns false when out of range.
    pub fn charged_kick(&mut self, dir_x: f32, dir_y: f32, charge: f32, player_x: f32, player_y: f32) -> bool {
        let dist = distance(self.x, self.y, player_x, player_y);
        if dist > CHARGED_KICK_DISTANCE {
            return false;
        }

        let charge = charge.clamp(0.0, 1.0);
        let speed = CHARGED_KICK_MIN_SPEED + (CHARGED_KICK_MAX_SPEED - CHARGED_KICK_MIN_SPEED) * charge;
        self.vel_x = dir_x * speed;
        self.vel_y = dir_y * speed;
        true
    }

    /// Back to the center spot, at rest
    pub fn reset(&mut self) {
        let (x, y) = tile_center(CENTER_TILE.0, CENTER_TILE.1);
        self.x = x;
        self.y = y;
        self.vel_x = 0.0;
        self.vel_y = 0.0;
    }

    fn touch_kick(&mut self, player_x: f32, player_y: f32) {
        let dx = self.x - player_x;
        let dy = self.y - player_y;
        let dist = (dx * dx + dy * dy).sqrt();

        if dist > 0.0 && dist < TOUCH_KICK_DISTANCE {
            self.vel_x = dx / dist * TOUCH_KICK_SPEED;
            self.vel_y = dy / dist * TOUCH_KICK_SPEED;
        }
    }

    /// Reflects the axis whose tile transition hit the wall. When neither
    /// axis alone is blocked the hit was a corner and both reflect.
    fn bounce(&mut self, grid: &TileGrid, next_x: i32, next_y: i32) {
        let (cur_x, cur_y) = world_to_tile(self.x, self.y);

        let wall_x = next_x != cur_x && grid.is_blocked(next_x, cur_y);
        let wall_y = next_y != cur_y && grid.is_blocked(cur_x, next_y);

        if wall_x || !wall_y {
            self.vel_x = -self.vel_x * BOUNCE_DAMPING;
        }
        if wall_y || !wall_x {
            self.vel_y = -self.vel_y * BOUNCE_DAMPING;
        }
    }
}

fn scoring_side(tile: Tile) -> Option<Side> {
    match tile {
        Tile::GoalLeft => Some(Side::Right),
        Tile::GoalRight => Some(Side::Left),
        _ => None,
    }
}

fn distance(ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    let dx = ax - bx;
    let dy = ay - by;
    (dx * dx + dy * dy).sqrt()
}
