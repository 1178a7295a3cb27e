//! Local player simulation: movement, tile collision and the charge kick
//!
//! The local player is authoritative for its own position. Every frame the
//! sampled [`PlayerInput`] is turned into a velocity, the proposed position
//! is checked against the tile grid, and the kick state machine advances.

use shared::{tile_center, world_to_tile, TileGrid, SPAWN_TILE};

pub const WALK_SPEED: f32 = 160.0;
pub const SPRINT_SPEED: f32 = 280.0;
pub const DIAGONAL_FACTOR: f32 = 0.707;

/// Charge gained per second while standing still
pub const CHARGE_RATE_STILL: f32 = 1.2;
/// Charge gained per second while moving
pub const CHARGE_RATE_MOVING: f32 = 0.35;
pub const MAX_CHARGE: f32 = 1.0;

/// Length of the one-shot kick animation (3 frames at 10 fps)
pub const KICK_ANIMATION_SECS: f32 = 0.3;

/// Keyboard intent sampled once per frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub sprint: bool,
    pub kick_held: bool,
    /// A text field has focus; movement and kicking are suspended
    pub typing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KickState {
    Idle,
    Charging { charge: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Animation {
    Idle,
    Walk,
    Run,
    /// One-shot, blocks other transitions until it has played out
    Kick { elapsed: f32 },
}

impl Animation {
    pub fn name(&self) -> &'static str {
        match self {
            Animation::Idle => "idle",
            Animation::Walk => "walk",
            Animation::Run => "run",
            Animation::Kick { .. } => "kick",
        }
    }
}

/// Impulse released by letting go of the kick key
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargedKick {
    pub dir_x: f32,
    pub dir_y: f32,
    pub charge: f32,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone)]
pub struct LocalPlayer {
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    facing: (f32, f32),
    kick: KickState,
    animation: Animation,
    flip_x: bool,
}

impl LocalPlayer {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            vel_x: 0.0,
            vel_y: 0.0,
            facing: (0.0, 1.0),
            kick: KickState::Idle,
            animation: Animation::Idle,
            flip_x: false,
        }
    }

    pub fn at_spawn() -> Self {
        let (x, y) = tile_center(SPAWN_TILE.0, SPAWN_TILE.1);
        Self::new(x, y)
    }

    /// Last nonzero movement direction, normalized
    pub fn facing(&self) -> (f32, f32) {
        self.facing
    }

    pub fn kick_state(&self) -> KickState {
        self.kick
    }

    /// Current charge in `[0, 1]`, zero when not charging
    pub fn charge(&self) -> f32 {
        match self.kick {
            KickState::Charging { charge } => charge,
            KickState::Idle => 0.0,
        }
    }

    pub fn animation(&self) -> Animation {
        self.animation
    }

    pub fn flip_x(&self) -> bool {
        self.flip_x
    }

    /// Advances one frame. Returns the kick to apply to the ball when the
    /// kick key was released this frame.
    pub fn update(&mut self, input: &PlayerInput, dt: f32, grid: &TileGrid) -> Option<ChargedKick> {
        // A focused text field swallows every key, so a held kick counts as
        // released
        let input = if input.typing {
            PlayerInput {
                typing: true,
                ..PlayerInput::default()
            }
        } else {
            *input
        };

        let (dir_x, dir_y) = direction(&input);
        let moving = dir_x != 0.0 || dir_y != 0.0;
        let speed = if input.sprint { SPRINT_SPEED } else { WALK_SPEED };

        self.vel_x = dir_x * speed;
        self.vel_y = dir_y * speed;
        if dir_x != 0.0 && dir_y != 0.0 {
            self.vel_x *= DIAGONAL_FACTOR;
            self.vel_y *= DIAGONAL_FACTOR;
        }

        if moving {
            let len = (dir_x * dir_x + dir_y * dir_y).sqrt();
            self.facing = (dir_x / len, dir_y / len);
            if dir_x != 0.0 {
                self.flip_x = dir_x < 0.0;
            }
        }

        self.try_move(dt, grid);
        let kick = self.update_kick(&input, moving, dt);
        self.update_animation(&input, moving, dt, kick.is_some());

        kick
    }

    /// Moves by the current velocity unless the destination tile blocks.
    /// No sliding: a blocked move is rejected on both axes.
    fn try_move(&mut self, dt: f32, grid: &TileGrid) {
        let new_x = self.x + self.vel_x * dt;
        let new_y = self.y + self.vel_y * dt;
        let (tile_x, tile_y) = world_to_tile(new_x, new_y);

        if !grid.is_blocked(tile_x, tile_y) {
            self.x = new_x;
            self.y = new_y;
        }
    }

    fn update_kick(&mut self, input: &PlayerInput, moving: bool, dt: f32) -> Option<ChargedKick> {
        match (self.kick, input.kick_held) {
            // Entering the charge starts from zero and already charges on
            // the press frame
            (_, true) => {
                let rate = if moving {
                    CHARGE_RATE_MOVING
                } else {
                    CHARGE_RATE_STILL
                };
                self.kick = KickState::Charging {
                    charge: (self.charge() + rate * dt).min(MAX_CHARGE),
                };
                None
            }
            (KickState::Charging { charge }, false) => {
                self.kick = KickState::Idle;
                Some(ChargedKick {
                    dir_x: self.facing.0,
                    dir_y: self.facing.1,
                    charge,
                    x: self.x,
                    y: self.y,
                })
            }
            (KickState::Idle, false) => None,
        }
    }

    fn update_animation(&mut self, input: &PlayerInput, moving: bool, dt: f32, kicked: bool) {
        // A kick during a running kick animation does not restart it
        if kicked && !matches!(self.animation, Animation::Kick { .. }) {
            self.animation = Animation::Kick { elapsed: 0.0 };
            return;
        }

        if let Animation::Kick { elapsed } = self.animation {
            let elapsed = elapsed + dt;
            if elapsed < KICK_ANIMATION_SECS {
                self.animation = Animation::Kick { elapsed };
                return;
            }
        }

        self.animation = match (moving, input.sprint) {
            (true, true) => Animation::Run,
            (true, false) => Animation::Walk,
            (false, _) => Animation::Idle,
        };
    }
}

/// Per-axis direction. When both keys of an axis are held, right wins over
/// left and down wins over up.
fn direction(input: &PlayerInput) -> (f32, f32) {
    let mut dir_x = 0.0;
    let mut dir_y = 0.0;

    if input.left {
        dir_x = -1.0;
    }
    if input.right {
        dir_x = 1.0;
    }
    if input.up {
        dir_y = -1.0;
    }
    if input.down {
        dir_y = 1.0;
    }

    (dir_x, dir_y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::Tile;

    const DT: f32 = 0.1;

    fn open_grid() -> TileGrid {
        TileGrid::filled(10, 10, Tile::Grass)
    }

    fn held(f: impl FnOnce(&mut PlayerInput)) -> PlayerInput {
        let mut input = PlayerInput::default();
        f(&mut input);
        input
    }

    #[test]
    fn test_spawn_position() {
        let player = LocalPlayer::at_spawn();
        assert_approx_eq!(player.x, 560.0);
        assert_approx_eq!(player.y, 240.0);
        assert_eq!(player.facing(), (0.0, 1.0));
    }

    #[test]
    fn test_walk_and_sprint_speeds() {
        let grid = open_grid();
        let mut player = LocalPlayer::new(100.0, 100.0);

        player.update(&held(|i| i.right = true), DT, &grid);
        assert_approx_eq!(player.x, 116.0);
        assert_eq!(player.animation(), Animation::Walk);

        player.update(&held(|i| { i.right = true; i.sprint = true; }), DT, &grid);
        assert_approx_eq!(player.x, 144.0);
        assert_eq!(player.animation(), Animation::Run);
    }

    #[test]
    fn test_diagonal_is_normalized() {
        let grid = open_grid();
        let mut player = LocalPlayer::new(100.0, 100.0);

        player.update(&held(|i| { i.right = true; i.down = true; }), DT, &grid);

        assert_approx_eq!(player.vel_x, 160.0 * 0.707, 1e-3);
        assert_approx_eq!(player.vel_y, 160.0 * 0.707, 1e-3);
        let (fx, fy) = player.facing();
        assert_approx_eq!(fx, std::f32::consts::FRAC_1_SQRT_2, 1e-5);
        assert_approx_eq!(fy, std::f32::consts::FRAC_1_SQRT_2, 1e-5);
    }

    #[test]
    fn test_opposite_keys_later_direction_wins() {
        let grid = open_grid();
        let mut player = LocalPlayer::new(100.0, 100.0);

        player.update(
            &held(|i| { i.left = true; i.right = true; i.up = true; i.down = true; }),
            DT,
            &grid,
        );

        assert!(player.vel_x > 0.0);
        assert!(player.vel_y > 0.0);
    }

    #[test]
    fn test_facing_kept_while_idle() {
        let grid = open_grid();
        let mut player = LocalPlayer::new(100.0, 100.0);

        player.update(&held(|i| i.left = true), DT, &grid);
        assert!(player.flip_x());
        player.update(&PlayerInput::default(), DT, &grid);

        assert_eq!(player.facing(), (-1.0, 0.0));
        assert!(player.flip_x());
        assert_eq!(player.animation(), Animation::Idle);
    }

    #[test]
    fn test_typing_suppresses_movement() {
        let grid = open_grid();
        let mut player = LocalPlayer::new(100.0, 100.0);

        player.update(&held(|i| { i.right = true; i.typing = true; }), DT, &grid);

        assert_approx_eq!(player.x, 100.0);
        assert_eq!(player.kick_state(), KickState::Idle);
    }

    #[test]
    fn test_wall_rejects_whole_move() {
        let mut grid = open_grid();
        grid.stamp_solid(vec![(4, 4)]);
        // Just left of the wall tile, moving diagonally into it
        let mut player = LocalPlayer::new(127.0, 127.0);

        player.update(&held(|i| { i.right = true; i.down = true; }), DT, &grid);

        assert_approx_eq!(player.x, 127.0);
        assert_approx_eq!(player.y, 127.0);
    }

    #[test]
    fn test_map_edge_blocks() {
        let grid = open_grid();
        let mut player = LocalPlayer::new(5.0, 100.0);

        player.update(&held(|i| i.left = true), DT, &grid);
        assert_approx_eq!(player.x, 5.0);
    }

    #[test]
    fn test_goal_tiles_are_walkable() {
        let grid = TileGrid::town_and_field();
        let (x, y) = tile_center(19, 7);
        let mut player = LocalPlayer::new(x, y);

        for _ in 0..2 {
            player.update(&held(|i| i.right = true), DT, &grid);
        }
        assert_eq!(world_to_tile(player.x, player.y), (20, 7));
    }

    #[test]
    fn test_charge_accumulates_and_clamps() {
        let grid = open_grid();
        let mut player = LocalPlayer::new(100.0, 100.0);
        let kick = held(|i| i.kick_held = true);

        // The press frame already charges
        player.update(&kick, DT, &grid);
        assert!(matches!(player.kick_state(), KickState::Charging { .. }));
        assert_approx_eq!(player.charge(), 0.12);

        player.update(&kick, 0.5, &grid);
        assert_approx_eq!(player.charge(), 0.72);

        player.update(&held(|i| { i.kick_held = true; i.right = true; }), 0.5, &grid);
        assert_approx_eq!(player.charge(), 0.895);

        player.update(&kick, 1.0, &grid);
        assert_approx_eq!(player.charge(), MAX_CHARGE);
    }

    #[test]
    fn test_release_fires_kick_with_facing() {
        let grid = open_grid();
        let mut player = LocalPlayer::new(100.0, 100.0);

        player.update(&held(|i| i.up = true), DT, &grid);
        player.update(&held(|i| i.kick_held = true), DT, &grid);
        player.update(&held(|i| i.kick_held = true), 0.5, &grid);

        let kick = player.update(&PlayerInput::default(), DT, &grid).unwrap();
        assert_approx_eq!(kick.dir_x, 0.0);
        assert_approx_eq!(kick.dir_y, -1.0);
        assert_approx_eq!(kick.charge, 0.72);
        assert_approx_eq!(kick.y, player.y);

        assert_eq!(player.kick_state(), KickState::Idle);
        assert_approx_eq!(player.charge(), 0.0);
        assert_eq!(player.animation().name(), "kick");
    }

    #[test]
    fn test_kick_animation_blocks_until_done() {
        let grid = open_grid();
        let mut player = LocalPlayer::new(100.0, 100.0);

        player.update(&held(|i| i.kick_held = true), DT, &grid);
        player.update(&PlayerInput::default(), DT, &grid);

        player.update(&held(|i| i.right = true), 0.1, &grid);
        assert_eq!(player.animation().name(), "kick");
        player.update(&held(|i| i.right = true), 0.1, &grid);
        assert_eq!(player.animation().name(), "kick");
        player.update(&held(|i| i.right = true), 0.2, &grid);
        assert_eq!(player.animation(), Animation::Walk);
    }

    #[test]
    fn test_typing_releases_held_kick() {
        let grid = open_grid();
        let mut player = LocalPlayer::new(100.0, 100.0);
        let kick = held(|i| i.kick_held = true);

        player.update(&kick, DT, &grid);
        player.update(&kick, DT, &grid);
        assert_approx_eq!(player.charge(), 0.24);

        // Chat opens while the key is still down
        let typing = held(|i| { i.kick_held = true; i.typing = true; });
        let fired = player.update(&typing, 0.5, &grid).unwrap();
        assert_approx_eq!(fired.charge, 0.24);
        assert_eq!(player.kick_state(), KickState::Idle);

        // No charge builds while typing, and closing chat fires nothing
        assert!(player.update(&typing, 0.5, &grid).is_none());
        assert_approx_eq!(player.charge(), 0.0);
        assert!(player.update(&PlayerInput::default(), DT, &grid).is_none());
    }

    #[test]
    fn test_kick_during_kick_animation_does_not_restart_it() {
        let grid = open_grid();
        let mut player = LocalPlayer::new(100.0, 100.0);
        let kick = held(|i| i.kick_held = true);

        player.update(&kick, DT, &grid);
        assert!(player.update(&PlayerInput::default(), DT, &grid).is_some());
        assert_eq!(player.animation(), Animation::Kick { elapsed: 0.0 });

        player.update(&kick, 0.1, &grid);
        assert!(player.update(&PlayerInput::default(), 0.1, &grid).is_some());
        assert_eq!(player.animation().name(), "kick");

        // The first kick's animation ends on schedule
        player.update(&PlayerInput::default(), 0.15, &grid);
        assert_eq!(player.animation(), Animation::Idle);
    }
}
