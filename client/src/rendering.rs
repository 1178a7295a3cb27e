use crate::appearance::Appearance;
use crate::ball::BALL_RADIUS;
use crate::game::World;
use crate::input::ChatField;
use crate::player::{Animation, LocalPlayer};
use crate::remote::{RemoteAnimation, RemotePlayerView};
use crate::transport::ConnectionState;
use macroquad::prelude::*;
use ::rand::rngs::StdRng;
use ::rand::{Rng, SeedableRng};
use shared::{Side, Tile, TileGrid, TILE_SIZE};

const DECORATION_SEED: u64 = 0x9e37_79b9;
const PLAYER_WIDTH: f32 = 18.0;
const PLAYER_HEIGHT: f32 = 26.0;
const HUD_HEIGHT: f32 = 84.0;

/// A small darker or lighter dot drawn on grass and path tiles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Speckle {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub shade: f32,
}

/// Deterministic tile decoration, identical on every client
pub fn decorate(grid: &TileGrid) -> Vec<Speckle> {
    let mut rng = StdRng::seed_from_u64(DECORATION_SEED);
    let mut speckles = Vec::new();

    for (tile_x, tile_y, tile) in grid.iter() {
        let count = match tile {
            Tile::Grass => 3,
            Tile::Path => 1,
            _ => 0,
        };
        for _ in 0..count {
            speckles.push(Speckle {
                x: tile_x as f32 * TILE_SIZE + rng.gen_range(2.0..TILE_SIZE - 2.0),
                y: tile_y as f32 * TILE_SIZE + rng.gen_range(2.0..TILE_SIZE - 2.0),
                size: rng.gen_range(1.0..3.0),
                shade: rng.gen_range(-0.08..0.08),
            });
        }
    }

    speckles
}

/// Maps world units onto the window, letterboxed below the HUD
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Viewport {
    pub fn fit(world_width: f32, world_height: f32, screen_w: f32, screen_h: f32) -> Self {
        let available = (screen_h - HUD_HEIGHT).max(1.0);
        let scale = (screen_w / world_width).min(available / world_height);
        Self {
            scale,
            offset_x: (screen_w - world_width * scale) / 2.0,
            offset_y: HUD_HEIGHT + (available - world_height * scale) / 2.0,
        }
    }

    pub fn to_screen(&self, x: f32, y: f32) -> (f32, f32) {
        (self.offset_x + x * self.scale, self.offset_y + y * self.scale)
    }

    fn rect(&self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        let (sx, sy) = self.to_screen(x, y);
        draw_rectangle(sx, sy, w * self.scale, h * self.scale, color);
    }
}

fn tile_color(tile: Tile) -> Color {
    match tile {
        Tile::Grass => Color::from_rgba(92, 168, 76, 255),
        Tile::Path => Color::from_rgba(196, 170, 120, 255),
        Tile::Wall => Color::from_rgba(88, 84, 96, 255),
        Tile::Floor => Color::from_rgba(150, 110, 80, 255),
        Tile::GoalLeft | Tile::GoalRight => Color::from_rgba(235, 235, 235, 255),
    }
}

fn shade(color: Color, amount: f32) -> Color {
    Color::new(
        (color.r + amount).clamp(0.0, 1.0),
        (color.g + amount).clamp(0.0, 1.0),
        (color.b + amount).clamp(0.0, 1.0),
        color.a,
    )
}

/// Vertical bounce of a walking or running sprite
fn bob(rate: f64, amplitude: f32) -> f32 {
    (get_time() * rate).sin() as f32 * amplitude
}

pub struct Renderer {
    speckles: Vec<Speckle>,
    local_look: Appearance,
}

impl Renderer {
    pub fn new(world: &World, local_look: Appearance) -> Self {
        Self {
            speckles: decorate(world.grid()),
            local_look,
        }
    }

    pub fn render(&self, world: &World, chat: &ChatField, state: ConnectionState) {
        clear_background(Color::from_rgba(26, 26, 26, 255));

        let grid = world.grid();
        let view = Viewport::fit(
            grid.pixel_width(),
            grid.pixel_height(),
            screen_width(),
            screen_height(),
        );

        self.draw_tiles(&view, grid);

        for remote in world.remotes.iter() {
            draw_remote(&view, remote);
        }
        self.draw_local(&view, &world.player, world.name());

        let (bx, by) = view.to_screen(world.ball.x, world.ball.y);
        draw_circle(bx, by, BALL_RADIUS * view.scale, WHITE);
        draw_circle_lines(bx, by, BALL_RADIUS * view.scale, 1.5, BLACK);

        draw_status(state, world.remotes.len());
        draw_scoreboard(world);
        draw_chat(world, chat);
    }

    fn draw_tiles(&self, view: &Viewport, grid: &TileGrid) {
        for (tile_x, tile_y, tile) in grid.iter() {
            let x = tile_x as f32 * TILE_SIZE;
            let y = tile_y as f32 * TILE_SIZE;
            view.rect(x, y, TILE_SIZE, TILE_SIZE, tile_color(tile));

            if tile.is_goal() {
                let (sx, sy) = view.to_screen(x, y);
                let side = TILE_SIZE * view.scale;
                draw_rectangle_lines(sx, sy, side, side, 1.0, GRAY);
            }
        }

        let base = tile_color(Tile::Grass);
        for speckle in &self.speckles {
            view.rect(
                speckle.x,
                speckle.y,
                speckle.size,
                speckle.size,
                shade(base, speckle.shade),
            );
        }
    }

    fn draw_local(&self, view: &Viewport, player: &LocalPlayer, name: &str) {
        let offset = match player.animation() {
            Animation::Idle => 0.0,
            Animation::Walk => bob(10.0, 1.0),
            Animation::Run => bob(16.0, 2.0),
            Animation::Kick { .. } => -2.0,
        };
        draw_avatar(view, player.x, player.y, &self.local_look, player.flip_x(), offset);
        draw_name(view, player.x, player.y, name, YELLOW);

        let charge = player.charge();
        if charge > 0.0 {
            let width = 24.0;
            let x = player.x - width / 2.0;
            let y = player.y + PLAYER_HEIGHT / 2.0 + 4.0;
            view.rect(x, y, width, 4.0, Color::from_rgba(0, 0, 0, 160));
            view.rect(x, y, width * charge, 4.0, Color::new(1.0, 1.0 - charge, 0.0, 1.0));
        }
    }
}

fn draw_avatar(view: &Viewport, x: f32, y: f32, look: &Appearance, flip_x: bool, offset: f32) {
    let left = x - PLAYER_WIDTH / 2.0;
    let top = y - PLAYER_HEIGHT / 2.0 + offset;

    // Legs, outfit, head, hair
    view.rect(left + 3.0, top + 18.0, 5.0, 8.0, DARKGRAY);
    view.rect(left + 10.0, top + 18.0, 5.0, 8.0, DARKGRAY);
    view.rect(left, top + 9.0, PLAYER_WIDTH, 11.0, look.outfit);
    view.rect(left + 3.0, top, 12.0, 10.0, look.skin);
    view.rect(left + 2.0, top - 2.0, 14.0, 4.0, look.hair);

    let eye_x = if flip_x { left + 5.0 } else { left + 11.0 };
    view.rect(eye_x, top + 4.0, 2.0, 2.0, BLACK);

    if let Some(accessory) = look.accessory {
        view.rect(left + 1.0, top - 4.0, 16.0, 3.0, accessory);
    }
}

fn draw_name(view: &Viewport, x: f32, y: f32, name: &str, color: Color) {
    let (sx, sy) = view.to_screen(x, y - PLAYER_HEIGHT / 2.0 - 8.0);
    let size = measure_text(name, None, 14, 1.0);
    draw_text(name, sx - size.width / 2.0, sy, 14.0, color);
}

fn draw_remote(view: &Viewport, remote: &RemotePlayerView) {
    let offset = match remote.animation {
        RemoteAnimation::Idle => 0.0,
        RemoteAnimation::Walk => bob(10.0, 1.0),
        RemoteAnimation::Run => bob(16.0, 2.0),
    };
    draw_avatar(
        view,
        remote.current_x,
        remote.current_y,
        &remote.appearance,
        remote.flip_x,
        offset,
    );
    draw_name(view, remote.current_x, remote.current_y, &remote.name, WHITE);
}

fn draw_scoreboard(world: &World) {
    let text = format!("{}  :  {}", world.scoreboard.left(), world.scoreboard.right());
    let size = measure_text(&text, None, 32, 1.0);
    let x = screen_width() / 2.0 - size.width / 2.0;

    draw_rectangle(
        x - 12.0,
        6.0,
        size.width + 24.0,
        40.0,
        Color::from_rgba(0, 0, 0, 160),
    );
    draw_text(&text, x, 36.0, 32.0, WHITE);

    if let Some(side) = world.scoreboard.flashing() {
        let label = match side {
            Side::Left => "GOAL! Left",
            Side::Right => "GOAL! Right",
        };
        let size = measure_text(label, None, 28, 1.0);
        draw_text(label, screen_width() / 2.0 - size.width / 2.0, 72.0, 28.0, YELLOW);
    }
}

fn draw_chat(world: &World, chat: &ChatField) {
    let line_height = 18.0;
    let mut y = screen_height() - 30.0 - world.chat.len() as f32 * line_height;
    for line in world.chat.iter() {
        y += line_height;
        draw_text(&format!("{}: {}", line.sender, line.text), 10.0, y, 18.0, WHITE);
    }

    let bottom = screen_height() - 8.0;
    if chat.is_open() {
        draw_rectangle(
            6.0,
            bottom - 18.0,
            screen_width() - 12.0,
            24.0,
            Color::from_rgba(0, 0, 0, 180),
        );
        draw_text(&format!("> {}_", chat.text()), 10.0, bottom, 18.0, WHITE);
    } else {
        draw_text(
            "Enter: chat  Space: kick  Shift: sprint  R: reconnect",
            10.0,
            bottom,
            16.0,
            GRAY,
        );
    }
}

fn draw_status(state: ConnectionState, remote_count: usize) {
    let (text, color) = match state {
        ConnectionState::Connected { client_id } => (
            format!("Connected as #{} | {} others", client_id, remote_count),
            GREEN,
        ),
        ConnectionState::Connecting => ("Connecting...".to_string(), YELLOW),
        ConnectionState::Disconnected => ("Disconnected".to_string(), RED),
    };
    draw_text(&text, 10.0, 20.0, 18.0, color);
}
