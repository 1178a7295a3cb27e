//! Types and constants shared by the pixel world server and client.
//!
//! The wire protocol lives in [`protocol`], the static map classification in
//! [`tiles`]. World dimensions are expressed in tiles; positions on the wire
//! and in the simulators are world units (pixels at zoom 1).

pub mod protocol;
pub mod tiles;

pub use protocol::{
    clamp_name, decode, encode, AvatarConfig, EventKind, Packet, PlayerData, PlayerId, ProtocolError,
    ServerEvent, Side,
};
pub use tiles::{Tile, TileGrid};

pub const TILE_SIZE: f32 = 32.0;
pub const MAP_WIDTH: usize = 40;
pub const MAP_HEIGHT: usize = 15;
pub const WORLD_WIDTH: f32 = MAP_WIDTH as f32 * TILE_SIZE;
pub const WORLD_HEIGHT: f32 = MAP_HEIGHT as f32 * TILE_SIZE;

/// Columns `0..TOWN_WIDTH` are the town, the rest is the football field.
pub const TOWN_WIDTH: usize = 20;

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_NAME_LEN: usize = 16;
pub const MAX_PACKET_SIZE: usize = 16 * 1024;

/// Tile the local player spawns on.
pub const SPAWN_TILE: (usize, usize) = (17, 7);

/// Center of a tile in world units.
pub fn tile_center(tile_x: usize, tile_y: usize) -> (f32, f32) {
    (
        tile_x as f32 * TILE_SIZE + TILE_SIZE / 2.0,
        tile_y as f32 * TILE_SIZE + TILE_SIZE / 2.0,
    )
}

/// Tile coordinates containing a world position. May be out of the map.
pub fn world_to_tile(x: f32, y: f32) -> (i32, i32) {
    ((x / TILE_SIZE).floor() as i32, (y / TILE_SIZE).floor() as i32)
}
