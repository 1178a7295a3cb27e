//! Static terrain classification of the map.
//!
//! The grid is built once at map load. The only mutation allowed afterwards
//! is [`TileGrid::stamp_solid`], applied by the object placement layer before
//! the first simulation tick; simulators share it read-only behind an `Arc`.

use crate::{MAP_HEIGHT, MAP_WIDTH, TILE_SIZE, TOWN_WIDTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tile {
    Grass,
    Path,
    Wall,
    Floor,
    GoalLeft,
    GoalRight,
}

impl Tile {
    pub fn code(self) -> u8 {
        match self {
            Tile::Grass => 0,
            Tile::Path => 1,
            Tile::Wall => 2,
            Tile::Floor => 3,
            Tile::GoalLeft => 4,
            Tile::GoalRight => 5,
        }
    }

    pub fn from_code(code: u8) -> Option<Tile> {
        match code {
            0 => Some(Tile::Grass),
            1 => Some(Tile::Path),
            2 => Some(Tile::Wall),
            3 => Some(Tile::Floor),
            4 => Some(Tile::GoalLeft),
            5 => Some(Tile::GoalRight),
            _ => None,
        }
    }

    pub fn is_wall(self) -> bool {
        self == Tile::Wall
    }

    pub fn is_goal(self) -> bool {
        matches!(self, Tile::GoalLeft | Tile::GoalRight)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
}

impl TileGrid {
    pub fn filled(width: usize, height: usize, tile: Tile) -> Self {
        Self {
            width,
            height,
            tiles: vec![tile; width * height],
        }
    }

    /// Builds a grid from rows of tile codes. Returns `None` if the rows are
    /// ragged, empty or contain an unknown code.
    pub fn from_codes(rows: &[Vec<u8>]) -> Option<Self> {
        let height = rows.len();
        let width = rows.first()?.len();
        if width == 0 || rows.iter().any(|row| row.len() != width) {
            return None;
        }

        let tiles = rows
            .iter()
            .flatten()
            .map(|code| Tile::from_code(*code))
            .collect::<Option<Vec<_>>>()?;

        Some(Self {
            width,
            height,
            tiles,
        })
    }

    /// The walled town on the left, opening at rows 6..=8 onto the football
    /// field on the right. Goals sit in the outermost field columns,
    /// rows 5..=9, flanked by posts.
    pub fn town_and_field() -> Self {
        let mut grid = Self::filled(MAP_WIDTH, MAP_HEIGHT, Tile::Grass);

        for y in 0..MAP_HEIGHT {
            for x in 0..MAP_WIDTH {
                let tile = if x < TOWN_WIDTH {
                    town_tile(x, y)
                } else {
                    field_tile(x, y)
                };
                grid.tiles[y * MAP_WIDTH + x] = tile;
            }
        }

        grid
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel_width(&self) -> f32 {
        self.width as f32 * TILE_SIZE
    }

    pub fn pixel_height(&self) -> f32 {
        self.height as f32 * TILE_SIZE
    }

    pub fn in_bounds(&self, tile_x: i32, tile_y: i32) -> bool {
        tile_x >= 0 && tile_y >= 0 && (tile_x as usize) < self.width && (tile_y as usize) < self.height
    }

    pub fn get(&self, tile_x: i32, tile_y: i32) -> Option<Tile> {
        if !self.in_bounds(tile_x, tile_y) {
            return None;
        }
        Some(self.tiles[tile_y as usize * self.width + tile_x as usize])
    }

    /// Walls and everything outside the map block movement.
    pub fn is_blocked(&self, tile_x: i32, tile_y: i32) -> bool {
        self.get(tile_x, tile_y).map_or(true, Tile::is_wall)
    }

    /// Marks the given tiles as walls. Out-of-map coordinates are skipped.
    /// Returns how many tiles were stamped.
    pub fn stamp_solid<I>(&mut self, tiles: I) -> usize
    where
        I: IntoIterator<Item = (i32, i32)>,
    {
        let mut stamped = 0;
        for (tile_x, tile_y) in tiles {
            if self.in_bounds(tile_x, tile_y) {
                self.tiles[tile_y as usize * self.width + tile_x as usize] = Tile::Wall;
                stamped += 1;
            }
        }
        stamped
    }

    /// Iterates `(tile_x, tile_y, tile)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, Tile)> + '_ {
        self.tiles
            .iter()
            .enumerate()
            .map(move |(i, tile)| (i % self.width, i / self.width, *tile))
    }
}

fn town_tile(x: usize, y: usize) -> Tile {
    let last_row = MAP_HEIGHT - 1;

    if x == 0 || y == 0 || y == last_row {
        return Tile::Wall;
    }
    if x == TOWN_WIDTH - 1 {
        return if (6..=8).contains(&y) { Tile::Path } else { Tile::Wall };
    }

    // Building with its door at (16, 5)
    if (14..=18).contains(&x) && (2..=5).contains(&y) {
        let edge = x == 14 || x == 18 || y == 2 || y == 5;
        let door = x == 16 && y == 5;
        return if edge && !door { Tile::Wall } else { Tile::Floor };
    }

    if y == 7 || (x == 10 && (3..=12).contains(&y)) || (x == 16 && y == 6) {
        Tile::Path
    } else {
        Tile::Grass
    }
}

fn field_tile(x: usize, y: usize) -> Tile {
    if y == 0 || y == MAP_HEIGHT - 1 {
        return Tile::Wall;
    }

    let in_goal_mouth = (5..=9).contains(&y);
    if x == TOWN_WIDTH {
        if in_goal_mouth { Tile::GoalLeft } else { Tile::Wall }
    } else if x == MAP_WIDTH - 1 {
        if in_goal_mouth { Tile::GoalRight } else { Tile::Wall }
    } else {
        Tile::Grass
    }
}
