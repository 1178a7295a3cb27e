//! Per-player visuals derived from an avatar selection
//!
//! Avatar item identifiers are opaque to the rest of the client. Here they
//! are only hashed into a palette so every player with the same selection
//! looks the same on every screen.

use log::warn;
use macroquad::color::Color;
use shared::AvatarConfig;
use thiserror::Error;

/// Accessory identifier meaning "nothing worn"
pub const NO_ACCESSORY: &str = "none";

const SKIN_TONES: [Color; 5] = [
    Color::new(0.98, 0.85, 0.72, 1.0),
    Color::new(0.91, 0.74, 0.58, 1.0),
    Color::new(0.78, 0.58, 0.42, 1.0),
    Color::new(0.58, 0.40, 0.27, 1.0),
    Color::new(0.38, 0.25, 0.17, 1.0),
];

const CLOTH: [Color; 8] = [
    Color::new(0.85, 0.22, 0.22, 1.0),
    Color::new(0.22, 0.45, 0.85, 1.0),
    Color::new(0.25, 0.70, 0.35, 1.0),
    Color::new(0.95, 0.75, 0.20, 1.0),
    Color::new(0.60, 0.30, 0.75, 1.0),
    Color::new(0.95, 0.50, 0.15, 1.0),
    Color::new(0.20, 0.70, 0.70, 1.0),
    Color::new(0.35, 0.35, 0.40, 1.0),
];

const HAIR: [Color; 6] = [
    Color::new(0.10, 0.08, 0.06, 1.0),
    Color::new(0.40, 0.25, 0.12, 1.0),
    Color::new(0.85, 0.70, 0.35, 1.0),
    Color::new(0.70, 0.25, 0.10, 1.0),
    Color::new(0.75, 0.75, 0.78, 1.0),
    Color::new(0.95, 0.45, 0.70, 1.0),
];

/// Drawn instead of a real appearance when generation fails
pub const FALLBACK_COLOR: Color = Color::new(0.55, 0.55, 0.55, 1.0);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AppearanceError {
    #[error("avatar {0} is empty")]
    EmptyItem(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Appearance {
    pub skin: Color,
    pub outfit: Color,
    pub hair: Color,
    pub accessory: Option<Color>,
    /// True when this is the placeholder look
    pub fallback: bool,
}

impl Appearance {
    pub fn generate(avatar: &AvatarConfig) -> Result<Self, AppearanceError> {
        let skin = pick(&SKIN_TONES, "body", &avatar.body)?;
        let outfit = pick(&CLOTH, "outfit", &avatar.outfit)?;
        let hair = pick(&HAIR, "hair", &avatar.hair)?;
        let accessory = if avatar.accessory == NO_ACCESSORY {
            None
        } else {
            Some(pick(&CLOTH, "accessory", &avatar.accessory)?)
        };

        Ok(Self {
            skin,
            outfit,
            hair,
            accessory,
            fallback: false,
        })
    }

    pub fn fallback() -> Self {
        Self {
            skin: FALLBACK_COLOR,
            outfit: FALLBACK_COLOR,
            hair: FALLBACK_COLOR,
            accessory: None,
            fallback: true,
        }
    }

    /// Generates the appearance, falling back to the placeholder on failure.
    /// Failures never leave this function.
    pub fn for_player(id: shared::PlayerId, avatar: &AvatarConfig) -> Self {
        match Self::generate(avatar) {
            Ok(appearance) => appearance,
            Err(e) => {
                warn!("Using fallback appearance for player {}: {}", id, e);
                Self::fallback()
            }
        }
    }
}

fn pick(palette: &[Color], slot: &'static str, item: &str) -> Result<Color, AppearanceError> {
    if item.trim().is_empty() {
        return Err(AppearanceError::EmptyItem(slot));
    }
    Ok(palette[(fnv1a(item) % palette.len() as u64) as usize])
}

fn fnv1a(s: &str) -> u64 {
    s.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x0000_0100_0000_01b3)
    })
}
