//! Keyboard sampling and the chat text field

use crate::player::PlayerInput;
use macroquad::prelude::*;

/// Longest chat line accepted by the text field
pub const MAX_CHAT_LEN: usize = 120;

/// Single-line text entry. While open, it owns the keyboard and movement
/// input is suspended.
#[derive(Debug, Default)]
pub struct ChatField {
    text: Option<String>,
}

impl ChatField {
    pub fn is_open(&self) -> bool {
        self.text.is_some()
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn open(&mut self) {
        if self.text.is_none() {
            self.text = Some(String::new());
        }
    }

    pub fn cancel(&mut self) {
        self.text = None;
    }

    pub fn push(&mut self, c: char) {
        if let Some(text) = self.text.as_mut() {
            if !c.is_control() && text.chars().count() < MAX_CHAT_LEN {
                text.push(c);
            }
        }
    }

    pub fn backspace(&mut self) {
        if let Some(text) = self.text.as_mut() {
            text.pop();
        }
    }

    /// Closes the field and returns its content, unless it was blank
    pub fn submit(&mut self) -> Option<String> {
        let text = self.text.take()?;
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

/// What the keyboard asked for this frame, besides movement
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FrameCommands {
    pub chat: Option<String>,
    pub reconnect: bool,
}

/// Samples the keyboard once per frame
#[derive(Default)]
pub struct InputManager {
    chat: ChatField,
}

impl InputManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chat(&self) -> &ChatField {
        &self.chat
    }

    pub fn update(&mut self) -> (PlayerInput, FrameCommands) {
        let mut commands = FrameCommands::default();

        if self.chat.is_open() {
            while let Some(c) = get_char_pressed() {
                self.chat.push(c);
            }
            if is_key_pressed(KeyCode::Backspace) {
                self.chat.backspace();
            }
            if is_key_pressed(KeyCode::Escape) {
                self.chat.cancel();
            } else if is_key_pressed(KeyCode::Enter) {
                commands.chat = self.chat.submit();
            }
        } else {
            // Drop characters typed while the field was closed
            while get_char_pressed().is_some() {}

            if is_key_pressed(KeyCode::Enter) {
                self.chat.open();
            }
            commands.reconnect = is_key_pressed(KeyCode::R);
        }

        let input = PlayerInput {
            up: is_key_down(KeyCode::W) || is_key_down(KeyCode::Up),
            down: is_key_down(KeyCode::S) || is_key_down(KeyCode::Down),
            left: is_key_down(KeyCode::A) || is_key_down(KeyCode::Left),
            right: is_key_down(KeyCode::D) || is_key_down(KeyCode::Right),
            sprint: is_key_down(KeyCode::LeftShift) || is_key_down(KeyCode::RightShift),
            kick_held: is_key_down(KeyCode::Space),
            typing: self.chat.is_open(),
        };

        (input, commands)
    }
}
