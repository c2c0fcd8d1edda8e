//! Color theme and styling for the adventure TUI

use ratatui::style::{Color, Modifier, Style};

/// Game UI color theme
#[derive(Debug, Clone)]
pub struct GameTheme {
    // Base colors
    pub foreground: Color,
    pub border: Color,
    pub border_focused: Color,
    pub title: Color,

    // HP colors
    pub hp_healthy: Color,
    pub hp_wounded: Color,

    // Text colors
    pub story_text: Color,
    pub choice_text: Color,
    pub hint_text: Color,
    pub combat_text: Color,

    // Notices
    pub validation: Color,
    pub failure: Color,
}

impl Default for GameTheme {
    fn default() -> Self {
        Self {
            foreground: Color::White,
            border: Color::DarkGray,
            border_focused: Color::Cyan,
            title: Color::Yellow,

            hp_healthy: Color::Green,
            hp_wounded: Color::Yellow,

            story_text: Color::White,
            choice_text: Color::Cyan,
            hint_text: Color::DarkGray,
            combat_text: Color::LightRed,

            validation: Color::Yellow,
            failure: Color::Red,
        }
    }
}

impl GameTheme {
    /// Get style for normal text
    pub fn text_style(&self) -> Style {
        Style::default().fg(self.foreground)
    }

    pub fn story_style(&self) -> Style {
        Style::default().fg(self.story_text)
    }

    /// Get style for a listed choice
    pub fn choice_style(&self, selected: bool) -> Style {
        let style = Style::default().fg(self.choice_text);
        if selected {
            style.add_modifier(Modifier::BOLD | Modifier::REVERSED)
        } else {
            style
        }
    }

    /// Get style for key hints and placeholders
    pub fn hint_style(&self) -> Style {
        Style::default()
            .fg(self.hint_text)
            .add_modifier(Modifier::DIM)
    }

    pub fn combat_style(&self) -> Style {
        Style::default()
            .fg(self.combat_text)
            .add_modifier(Modifier::BOLD)
    }

    /// HP is shown green when the character has at least 10 points.
    pub fn hp_color(&self, hit_points: i32) -> Color {
        if hit_points >= 10 {
            self.hp_healthy
        } else {
            self.hp_wounded
        }
    }

    /// Get border style
    pub fn border_style(&self, focused: bool) -> Style {
        Style::default().fg(if focused {
            self.border_focused
        } else {
            self.border
        })
    }

    /// Get title style
    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.title)
            .add_modifier(Modifier::BOLD)
    }

    pub fn notice_style(&self, is_failure: bool) -> Style {
        Style::default()
            .fg(if is_failure {
                self.failure
            } else {
                self.validation
            })
            .add_modifier(Modifier::BOLD)
    }
}
