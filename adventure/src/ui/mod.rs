//! UI module for the adventure TUI

pub mod render;
pub mod theme;
