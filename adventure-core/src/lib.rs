//! Session state machine for the narrative adventure client.
//!
//! This crate provides:
//! - Character draft validation
//! - A single-flight cache for the character creation options
//! - The view state machine that governs home, character creation, the
//!   character sheet and the adventure loop
//! - A background request worker and an inline headless driver
//!
//! # Quick Start
//!
//! ```ignore
//! use adventure_core::{DraftField, HeadlessGame, Trigger};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut game = HeadlessGame::from_env()?;
//!
//!     game.trigger(Trigger::Begin).await?;
//!     game.set_field(DraftField::Name, "Kael")?;
//!     game.set_field(DraftField::Race, "Elf")?;
//!     game.set_field(DraftField::CharacterClass, "Rogue")?;
//!     game.set_field(DraftField::Background, "Orphan")?;
//!     game.trigger(Trigger::Submit).await?;
//!     game.trigger(Trigger::BeginAdventure).await?;
//!
//!     if let Some(story) = game.machine().story() {
//!         println!("{}", story.story_text);
//!     }
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod draft;
pub mod headless;
pub mod machine;
pub mod options;
pub mod testing;
pub mod worker;

// Primary public API
pub use backend::{RequestFailure, StoryBackend};
pub use draft::{is_submittable, CharacterDraft, DraftField, ValidationFailure};
pub use headless::{HeadlessGame, Step};
pub use machine::{
    AdventureSession, Applied, Command, Completion, Notice, NoticeKind, Outcome, Rejection,
    Request, RequestTag, Trigger, View, ViewStateMachine,
};
pub use options::CharacterOptionsCache;
pub use testing::{BackendCall, MockBackend};
pub use worker::{execute, spawn_worker, WorkerRequest};
