//! Testing utilities for the adventure client.
//!
//! This module provides tools for integration testing:
//! - `MockBackend` for deterministic tests without a server
//! - Sample data builders for options, characters and story states

use crate::backend::{RequestFailure, StoryBackend};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use story_api::{
    AdventureStart, Character, CharacterOptions, NewCharacter, StoryHistory, StoryState,
};
use tokio::sync::Semaphore;

/// A call received by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    CharacterOptions,
    CreateCharacter(NewCharacter),
    StartAdventure(String),
    SubmitChoice {
        session_id: String,
        choice_text: String,
    },
    StoryHistory(String),
}

#[derive(Default)]
struct Script {
    options: VecDeque<Result<CharacterOptions, RequestFailure>>,
    characters: VecDeque<Result<Character, RequestFailure>>,
    starts: VecDeque<Result<AdventureStart, RequestFailure>>,
    choices: VecDeque<Result<StoryState, RequestFailure>>,
    histories: VecDeque<Result<StoryHistory, RequestFailure>>,
    calls: Vec<BackendCall>,
}

/// A backend that returns scripted responses.
///
/// Responses are queued per endpoint and returned in order. An endpoint with
/// nothing queued answers with a 500. A gated backend records each call
/// immediately but holds the response until [`release`](Self::release) is
/// called, which lets tests observe the machine while a request is pending.
pub struct MockBackend {
    script: Mutex<Script>,
    gate: Option<Semaphore>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// A backend that answers immediately.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script::default()),
            gate: None,
        }
    }

    /// A backend that holds every response until released.
    pub fn gated() -> Self {
        Self {
            script: Mutex::new(Script::default()),
            gate: Some(Semaphore::new(0)),
        }
    }

    pub fn with_options(self, response: Result<CharacterOptions, RequestFailure>) -> Self {
        self.script().options.push_back(response);
        self
    }

    pub fn with_character(self, response: Result<Character, RequestFailure>) -> Self {
        self.script().characters.push_back(response);
        self
    }

    pub fn with_start(self, response: Result<AdventureStart, RequestFailure>) -> Self {
        self.script().starts.push_back(response);
        self
    }

    pub fn with_choice(self, response: Result<StoryState, RequestFailure>) -> Self {
        self.script().choices.push_back(response);
        self
    }

    pub fn with_history(self, response: Result<StoryHistory, RequestFailure>) -> Self {
        self.script().histories.push_back(response);
        self
    }

    /// Let `n` held responses through. No effect on an ungated backend.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.script().calls.clone()
    }

    /// Number of received calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&BackendCall) -> bool) -> usize {
        self.script().calls.iter().filter(|call| predicate(call)).count()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn respond<T>(
        &self,
        call: BackendCall,
        queue: impl FnOnce(&mut Script) -> &mut VecDeque<Result<T, RequestFailure>>,
    ) -> Result<T, RequestFailure> {
        self.script().calls.push(call);

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let mut script = self.script();
        let response = queue(&mut *script).pop_front();
        response.unwrap_or_else(|| {
            Err(RequestFailure::Api {
                status: 500,
                message: "no scripted response".to_string(),
            })
        })
    }
}

#[async_trait]
impl StoryBackend for MockBackend {
    async fn character_options(&self) -> Result<CharacterOptions, RequestFailure> {
        self.respond(BackendCall::CharacterOptions, |s| &mut s.options)
            .await
    }

    async fn create_character(
        &self,
        character: &NewCharacter,
    ) -> Result<Character, RequestFailure> {
        self.respond(BackendCall::CreateCharacter(character.clone()), |s| {
            &mut s.characters
        })
        .await
    }

    async fn start_adventure(&self, character_id: &str) -> Result<AdventureStart, RequestFailure> {
        self.respond(BackendCall::StartAdventure(character_id.to_string()), |s| {
            &mut s.starts
        })
        .await
    }

    async fn submit_choice(
        &self,
        session_id: &str,
        choice_text: &str,
    ) -> Result<StoryState, RequestFailure> {
        let call = BackendCall::SubmitChoice {
            session_id: session_id.to_string(),
            choice_text: choice_text.to_string(),
        };
        self.respond(call, |s| &mut s.choices).await
    }

    async fn story_history(&self, session_id: &str) -> Result<StoryHistory, RequestFailure> {
        self.respond(BackendCall::StoryHistory(session_id.to_string()), |s| {
            &mut s.histories
        })
        .await
    }
}

/// Options with two entries per list.
pub fn sample_options() -> CharacterOptions {
    CharacterOptions {
        races: vec!["Human".to_string(), "Elf".to_string()],
        classes: vec!["Fighter".to_string(), "Rogue".to_string()],
        backgrounds: vec!["Orphan".to_string(), "Sage".to_string()],
    }
}

/// A level 1 elf rogue as the backend would create it.
pub fn sample_character(id: &str) -> Character {
    Character {
        id: id.to_string(),
        name: "Kael".to_string(),
        race: "Elf".to_string(),
        character_class: "Rogue".to_string(),
        background: "Orphan".to_string(),
        level: 1,
        hit_points: 8,
        armor_class: 11,
        strength: 10,
        dexterity: 12,
        constitution: 10,
        intelligence: 11,
        wisdom: 10,
        charisma: 10,
        gold: 100,
        inventory: vec![
            "Basic equipment".to_string(),
            "Rations".to_string(),
            "Backpack".to_string(),
        ],
        created_at: None,
    }
}

/// An opening scene with two choices and no location.
pub fn sample_story() -> StoryState {
    StoryState {
        story_text: "You awaken...".to_string(),
        choices: vec!["Explore".to_string(), "Sleep".to_string()],
        location: None,
        combat_encounter: false,
    }
}

pub fn sample_start(session_id: &str) -> AdventureStart {
    AdventureStart {
        session_id: session_id.to_string(),
        story: sample_story(),
    }
}
