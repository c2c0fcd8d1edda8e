//! A machine driven without a UI.
//!
//! [`HeadlessGame`] runs every command inline and feeds the completion straight
//! back, so each trigger returns once the state is settled. Used by the
//! line-oriented front end and by the scenario tests.

use crate::backend::StoryBackend;
use crate::draft::DraftField;
use crate::machine::{Applied, Rejection, Trigger, ViewStateMachine};
use crate::options::CharacterOptionsCache;
use crate::worker::execute;
use std::sync::Arc;
use story_api::{ApiConfig, StoryApi};

/// What happened when a trigger was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The trigger fired without needing the backend.
    Local,
    /// The trigger issued a request that settled as described.
    Settled(Applied),
}

pub struct HeadlessGame {
    machine: ViewStateMachine,
    backend: Arc<dyn StoryBackend>,
    options: Arc<CharacterOptionsCache>,
}

impl HeadlessGame {
    pub fn new(backend: Arc<dyn StoryBackend>) -> Self {
        let options = Arc::new(CharacterOptionsCache::new(Arc::clone(&backend)));
        Self {
            machine: ViewStateMachine::new(),
            backend,
            options,
        }
    }

    /// Connect to the backend configured in the environment.
    pub fn from_env() -> Result<Self, story_api::Error> {
        Self::with_config(ApiConfig::from_env()?)
    }

    pub fn with_config(config: ApiConfig) -> Result<Self, story_api::Error> {
        let api = StoryApi::new(config)?;
        Ok(Self::new(Arc::new(api)))
    }

    pub fn machine(&self) -> &ViewStateMachine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut ViewStateMachine {
        &mut self.machine
    }

    pub fn options_cache(&self) -> &CharacterOptionsCache {
        &self.options
    }

    /// Apply a trigger and wait for any request it issues.
    pub async fn trigger(&mut self, trigger: Trigger) -> Result<Step, Rejection> {
        match self.machine.dispatch(trigger)? {
            Some(command) => {
                let completion = execute(self.backend.as_ref(), &self.options, command).await;
                Ok(Step::Settled(self.machine.complete(completion)))
            }
            None => Ok(Step::Local),
        }
    }

    pub fn set_field(
        &mut self,
        field: DraftField,
        value: impl Into<String>,
    ) -> Result<(), Rejection> {
        self.machine.set_draft_field(field, value)
    }
}
