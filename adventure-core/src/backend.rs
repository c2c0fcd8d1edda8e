//! The seam between the state machine and the network.

use async_trait::async_trait;
use story_api::{
    AdventureStart, Character, CharacterOptions, NewCharacter, StoryApi, StoryHistory, StoryState,
};

/// Any failure of a backend call: network, status, or unparseable body.
pub type RequestFailure = story_api::Error;

/// Backend operations the client depends on.
///
/// Implemented by [`StoryApi`] for real use and by
/// [`MockBackend`](crate::testing::MockBackend) in tests.
#[async_trait]
pub trait StoryBackend: Send + Sync {
    async fn character_options(&self) -> Result<CharacterOptions, RequestFailure>;

    async fn create_character(&self, character: &NewCharacter)
        -> Result<Character, RequestFailure>;

    async fn start_adventure(&self, character_id: &str) -> Result<AdventureStart, RequestFailure>;

    async fn submit_choice(
        &self,
        session_id: &str,
        choice_text: &str,
    ) -> Result<StoryState, RequestFailure>;

    async fn story_history(&self, session_id: &str) -> Result<StoryHistory, RequestFailure>;
}

#[async_trait]
impl StoryBackend for StoryApi {
    async fn character_options(&self) -> Result<CharacterOptions, RequestFailure> {
        StoryApi::character_options(self).await
    }

    async fn create_character(
        &self,
        character: &NewCharacter,
    ) -> Result<Character, RequestFailure> {
        StoryApi::create_character(self, character).await
    }

    async fn start_adventure(&self, character_id: &str) -> Result<AdventureStart, RequestFailure> {
        StoryApi::start_adventure(self, character_id).await
    }

    async fn submit_choice(
        &self,
        session_id: &str,
        choice_text: &str,
    ) -> Result<StoryState, RequestFailure> {
        StoryApi::submit_choice(self, session_id, choice_text).await
    }

    async fn story_history(&self, session_id: &str) -> Result<StoryHistory, RequestFailure> {
        StoryApi::story_history(self, session_id).await
    }
}
